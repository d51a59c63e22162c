//! Run-level error type for the prober.
//!
//! Per-candidate probe failures are *values* (see [`crate::evm::CallFailure`])
//! and never surface here; only exhaustion of an entire chain or a fatal
//! precondition becomes a `ProbeError`. Each error carries a stable string
//! code for log scraping.

use std::fmt;

/// Error raised when a whole probing stage cannot proceed.
#[derive(Debug)]
pub struct ProbeError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl ProbeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ProbeError {}

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No acquisition tier produced the target's asset. Fatal, not a
    /// security signal.
    AcquisitionFailed,
    /// Every entry candidate was rejected by the target. Fatal.
    EntryFailed,
    /// Caller is neither the owner nor the lending pool. Fatal.
    Unauthorized,
    /// A planned attack step failed inside the atomic callback. The whole
    /// operation was rolled back.
    CallStepFailed,
    /// Could not seed the simulation from the fork endpoint.
    ForkLoadFailed,
    /// Missing or malformed configuration.
    ConfigInvalid,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcquisitionFailed => "ACQUISITION_FAILED",
            Self::EntryFailed => "ENTRY_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::CallStepFailed => "CALL_STEP_FAILED",
            Self::ForkLoadFailed => "FORK_LOAD_FAILED",
            Self::ConfigInvalid => "CONFIG_INVALID",
        }
    }
}

// Convenience constructors

impl ProbeError {
    pub fn acquisition_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AcquisitionFailed, msg)
    }

    pub fn entry_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntryFailed, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, msg)
    }

    pub fn call_step_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CallStepFailed, msg)
    }

    pub fn fork_load_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ForkLoadFailed, msg)
    }

    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, msg)
    }
}

/// Result alias used throughout the crate.
pub type ProbeResult<T> = Result<T, ProbeError>;

//! Vault Prober - REVM-based vault exploit probing engine
//!
//! Probes deployed pooled-custody contracts for exploitable behaviors,
//! entirely inside an in-memory EVM simulation:
//! - Ordered-fallback entry/exit probing with a strict profit predicate
//! - First-depositor inflation, share-price drift and fee-refund scenarios
//! - A fixed deep-scan catalog of generic payout operations
//! - An atomic flash-loan attack orchestrator with whole-state rollback
//!
//! Nothing here ever touches a live chain beyond read-only fork seeding.

pub mod abi;
pub mod acquire;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod deep_scan;
pub mod errors;
pub mod evm;
pub mod flashloan;
pub mod fork;
pub mod pipeline;
pub mod prober;
pub mod report;

pub use acquire::Acquired;
pub use catalog::{ArgTemplate, CallCandidate, ValuePolicy};
pub use classifier::{classify, ExploitVerdict, ProbeEvidence, VaultSnapshot};
pub use config::ProberConfig;
pub use deep_scan::DeepScanHit;
pub use errors::{ErrorCode, ProbeError, ProbeResult};
pub use evm::{random_identity, CallFailure, EvmHarness, TargetVm};
pub use flashloan::{
    AttackReceipt, CallValue, FlashLoanOrchestrator, FlashLoanPlan, OrchestratorState, PlannedCall,
};
pub use fork::ForkLoader;
pub use pipeline::{probe_target, ProbeReport};
pub use prober::{advance_time, run_entry, run_exit, ProbeOutcome};

//! Deterministic vulnerability classification over collected evidence.
//!
//! The classifier is total and pure: it inspects the evidence a probe run
//! gathered and returns exactly one verdict. Evaluation short-circuits in
//! probe order, so the first applicable classification wins. It never
//! performs calls and never fails.

use alloy_primitives::{U256, U512};

use crate::deep_scan::DeepScanHit;
use crate::prober::ProbeOutcome;

/// Vault accounting captured at a checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultSnapshot {
    pub total_assets: U256,
    pub total_shares: U256,
    pub prober_balance: U256,
}

/// Second-party deposit observation from the inflation scenario.
#[derive(Debug, Clone, Copy)]
pub struct InflationEvidence {
    /// Assets the victim committed after the 1-wei deposit and donation.
    pub victim_deposit: U256,
    /// Shares the vault minted for that deposit.
    pub victim_shares_minted: U256,
}

/// Share-price observation across a full deposit/withdraw cycle.
#[derive(Debug, Clone, Copy)]
pub struct DriftEvidence {
    pub before: VaultSnapshot,
    pub after: VaultSnapshot,
}

impl DriftEvidence {
    /// Price-per-share strictly increased across the cycle, compared without
    /// division: assets₂·shares₁ > assets₁·shares₂ in widened arithmetic.
    pub fn price_increased(&self) -> bool {
        if self.before.total_shares.is_zero() || self.after.total_shares.is_zero() {
            return false;
        }
        let lhs: U512 = self.after.total_assets.widening_mul(self.before.total_shares);
        let rhs: U512 = self.before.total_assets.widening_mul(self.after.total_shares);
        lhs > rhs
    }
}

/// Fee-refund observation: a minimal-value call under a spiked gas price.
#[derive(Debug, Clone, Copy)]
pub struct FeeRefundEvidence {
    pub balance_before: U256,
    pub balance_after: U256,
    pub gas_price: U256,
}

/// Everything one probe run observed, fed to [`classify`].
#[derive(Debug, Clone, Default)]
pub struct ProbeEvidence {
    /// Entry method that the target accepted, if any.
    pub entry_method: Option<String>,
    /// Prober balance before capital acquisition.
    pub balance_start: U256,
    /// Winning exit outcome, present only when the exit chain found a
    /// balance-increasing candidate.
    pub direct_drain: Option<ProbeOutcome>,
    pub inflation: Option<InflationEvidence>,
    pub drift: Option<DriftEvidence>,
    pub fee_refund: Option<FeeRefundEvidence>,
    pub deep_scan: Option<DeepScanHit>,
}

/// The one verdict a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploitVerdict {
    DirectDrain {
        method: String,
        profit: U256,
    },
    InflationAttack {
        victim_deposit: U256,
    },
    RoundingDrift {
        before: VaultSnapshot,
        after: VaultSnapshot,
    },
    SequencerFeeRefund {
        profit: U256,
    },
    DeepScanHit {
        method: &'static str,
        selector: [u8; 4],
        profit: U256,
    },
    NoVulnerability,
}

impl ExploitVerdict {
    pub fn is_vulnerable(&self) -> bool {
        !matches!(self, ExploitVerdict::NoVulnerability)
    }
}

/// Map evidence to a verdict. Short-circuits in probe order.
pub fn classify(evidence: &ProbeEvidence) -> ExploitVerdict {
    if let Some(exit) = &evidence.direct_drain {
        if exit.balance_after > evidence.balance_start {
            return ExploitVerdict::DirectDrain {
                method: exit.method.clone(),
                profit: exit.balance_after - evidence.balance_start,
            };
        }
    }

    if let Some(inflation) = &evidence.inflation {
        if !inflation.victim_deposit.is_zero() && inflation.victim_shares_minted.is_zero() {
            return ExploitVerdict::InflationAttack {
                victim_deposit: inflation.victim_deposit,
            };
        }
    }

    if let Some(drift) = &evidence.drift {
        if drift.price_increased() {
            return ExploitVerdict::RoundingDrift {
                before: drift.before,
                after: drift.after,
            };
        }
    }

    if let Some(refund) = &evidence.fee_refund {
        if refund.balance_after > refund.balance_before {
            return ExploitVerdict::SequencerFeeRefund {
                profit: refund.balance_after - refund.balance_before,
            };
        }
    }

    if let Some(hit) = &evidence.deep_scan {
        if !hit.profit.is_zero() {
            return ExploitVerdict::DeepScanHit {
                method: hit.method,
                selector: hit.selector,
                profit: hit.profit,
            };
        }
    }

    ExploitVerdict::NoVulnerability
}

//! Ordered-fallback entry and exit probing.
//!
//! Each chain is a list of interchangeable candidates sharing one attempt
//! path; iteration short-circuits on the first candidate that satisfies the
//! chain's success predicate. Per-candidate failures are swallowed and the
//! chain advances; only exhausting a whole chain surfaces upward.

use alloy_primitives::{Address, U256};
use tracing::{debug, info};

use crate::catalog::{CallCandidate, ENTRY_CHAIN_ASSET, ENTRY_CHAIN_NATIVE, EXIT_CHAIN};
use crate::config::{LOCKUP_WARP_SECS, WARP_BLOCKS};
use crate::errors::{ProbeError, ProbeResult};
use crate::evm::TargetVm;

/// Record of one candidate attempt. Created and discarded per attempt; the
/// winning one is kept as evidence.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub method: String,
    pub selector: [u8; 4],
    pub succeeded: bool,
    pub balance_before: U256,
    pub balance_after: U256,
    pub failure: Option<String>,
}

impl ProbeOutcome {
    fn attempt(
        vm: &mut dyn TargetVm,
        prober: Address,
        target: Address,
        candidate: &CallCandidate,
        amount: U256,
    ) -> Self {
        let balance_before = vm.native_balance(prober);
        let calldata = candidate.encode(amount, prober);
        let value = candidate.resolve_value(amount, balance_before);
        let result = vm.invoke(prober, target, calldata, value);
        let balance_after = vm.native_balance(prober);
        match result {
            Ok(_) => Self {
                method: candidate.name().to_string(),
                selector: candidate.selector(),
                succeeded: true,
                balance_before,
                balance_after,
                failure: None,
            },
            Err(e) => Self {
                method: candidate.name().to_string(),
                selector: candidate.selector(),
                succeeded: false,
                balance_before,
                balance_after,
                failure: Some(e.to_string()),
            },
        }
    }

    /// Strict balance gain over the given baseline.
    pub fn gained_over(&self, baseline: U256) -> bool {
        self.balance_after > baseline
    }
}

/// Try the entry chain in order; the first candidate the target accepts is
/// the entry method. `asset` widens the chain with ERC-20 deposit forms.
pub fn run_entry(
    vm: &mut dyn TargetVm,
    prober: Address,
    target: Address,
    amount: U256,
    asset: Option<Address>,
) -> ProbeResult<ProbeOutcome> {
    let chains: [&[CallCandidate]; 2] = if asset.is_some() {
        [ENTRY_CHAIN_ASSET, ENTRY_CHAIN_NATIVE]
    } else {
        [&[], ENTRY_CHAIN_NATIVE]
    };

    for candidate in chains.into_iter().flatten() {
        let outcome = ProbeOutcome::attempt(vm, prober, target, candidate, amount);
        if outcome.succeeded {
            info!(method = outcome.method, "entry accepted");
            return Ok(outcome);
        }
        debug!(
            method = outcome.method,
            reason = outcome.failure.as_deref().unwrap_or(""),
            "entry candidate rejected"
        );
    }

    Err(ProbeError::entry_failed(format!(
        "no entry candidate accepted by {}",
        target
    )))
}

/// Fast-forward past common lock-up windows. A no-op for ungated targets
/// and never a precondition for any verdict.
pub fn advance_time(vm: &mut dyn TargetVm) {
    vm.warp(LOCKUP_WARP_SECS, WARP_BLOCKS);
    debug!(
        seconds = LOCKUP_WARP_SECS,
        blocks = WARP_BLOCKS,
        "advanced simulated clock"
    );
}

/// Try the exit chain in order. A candidate succeeds only if its call does
/// not fail AND the prober's balance strictly increased over the balance
/// recorded right after entry. Returns `None` when every candidate fails
/// the predicate; deep scan takes over from there.
pub fn run_exit(
    vm: &mut dyn TargetVm,
    prober: Address,
    target: Address,
    amount: U256,
    balance_after_entry: U256,
) -> Option<ProbeOutcome> {
    for candidate in EXIT_CHAIN {
        let outcome = ProbeOutcome::attempt(vm, prober, target, candidate, amount);
        if outcome.succeeded && outcome.gained_over(balance_after_entry) {
            info!(method = outcome.method, "exit succeeded with balance gain");
            return Some(outcome);
        }
        debug!(
            method = outcome.method,
            call_ok = outcome.succeeded,
            "exit candidate did not satisfy predicate"
        );
    }
    None
}

//! Last-resort brute force over the fixed payout catalog.
//!
//! Runs only after the exit chain came up empty. Each catalog entry is
//! tried with no value, then with a minimal value, then (for
//! address-parameterized entries) with the probing identity as the
//! argument. The first attempt that strictly increases the prober's
//! balance wins and is reported by selector.

use alloy_primitives::{Address, Bytes, U256};
use tracing::{debug, info};

use crate::catalog::{CallCandidate, DEEP_SCAN_CATALOG};
use crate::evm::TargetVm;

/// First balance-increasing candidate found by the scan.
#[derive(Debug, Clone)]
pub struct DeepScanHit {
    pub method: &'static str,
    pub selector: [u8; 4],
    pub profit: U256,
}

impl DeepScanHit {
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }
}

/// One attempt: invoke and check for a strict balance increase.
fn attempt(
    vm: &mut dyn TargetVm,
    prober: Address,
    target: Address,
    candidate: &CallCandidate,
    calldata: Bytes,
    value: U256,
) -> Option<DeepScanHit> {
    let before = vm.native_balance(prober);
    match vm.invoke(prober, target, calldata, value) {
        Ok(_) => {
            let after = vm.native_balance(prober);
            if after > before {
                return Some(DeepScanHit {
                    method: candidate.name(),
                    selector: candidate.selector(),
                    profit: after - before,
                });
            }
            None
        }
        Err(e) => {
            debug!(method = candidate.name(), "deep scan attempt failed: {}", e);
            None
        }
    }
}

/// Scan the full catalog in order. `None` means the catalog was exhausted
/// without any balance increase, a valid negative result.
pub fn run_deep_scan(
    vm: &mut dyn TargetVm,
    prober: Address,
    target: Address,
) -> Option<DeepScanHit> {
    for candidate in DEEP_SCAN_CATALOG {
        let no_arg_calldata = if candidate.takes_address() {
            // Address-parameterized entries have no zero-arg form; the
            // selector alone is still worth a shot before the typed call.
            Bytes::from(candidate.selector().to_vec())
        } else {
            candidate.encode(U256::ZERO, prober)
        };

        // No value.
        if let Some(hit) = attempt(
            vm,
            prober,
            target,
            candidate,
            no_arg_calldata.clone(),
            U256::ZERO,
        ) {
            info!(method = hit.method, "deep scan hit");
            return Some(hit);
        }

        // Minimal value.
        if let Some(hit) = attempt(vm, prober, target, candidate, no_arg_calldata, U256::from(1u64))
        {
            info!(method = hit.method, "deep scan hit (1 wei)");
            return Some(hit);
        }

        // Probing identity as argument.
        if candidate.takes_address() {
            let with_addr = candidate.encode(U256::ZERO, prober);
            if let Some(hit) = attempt(vm, prober, target, candidate, with_addr, U256::ZERO) {
                info!(method = hit.method, "deep scan hit (address arg)");
                return Some(hit);
            }
        }
    }
    None
}

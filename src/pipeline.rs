//! The probe run: acquisition, entry, scenarios, deep scan, verdict.
//!
//! Stages run strictly in order against one VM. Scenario probes (inflation,
//! drift, fee refund) each run against a checkpoint and roll back so later
//! stages see the post-entry state unchanged. After every evidence-producing
//! stage the classifier is consulted; the first positive verdict ends the
//! run.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, info};

use crate::abi;
use crate::acquire::{self, Acquired};
use crate::catalog::CallCandidate;
use crate::classifier::{
    classify, DriftEvidence, ExploitVerdict, FeeRefundEvidence, InflationEvidence, ProbeEvidence,
    VaultSnapshot,
};
use crate::config::{ProberConfig, GAS_SPIKE_WEI};
use crate::deep_scan;
use crate::errors::ProbeResult;
use crate::evm::{random_identity, TargetVm};
use crate::prober::{advance_time, run_entry, run_exit, ProbeOutcome};

/// Donation size for the inflation scenario, in asset units or wei.
const INFLATION_DONATION: u64 = 1_000_000_000;

/// Victim deposit size for the inflation scenario.
const INFLATION_VICTIM_DEPOSIT: u64 = 500_000_000;

/// Outcome of a full probe run against one target.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub target: Address,
    pub entry_method: Option<String>,
    pub verdict: ExploitVerdict,
}

/// Probe one target end to end and classify what was observed.
pub fn probe_target(
    vm: &mut dyn TargetVm,
    cfg: &ProberConfig,
    prober: Address,
    target: Address,
) -> ProbeResult<ProbeReport> {
    let mut evidence = ProbeEvidence {
        balance_start: vm.native_balance(prober),
        ..Default::default()
    };

    let acquired = acquire::acquire(vm, prober, target, cfg.probe_amount)?;
    info!(target = %target, "capital acquired, probing entry");

    let entry = run_entry(vm, prober, target, acquired.amount, acquired.asset)?;
    evidence.entry_method = Some(entry.method.clone());
    let balance_after_entry = entry.balance_after;

    advance_time(vm);

    evidence.direct_drain = run_exit(vm, prober, target, acquired.amount, balance_after_entry);
    let verdict = classify(&evidence);
    if verdict.is_vulnerable() {
        return Ok(report(target, evidence, verdict));
    }

    evidence.inflation = inflation_scenario(vm, target, &acquired, &entry);
    let verdict = classify(&evidence);
    if verdict.is_vulnerable() {
        return Ok(report(target, evidence, verdict));
    }

    evidence.drift = drift_scenario(vm, prober, target, &acquired);
    let verdict = classify(&evidence);
    if verdict.is_vulnerable() {
        return Ok(report(target, evidence, verdict));
    }

    evidence.fee_refund = fee_refund_scenario(vm, prober, target);
    let verdict = classify(&evidence);
    if verdict.is_vulnerable() {
        return Ok(report(target, evidence, verdict));
    }

    // The exit chain came up empty; brute force the payout catalog.
    if evidence.direct_drain.is_none() {
        evidence.deep_scan = deep_scan::run_deep_scan(vm, prober, target);
    }
    let verdict = classify(&evidence);
    Ok(report(target, evidence, verdict))
}

fn report(target: Address, evidence: ProbeEvidence, verdict: ExploitVerdict) -> ProbeReport {
    ProbeReport {
        target,
        entry_method: evidence.entry_method,
        verdict,
    }
}

/// Re-run the accepted entry candidate on behalf of a given identity.
fn deposit_as(
    vm: &mut dyn TargetVm,
    who: Address,
    target: Address,
    candidate: &CallCandidate,
    amount: U256,
) -> bool {
    let calldata = candidate.encode(amount, who);
    let value = candidate.resolve_value(amount, vm.native_balance(who));
    vm.invoke(who, target, calldata, value).is_ok()
}

fn share_balance(vm: &mut dyn TargetVm, holder: Address, target: Address) -> Option<U256> {
    let call = Bytes::from(abi::balanceOfCall { account: holder }.abi_encode());
    vm.view(holder, target, call).ok().map(|ret| abi::decode_uint(&ret))
}

fn vault_snapshot(vm: &mut dyn TargetVm, prober: Address, target: Address) -> Option<VaultSnapshot> {
    let assets_call = Bytes::from(abi::totalAssetsCall {}.abi_encode());
    let supply_call = Bytes::from(abi::totalSupplyCall {}.abi_encode());
    let total_assets = abi::decode_uint(&vm.view(prober, target, assets_call).ok()?);
    let total_shares = abi::decode_uint(&vm.view(prober, target, supply_call).ok()?);
    Some(VaultSnapshot {
        total_assets,
        total_shares,
        prober_balance: vm.native_balance(prober),
    })
}

/// First-depositor inflation: 1-wei deposit, a donation that bypasses the
/// vault's accounting, then a victim deposit. Runs against a checkpoint.
fn inflation_scenario(
    vm: &mut dyn TargetVm,
    target: Address,
    acquired: &Acquired,
    entry: &ProbeOutcome,
) -> Option<InflationEvidence> {
    let candidate = crate::catalog::find_candidate(&entry.method)?;
    let cp = vm.checkpoint();

    let attacker = random_identity();
    vm.set_native_balance(attacker, U256::from(INFLATION_DONATION) * U256::from(4u64));

    let result = (|| {
        if !deposit_as(vm, attacker, target, candidate, U256::from(1u64)) {
            return None;
        }

        // Donate past the accounting. Native targets get a raw balance bump;
        // asset vaults get a direct token transfer.
        match acquired.asset {
            None => {
                let held = vm.native_balance(target);
                vm.set_native_balance(target, held + U256::from(INFLATION_DONATION));
            }
            Some(asset) => {
                let donate = Bytes::from(
                    abi::transferCall {
                        to: target,
                        amount: U256::from(INFLATION_DONATION),
                    }
                    .abi_encode(),
                );
                if vm.invoke(attacker, asset, donate, U256::ZERO).is_err() {
                    return None;
                }
            }
        }

        let victim = random_identity();
        vm.set_native_balance(victim, U256::from(INFLATION_VICTIM_DEPOSIT) * U256::from(2u64));
        let victim_deposit = U256::from(INFLATION_VICTIM_DEPOSIT);
        if !deposit_as(vm, victim, target, candidate, victim_deposit) {
            return None;
        }

        let minted = share_balance(vm, victim, target)?;
        debug!(minted = %minted, "inflation scenario victim shares");
        Some(InflationEvidence {
            victim_deposit,
            victim_shares_minted: minted,
        })
    })();

    vm.revert_to(cp);
    result
}

/// Share-price drift across one extra deposit/withdraw cycle. Needs the
/// target to expose totalAssets/totalSupply; silently skipped otherwise.
fn drift_scenario(
    vm: &mut dyn TargetVm,
    prober: Address,
    target: Address,
    acquired: &Acquired,
) -> Option<DriftEvidence> {
    let cp = vm.checkpoint();

    let result = (|| {
        let before = vault_snapshot(vm, prober, target)?;
        if run_entry(vm, prober, target, acquired.amount, acquired.asset).is_err() {
            return None;
        }
        advance_time(vm);
        // A failed exit still moves the accounting we care about.
        let baseline = vm.native_balance(prober);
        let _ = run_exit(vm, prober, target, acquired.amount, baseline);
        let after = vault_snapshot(vm, prober, target)?;
        Some(DriftEvidence { before, after })
    })();

    vm.revert_to(cp);
    result
}

/// Minimal-value `execute()` under a spiked gas price. A target refunding
/// more than it was sent leaks value.
fn fee_refund_scenario(
    vm: &mut dyn TargetVm,
    prober: Address,
    target: Address,
) -> Option<FeeRefundEvidence> {
    let cp = vm.checkpoint();
    let normal_price = vm.gas_price();
    vm.set_gas_price(U256::from(GAS_SPIKE_WEI));

    let balance_before = vm.native_balance(prober);
    let execute_call = {
        let hash = alloy_primitives::keccak256(b"execute()");
        Bytes::from(vec![hash[0], hash[1], hash[2], hash[3]])
    };
    let outcome = vm.invoke(prober, target, execute_call, U256::from(1u64));
    let balance_after = vm.native_balance(prober);
    let gas_price = vm.gas_price();

    vm.set_gas_price(normal_price);
    vm.revert_to(cp);

    match outcome {
        Ok(_) => Some(FeeRefundEvidence {
            balance_before,
            balance_after,
            gas_price,
        }),
        Err(e) => {
            debug!("fee refund probe rejected: {}", e);
            None
        }
    }
}

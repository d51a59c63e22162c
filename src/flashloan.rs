//! Atomic flash-loan attack orchestration.
//!
//! The orchestrator walks a fixed state machine, Requested to InCallback to
//! Settled, against a checkpointed VM. Any step failure rolls the whole
//! checkpoint back so no partial effects survive. Entry is owner-gated; the
//! callback phase is callable only as the lending pool identity.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, info};

use crate::abi;
use crate::config::FLASH_LOAN_PREMIUM_BPS;
use crate::errors::{ProbeError, ProbeResult};
use crate::evm::TargetVm;

/// Orchestration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Requested,
    InCallback,
    Settled,
}

/// Value attached to a planned step.
#[derive(Debug, Clone, Copy)]
pub enum CallValue {
    Exact(U256),
    /// Resolved to the orchestrator's full native balance at step time.
    MaxAvailable,
}

/// One step of the attack plan, executed inside the loan callback.
#[derive(Debug, Clone)]
pub struct PlannedCall {
    pub target: Address,
    pub payload: Bytes,
    pub value: CallValue,
}

/// A borrow amount plus the steps to run while holding it.
#[derive(Debug, Clone)]
pub struct FlashLoanPlan {
    pub loan_amount: U256,
    pub steps: Vec<PlannedCall>,
}

/// Completion record for a settled attack.
#[derive(Debug, Clone)]
pub struct AttackReceipt {
    pub target: Address,
    pub borrowed: U256,
    pub profit: U256,
}

/// Owner-gated flash-loan executor.
pub struct FlashLoanOrchestrator {
    owner: Address,
    pool: Address,
    weth: Address,
    /// The orchestrator's own contract identity inside the simulation.
    pub address: Address,
    state: OrchestratorState,
}

impl FlashLoanOrchestrator {
    pub fn new(owner: Address, pool: Address, weth: Address, address: Address) -> Self {
        Self {
            owner,
            pool,
            weth,
            address,
            state: OrchestratorState::Idle,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Premium owed on top of the principal.
    pub fn premium(amount: U256) -> U256 {
        amount * U256::from(FLASH_LOAN_PREMIUM_BPS) / U256::from(10_000u64)
    }

    /// Run the full plan atomically. Only the owner may call; any failed
    /// step rolls back every effect since entry.
    pub fn execute(
        &mut self,
        caller: Address,
        vm: &mut dyn TargetVm,
        plan: &FlashLoanPlan,
        attack_target: Address,
    ) -> ProbeResult<AttackReceipt> {
        if caller != self.owner {
            return Err(ProbeError::unauthorized(format!(
                "execute caller {} is not the owner",
                caller
            )));
        }

        let checkpoint = vm.checkpoint();
        let owner_native_before = vm.native_balance(self.owner);
        self.state = OrchestratorState::Requested;

        let result = self.request_and_settle(vm, plan);
        match result {
            Ok(()) => {
                self.state = OrchestratorState::Settled;
                let profit = vm
                    .native_balance(self.owner)
                    .saturating_sub(owner_native_before);
                info!(
                    borrowed = %plan.loan_amount,
                    profit = %profit,
                    "flash loan settled"
                );
                Ok(AttackReceipt {
                    target: attack_target,
                    borrowed: plan.loan_amount,
                    profit,
                })
            }
            Err(e) => {
                vm.revert_to(checkpoint);
                self.state = OrchestratorState::Idle;
                debug!("flash loan rolled back: {}", e);
                Err(e)
            }
        }
    }

    fn request_and_settle(
        &mut self,
        vm: &mut dyn TargetVm,
        plan: &FlashLoanPlan,
    ) -> ProbeResult<()> {
        // Requested: the pool advances the principal in WETH.
        let advance = Bytes::from(
            abi::transferCall {
                to: self.address,
                amount: plan.loan_amount,
            }
            .abi_encode(),
        );
        vm.invoke(self.pool, self.weth, advance, U256::ZERO)
            .map_err(|e| {
                ProbeError::call_step_failed(format!("loan advance failed: {}", e))
            })?;

        self.on_loan(self.pool, vm, plan)?;
        self.settle(vm, plan.loan_amount)
    }

    /// Callback phase. Gated on the pool identity.
    fn on_loan(
        &mut self,
        caller: Address,
        vm: &mut dyn TargetVm,
        plan: &FlashLoanPlan,
    ) -> ProbeResult<()> {
        if caller != self.pool {
            return Err(ProbeError::unauthorized(format!(
                "callback caller {} is not the lending pool",
                caller
            )));
        }
        self.state = OrchestratorState::InCallback;

        // Unwrap the principal so plan steps spend native value.
        let unwrap = Bytes::from(abi::withdrawCall { wad: plan.loan_amount }.abi_encode());
        vm.invoke(self.address, self.weth, unwrap, U256::ZERO)
            .map_err(|e| ProbeError::call_step_failed(format!("unwrap failed: {}", e)))?;

        for (i, step) in plan.steps.iter().enumerate() {
            let value = match step.value {
                CallValue::Exact(v) => v,
                CallValue::MaxAvailable => vm.native_balance(self.address),
            };
            vm.invoke(self.address, step.target, step.payload.clone(), value)
                .map_err(|e| {
                    ProbeError::call_step_failed(format!("step {} failed: {}", i + 1, e))
                })?;
        }
        Ok(())
    }

    /// Repay principal plus premium, then sweep everything to the owner.
    fn settle(&mut self, vm: &mut dyn TargetVm, borrowed: U256) -> ProbeResult<()> {
        let owed = borrowed + Self::premium(borrowed);

        let weth_held = self.weth_balance(vm);
        if weth_held < owed {
            let shortfall = owed - weth_held;
            let wrap = Bytes::from(abi::depositCall {}.abi_encode());
            vm.invoke(self.address, self.weth, wrap, shortfall)
                .map_err(|e| {
                    ProbeError::call_step_failed(format!("repayment wrap failed: {}", e))
                })?;
        }

        let repay = Bytes::from(
            abi::transferCall {
                to: self.pool,
                amount: owed,
            }
            .abi_encode(),
        );
        vm.invoke(self.address, self.weth, repay, U256::ZERO)
            .map_err(|e| ProbeError::call_step_failed(format!("repayment failed: {}", e)))?;

        // Sweep residual WETH, then residual native value.
        let residual_weth = self.weth_balance(vm);
        if !residual_weth.is_zero() {
            let sweep = Bytes::from(
                abi::transferCall {
                    to: self.owner,
                    amount: residual_weth,
                }
                .abi_encode(),
            );
            vm.invoke(self.address, self.weth, sweep, U256::ZERO)
                .map_err(|e| ProbeError::call_step_failed(format!("token sweep failed: {}", e)))?;
        }

        let residual_native = vm.native_balance(self.address);
        if !residual_native.is_zero() {
            vm.invoke(self.address, self.owner, Bytes::new(), residual_native)
                .map_err(|e| {
                    ProbeError::call_step_failed(format!("native sweep failed: {}", e))
                })?;
        }
        Ok(())
    }

    fn weth_balance(&self, vm: &mut dyn TargetVm) -> U256 {
        let call = Bytes::from(
            abi::balanceOfCall {
                account: self.address,
            }
            .abi_encode(),
        );
        match vm.view(self.address, self.weth, call) {
            Ok(ret) => abi::decode_uint(&ret),
            Err(_) => U256::ZERO,
        }
    }
}

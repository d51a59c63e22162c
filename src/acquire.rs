//! Capital acquisition: convert held native currency into whatever asset
//! the target accepts.
//!
//! Native-accepting targets need nothing. A wrapped-native vault gets a
//! single wrap. Any other ERC-20 is bought on Uniswap V3, walking the fee
//! tiers low to high and taking the first swap that does not fail.
//! Exhausting all tiers aborts the run; this stage is never a security
//! signal.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, info};

use crate::abi;
use crate::config;
use crate::errors::{ProbeError, ProbeResult};
use crate::evm::TargetVm;

/// What the prober holds after acquisition.
#[derive(Debug, Clone, Copy)]
pub struct Acquired {
    /// Underlying asset of the target; `None` when the target takes native
    /// value directly.
    pub asset: Option<Address>,
    /// Amount of that asset (or native wei) committed to the probe.
    pub amount: U256,
}

/// Resolve the target's accepted asset via `asset()` then `token()`.
pub fn resolve_asset(vm: &mut dyn TargetVm, prober: Address, target: Address) -> Option<Address> {
    let asset_call = Bytes::from(abi::assetCall {}.abi_encode());
    if let Ok(ret) = vm.view(prober, target, asset_call) {
        if let Some(addr) = abi::decode_address(&ret) {
            if addr != Address::ZERO {
                return Some(addr);
            }
        }
    }
    let token_call = Bytes::from(abi::tokenCall {}.abi_encode());
    if let Ok(ret) = vm.view(prober, target, token_call) {
        if let Some(addr) = abi::decode_address(&ret) {
            if addr != Address::ZERO {
                return Some(addr);
            }
        }
    }
    None
}

/// Acquire the target's asset with `desired` wei of native currency.
pub fn acquire(
    vm: &mut dyn TargetVm,
    prober: Address,
    target: Address,
    desired: U256,
) -> ProbeResult<Acquired> {
    let asset = resolve_asset(vm, prober, target);

    let Some(asset_addr) = asset else {
        debug!("target accepts native value, no acquisition needed");
        return Ok(Acquired {
            asset: None,
            amount: desired,
        });
    };

    if asset_addr == *config::WETH_ADDRESS {
        // Single wrap.
        let wrap = Bytes::from(abi::depositCall {}.abi_encode());
        vm.invoke(prober, asset_addr, wrap, desired).map_err(|e| {
            ProbeError::acquisition_failed(format!("wrap failed: {}", e))
        })?;
        approve_target(vm, prober, asset_addr, target)?;
        info!("acquired {} wei of wrapped native", desired);
        return Ok(Acquired {
            asset: Some(asset_addr),
            amount: desired,
        });
    }

    // Swap across fee tiers, low to high; first tier that works wins.
    for fee in config::FEE_TIERS {
        let params = abi::ExactInputSingleParams {
            tokenIn: *config::WETH_ADDRESS,
            tokenOut: asset_addr,
            fee: alloy_primitives::Uint::<24, 1>::from(fee),
            recipient: prober,
            deadline: U256::MAX,
            amountIn: desired,
            amountOutMinimum: U256::ZERO,
            sqrtPriceLimitX96: alloy_primitives::Uint::<160, 3>::ZERO,
        };
        let swap = Bytes::from(abi::exactInputSingleCall { params }.abi_encode());
        match vm.invoke(prober, *config::UNISWAP_V3_ROUTER, swap, desired) {
            Ok(ret) => {
                let amount_out = abi::decode_uint(&ret);
                approve_target(vm, prober, asset_addr, target)?;
                info!(fee_tier = fee, "swap succeeded, received {} units", amount_out);
                return Ok(Acquired {
                    asset: Some(asset_addr),
                    amount: amount_out,
                });
            }
            Err(e) => {
                debug!(fee_tier = fee, "swap tier failed: {}", e);
            }
        }
    }

    Err(ProbeError::acquisition_failed(format!(
        "all fee tiers failed for asset {}",
        asset_addr
    )))
}

fn approve_target(
    vm: &mut dyn TargetVm,
    prober: Address,
    asset: Address,
    target: Address,
) -> ProbeResult<()> {
    let approve = Bytes::from(
        abi::approveCall {
            spender: target,
            amount: U256::MAX,
        }
        .abi_encode(),
    );
    vm.invoke(prober, asset, approve, U256::ZERO)
        .map_err(|e| ProbeError::acquisition_failed(format!("approve failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::CallFailure;

    /// Scripted acquisition world: asset/token views, a wrapping WETH and a
    /// router accepting one configurable fee tier.
    struct AcquireVm {
        asset_view: Option<Address>,
        token_view: Option<Address>,
        accepted_tier: Option<u32>,
        wrap_reverts: bool,
        wrapped: U256,
        tiers_tried: Vec<u32>,
        approvals: Vec<(Address, Address)>,
    }

    impl AcquireVm {
        fn new() -> Self {
            Self {
                asset_view: None,
                token_view: None,
                accepted_tier: None,
                wrap_reverts: false,
                wrapped: U256::ZERO,
                tiers_tried: Vec::new(),
                approvals: Vec::new(),
            }
        }

        fn selector_of(data: &Bytes) -> [u8; 4] {
            if data.len() >= 4 {
                [data[0], data[1], data[2], data[3]]
            } else {
                [0u8; 4]
            }
        }

        fn address_word(addr: Address) -> Bytes {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr.as_slice());
            Bytes::from(word.to_vec())
        }
    }

    impl TargetVm for AcquireVm {
        fn invoke(
            &mut self,
            _from: Address,
            to: Address,
            calldata: Bytes,
            value: U256,
        ) -> Result<Bytes, CallFailure> {
            let sel = Self::selector_of(&calldata);

            if to == *config::UNISWAP_V3_ROUTER && sel == abi::exactInputSingleCall::SELECTOR {
                // fee is the third word of the params tuple
                let fee = u32::from_be_bytes([
                    calldata[96],
                    calldata[97],
                    calldata[98],
                    calldata[99],
                ]);
                self.tiers_tried.push(fee);
                if Some(fee) == self.accepted_tier {
                    return Ok(Bytes::from(U256::from(777u64).to_be_bytes::<32>().to_vec()));
                }
                return Err(CallFailure::reverted("no pool for tier"));
            }

            if to == *config::WETH_ADDRESS && sel == abi::depositCall::SELECTOR {
                if self.wrap_reverts {
                    return Err(CallFailure::reverted("wrap disabled"));
                }
                self.wrapped += value;
                return Ok(Bytes::new());
            }

            if sel == abi::approveCall::SELECTOR && calldata.len() >= 36 {
                let spender = Address::from_slice(&calldata[16..36]);
                self.approvals.push((to, spender));
                return Ok(Bytes::new());
            }

            Err(CallFailure::reverted("unknown function"))
        }

        fn view(
            &mut self,
            _from: Address,
            _to: Address,
            calldata: Bytes,
        ) -> Result<Bytes, CallFailure> {
            let sel = Self::selector_of(&calldata);
            if sel == abi::assetCall::SELECTOR {
                if let Some(a) = self.asset_view {
                    return Ok(Self::address_word(a));
                }
            }
            if sel == abi::tokenCall::SELECTOR {
                if let Some(t) = self.token_view {
                    return Ok(Self::address_word(t));
                }
            }
            Err(CallFailure::reverted("unknown view"))
        }

        fn native_balance(&self, _who: Address) -> U256 {
            U256::from(1_000_000_000_000_000_000u128)
        }

        fn set_native_balance(&mut self, _who: Address, _amount: U256) {}
        fn warp(&mut self, _s: u64, _b: u64) {}
        fn gas_price(&self) -> U256 {
            U256::ZERO
        }
        fn set_gas_price(&mut self, _p: U256) {}
        fn checkpoint(&mut self) -> usize {
            0
        }
        fn revert_to(&mut self, _c: usize) {}
    }

    const PROBER: Address = Address::repeat_byte(1);
    const TARGET: Address = Address::repeat_byte(2);
    const TOKEN: Address = Address::repeat_byte(3);

    #[test]
    fn test_native_target_needs_no_acquisition() {
        let mut vm = AcquireVm::new();
        let got = acquire(&mut vm, PROBER, TARGET, U256::from(5_000u64)).expect("acquire");
        assert_eq!(got.asset, None);
        assert_eq!(got.amount, U256::from(5_000u64));
        assert!(vm.tiers_tried.is_empty());
    }

    #[test]
    fn test_weth_vault_wraps_once_and_approves() {
        let mut vm = AcquireVm::new();
        vm.asset_view = Some(*config::WETH_ADDRESS);

        let got = acquire(&mut vm, PROBER, TARGET, U256::from(5_000u64)).expect("acquire");
        assert_eq!(got.asset, Some(*config::WETH_ADDRESS));
        assert_eq!(got.amount, U256::from(5_000u64));
        assert_eq!(vm.wrapped, U256::from(5_000u64));
        assert_eq!(vm.approvals, vec![(*config::WETH_ADDRESS, TARGET)]);
        // No swap for the wrapped-native case.
        assert!(vm.tiers_tried.is_empty());
    }

    #[test]
    fn test_wrap_failure_aborts_acquisition() {
        let mut vm = AcquireVm::new();
        vm.asset_view = Some(*config::WETH_ADDRESS);
        vm.wrap_reverts = true;

        let err = acquire(&mut vm, PROBER, TARGET, U256::from(5_000u64)).unwrap_err();
        assert_eq!(err.code_str(), "ACQUISITION_FAILED");
    }

    #[test]
    fn test_swap_walks_tiers_until_one_succeeds() {
        let mut vm = AcquireVm::new();
        vm.asset_view = Some(TOKEN);
        vm.accepted_tier = Some(3000);

        let got = acquire(&mut vm, PROBER, TARGET, U256::from(5_000u64)).expect("acquire");
        assert_eq!(got.asset, Some(TOKEN));
        // Amount is what the swap returned, not what was spent.
        assert_eq!(got.amount, U256::from(777u64));
        // Low tier first, winning tier last, nothing after the winner.
        assert_eq!(vm.tiers_tried, vec![500, 3000]);
        assert_eq!(vm.approvals, vec![(TOKEN, TARGET)]);
    }

    #[test]
    fn test_tier_exhaustion_is_acquisition_failed() {
        let mut vm = AcquireVm::new();
        vm.asset_view = Some(TOKEN);

        let err = acquire(&mut vm, PROBER, TARGET, U256::from(5_000u64)).unwrap_err();
        assert_eq!(err.code_str(), "ACQUISITION_FAILED");
        assert_eq!(vm.tiers_tried, vec![500, 3000, 10000]);
        assert!(vm.approvals.is_empty());
    }

    #[test]
    fn test_token_view_is_the_fallback_resolver() {
        let mut vm = AcquireVm::new();
        vm.token_view = Some(TOKEN);
        assert_eq!(resolve_asset(&mut vm, PROBER, TARGET), Some(TOKEN));

        // asset() wins when both answer.
        vm.asset_view = Some(*config::WETH_ADDRESS);
        assert_eq!(
            resolve_asset(&mut vm, PROBER, TARGET),
            Some(*config::WETH_ADDRESS)
        );
    }
}

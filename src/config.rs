//! Configuration for a probe run.
//!
//! The target address and fork endpoint come from the environment; chain
//! constants (wrapped native, router, lending pool) live here as the single
//! source of truth.

use alloy_primitives::{Address, U256};
use lazy_static::lazy_static;
use std::str::FromStr;

lazy_static! {
    /// WETH on Ethereum mainnet.
    pub static ref WETH_ADDRESS: Address =
        Address::from_str("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2").unwrap();

    /// Uniswap V3 SwapRouter.
    pub static ref UNISWAP_V3_ROUTER: Address =
        Address::from_str("0xE592427A0AEce92De3Edee1F18E0157C05861564").unwrap();

    /// Aave V3 Pool (flash loan provider).
    pub static ref AAVE_V3_POOL: Address =
        Address::from_str("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2").unwrap();
}

/// Uniswap V3 fee tiers tried in order during capital acquisition.
pub const FEE_TIERS: [u32; 3] = [500, 3000, 10000];

/// Lock-up fast-forward: one day plus an hour of margin.
pub const LOCKUP_WARP_SECS: u64 = 86_400 + 3_600;

/// Blocks advanced alongside the timestamp warp.
pub const WARP_BLOCKS: u64 = 7_200;

/// Aave V3 flash-loan premium, in basis points.
pub const FLASH_LOAN_PREMIUM_BPS: u64 = 5;

/// Gas price used for the sequencer-fee-refund probe (far above normal).
/// Probe transactions are not charged for gas; this value is only what
/// targets observe.
pub const GAS_SPIKE_WEI: u128 = 10_000_000_000_000; // 10,000 gwei

/// Public RPC fallback when no endpoint is configured.
pub const PUBLIC_RPC_FALLBACK: &str = "https://eth.llamarpc.com";

/// Configuration for the prober.
pub struct ProberConfig {
    /// Contract under test.
    pub target: Option<Address>,

    /// Fork endpoint used to seed the simulation.
    pub fork_url: String,

    /// Chain ID for the simulated environment.
    pub chain_id: u64,

    /// Native amount committed per probe cycle.
    pub probe_amount: U256,

    /// Native balance dealt to the probing identity.
    pub prober_funding: U256,
}

impl Default for ProberConfig {
    fn default() -> Self {
        let target = std::env::var("TARGET_ADDRESS")
            .ok()
            .and_then(|s| Address::from_str(s.trim()).ok());

        Self {
            target,
            fork_url: std::env::var("ETH_FORK_URL")
                .unwrap_or_else(|_| PUBLIC_RPC_FALLBACK.to_string()),
            chain_id: 1,
            probe_amount: U256::from(100_000_000_000_000u128), // 0.0001 ETH
            prober_funding: U256::from(100_000_000_000_000_000_000u128), // 100 ETH
        }
    }
}

//! Static call catalogs: entry chain, exit chain, deep-scan catalog.
//!
//! Each catalog entry pairs a function signature with a value policy and an
//! argument template. Probing logic never touches raw ABI bytes; encoding is
//! isolated here. Catalogs are immutable and evaluated strictly in order.

use alloy_primitives::{keccak256, Address, Bytes, U256};

/// How much native value a candidate call attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePolicy {
    /// No value.
    NoValue,
    /// Fixed number of wei.
    Fixed(u128),
    /// The amount the caller committed to this probe cycle.
    CallerAmount,
    /// Sentinel resolved to "everything currently available" at call time.
    MaxAvailable,
}

/// Positional argument shape for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgTemplate {
    /// Selector only (or completely empty calldata for the raw transfer).
    NoArgs,
    /// (uint256 amount)
    Amount,
    /// (uint256 amount, address receiver)
    AmountReceiver,
    /// (uint256 amount, address receiver, address owner)
    AmountReceiverOwner,
    /// (address who)
    AddressArg,
}

/// One immutable catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct CallCandidate {
    /// Canonical signature, e.g. `withdraw(uint256)`. Empty string means a
    /// raw value transfer with no calldata.
    pub signature: &'static str,
    pub value: ValuePolicy,
    pub args: ArgTemplate,
}

impl CallCandidate {
    pub const fn new(signature: &'static str, value: ValuePolicy, args: ArgTemplate) -> Self {
        Self {
            signature,
            value,
            args,
        }
    }

    /// Human-readable identifier reported for a successful candidate.
    pub fn name(&self) -> &'static str {
        if self.signature.is_empty() {
            "receive()"
        } else {
            self.signature
        }
    }

    /// 4-byte operation discriminator. Zeroes for the raw transfer.
    pub fn selector(&self) -> [u8; 4] {
        if self.signature.is_empty() {
            return [0u8; 4];
        }
        let hash = keccak256(self.signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Whether this entry takes an address argument (deep-scan variants).
    pub fn takes_address(&self) -> bool {
        matches!(self.args, ArgTemplate::AddressArg)
    }

    /// Encode calldata for this candidate.
    pub fn encode(&self, amount: U256, who: Address) -> Bytes {
        if self.signature.is_empty() {
            return Bytes::new();
        }
        let mut data = Vec::with_capacity(4 + 3 * 32);
        data.extend_from_slice(&self.selector());
        match self.args {
            ArgTemplate::NoArgs => {}
            ArgTemplate::Amount => {
                data.extend_from_slice(&amount.to_be_bytes::<32>());
            }
            ArgTemplate::AmountReceiver => {
                data.extend_from_slice(&amount.to_be_bytes::<32>());
                data.extend_from_slice(&address_word(who));
            }
            ArgTemplate::AmountReceiverOwner => {
                data.extend_from_slice(&amount.to_be_bytes::<32>());
                data.extend_from_slice(&address_word(who));
                data.extend_from_slice(&address_word(who));
            }
            ArgTemplate::AddressArg => {
                data.extend_from_slice(&address_word(who));
            }
        }
        Bytes::from(data)
    }

    /// Resolve the attached value given the caller's committed amount and
    /// the maximum currently available.
    pub fn resolve_value(&self, caller_amount: U256, max_available: U256) -> U256 {
        match self.value {
            ValuePolicy::NoValue => U256::ZERO,
            ValuePolicy::Fixed(wei) => U256::from(wei),
            ValuePolicy::CallerAmount => caller_amount,
            ValuePolicy::MaxAvailable => max_available,
        }
    }
}

fn address_word(addr: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_slice());
    word
}

/// Entry candidates for asset (ERC-20) vaults, tried before the native
/// chain when the target declares an underlying token.
pub static ENTRY_CHAIN_ASSET: &[CallCandidate] = &[
    CallCandidate::new(
        "deposit(uint256,address)",
        ValuePolicy::NoValue,
        ArgTemplate::AmountReceiver,
    ),
    CallCandidate::new("deposit(uint256)", ValuePolicy::NoValue, ArgTemplate::Amount),
];

/// Entry candidates for native-accepting targets, in fixed priority order.
pub static ENTRY_CHAIN_NATIVE: &[CallCandidate] = &[
    CallCandidate::new("deposit()", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    // Raw value transfer, no calldata.
    CallCandidate::new("", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    CallCandidate::new("stake()", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    CallCandidate::new("contribute()", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    CallCandidate::new("enter()", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    CallCandidate::new("execute()", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    CallCandidate::new("claim()", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    CallCandidate::new("refund()", ValuePolicy::CallerAmount, ArgTemplate::NoArgs),
    // Minimal-unit fallback probe.
    CallCandidate::new("", ValuePolicy::Fixed(1), ArgTemplate::NoArgs),
];

/// Exit candidates in fixed priority order.
pub static EXIT_CHAIN: &[CallCandidate] = &[
    CallCandidate::new("withdraw(uint256)", ValuePolicy::NoValue, ArgTemplate::Amount),
    CallCandidate::new("withdraw()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("withdrawAll()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new(
        "redeem(uint256,address,address)",
        ValuePolicy::NoValue,
        ArgTemplate::AmountReceiverOwner,
    ),
    CallCandidate::new("redeem(uint256)", ValuePolicy::NoValue, ArgTemplate::Amount),
    CallCandidate::new("exit()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("leave()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
];

/// Last-resort catalog of generic payout operations. Sixteen entries,
/// exhausted in order before the run concludes no vulnerability.
pub static DEEP_SCAN_CATALOG: &[CallCandidate] = &[
    CallCandidate::new("claimReward()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("claimRewards()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("getReward()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("harvest()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("compound()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("skim(address)", ValuePolicy::NoValue, ArgTemplate::AddressArg),
    CallCandidate::new("sweep()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("sweepETH()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("recover(address)", ValuePolicy::NoValue, ArgTemplate::AddressArg),
    CallCandidate::new("emergencyWithdraw()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("rescue()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("drain()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("collect()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("payout()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("cashOut()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
    CallCandidate::new("withdrawFees()", ValuePolicy::NoValue, ArgTemplate::NoArgs),
];

/// Look an entry candidate up by its reported name, across both entry
/// chains. Used to replay the accepted entry method for other identities.
pub fn find_candidate(name: &str) -> Option<&'static CallCandidate> {
    ENTRY_CHAIN_ASSET
        .iter()
        .chain(ENTRY_CHAIN_NATIVE.iter())
        .find(|c| c.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_known_selectors() {
        // Well-known 4-byte discriminators.
        let deposit = CallCandidate::new("deposit()", ValuePolicy::NoValue, ArgTemplate::NoArgs);
        assert_eq!(deposit.selector(), [0xd0, 0xe3, 0x0d, 0xb0]);

        let withdraw =
            CallCandidate::new("withdraw(uint256)", ValuePolicy::NoValue, ArgTemplate::Amount);
        assert_eq!(withdraw.selector(), [0x2e, 0x1a, 0x7d, 0x4d]);
    }

    #[test]
    fn test_raw_transfer_encodes_empty() {
        let raw = CallCandidate::new("", ValuePolicy::CallerAmount, ArgTemplate::NoArgs);
        assert!(raw.encode(U256::from(1u64), Address::ZERO).is_empty());
        assert_eq!(raw.name(), "receive()");
        assert_eq!(raw.selector(), [0u8; 4]);
    }

    #[test]
    fn test_encode_amount_receiver_owner() {
        let redeem = CallCandidate::new(
            "redeem(uint256,address,address)",
            ValuePolicy::NoValue,
            ArgTemplate::AmountReceiverOwner,
        );
        let who = Address::from_str("0x00000000000000000000000000000000DeaDBeef").unwrap();
        let data = redeem.encode(U256::from(7u64), who);
        assert_eq!(data.len(), 4 + 3 * 32);
        // amount word
        assert_eq!(U256::from_be_slice(&data[4..36]), U256::from(7u64));
        // receiver and owner are both the probing identity
        assert_eq!(&data[48..68], who.as_slice());
        assert_eq!(&data[80..100], who.as_slice());
    }

    #[test]
    fn test_deep_scan_catalog_is_sixteen_entries() {
        assert_eq!(DEEP_SCAN_CATALOG.len(), 16);
    }

    #[test]
    fn test_deep_scan_catalog_order_is_stable() {
        let names: Vec<_> = DEEP_SCAN_CATALOG.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "claimReward()",
                "claimRewards()",
                "getReward()",
                "harvest()",
                "compound()",
                "skim(address)",
                "sweep()",
                "sweepETH()",
                "recover(address)",
                "emergencyWithdraw()",
                "rescue()",
                "drain()",
                "collect()",
                "payout()",
                "cashOut()",
                "withdrawFees()",
            ]
        );
        // Exactly the two address-parameterized entries.
        let with_address: Vec<_> = DEEP_SCAN_CATALOG
            .iter()
            .filter(|c| c.takes_address())
            .map(|c| c.name())
            .collect();
        assert_eq!(with_address, vec!["skim(address)", "recover(address)"]);
    }

    #[test]
    fn test_value_resolution() {
        let max = CallCandidate::new("x()", ValuePolicy::MaxAvailable, ArgTemplate::NoArgs);
        assert_eq!(
            max.resolve_value(U256::from(1u64), U256::from(42u64)),
            U256::from(42u64)
        );
        let fixed = CallCandidate::new("x()", ValuePolicy::Fixed(1), ArgTemplate::NoArgs);
        assert_eq!(
            fixed.resolve_value(U256::from(9u64), U256::from(9u64)),
            U256::from(1u64)
        );
    }

    #[test]
    fn test_exit_chain_order_is_stable() {
        let names: Vec<_> = EXIT_CHAIN.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "withdraw(uint256)",
                "withdraw()",
                "withdrawAll()",
                "redeem(uint256,address,address)",
                "redeem(uint256)",
                "exit()",
                "leave()",
            ]
        );
    }
}

//! Deterministic mock vault used by the integration tests.
//!
//! Implements `TargetVm` over plain hash maps: native balances, a share
//! ledger for the vault under test, and checkpoint/rollback via full
//! snapshots. The vault's behavior is selected per test.

use alloy_primitives::{keccak256, Address, Bytes, U256};
use std::collections::HashMap;

use vault_prober::{CallFailure, TargetVm};

/// How the mock vault responds to probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Proportional accounting, exact payouts, no extras.
    Honest,
    /// Pays out double the stake on withdrawal.
    Drainable,
    /// Mints shares with floor division over donated assets.
    InflationProne,
    /// Keeps a cut of every withdrawal, inflating the share price.
    FeeSkimming,
    /// Accepts deposits, rejects every exit, pays on `sweep()`.
    DeepScanOnly,
    /// Honest vault that over-refunds minimal-value `execute()` calls
    /// under a spiked gas price.
    FeeRefunding,
}

pub fn sel(sig: &str) -> [u8; 4] {
    let h = keccak256(sig.as_bytes());
    [h[0], h[1], h[2], h[3]]
}

type Snapshot = (HashMap<Address, U256>, HashMap<Address, U256>, U256);

pub struct MockVaultVm {
    pub target: Address,
    behavior: Behavior,
    native: HashMap<Address, U256>,
    shares: HashMap<Address, U256>,
    total_shares: U256,
    gas_price: U256,
    snapshots: Vec<Snapshot>,
}

impl MockVaultVm {
    pub fn new(target: Address, behavior: Behavior) -> Self {
        Self {
            target,
            behavior,
            native: HashMap::new(),
            shares: HashMap::new(),
            total_shares: U256::ZERO,
            gas_price: U256::from(20_000_000_000u64),
            snapshots: Vec::new(),
        }
    }

    /// Give the vault a pre-existing depositor so share accounting starts
    /// from a nonzero supply.
    pub fn with_seed_depositor(mut self, amount: u64) -> Self {
        let seed = Address::repeat_byte(0x55);
        let amount = U256::from(amount);
        *self.native.entry(self.target).or_default() += amount;
        self.shares.insert(seed, amount);
        self.total_shares = amount;
        self
    }

    fn vault_assets(&self) -> U256 {
        self.native.get(&self.target).copied().unwrap_or_default()
    }

    fn selector_of(data: &Bytes) -> [u8; 4] {
        if data.len() >= 4 {
            [data[0], data[1], data[2], data[3]]
        } else {
            [0u8; 4]
        }
    }

    fn has_views(&self) -> bool {
        !matches!(self.behavior, Behavior::DeepScanOnly | Behavior::FeeRefunding)
    }

    fn debit(&mut self, who: Address, amount: U256) -> Result<(), CallFailure> {
        let held = self.native.get(&who).copied().unwrap_or_default();
        if held < amount {
            return Err(CallFailure::reverted("insufficient value"));
        }
        self.native.insert(who, held - amount);
        Ok(())
    }

    fn credit(&mut self, who: Address, amount: U256) {
        *self.native.entry(who).or_default() += amount;
    }

    fn mint_for(&mut self, depositor: Address, value: U256) {
        let assets_before = self.vault_assets();
        let minted = match self.behavior {
            Behavior::InflationProne => {
                if self.total_shares.is_zero() {
                    value
                } else {
                    // Floor division over donated assets, the vulnerability.
                    value * self.total_shares / assets_before
                }
            }
            _ => value,
        };
        *self.shares.entry(depositor).or_default() += minted;
        self.total_shares += minted;
    }

    fn deposit(&mut self, from: Address, value: U256) -> Result<Bytes, CallFailure> {
        if value.is_zero() {
            return Err(CallFailure::reverted("zero deposit"));
        }
        self.debit(from, value)?;
        self.mint_for(from, value);
        self.credit(self.target, value);
        Ok(Bytes::new())
    }

    fn withdraw(&mut self, from: Address) -> Result<Bytes, CallFailure> {
        if self.behavior == Behavior::DeepScanOnly {
            return Err(CallFailure::reverted("withdrawals disabled"));
        }
        let held = self.shares.get(&from).copied().unwrap_or_default();
        if held.is_zero() {
            return Err(CallFailure::reverted("no shares"));
        }
        let entitled = held * self.vault_assets() / self.total_shares;
        let payout = match self.behavior {
            Behavior::Drainable => entitled * U256::from(2u64),
            Behavior::FeeSkimming => entitled * U256::from(99u64) / U256::from(100u64),
            _ => entitled,
        };
        self.shares.insert(from, U256::ZERO);
        self.total_shares -= held;
        // A drainable vault pays from thin air; everyone else from holdings.
        if self.behavior != Behavior::Drainable {
            self.debit(self.target, payout)?;
        }
        self.credit(from, payout);
        Ok(Bytes::new())
    }
}

impl TargetVm for MockVaultVm {
    fn invoke(
        &mut self,
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
    ) -> Result<Bytes, CallFailure> {
        if to != self.target {
            // Plain native transfer between accounts.
            self.debit(from, value)?;
            self.credit(to, value);
            return Ok(Bytes::new());
        }

        let selector = Self::selector_of(&calldata);
        if selector == sel("deposit()") {
            return self.deposit(from, value);
        }
        if selector == sel("withdraw(uint256)") {
            return self.withdraw(from);
        }
        if selector == sel("execute()") && self.behavior == Behavior::FeeRefunding {
            // Refunds more than it was sent when gas is priced far above
            // normal.
            if self.gas_price >= U256::from(10_000_000_000_000u128) {
                self.debit(from, value)?;
                self.credit(from, value + U256::from(1_000u64));
                return Ok(Bytes::new());
            }
            return Err(CallFailure::reverted("nothing to execute"));
        }
        if selector == sel("sweep()") && self.behavior == Behavior::DeepScanOnly {
            let loot = self.vault_assets();
            self.debit(self.target, loot)?;
            self.credit(from, loot);
            return Ok(Bytes::new());
        }
        Err(CallFailure::reverted("unknown function"))
    }

    fn view(
        &mut self,
        _from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, CallFailure> {
        if to != self.target || !self.has_views() {
            return Err(CallFailure::reverted("unknown view"));
        }
        let selector = Self::selector_of(&calldata);
        if selector == sel("balanceOf(address)") && calldata.len() >= 36 {
            let who = Address::from_slice(&calldata[16..36]);
            let bal = self.shares.get(&who).copied().unwrap_or_default();
            return Ok(Bytes::from(bal.to_be_bytes::<32>().to_vec()));
        }
        if selector == sel("totalAssets()") {
            return Ok(Bytes::from(self.vault_assets().to_be_bytes::<32>().to_vec()));
        }
        if selector == sel("totalSupply()") {
            return Ok(Bytes::from(self.total_shares.to_be_bytes::<32>().to_vec()));
        }
        Err(CallFailure::reverted("unknown view"))
    }

    fn native_balance(&self, who: Address) -> U256 {
        self.native.get(&who).copied().unwrap_or_default()
    }

    fn set_native_balance(&mut self, who: Address, amount: U256) {
        self.native.insert(who, amount);
    }

    fn warp(&mut self, _seconds: u64, _blocks: u64) {}

    fn gas_price(&self) -> U256 {
        self.gas_price
    }

    fn set_gas_price(&mut self, price: U256) {
        self.gas_price = price;
    }

    fn checkpoint(&mut self) -> usize {
        self.snapshots
            .push((self.native.clone(), self.shares.clone(), self.total_shares));
        self.snapshots.len() - 1
    }

    fn revert_to(&mut self, checkpoint: usize) {
        if checkpoint < self.snapshots.len() {
            let (native, shares, total) = self.snapshots.swap_remove(checkpoint);
            self.snapshots.truncate(checkpoint);
            self.native = native;
            self.shares = shares;
            self.total_shares = total;
        }
    }
}

//! In-memory EVM execution boundary.
//!
//! All probing and attack logic talks to the target through [`TargetVm`]:
//! a call either returns response bytes or a [`CallFailure`]. The production
//! implementation ([`EvmHarness`]) wraps REVM over a fork-seeded `CacheDB`;
//! tests substitute a deterministic mock behind the same trait.

use alloy_primitives::{keccak256, Address, Bytes, U256};
use revm::{
    db::{CacheDB, EmptyDB},
    primitives::{
        AccountInfo, BlockEnv, Bytecode, CfgEnvWithHandlerCfg, EnvWithHandlerCfg, ExecutionResult,
        Output, SpecId, TxEnv, TxKind, KECCAK_EMPTY,
    },
    Evm,
};
use std::collections::HashMap;

/// Gas limit for every simulated call.
const CALL_GAS_LIMIT: u64 = 1_500_000;

/// Why a call did not succeed. Non-fatal: the chain engine converts every
/// failure into "advance to the next candidate".
#[derive(Debug, Clone)]
pub struct CallFailure {
    /// Decoded revert string or halt description.
    pub reason: String,
    /// True when the target explicitly reverted (as opposed to halting).
    pub reverted: bool,
}

impl CallFailure {
    pub fn reverted(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            reverted: true,
        }
    }

    pub fn halted(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            reverted: false,
        }
    }
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reverted {
            write!(f, "reverted: {}", self.reason)
        } else {
            write!(f, "halted: {}", self.reason)
        }
    }
}

/// Execution boundary the probers, classifier scenarios and the flash-loan
/// orchestrator run against.
pub trait TargetVm {
    /// Send a state-changing call. Failure is a value, not an error.
    fn invoke(
        &mut self,
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
    ) -> Result<Bytes, CallFailure>;

    /// Read-only call; no state is committed.
    fn view(&mut self, from: Address, to: Address, calldata: Bytes) -> Result<Bytes, CallFailure>;

    /// Native balance of an account.
    fn native_balance(&self, who: Address) -> U256;

    /// Overwrite an account's native balance (dealing funds, donations that
    /// bypass target accounting).
    fn set_native_balance(&mut self, who: Address, amount: U256);

    /// Fast-forward the simulated clock and height.
    fn warp(&mut self, seconds: u64, blocks: u64);

    /// Current simulated gas price.
    fn gas_price(&self) -> U256;

    /// Override the simulated gas price.
    fn set_gas_price(&mut self, price: U256);

    /// Record a checkpoint; returns its id.
    fn checkpoint(&mut self) -> usize;

    /// Discard all state changes made since the checkpoint.
    fn revert_to(&mut self, checkpoint: usize);
}

/// Saved state for checkpoint/rollback.
#[derive(Clone)]
struct HarnessState {
    db: CacheDB<EmptyDB>,
    block_number: u64,
    timestamp: u64,
    nonces: HashMap<Address, u64>,
}

/// REVM-backed implementation of [`TargetVm`].
pub struct EvmHarness {
    chain_id: u64,
    db: CacheDB<EmptyDB>,
    block_number: u64,
    timestamp: u64,
    gas_price: U256,
    nonces: HashMap<Address, u64>,
    snapshots: Vec<HarnessState>,
}

impl EvmHarness {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            db: CacheDB::new(EmptyDB::default()),
            block_number: 19_000_000,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            gas_price: U256::ZERO,
            nonces: HashMap::new(),
            snapshots: Vec::new(),
        }
    }

    /// Insert an externally owned account with a balance.
    pub fn insert_funded_account(&mut self, who: Address, balance: U256) {
        self.db.insert_account_info(
            who,
            AccountInfo {
                balance,
                nonce: 0,
                code_hash: KECCAK_EMPTY,
                code: None,
            },
        );
    }

    /// Insert a contract account with bytecode and balance (fork seeding).
    pub fn insert_contract(&mut self, addr: Address, code: Bytes, balance: U256) {
        let code_hash = keccak256(&code);
        self.db.insert_account_info(
            addr,
            AccountInfo {
                balance,
                nonce: 1,
                code_hash,
                code: Some(Bytecode::new_raw(code)),
            },
        );
    }

    fn next_nonce(&mut self, caller: Address) -> u64 {
        let entry = self.nonces.entry(caller).or_insert(0);
        let nonce = *entry;
        *entry += 1;
        nonce
    }

    fn build_env(&self, tx_env: TxEnv) -> EnvWithHandlerCfg {
        // Zero basefee: probing runs gas-free so balance deltas track value
        // flows, not execution cost.
        let block_env = BlockEnv {
            number: U256::from(self.block_number),
            timestamp: U256::from(self.timestamp),
            gas_limit: U256::from(30_000_000u64),
            basefee: U256::ZERO,
            ..Default::default()
        };
        let cfg = CfgEnvWithHandlerCfg::new_with_spec_id(Default::default(), SpecId::CANCUN);
        EnvWithHandlerCfg::new_with_cfg_env(cfg, block_env, tx_env)
    }

    fn tx_env(&mut self, from: Address, to: Address, value: U256, data: Bytes) -> TxEnv {
        let nonce = self.next_nonce(from);
        TxEnv {
            caller: from,
            gas_limit: CALL_GAS_LIMIT,
            gas_price: self.gas_price,
            transact_to: TxKind::Call(to),
            value,
            data,
            nonce: Some(nonce),
            chain_id: Some(self.chain_id),
            ..Default::default()
        }
    }

    /// Decode revert reason from output bytes (Error(string) selector).
    pub fn decode_revert_reason(output: &Bytes) -> String {
        if output.len() >= 68 && output[0..4] == [0x08, 0xc3, 0x79, 0xa0] {
            let len_start = 36;
            if output.len() > len_start + 32 {
                let len = U256::from_be_slice(&output[len_start..len_start + 32]);
                let len_usize: usize = len.try_into().unwrap_or(0);
                let str_start = len_start + 32;
                if output.len() >= str_start + len_usize {
                    if let Ok(s) =
                        String::from_utf8(output[str_start..str_start + len_usize].to_vec())
                    {
                        return s;
                    }
                }
            }
        }
        if output.is_empty() {
            return "no reason".to_string();
        }
        format!("0x{}", hex::encode(&output[..output.len().min(64)]))
    }

    fn transact(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
        commit: bool,
    ) -> Result<Bytes, CallFailure> {
        let tx_env = self.tx_env(from, to, value, data);
        let env = self.build_env(tx_env);

        let mut evm = Evm::builder()
            .with_db(&mut self.db)
            .with_env_with_handler_cfg(env)
            .build();

        let result = if commit {
            evm.transact_commit()
        } else {
            evm.transact().map(|r| r.result)
        };
        drop(evm);

        if !commit {
            // View calls must not consume the caller's nonce.
            if let Some(n) = self.nonces.get_mut(&from) {
                *n = n.saturating_sub(1);
            }
        } else if let Ok(res) = &result {
            // The simulated gas price must stay visible to targets (fee
            // refund probes read it) without the charge skewing the balance
            // deltas every success predicate compares. Return it.
            let charged = U256::from(res.gas_used()) * self.gas_price;
            if !charged.is_zero() {
                if let Some(acct) = self.db.accounts.get_mut(&from) {
                    acct.info.balance += charged;
                }
            }
        }

        match result {
            Ok(ExecutionResult::Success { output, .. }) => match output {
                Output::Call(bytes) => Ok(bytes),
                Output::Create(bytes, _) => Ok(bytes),
            },
            Ok(ExecutionResult::Revert { output, .. }) => {
                Err(CallFailure::reverted(Self::decode_revert_reason(&output)))
            }
            Ok(ExecutionResult::Halt { reason, .. }) => {
                Err(CallFailure::halted(format!("{:?}", reason)))
            }
            Err(e) => Err(CallFailure::halted(format!("EVM error: {:?}", e))),
        }
    }
}

impl TargetVm for EvmHarness {
    fn invoke(
        &mut self,
        from: Address,
        to: Address,
        calldata: Bytes,
        value: U256,
    ) -> Result<Bytes, CallFailure> {
        self.transact(from, to, value, calldata, true)
    }

    fn view(&mut self, from: Address, to: Address, calldata: Bytes) -> Result<Bytes, CallFailure> {
        self.transact(from, to, U256::ZERO, calldata, false)
    }

    fn native_balance(&self, who: Address) -> U256 {
        self.db
            .accounts
            .get(&who)
            .map(|a| a.info.balance)
            .unwrap_or_default()
    }

    fn set_native_balance(&mut self, who: Address, amount: U256) {
        match self.db.accounts.get_mut(&who) {
            Some(acct) => acct.info.balance = amount,
            None => self.insert_funded_account(who, amount),
        }
    }

    fn warp(&mut self, seconds: u64, blocks: u64) {
        self.timestamp += seconds;
        self.block_number += blocks;
    }

    fn gas_price(&self) -> U256 {
        self.gas_price
    }

    fn set_gas_price(&mut self, price: U256) {
        self.gas_price = price;
    }

    fn checkpoint(&mut self) -> usize {
        self.snapshots.push(HarnessState {
            db: self.db.clone(),
            block_number: self.block_number,
            timestamp: self.timestamp,
            nonces: self.nonces.clone(),
        });
        self.snapshots.len() - 1
    }

    fn revert_to(&mut self, checkpoint: usize) {
        if checkpoint < self.snapshots.len() {
            let state = self.snapshots.swap_remove(checkpoint);
            self.snapshots.truncate(checkpoint);
            self.db = state.db;
            self.block_number = state.block_number;
            self.timestamp = state.timestamp;
            self.nonces = state.nonces;
        }
    }
}

/// Generate a random probing identity. Targets cannot special-case an
/// address they have never seen.
pub fn random_identity() -> Address {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 20];
    rng.fill(&mut bytes);
    Address::from(bytes)
}

//! # In-Process Ledger
//!
//! An authoritative, atomically ordered, append-only execution environment
//! for the escrow contract. Accounts carry balances and nonces; every
//! submission is validated, charged for gas, executed under one interior
//! lock, and included in its own block. The lock is the serialization point:
//! two racing submissions against the same condition are ordered here, and
//! the loser reverts with the terminal-state guard error.
//!
//! Time is UNIX seconds with an atomic signed offset so tests can advance
//! past deadlines while runtime deployments follow wall time.

use crate::condition::Condition;
use crate::contract::EscrowContract;
use crate::error::{ContractError, LedgerError};
use crate::events::{ContractEvent, EventRecord};
use crate::types::{keccak256, parse_units, Address, ConditionId, Hash, Timestamp, U256};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

// =============================================================================
// GAS SCHEDULE
// =============================================================================

/// Flat per-operation gas costs.
pub mod costs {
    /// Base cost of any transaction.
    pub const TX_BASE: u64 = 21_000;
    /// Creating a condition (two storage slots plus the record).
    pub const CREATE_CONDITION: u64 = 47_000;
    /// Triggering a condition (state flip plus value transfer).
    pub const TRIGGER_CONDITION: u64 = 31_000;
    /// Refunding a condition.
    pub const REFUND_CONDITION: u64 = 15_000;
    /// Granting or revoking the relayer role.
    pub const MANAGE_ROLE: u64 = 3_000;
    /// Gas per byte of metadata calldata.
    pub const CALLDATA_BYTE: u64 = 16;
}

// =============================================================================
// CALLS, TRANSACTIONS, RECEIPTS
// =============================================================================

/// A state-changing contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EscrowCall {
    /// Create and fund a condition with the transaction's attached value.
    #[serde(rename_all = "camelCase")]
    CreateCondition {
        payee: Address,
        deadline: Timestamp,
        #[serde(rename = "metadataURI")]
        metadata_uri: String,
    },
    /// Release escrowed funds to the payee (relayer role).
    #[serde(rename_all = "camelCase")]
    TriggerCondition {
        id: ConditionId,
        proof_hash: Hash,
    },
    /// Return escrowed funds to the payer (after deadline).
    #[serde(rename_all = "camelCase")]
    RefundCondition { id: ConditionId },
    /// Grant the relayer role (admin).
    #[serde(rename_all = "camelCase")]
    AddRelayer { relayer: Address },
    /// Revoke the relayer role (admin).
    #[serde(rename_all = "camelCase")]
    RemoveRelayer { relayer: Address },
}

impl EscrowCall {
    /// Gas this call consumes when executed.
    #[must_use]
    pub fn required_gas(&self) -> u64 {
        let op = match self {
            Self::CreateCondition { metadata_uri, .. } => {
                costs::CREATE_CONDITION + metadata_uri.len() as u64 * costs::CALLDATA_BYTE
            }
            Self::TriggerCondition { .. } => costs::TRIGGER_CONDITION,
            Self::RefundCondition { .. } => costs::REFUND_CONDITION,
            Self::AddRelayer { .. } | Self::RemoveRelayer { .. } => costs::MANAGE_ROLE,
        };
        costs::TX_BASE + op
    }
}

/// A signed submission ready for inclusion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Sender identity (already authenticated by the client adapter).
    pub from: Address,
    /// Sender's sequence number; must match the account's next nonce.
    pub nonce: u64,
    /// Maximum gas the sender will pay for.
    pub gas_limit: u64,
    /// Value attached to the call (escrowed on create).
    pub value: U256,
    /// The contract call.
    pub call: EscrowCall,
}

impl Transaction {
    fn hash(&self) -> Hash {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(self.from.as_bytes());
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        preimage.extend_from_slice(&serde_json::to_vec(&self.call).unwrap_or_default());
        keccak256(&preimage)
    }
}

/// How an included transaction's execution ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// State transition applied, events emitted.
    Success,
    /// A contract guard rejected the call; gas was still consumed.
    Reverted(ContractError),
    /// Gas limit below the call's requirement; the provided gas is consumed.
    OutOfGas,
}

impl ExecutionOutcome {
    /// True only for a fully applied transition.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Inclusion metadata returned for every included transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash identifying the submission.
    pub tx_hash: Hash,
    /// Block that included it.
    pub block_number: u64,
    /// Gas actually consumed.
    pub gas_used: u64,
    /// Execution outcome.
    pub outcome: ExecutionOutcome,
}

// =============================================================================
// GENESIS / DEPLOYMENT DESCRIPTOR
// =============================================================================

/// A pre-funded account in the deployment descriptor.
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisAccount {
    /// Account identity.
    pub address: Address,
    /// Initial balance as a decimal unit string (e.g. `"100.0"`).
    pub balance: String,
}

/// The deployment descriptor: contract roles plus initial account state.
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisConfig {
    /// Admin identity for role management.
    pub admin: Address,
    /// Initial relayer identity.
    pub relayer: Address,
    /// Pre-funded accounts.
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    /// Gas price in base denomination, applied to every submission.
    #[serde(default = "default_gas_price")]
    pub gas_price: u64,
}

fn default_gas_price() -> u64 {
    1_000_000_000 // 1 gwei-equivalent
}

/// Errors building a ledger from a deployment descriptor.
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    /// An account balance string did not parse as decimal units.
    #[error("invalid balance for {address}: {balance:?}")]
    InvalidBalance {
        address: Address,
        balance: String,
    },

    /// Contract deployment guard rejected the descriptor.
    #[error(transparent)]
    Contract(#[from] ContractError),
}

// =============================================================================
// LEDGER
// =============================================================================

#[derive(Clone, Debug, Default)]
struct AccountState {
    balance: U256,
    nonce: u64,
}

struct LedgerState {
    accounts: HashMap<Address, AccountState>,
    contract: EscrowContract,
    block_number: u64,
    gas_price: U256,
    events: Vec<EventRecord>,
}

/// The authoritative ledger. One interior lock totally orders all mutations.
pub struct Ledger {
    state: Mutex<LedgerState>,
    time_offset: AtomicI64,
}

/// Account holding escrowed value between creation and release.
const ESCROW_ACCOUNT: Address = Address([0xee; 20]);

impl Ledger {
    /// Builds a ledger from a deployment descriptor.
    pub fn new(genesis: &GenesisConfig) -> Result<Self, GenesisError> {
        let contract = EscrowContract::new(genesis.admin, genesis.relayer)?;

        let mut accounts = HashMap::new();
        for entry in &genesis.accounts {
            let balance =
                parse_units(&entry.balance).ok_or_else(|| GenesisError::InvalidBalance {
                    address: entry.address,
                    balance: entry.balance.clone(),
                })?;
            accounts.insert(
                entry.address,
                AccountState {
                    balance,
                    nonce: 0,
                },
            );
        }

        Ok(Self {
            state: Mutex::new(LedgerState {
                accounts,
                contract,
                block_number: 0,
                gas_price: U256::from(genesis.gas_price),
                events: Vec::new(),
            }),
            time_offset: AtomicI64::new(0),
        })
    }

    /// Current ledger time in UNIX seconds.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let shifted = wall + self.time_offset.load(Ordering::Relaxed);
        shifted.max(0) as Timestamp
    }

    /// Advances ledger time. Test hook for deadline arithmetic.
    pub fn advance_time(&self, secs: u64) {
        self.time_offset.fetch_add(secs as i64, Ordering::Relaxed);
    }

    // -------------------------------------------------------------------------
    // Read path
    // -------------------------------------------------------------------------

    /// Snapshot of a condition.
    pub fn condition(&self, id: ConditionId) -> Result<Condition, ContractError> {
        self.state.lock().contract.condition(id).cloned()
    }

    /// Trigger eligibility.
    pub fn can_trigger(&self, id: ConditionId) -> Result<bool, ContractError> {
        self.state.lock().contract.can_trigger(id)
    }

    /// Refund eligibility at current ledger time.
    pub fn can_refund(&self, id: ConditionId) -> Result<bool, ContractError> {
        let now = self.now();
        self.state.lock().contract.can_refund(id, now)
    }

    /// Number of conditions ever created.
    #[must_use]
    pub fn condition_count(&self) -> u64 {
        self.state.lock().contract.condition_count()
    }

    /// Current balance of an account (zero if never seen).
    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.state
            .lock()
            .accounts
            .get(&account)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Next valid nonce for an account, counting in-flight submissions.
    /// Inclusion is immediate here, so pending equals confirmed.
    #[must_use]
    pub fn pending_nonce(&self, account: Address) -> u64 {
        self.state
            .lock()
            .accounts
            .get(&account)
            .map(|a| a.nonce)
            .unwrap_or(0)
    }

    /// Height of the last included block.
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.state.lock().block_number
    }

    /// All events emitted so far, in inclusion order.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.state.lock().events.clone()
    }

    /// True if the identity holds the relayer role.
    #[must_use]
    pub fn is_relayer(&self, who: Address) -> bool {
        self.state.lock().contract.is_relayer(who)
    }

    /// Dry-runs a call against current state and returns the gas it would
    /// consume. Fails with the guard error the execution would revert with,
    /// so callers can price a submission without spending anything.
    pub fn estimate_gas(
        &self,
        from: Address,
        value: U256,
        call: &EscrowCall,
    ) -> Result<u64, ContractError> {
        let state = self.state.lock();
        let now = self.now();
        let mut scratch = state.contract.clone();
        Self::apply_call(&mut scratch, from, value, call, now)?;
        Ok(call.required_gas())
    }

    // -------------------------------------------------------------------------
    // Write path
    // -------------------------------------------------------------------------

    /// Validates, executes, and includes a transaction atomically.
    ///
    /// A guard revert still consumes gas and yields a receipt with a
    /// `Reverted` outcome. Errors here mean the transaction was never
    /// included at all.
    pub fn submit(&self, tx: Transaction) -> Result<Receipt, LedgerError> {
        let mut state = self.state.lock();
        let now = self.now();

        if tx.from.is_zero() {
            return Err(LedgerError::InvalidSender(tx.from));
        }

        let gas_price = state.gas_price;
        let account = state.accounts.entry(tx.from).or_default();
        if tx.nonce != account.nonce {
            return Err(LedgerError::NonceMismatch {
                expected: account.nonce,
                got: tx.nonce,
            });
        }

        let max_fee = U256::from(tx.gas_limit) * gas_price;
        let required = tx
            .value
            .checked_add(max_fee)
            .unwrap_or(U256::max_value());
        if account.balance < required {
            return Err(LedgerError::InsufficientFunds {
                required,
                available: account.balance,
            });
        }

        account.nonce += 1;
        let tx_hash = tx.hash();
        state.block_number += 1;
        let block_number = state.block_number;

        let required_gas = tx.call.required_gas();
        if tx.gas_limit < required_gas {
            let gas_used = tx.gas_limit;
            state.charge_fee(tx.from, gas_used);
            debug!(%tx_hash, block_number, gas_used, "submission ran out of gas");
            return Ok(Receipt {
                tx_hash,
                block_number,
                gas_used,
                outcome: ExecutionOutcome::OutOfGas,
            });
        }

        let gas_used = required_gas;
        state.charge_fee(tx.from, gas_used);

        let mut scratch = state.contract.clone();
        let outcome = match Self::apply_call(&mut scratch, tx.from, tx.value, &tx.call, now) {
            Ok((events, transfers)) => {
                state.contract = scratch;
                for (from, to, amount) in transfers {
                    state.transfer(from, to, amount);
                }
                for event in events {
                    state.events.push(EventRecord {
                        block_number,
                        event,
                    });
                }
                ExecutionOutcome::Success
            }
            Err(err) => ExecutionOutcome::Reverted(err),
        };

        debug!(%tx_hash, block_number, gas_used, ?outcome, "included submission");
        Ok(Receipt {
            tx_hash,
            block_number,
            gas_used,
            outcome,
        })
    }

    /// Runs a call against a contract snapshot, returning the events to
    /// record and the balance movements to apply on success.
    #[allow(clippy::type_complexity)]
    fn apply_call(
        contract: &mut EscrowContract,
        from: Address,
        value: U256,
        call: &EscrowCall,
        now: Timestamp,
    ) -> Result<(Vec<ContractEvent>, Vec<(Address, Address, U256)>), ContractError> {
        match call {
            EscrowCall::CreateCondition {
                payee,
                deadline,
                metadata_uri,
            } => {
                let (_, event) = contract.create_condition(
                    from,
                    value,
                    *payee,
                    *deadline,
                    metadata_uri.clone(),
                    now,
                )?;
                Ok((vec![event], vec![(from, ESCROW_ACCOUNT, value)]))
            }
            EscrowCall::TriggerCondition { id, proof_hash } => {
                let (transfer, event) = contract.trigger_condition(from, *id, *proof_hash)?;
                Ok((
                    vec![event],
                    vec![(ESCROW_ACCOUNT, transfer.to, transfer.amount)],
                ))
            }
            EscrowCall::RefundCondition { id } => {
                let (transfer, event) = contract.refund_condition(from, *id, now)?;
                Ok((
                    vec![event],
                    vec![(ESCROW_ACCOUNT, transfer.to, transfer.amount)],
                ))
            }
            EscrowCall::AddRelayer { relayer } => {
                let event = contract.add_relayer(from, *relayer)?;
                Ok((vec![event], Vec::new()))
            }
            EscrowCall::RemoveRelayer { relayer } => {
                let event = contract.remove_relayer(from, *relayer)?;
                Ok((vec![event], Vec::new()))
            }
        }
    }
}

impl LedgerState {
    fn charge_fee(&mut self, from: Address, gas_used: u64) {
        let fee = U256::from(gas_used) * self.gas_price;
        let account = self.accounts.entry(from).or_default();
        account.balance = account.balance.saturating_sub(fee);
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) {
        let sender = self.accounts.entry(from).or_default();
        // Validated upstream: the payer's balance at submission, or escrowed
        // value held since creation.
        sender.balance = sender.balance.saturating_sub(amount);
        let recipient = self.accounts.entry(to).or_default();
        recipient.balance += amount;
    }
}

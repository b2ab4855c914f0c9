// Guestbook runtime: transaction lifecycle for on-chain guestbooks
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Guestbook contributors.
//
// Copyright (C) 2025 Guestbook contributors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Address, Amount, CostEstimate, LedgerError, TxId};

/// Argument of a contract call.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub enum CallArg {
    Address(Address),
    Uint(u128),
    Bool(bool),
    Text(String),
    AddressList(Vec<Address>),
    TextList(Vec<String>),
}

/// State-changing call to a contract, submitted as a signed transaction.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct ContractCall {
    pub contract: Address,
    pub from: Option<Address>,
    pub method: String,
    pub args: Vec<CallArg>,
    pub value: Amount,
}

/// Read-only query of a contract state.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct ReadCall {
    pub contract: Address,
    pub method: String,
    pub args: Vec<CallArg>,
}

impl ReadCall {
    pub fn new(contract: Address, method: impl Into<String>, args: Vec<CallArg>) -> Self {
        ReadCall { contract, method: method.into(), args }
    }
}

/// Value returned by a read-only contract query.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub enum StateValue {
    Empty,
    Bool(bool),
    Uint(u128),
    Address(Address),
    Text(String),
    List(Vec<StateValue>),
}

impl StateValue {
    pub fn as_uint(&self) -> Option<u128> {
        match self {
            StateValue::Uint(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            StateValue::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            StateValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool { matches!(self, StateValue::Empty) }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
#[display(lowercase)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: DateTime<Utc>,
}

/// Ledger acknowledgment of an included transaction.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct Receipt {
    pub tx_id: TxId,
    pub status: ReceiptStatus,
    /// Block which has included the transaction.
    pub block: BlockInfo,
    /// Number of blocks on top of the including one, the including block counted.
    pub confirmations: u32,
    pub units_used: u64,
    pub revert_reason: Option<String>,
}

impl Receipt {
    #[inline]
    pub fn is_success(&self) -> bool { self.status == ReceiptStatus::Success }
}

pub type BlockCallback = Box<dyn Fn(&BlockInfo) + Send + Sync>;

/// Handle of a new-block subscription; unsubscribes when dropped.
pub struct BlockSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl BlockSubscription {
    pub fn with(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        BlockSubscription { unsubscribe: Some(Box::new(unsubscribe)) }
    }

    /// Subscription which does nothing on termination, for ledgers not supporting block
    /// notifications.
    pub fn inert() -> Self { BlockSubscription { unsubscribe: None } }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f()
        }
    }
}

impl Debug for BlockSubscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockSubscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

impl Drop for BlockSubscription {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f()
        }
    }
}

/// Access to the remote ledger holding guestbook contracts.
///
/// `submit` is bound to the connected wallet: it signs the call with the wallet key, prompting
/// the user if needed, and hands the signed transaction to the ledger. The runtime never sees
/// keys or signatures.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit(&self, call: &ContractCall) -> Result<TxId, LedgerError>;

    /// Resolves once the transaction has at least `confirmations` confirmations, returning its
    /// receipt. A reverted transaction resolves with a receipt of [`ReceiptStatus::Failure`].
    async fn wait_for_confirmation(
        &self,
        tx_id: TxId,
        confirmations: u32,
    ) -> Result<Receipt, LedgerError>;

    async fn estimate_cost(&self, call: &ContractCall) -> Result<CostEstimate, LedgerError>;

    async fn read(&self, call: &ReadCall) -> Result<StateValue, LedgerError>;

    async fn block(&self) -> Result<BlockInfo, LedgerError>;

    fn subscribe_to_blocks(&self, callback: BlockCallback) -> BlockSubscription;
}

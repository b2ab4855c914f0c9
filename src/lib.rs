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

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Transaction lifecycle and contract-interaction runtime for on-chain guestbooks.
//!
//! The crate validates user actions, submits them through a [`LedgerClient`], tracks each
//! transaction until it is confirmed, estimates costs, reconciles optimistic local state with the
//! ledger and keeps read-only state fresh with pollers.

#[macro_use]
extern crate amplify;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_crate as serde;
#[macro_use]
extern crate log;

mod primitives;
mod errors;
pub mod operation;
pub mod ledger;
mod session;
mod cancel;
pub mod lifecycle;
mod estimate;
pub mod optimistic;
pub mod batch;
pub mod poll;
mod reads;
mod config;
mod guestbook;
pub mod sandbox;

pub use batch::{validate_batch, BatchCoordinator, BatchOperation, BatchOutcome};
pub use cancel::CancelToken;
pub use config::{ConfigError, Contracts, GuestbookConfig};
pub use errors::{LedgerError, OperationError, ValidationError};
pub use estimate::{CostEstimate, CostEstimator, EstimateSnapshot};
pub use guestbook::Guestbook;
pub use ledger::{
    BlockCallback, BlockInfo, BlockSubscription, CallArg, ContractCall, LedgerClient, ReadCall,
    Receipt, ReceiptStatus, StateValue,
};
pub use lifecycle::{
    LifecycleConfig, ListenerId, SubmitOptions, TransactionRecord, TxController, TxStatus,
    DEFAULT_CONFIRMATIONS,
};
pub use operation::{
    Operation, OperationKind, OperationPolicy, Payload, MAX_BATCH_SIZE, MAX_MESSAGE_LEN,
};
pub use optimistic::{OptimisticView, Reconciler};
pub use poll::{PollOptions, PollState, Poller, PollerHandle, DEFAULT_POLL_INTERVAL};
pub use primitives::{Address, Amount, ChainId, ParseError, TxId};
pub use reads::{LeaderboardEntry, ProfileStats, Reader, Signature};
pub use sandbox::{Mining, SandboxLedger};
pub use session::{Session, StaticSession};

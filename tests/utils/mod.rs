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

pub mod runtime;

use std::sync::Arc;

use guestbook::{Address, Amount, ChainId, OperationKind, Payload, TransactionRecord, TxStatus};
use parking_lot::Mutex;

pub const SIGNATURE_FEE: u128 = 1_000;

pub fn account(no: u8) -> Address { Address::from([no; 20]) }

pub fn alice() -> Address { account(0xA1) }
pub fn bob() -> Address { account(0xB0) }
pub fn carol() -> Address { account(0xC0) }

pub fn chain() -> ChainId { ChainId::new(1) }

pub fn fee() -> Amount { Amount::from_units(SIGNATURE_FEE) }

pub fn message(len: usize) -> String { "g".repeat(len) }

/// Builds a payload of a message-carrying kind.
pub fn payload_with_message(kind: OperationKind, message: String) -> Payload {
    match kind {
        OperationKind::Sign => Payload::Sign { target: bob(), message },
        OperationKind::EditSignature => Payload::EditSignature { owner: bob(), index: 0, message },
        OperationKind::SignWithReferral => {
            Payload::SignWithReferral { target: bob(), message, referrer: carol() }
        }
        _ => unreachable!("{kind} doesn't carry a message"),
    }
}

/// Collects records published by a lifecycle controller.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<TransactionRecord>>>);

impl Recorder {
    pub fn listener(&self) -> impl Fn(&TransactionRecord) + Send + Sync + 'static {
        let log = self.0.clone();
        move |record| log.lock().push(record.clone())
    }

    pub fn records(&self) -> Vec<TransactionRecord> { self.0.lock().clone() }

    /// Sequence of statuses, with repeated ones collapsed.
    pub fn statuses(&self) -> Vec<TxStatus> {
        let mut statuses = self
            .0
            .lock()
            .iter()
            .map(TransactionRecord::status)
            .collect::<Vec<_>>();
        statuses.dedup();
        statuses
    }

    pub fn confirmations(&self) -> Vec<u32> {
        self.0
            .lock()
            .iter()
            .map(TransactionRecord::confirmations_seen)
            .collect()
    }
}

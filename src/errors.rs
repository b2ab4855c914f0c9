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

#![allow(clippy::result_large_err)]

use crate::{Address, Amount, ChainId, TxId};

/// Errors reported by a ledger client or a wallet bound to it.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum LedgerError {
    /// cannot connect to the ledger node.
    Connectivity,

    /// the wallet or the ledger node has rejected the transaction: {0}
    Rejected(String),

    /// the call reverted during execution: {0}
    Reverted(String),

    /// transaction {0} is not known to the ledger.
    UnknownTransaction(TxId),

    /// ledger node uses invalid protocol: {0}
    Protocol(String),

    /// the ledger node has returned an error "{0}"
    ServerSide(String),
}

/// Domain validation failures, detected before anything reaches the ledger.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum ValidationError {
    /// message cannot be empty.
    EmptyMessage,

    /// message is {0} characters long, while at most {1} characters are allowed.
    MessageTooLong(usize, usize),

    /// batch lists {0} targets but {1} messages; each target needs exactly one message.
    MismatchedArrays(usize, usize),

    /// batch of {0} signatures exceeds the limit of {1} signatures per transaction.
    BatchTooLarge(usize, usize),

    /// batch must contain at least one signature.
    EmptyBatch,

    /// tip amount must be positive.
    NonPositiveTip,

    /// tip amount {0} is below the minimal tip of {1}.
    TipTooSmall(Amount, Amount),

    /// account {0} can't target itself with this operation.
    SelfTarget(Address),

    /// referrer {0} must differ from both the signer and the guestbook owner.
    InvalidReferrer(Address),

    /// batch entry #{0}: {1}
    BatchItem(usize, Box<ValidationError>),

    /// required value overflows the range of the native currency.
    ValueOverflow,
}

/// Failures of a user operation, as observed by the façade caller.
///
/// The same value is both stored on the transaction record and returned to
/// the caller awaiting the operation.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum OperationError {
    /// no wallet is connected; connect a wallet to continue.
    NotConnected,

    /// wallet is connected to chain {1} while the guestbook lives on chain {0}.
    WrongChain(ChainId, ChainId),

    /// {0}
    #[from]
    InvalidInput(ValidationError),

    /// transaction submission failed: {0}
    SubmissionFailed(LedgerError),

    /// transaction {0} was included but its execution failed: {1}
    Reverted(TxId, String),

    /// unable to estimate transaction cost: {0}
    EstimationFailed(LedgerError),

    /// transaction {0} was not confirmed within {1} ms.
    Timeout(TxId, u64),

    /// operation was cancelled before it has settled.
    Cancelled,

    /// another operation is still in flight; wait until it settles.
    Busy,
}

impl OperationError {
    /// Converts a ledger failure which happened after the transaction id was known.
    pub(crate) fn after_submission(tx_id: TxId, err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted(reason) => OperationError::Reverted(tx_id, reason),
            err => OperationError::SubmissionFailed(err),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OperationError::NotConnected
                | OperationError::WrongChain(..)
                | OperationError::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert!(ValidationError::NonPositiveTip
            .to_string()
            .contains("tip amount must be positive"));
        assert!(OperationError::from(ValidationError::MessageTooLong(281, 280))
            .to_string()
            .contains("281 characters long"));
        assert!(OperationError::Timeout(TxId::from([1u8; 32]), 5000)
            .to_string()
            .contains("5000 ms"));
    }

    #[test]
    fn revert_mapping() {
        let tx = TxId::from([7u8; 32]);
        assert_eq!(
            OperationError::after_submission(tx, LedgerError::Reverted(s!("paused"))),
            OperationError::Reverted(tx, s!("paused"))
        );
        assert_eq!(
            OperationError::after_submission(tx, LedgerError::Connectivity),
            OperationError::SubmissionFailed(LedgerError::Connectivity)
        );
    }
}

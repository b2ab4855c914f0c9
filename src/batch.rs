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

use std::sync::Arc;

use crate::{
    Address, Amount, LedgerClient, LifecycleConfig, Operation, OperationError, OperationKind,
    OperationPolicy, Payload, Receipt, SubmitOptions, TxController, TxId, ValidationError,
};

/// Checks a batch of signatures before it may become an operation.
///
/// The arrays are compared first, so a mismatch is reported even for oversized batches.
pub fn validate_batch(
    signer: Address,
    targets: &[Address],
    messages: &[String],
    policy: &OperationPolicy,
) -> Result<(), ValidationError> {
    if targets.len() != messages.len() {
        return Err(ValidationError::MismatchedArrays(targets.len(), messages.len()));
    }
    if targets.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if targets.len() > policy.max_batch_size {
        return Err(ValidationError::BatchTooLarge(targets.len(), policy.max_batch_size));
    }
    for (no, (target, message)) in targets.iter().zip(messages).enumerate() {
        policy
            .validate_message(message)
            .map_err(|err| ValidationError::BatchItem(no, Box::new(err)))?;
        if *target == signer {
            let err = ValidationError::SelfTarget(signer);
            return Err(ValidationError::BatchItem(no, Box::new(err)));
        }
    }
    Ok(())
}

/// Result of a confirmed batch transaction.
///
/// The ledger applies a batch atomically, so a single outcome describes all of its entries.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BatchOutcome {
    pub tx_id: TxId,
    pub count: usize,
    pub value: Amount,
    pub receipt: Receipt,
}

/// Batch of signatures which passed validation and may be submitted.
///
/// Created only by [`BatchCoordinator::prepare`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BatchOperation {
    operation: Operation,
    count: usize,
}

impl BatchOperation {
    #[inline]
    pub fn operation(&self) -> &Operation { &self.operation }
    #[inline]
    pub fn count(&self) -> usize { self.count }
    #[inline]
    pub fn value(&self) -> Amount { self.operation.required_value() }
}

/// Submits groups of signatures as a single ledger transaction.
#[derive(Clone)]
pub struct BatchCoordinator {
    contract: Address,
    policy: OperationPolicy,
    ledger: Arc<dyn LedgerClient>,
    controller: TxController,
}

impl BatchCoordinator {
    pub fn new(
        contract: Address,
        policy: OperationPolicy,
        ledger: Arc<dyn LedgerClient>,
        lifecycle: LifecycleConfig,
    ) -> Self {
        let controller = TxController::with_name(
            OperationKind::BatchSign.to_string(),
            ledger.clone(),
            lifecycle,
        );
        BatchCoordinator { contract, policy, ledger, controller }
    }

    #[inline]
    pub fn controller(&self) -> &TxController { &self.controller }

    pub fn prepare(
        &self,
        signer: Address,
        targets: Vec<Address>,
        messages: Vec<String>,
    ) -> Result<BatchOperation, ValidationError> {
        let count = targets.len();
        let operation =
            Operation::validate(signer, Payload::BatchSign { targets, messages }, &self.policy)?;
        Ok(BatchOperation { operation, count })
    }

    /// Submits a prepared batch and waits for its confirmation.
    pub async fn submit(
        &self,
        batch: &BatchOperation,
        opts: SubmitOptions,
    ) -> Result<BatchOutcome, OperationError> {
        let count = batch.count;
        let call = batch.operation.to_call(self.contract);
        debug!(
            "Submitting batch of {count} signatures from {} carrying {}",
            batch.operation.signer(),
            batch.value()
        );
        let receipt = self
            .controller
            .submit_with(opts, || self.ledger.submit(&call))
            .await?;
        Ok(BatchOutcome {
            tx_id: receipt.tx_id,
            count,
            value: batch.value(),
            receipt,
        })
    }
}

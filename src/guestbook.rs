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
    Address, Amount, BatchCoordinator, BatchOutcome, CostEstimate, CostEstimator, GuestbookConfig,
    LedgerClient, ListenerId, Operation, OperationError, OperationKind, OperationPolicy, Payload,
    Reader, Receipt, Session, SubmitOptions, TransactionRecord, TxController,
};

/// Entry point for user actions on guestbooks.
///
/// Every action is validated against the current wallet session and the configured limits
/// before it reaches the ledger. Each action kind has its own lifecycle controller, so
/// operations of different kinds may run concurrently while a second operation of the same kind
/// is rejected as [`OperationError::Busy`].
pub struct Guestbook {
    config: GuestbookConfig,
    policy: OperationPolicy,
    ledger: Arc<dyn LedgerClient>,
    session: Arc<dyn Session>,
    controllers: [TxController; OperationKind::ALL.len()],
    batch: BatchCoordinator,
    estimator: CostEstimator,
    reader: Reader,
}

impl Guestbook {
    pub fn new(
        config: GuestbookConfig,
        ledger: Arc<dyn LedgerClient>,
        session: Arc<dyn Session>,
    ) -> Self {
        let policy = config.policy();
        let lifecycle = config.lifecycle();
        let batch =
            BatchCoordinator::new(config.contracts.guestbook, policy, ledger.clone(), lifecycle);
        // ordered as kind discriminants
        let controllers = OperationKind::ALL.map(|kind| match kind {
            OperationKind::BatchSign => batch.controller().clone(),
            kind => TxController::with_name(kind.to_string(), ledger.clone(), lifecycle),
        });
        Guestbook {
            policy,
            estimator: CostEstimator::new(ledger.clone()),
            reader: Reader::new(ledger.clone(), config.contracts),
            config,
            ledger,
            session,
            controllers,
            batch,
        }
    }

    #[inline]
    pub fn config(&self) -> &GuestbookConfig { &self.config }
    #[inline]
    pub fn session(&self) -> &dyn Session { self.session.as_ref() }
    #[inline]
    pub fn reader(&self) -> &Reader { &self.reader }
    #[inline]
    pub fn estimator(&self) -> &CostEstimator { &self.estimator }

    pub fn controller(&self, kind: OperationKind) -> &TxController {
        &self.controllers[kind as usize]
    }

    pub fn record(&self, kind: OperationKind) -> TransactionRecord { self.controller(kind).record() }

    /// Discards a settled record of the given kind; see [`TxController::reset`].
    pub fn reset(&self, kind: OperationKind) -> bool { self.controller(kind).reset() }

    pub fn subscribe(
        &self,
        kind: OperationKind,
        listener: impl Fn(&TransactionRecord) + Send + Sync + 'static,
    ) -> ListenerId {
        self.controller(kind).subscribe(listener)
    }

    /// Checks the session and validates `payload`, without touching the ledger.
    pub fn prepare(&self, payload: Payload) -> Result<Operation, OperationError> {
        let signer = self.signer()?;
        let op = Operation::validate(signer, payload, &self.policy)?;
        Ok(op)
    }

    /// Account which signs operations, if the session is connected to the configured chain.
    fn signer(&self) -> Result<Address, OperationError> {
        let signer = self.session.account().ok_or(OperationError::NotConnected)?;
        let chain = self.session.chain();
        if chain != self.config.chain {
            return Err(OperationError::WrongChain(self.config.chain, chain));
        }
        Ok(signer)
    }

    /// Estimates the cost of submitting `operation`. The estimate is advisory.
    pub async fn estimate(&self, operation: &Operation) -> Result<CostEstimate, OperationError> {
        let call = operation.to_call(self.config.contracts.guestbook);
        self.estimator.estimate(&call).await
    }

    pub async fn execute(&self, payload: Payload) -> Result<Receipt, OperationError> {
        self.execute_with(payload, SubmitOptions::default())
            .await
    }

    /// Prepares an operation and drives it through its lifecycle controller.
    pub async fn execute_with(
        &self,
        payload: Payload,
        opts: SubmitOptions,
    ) -> Result<Receipt, OperationError> {
        let operation = self.prepare(payload)?;
        self.submit(&operation, opts).await
    }

    pub async fn submit(
        &self,
        operation: &Operation,
        opts: SubmitOptions,
    ) -> Result<Receipt, OperationError> {
        let call = operation.to_call(self.config.contracts.guestbook);
        debug!(
            "Submitting {} from {} with value {}",
            operation.kind(),
            operation.signer(),
            operation.required_value()
        );
        self.controller(operation.kind())
            .submit_with(opts, || self.ledger.submit(&call))
            .await
    }

    pub async fn sign(
        &self,
        target: Address,
        message: impl Into<String>,
    ) -> Result<Receipt, OperationError> {
        self.execute(Payload::Sign { target, message: message.into() })
            .await
    }

    pub async fn react(&self, owner: Address, index: u64) -> Result<Receipt, OperationError> {
        self.execute(Payload::React { owner, index }).await
    }

    pub async fn unreact(&self, owner: Address, index: u64) -> Result<Receipt, OperationError> {
        self.execute(Payload::Unreact { owner, index }).await
    }

    pub async fn edit_signature(
        &self,
        owner: Address,
        index: u64,
        message: impl Into<String>,
    ) -> Result<Receipt, OperationError> {
        self.execute(Payload::EditSignature { owner, index, message: message.into() })
            .await
    }

    pub async fn pin_signature(&self, index: u64) -> Result<Receipt, OperationError> {
        self.execute(Payload::PinSignature { index }).await
    }

    pub async fn unpin_signature(&self) -> Result<Receipt, OperationError> {
        self.execute(Payload::UnpinSignature).await
    }

    pub async fn tip(&self, recipient: Address, amount: Amount) -> Result<Receipt, OperationError> {
        self.execute(Payload::Tip { recipient, amount }).await
    }

    pub async fn sign_with_referral(
        &self,
        target: Address,
        message: impl Into<String>,
        referrer: Address,
    ) -> Result<Receipt, OperationError> {
        self.execute(Payload::SignWithReferral { target, message: message.into(), referrer })
            .await
    }

    /// Signs several guestbooks with a single transaction.
    pub async fn batch_sign(
        &self,
        targets: Vec<Address>,
        messages: Vec<String>,
    ) -> Result<BatchOutcome, OperationError> {
        self.batch_sign_with(targets, messages, SubmitOptions::default())
            .await
    }

    pub async fn batch_sign_with(
        &self,
        targets: Vec<Address>,
        messages: Vec<String>,
        opts: SubmitOptions,
    ) -> Result<BatchOutcome, OperationError> {
        let batch = self.batch.prepare(self.signer()?, targets, messages)?;
        self.batch.submit(&batch, opts).await
    }
}

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

//! Transaction lifecycle controller.
//!
//! A controller drives one operation at a time through
//! `Idle → Preparing → Pending → Confirming → Confirmed`, falling to `Failed` from any in-flight
//! state. Every transition is published to the controller listeners in the order it happens.

use std::fmt::{self, Debug, Formatter};
use std::future::{self, Future};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::{CancelToken, LedgerClient, LedgerError, OperationError, Receipt, TxId};

pub const DEFAULT_CONFIRMATIONS: u32 = 1;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Display)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
#[display(lowercase)]
pub enum TxStatus {
    #[default]
    Idle,
    Preparing,
    Pending,
    Confirming,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, TxStatus::Preparing | TxStatus::Pending | TxStatus::Confirming)
    }

    pub fn is_terminal(self) -> bool { matches!(self, TxStatus::Confirmed | TxStatus::Failed) }
}

/// State of the operation tracked by a controller.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TransactionRecord {
    status: TxStatus,
    id: Option<TxId>,
    confirmations_seen: u32,
    receipt: Option<Receipt>,
    error: Option<OperationError>,
}

impl TransactionRecord {
    #[inline]
    pub fn status(&self) -> TxStatus { self.status }
    /// Transaction id, known once the record has reached `Pending`.
    #[inline]
    pub fn id(&self) -> Option<TxId> { self.id }
    #[inline]
    pub fn confirmations_seen(&self) -> u32 { self.confirmations_seen }
    #[inline]
    pub fn receipt(&self) -> Option<&Receipt> { self.receipt.as_ref() }
    /// Error which has failed the operation; present only in `Failed` state.
    #[inline]
    pub fn error(&self) -> Option<&OperationError> { self.error.as_ref() }

    #[inline]
    pub fn is_idle(&self) -> bool { self.status == TxStatus::Idle }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LifecycleConfig {
    /// Number of confirmations after which a transaction is considered confirmed.
    pub confirmations: u32,
    /// Bound on the time between obtaining a transaction id and reaching the required number of
    /// confirmations.
    pub timeout: Option<Duration>,
}

impl Default for LifecycleConfig {
    fn default() -> Self { LifecycleConfig { confirmations: DEFAULT_CONFIRMATIONS, timeout: None } }
}

/// Per-submission overrides of the controller configuration.
#[derive(Clone, Debug, Default)]
pub struct SubmitOptions {
    pub confirmations: Option<u32>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl SubmitOptions {
    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = Some(confirmations);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[display("listener#{0}")]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&TransactionRecord) + Send + Sync>;

#[derive(Default)]
struct Shared {
    record: Mutex<TransactionRecord>,
    listeners: Mutex<IndexMap<ListenerId, Listener>>,
    next_listener: AtomicU64,
}

impl Shared {
    /// Applies `f` to the record and notifies listeners with the resulting state.
    fn update(&self, f: impl FnOnce(&mut TransactionRecord)) -> TransactionRecord {
        let snapshot = {
            let mut record = self.record.lock();
            f(&mut record);
            record.clone()
        };
        self.notify(&snapshot);
        snapshot
    }

    fn notify(&self, record: &TransactionRecord) {
        // Listeners are called outside of the locks, so they may query the controller.
        let listeners = self.listeners.lock().values().cloned().collect::<Vec<_>>();
        for listener in listeners {
            listener(record);
        }
    }
}

/// Fails the record with `Cancelled` if the submitting future is dropped before it settles.
struct Flight<'a>(&'a Shared);

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if self.0.record.lock().status.is_in_flight() {
            self.0.update(|record| {
                record.status = TxStatus::Failed;
                record.error = Some(OperationError::Cancelled);
            });
        }
    }
}

struct Interrupts {
    deadline: Option<(Instant, TxId, u64)>,
    cancel: Option<CancelToken>,
}

impl Interrupts {
    async fn guard<T>(&self, fut: impl Future<Output = T>) -> Result<T, OperationError> {
        let deadline = async {
            match self.deadline {
                Some((at, tx_id, ms)) => {
                    sleep_until(at).await;
                    OperationError::Timeout(tx_id, ms)
                }
                None => future::pending().await,
            }
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = cancelled => Err(OperationError::Cancelled),
            err = deadline => Err(err),
            res = fut => Ok(res),
        }
    }
}

/// Drives a single operation at a time through its lifecycle.
///
/// Cloning the controller produces another handle to the same record and listeners.
#[derive(Clone)]
pub struct TxController {
    name: String,
    ledger: Arc<dyn LedgerClient>,
    config: LifecycleConfig,
    shared: Arc<Shared>,
}

impl Debug for TxController {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxController")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("record", &*self.shared.record.lock())
            .finish()
    }
}

impl TxController {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: LifecycleConfig) -> Self {
        Self::with_name("tx", ledger, config)
    }

    pub fn with_name(
        name: impl Into<String>,
        ledger: Arc<dyn LedgerClient>,
        config: LifecycleConfig,
    ) -> Self {
        TxController { name: name.into(), ledger, config, shared: Arc::new(Shared::default()) }
    }

    #[inline]
    pub fn name(&self) -> &str { &self.name }
    #[inline]
    pub fn config(&self) -> LifecycleConfig { self.config }

    pub fn record(&self) -> TransactionRecord { self.shared.record.lock().clone() }

    pub fn status(&self) -> TxStatus { self.shared.record.lock().status }

    pub fn is_in_flight(&self) -> bool { self.status().is_in_flight() }

    /// Registers a callback invoked with the record after each transition.
    pub fn subscribe(
        &self,
        listener: impl Fn(&TransactionRecord) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.listeners.lock().shift_remove(&id).is_some()
    }

    /// Returns the controller to `Idle`, discarding a settled record.
    ///
    /// Does nothing and returns `false` while an operation is in flight.
    pub fn reset(&self) -> bool {
        let (status, snapshot) = {
            let mut record = self.shared.record.lock();
            let status = record.status;
            if status.is_in_flight() || status == TxStatus::Idle {
                (status, None)
            } else {
                *record = TransactionRecord::default();
                (status, Some(record.clone()))
            }
        };
        if status.is_in_flight() {
            warn!("Ignoring reset of {} controller while the operation is {status}", self.name);
            return false;
        }
        if let Some(snapshot) = snapshot {
            debug!("Resetting {} controller from {status}", self.name);
            self.shared.notify(&snapshot);
        }
        true
    }

    /// Performs `submission` and tracks the resulting transaction until it is confirmed.
    ///
    /// `submission` signs and submits the transaction, returning its id. Errors are stored on the
    /// record and returned; a call made while another operation is in flight fails with
    /// [`OperationError::Busy`] leaving the record untouched.
    pub async fn submit<F, Fut>(&self, submission: F) -> Result<Receipt, OperationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TxId, LedgerError>>,
    {
        self.submit_with(SubmitOptions::default(), submission)
            .await
    }

    pub async fn submit_with<F, Fut>(
        &self,
        opts: SubmitOptions,
        submission: F,
    ) -> Result<Receipt, OperationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TxId, LedgerError>>,
    {
        let flight = self.begin()?;
        let required = opts
            .confirmations
            .unwrap_or(self.config.confirmations)
            .max(1);
        let timeout = opts.timeout.or(self.config.timeout);
        let mut interrupts = Interrupts { deadline: None, cancel: opts.cancel };

        let tx_id = match interrupts.guard(submission()).await {
            Ok(Ok(tx_id)) => tx_id,
            Ok(Err(err)) => return Err(self.fail(&flight, OperationError::SubmissionFailed(err))),
            Err(err) => return Err(self.fail(&flight, err)),
        };
        debug!("Operation of {} controller is submitted as {tx_id}", self.name);
        self.shared.update(|record| {
            record.status = TxStatus::Pending;
            record.id = Some(tx_id);
        });

        if let Some(timeout) = timeout {
            interrupts.deadline = Some((Instant::now() + timeout, tx_id, timeout.as_millis() as u64));
        }

        let mut receipt = self.wait(&flight, &interrupts, tx_id, 1).await?;
        debug!(
            "Transaction {tx_id} is included in block {} ({} confirmations)",
            receipt.block.number, receipt.confirmations
        );
        let mut seen = self
            .shared
            .update(|record| {
                record.status = TxStatus::Confirming;
                record.confirmations_seen = record.confirmations_seen.max(receipt.confirmations);
                record.receipt = Some(receipt.clone());
            })
            .confirmations_seen;

        while seen < required {
            receipt = self.wait(&flight, &interrupts, tx_id, seen + 1).await?;
            trace!("Transaction {tx_id} has {} of {required} confirmations", receipt.confirmations);
            seen = self
                .shared
                .update(|record| {
                    record.confirmations_seen = record.confirmations_seen.max(receipt.confirmations);
                    record.receipt = Some(receipt.clone());
                })
                .confirmations_seen;
        }

        debug!("Transaction {tx_id} is confirmed");
        self.shared.update(|record| record.status = TxStatus::Confirmed);
        drop(flight);
        Ok(receipt)
    }

    fn begin(&self) -> Result<Flight<'_>, OperationError> {
        let snapshot = {
            let mut record = self.shared.record.lock();
            if record.status.is_in_flight() {
                debug!(
                    "Rejecting submission to {} controller: operation is {}",
                    self.name, record.status
                );
                return Err(OperationError::Busy);
            }
            *record = TransactionRecord { status: TxStatus::Preparing, ..Default::default() };
            record.clone()
        };
        debug!("Preparing operation of {} controller", self.name);
        self.shared.notify(&snapshot);
        Ok(Flight(&self.shared))
    }

    async fn wait(
        &self,
        flight: &Flight<'_>,
        interrupts: &Interrupts,
        tx_id: TxId,
        confirmations: u32,
    ) -> Result<Receipt, OperationError> {
        trace!("Waiting for {confirmations} confirmation(s) of {tx_id}");
        let receipt = match interrupts
            .guard(self.ledger.wait_for_confirmation(tx_id, confirmations))
            .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(err)) => {
                return Err(self.fail(flight, OperationError::after_submission(tx_id, err)))
            }
            Err(err) => return Err(self.fail(flight, err)),
        };
        if !receipt.is_success() {
            let reason = receipt
                .revert_reason
                .clone()
                .unwrap_or_else(|| s!("execution reverted"));
            return Err(self.fail(flight, OperationError::Reverted(tx_id, reason)));
        }
        Ok(receipt)
    }

    fn fail(&self, _flight: &Flight<'_>, err: OperationError) -> OperationError {
        debug!("Operation of {} controller has failed: {err}", self.name);
        self.shared.update(|record| {
            record.status = TxStatus::Failed;
            record.error = Some(err.clone());
        });
        err
    }
}

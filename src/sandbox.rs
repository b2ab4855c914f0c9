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

//! Deterministic in-memory ledger.
//!
//! Used for dry runs and tests: it keeps submitted transactions, mines blocks either on demand
//! or automatically, and can be scripted to reject, revert or fail calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    BlockCallback, BlockInfo, BlockSubscription, ContractCall, CostEstimate, LedgerClient,
    LedgerError, ReadCall, Receipt, ReceiptStatus, StateValue, TxId,
};

const GENESIS_TIMESTAMP: i64 = 1_735_689_600;
const BLOCK_TIME: i64 = 12;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Display)]
#[display(lowercase)]
pub enum Mining {
    /// Transactions are included right after submission, and blocks are produced whenever a
    /// caller waits for more confirmations.
    #[default]
    Auto,
    /// Blocks are produced only by [`SandboxLedger::mine`].
    Manual,
}

/// Number of calls received by the sandbox, per ledger method.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct CallStats {
    pub submit: u64,
    pub wait: u64,
    pub estimate: u64,
    pub read: u64,
    pub block: u64,
}

impl CallStats {
    pub fn total(&self) -> u64 { self.submit + self.wait + self.estimate + self.read + self.block }
}

#[derive(Clone, Debug)]
struct SandboxTx {
    call: ContractCall,
    block: Option<u64>,
    revert_reason: Option<String>,
}

#[derive(Debug)]
struct State {
    mining: Mining,
    offline: bool,
    txs: IndexMap<TxId, SandboxTx>,
    rejections: VecDeque<LedgerError>,
    reverts: VecDeque<String>,
    estimate: Result<CostEstimate, LedgerError>,
    reads: IndexMap<ReadCall, StateValue>,
    method_reads: IndexMap<String, StateValue>,
    read_failure: Option<LedgerError>,
    submit_delay: Option<Duration>,
    calls: CallStats,
}

impl Default for State {
    fn default() -> Self {
        State {
            mining: Mining::default(),
            offline: false,
            txs: Default::default(),
            rejections: Default::default(),
            reverts: Default::default(),
            estimate: Ok(CostEstimate::new(50_000, 1u128)),
            reads: Default::default(),
            method_reads: Default::default(),
            read_failure: None,
            submit_delay: None,
            calls: CallStats::default(),
        }
    }
}

struct Inner {
    state: Mutex<State>,
    height: watch::Sender<u64>,
    subscribers: Mutex<IndexMap<u64, Arc<BlockCallback>>>,
    next_subscriber: AtomicU64,
}

/// In-memory ledger client. Clones share the same chain.
#[derive(Clone)]
pub struct SandboxLedger(Arc<Inner>);

impl Default for SandboxLedger {
    fn default() -> Self { Self::new(Mining::Auto) }
}

impl SandboxLedger {
    pub fn new(mining: Mining) -> Self {
        let (height, _) = watch::channel(0);
        SandboxLedger(Arc::new(Inner {
            state: Mutex::new(State { mining, ..Default::default() }),
            height,
            subscribers: Default::default(),
            next_subscriber: AtomicU64::new(0),
        }))
    }

    pub fn height(&self) -> u64 { *self.0.height.borrow() }

    pub fn block_info(number: u64) -> BlockInfo {
        let timestamp =
            DateTime::from_timestamp(GENESIS_TIMESTAMP + BLOCK_TIME * number as i64, 0)
                .unwrap_or_default();
        BlockInfo { number, timestamp }
    }

    pub fn set_mining(&self, mining: Mining) { self.0.state.lock().mining = mining; }

    /// Makes every ledger call fail with [`LedgerError::Connectivity`].
    pub fn set_offline(&self, offline: bool) { self.0.state.lock().offline = offline; }

    /// Makes the next submission fail with `err`. Multiple rejections are applied in order.
    pub fn reject_next(&self, err: LedgerError) { self.0.state.lock().rejections.push_back(err); }

    /// Makes the next accepted transaction revert on inclusion.
    pub fn revert_next(&self, reason: impl Into<String>) {
        self.0.state.lock().reverts.push_back(reason.into());
    }

    pub fn set_estimate(&self, estimate: Result<CostEstimate, LedgerError>) {
        self.0.state.lock().estimate = estimate;
    }

    /// Sets the value returned for an exact read call.
    pub fn set_read(&self, call: ReadCall, value: StateValue) {
        self.0.state.lock().reads.insert(call, value);
    }

    /// Sets the value returned for a method, whatever the contract and arguments are.
    pub fn set_method_read(&self, method: impl Into<String>, value: StateValue) {
        self.0
            .state
            .lock()
            .method_reads
            .insert(method.into(), value);
    }

    pub fn set_read_failure(&self, err: Option<LedgerError>) {
        self.0.state.lock().read_failure = err;
    }

    /// Delays each submission, emulating a wallet signing prompt.
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        self.0.state.lock().submit_delay = delay;
    }

    pub fn calls(&self) -> CallStats { self.0.state.lock().calls }

    /// Calls accepted by the sandbox so far, in submission order.
    pub fn submitted(&self) -> Vec<ContractCall> {
        self.0
            .state
            .lock()
            .txs
            .values()
            .map(|tx| tx.call.clone())
            .collect()
    }

    pub fn mempool_len(&self) -> usize {
        self.0
            .state
            .lock()
            .txs
            .values()
            .filter(|tx| tx.block.is_none())
            .count()
    }

    pub fn subscriber_count(&self) -> usize { self.0.subscribers.lock().len() }

    /// Produces `count` blocks; the first one includes all transactions from the mempool.
    pub fn mine(&self, count: u64) {
        for _ in 0..count {
            self.mine_block();
        }
    }

    fn mine_block(&self) -> u64 {
        let number = {
            let mut state = self.0.state.lock();
            let number = self.height() + 1;
            for tx in state.txs.values_mut().filter(|tx| tx.block.is_none()) {
                tx.block = Some(number);
            }
            self.0.height.send_replace(number);
            number
        };
        trace!("Sandbox has mined block {number}");
        let block = Self::block_info(number);
        let subscribers = self.0.subscribers.lock().values().cloned().collect::<Vec<_>>();
        for callback in subscribers {
            callback(&block);
        }
        number
    }

    fn receipt(&self, tx_id: TxId, confirmations: u32) -> Result<Option<Receipt>, LedgerError> {
        let state = self.0.state.lock();
        let tx = state
            .txs
            .get(&tx_id)
            .ok_or(LedgerError::UnknownTransaction(tx_id))?;
        let Some(block) = tx.block else {
            return Ok(None);
        };
        let seen = (self.height() - block + 1) as u32;
        if seen < confirmations {
            return Ok(None);
        }
        let units_used = state
            .estimate
            .as_ref()
            .map(|est| est.units_required)
            .unwrap_or_default();
        Ok(Some(Receipt {
            tx_id,
            status: if tx.revert_reason.is_some() {
                ReceiptStatus::Failure
            } else {
                ReceiptStatus::Success
            },
            block: Self::block_info(block),
            confirmations: seen,
            units_used,
            revert_reason: tx.revert_reason.clone(),
        }))
    }

    fn check_online(state: &State) -> Result<(), LedgerError> {
        if state.offline {
            return Err(LedgerError::Connectivity);
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for SandboxLedger {
    async fn submit(&self, call: &ContractCall) -> Result<TxId, LedgerError> {
        let delay = {
            let mut state = self.0.state.lock();
            state.calls.submit += 1;
            Self::check_online(&state)?;
            state.submit_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (tx_id, mining) = {
            let mut state = self.0.state.lock();
            if let Some(err) = state.rejections.pop_front() {
                debug!("Sandbox rejects `{}`: {err}", call.method);
                return Err(err);
            }
            let no = state.txs.len() as u64 + 1;
            let mut id = [0u8; 32];
            id[24..].copy_from_slice(&no.to_be_bytes());
            let tx_id = TxId::from(id);
            let revert_reason = state.reverts.pop_front();
            state
                .txs
                .insert(tx_id, SandboxTx { call: call.clone(), block: None, revert_reason });
            (tx_id, state.mining)
        };
        debug!("Sandbox accepts `{}` as {tx_id}", call.method);
        if mining == Mining::Auto {
            self.mine_block();
        }
        Ok(tx_id)
    }

    async fn wait_for_confirmation(
        &self,
        tx_id: TxId,
        confirmations: u32,
    ) -> Result<Receipt, LedgerError> {
        let mut height = {
            let mut state = self.0.state.lock();
            state.calls.wait += 1;
            Self::check_online(&state)?;
            self.0.height.subscribe()
        };
        loop {
            if let Some(receipt) = self.receipt(tx_id, confirmations)? {
                return Ok(receipt);
            }
            if self.0.state.lock().mining == Mining::Auto {
                self.mine_block();
                continue;
            }
            height
                .changed()
                .await
                .map_err(|_| LedgerError::Connectivity)?;
        }
    }

    async fn estimate_cost(&self, call: &ContractCall) -> Result<CostEstimate, LedgerError> {
        let mut state = self.0.state.lock();
        state.calls.estimate += 1;
        Self::check_online(&state)?;
        trace!("Sandbox estimates `{}`", call.method);
        state.estimate.clone()
    }

    async fn read(&self, call: &ReadCall) -> Result<StateValue, LedgerError> {
        let mut state = self.0.state.lock();
        state.calls.read += 1;
        Self::check_online(&state)?;
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        state
            .reads
            .get(call)
            .or_else(|| state.method_reads.get(&call.method))
            .cloned()
            .ok_or_else(|| {
                let msg = format!("contract method `{}` is not available", call.method);
                LedgerError::ServerSide(msg)
            })
    }

    async fn block(&self) -> Result<BlockInfo, LedgerError> {
        let mut state = self.0.state.lock();
        state.calls.block += 1;
        Self::check_online(&state)?;
        Ok(Self::block_info(self.height()))
    }

    fn subscribe_to_blocks(&self, callback: BlockCallback) -> BlockSubscription {
        let id = self.0.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.0
            .subscribers
            .lock()
            .insert(id, Arc::new(callback));
        let inner = Arc::downgrade(&self.0);
        BlockSubscription::with(move || {
            if let Some(inner) = inner.upgrade() {
                inner.subscribers.lock().shift_remove(&id);
            }
        })
    }
}

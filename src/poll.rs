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

//! Periodic refresh of read-only state.
//!
//! Fetches are scheduled at a fixed period measured from the start of each cycle. A fetch taking
//! longer than the period makes the poller skip the boundaries it has missed and continue with the
//! next one, so there is never more than one fetch running.

use std::fmt::Display;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::{BlockSubscription, LedgerClient, LedgerError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PollOptions {
    pub interval: Duration,
    pub enabled: bool,
    pub paused: bool,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions { interval: DEFAULT_POLL_INTERVAL, enabled: true, paused: false }
    }
}

impl PollOptions {
    pub fn with_interval(interval: Duration) -> Self {
        PollOptions { interval, ..Default::default() }
    }
}

/// Most recent polling results.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PollState<T, E = LedgerError> {
    /// Value of the last successful fetch; kept while subsequent fetches fail.
    pub value: Option<T>,
    /// Error of the last fetch, cleared by a successful one.
    pub error: Option<E>,
    pub in_flight: bool,
    /// Number of completed fetches, failed ones included.
    pub fetches: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T, E> Default for PollState<T, E> {
    fn default() -> Self {
        PollState { value: None, error: None, in_flight: false, fetches: 0, updated_at: None }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
struct Control {
    enabled: bool,
    paused: bool,
    /// Incremented each time polling becomes active again.
    epoch: u64,
}

impl Control {
    fn is_active(&self) -> bool { self.enabled && !self.paused }
}

/// Cloneable control handle of a running poller.
pub struct PollerHandle<T, E = LedgerError> {
    control: Arc<watch::Sender<Control>>,
    state: watch::Receiver<PollState<T, E>>,
    refetch: Arc<Notify>,
    blocks: Arc<Notify>,
}

impl<T, E> Clone for PollerHandle<T, E> {
    fn clone(&self) -> Self {
        PollerHandle {
            control: self.control.clone(),
            state: self.state.clone(),
            refetch: self.refetch.clone(),
            blocks: self.blocks.clone(),
        }
    }
}

impl<T: Clone, E: Clone> PollerHandle<T, E> {
    /// Stops periodic fetching, keeping the fetched data. Does nothing if already paused.
    pub fn pause(&self) {
        let paused = self
            .control
            .send_if_modified(|control| !std::mem::replace(&mut control.paused, true));
        if paused {
            debug!("Polling is paused");
        }
    }

    /// Restarts periodic fetching with an immediate fetch. Does nothing if not paused.
    pub fn resume(&self) {
        let resumed = self.control.send_if_modified(|control| {
            if !control.paused {
                return false;
            }
            control.paused = false;
            control.epoch += 1;
            true
        });
        if resumed {
            debug!("Polling is resumed");
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.control.send_if_modified(|control| {
            if control.enabled == enabled {
                return false;
            }
            control.enabled = enabled;
            if enabled {
                control.epoch += 1;
            }
            true
        });
    }

    pub fn is_paused(&self) -> bool { self.control.borrow().paused }

    pub fn is_active(&self) -> bool { self.control.borrow().is_active() }

    /// Requests an immediate fetch, regardless of whether polling is paused.
    pub fn refetch(&self) { self.refetch.notify_one(); }

    pub fn snapshot(&self) -> PollState<T, E> { self.state.borrow().clone() }

    pub fn value(&self) -> Option<T> { self.state.borrow().value.clone() }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T, E>> { self.state.clone() }

    /// Requests a fetch on each new block reported by the ledger, until the returned subscription
    /// is dropped. Blocks arriving while the poller is paused or disabled are ignored.
    pub fn refetch_on_blocks(&self, ledger: &dyn LedgerClient) -> BlockSubscription {
        let control = self.control.clone();
        let blocks = self.blocks.clone();
        ledger.subscribe_to_blocks(Box::new(move |block| {
            if !control.borrow().is_active() {
                return;
            }
            trace!("Block {} triggers refetch", block.number);
            blocks.notify_one();
        }))
    }
}

/// Background task refreshing a value; stops when dropped.
pub struct Poller<T, E = LedgerError> {
    handle: PollerHandle<T, E>,
    task: JoinHandle<()>,
}

impl<T, E> Deref for Poller<T, E> {
    type Target = PollerHandle<T, E>;
    #[inline]
    fn deref(&self) -> &Self::Target { &self.handle }
}

impl<T, E> Drop for Poller<T, E> {
    fn drop(&mut self) { self.task.abort(); }
}

impl<T, E> Poller<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Display + Send + Sync + 'static,
{
    /// Spawns polling task on the current tokio runtime.
    pub fn spawn<F, Fut>(fetcher: F, opts: PollOptions) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (control, control_rx) =
            watch::channel(Control { enabled: opts.enabled, paused: opts.paused, epoch: 0 });
        let (state, state_rx) = watch::channel(PollState::default());
        let refetch = Arc::new(Notify::new());
        let blocks = Arc::new(Notify::new());
        let worker = Worker { fetcher, state };
        let task = tokio::spawn(worker.run(
            control_rx,
            refetch.clone(),
            blocks.clone(),
            opts.interval,
        ));
        Poller {
            handle: PollerHandle { control: Arc::new(control), state: state_rx, refetch, blocks },
            task,
        }
    }

    pub fn handle(&self) -> PollerHandle<T, E> { self.handle.clone() }

    pub fn is_finished(&self) -> bool { self.task.is_finished() }

    /// Stops the task. No fetch starts after this call.
    pub fn shutdown(self) { drop(self) }
}

enum Event {
    Control,
    Fetch,
    Closed,
}

struct Worker<F, T, E> {
    fetcher: F,
    state: watch::Sender<PollState<T, E>>,
}

impl<F, Fut, T, E> Worker<F, T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    async fn run(
        mut self,
        mut control: watch::Receiver<Control>,
        refetch: Arc<Notify>,
        blocks: Arc<Notify>,
        period: Duration,
    ) {
        loop {
            let current = *control.borrow_and_update();
            if !current.is_active() {
                let event = tokio::select! {
                    biased;
                    res = control.changed() => {
                        if res.is_ok() { Event::Control } else { Event::Closed }
                    }
                    _ = refetch.notified() => Event::Fetch,
                };
                match event {
                    Event::Closed => return,
                    Event::Fetch => self.fetch().await,
                    Event::Control => {}
                }
                continue;
            }

            // the first tick completes immediately
            let mut ticker = time::interval(period.max(MIN_POLL_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // control changes win over due ticks, so no fetch starts after pause() returns
                let event = tokio::select! {
                    biased;
                    res = control.changed() => {
                        if res.is_ok() { Event::Control } else { Event::Closed }
                    }
                    _ = refetch.notified() => Event::Fetch,
                    _ = blocks.notified() => Event::Fetch,
                    _ = ticker.tick() => Event::Fetch,
                };
                match event {
                    Event::Closed => return,
                    Event::Fetch => self.fetch().await,
                    Event::Control => {
                        let next = *control.borrow_and_update();
                        if !next.is_active() || next.epoch != current.epoch {
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn fetch(&mut self) {
        self.state.send_modify(|state| state.in_flight = true);
        let res = (self.fetcher)().await;
        self.state.send_modify(|state| {
            state.in_flight = false;
            state.fetches += 1;
            match res {
                Ok(value) => {
                    state.value = Some(value);
                    state.error = None;
                    state.updated_at = Some(Utc::now());
                }
                Err(err) => {
                    warn!("Polling fetch has failed: {err}");
                    state.error = Some(err);
                }
            }
        });
    }
}

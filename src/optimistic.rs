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

use std::future::Future;

use tokio::sync::{watch, Mutex};

use crate::OperationError;

/// Speculative overlay on top of the last authoritative read.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OptimisticView<T> {
    authoritative: T,
    speculative: Option<T>,
    revision: u64,
}

impl<T> OptimisticView<T> {
    pub fn new(authoritative: T) -> Self {
        OptimisticView { authoritative, speculative: None, revision: 0 }
    }

    #[inline]
    pub fn authoritative(&self) -> &T { &self.authoritative }
    #[inline]
    pub fn speculative(&self) -> Option<&T> { self.speculative.as_ref() }

    /// Value to present: the speculative one while a mutation is in flight.
    #[inline]
    pub fn effective(&self) -> &T { self.speculative.as_ref().unwrap_or(&self.authoritative) }

    #[inline]
    pub fn is_pending(&self) -> bool { self.speculative.is_some() }
}

type ApplyFn<T, A> = Box<dyn Fn(&T, &A) -> T + Send + Sync>;
type ErrorFn<T, E> = Box<dyn Fn(&E, &T) + Send + Sync>;

/// Applies mutations to a local view before the ledger confirms them.
///
/// Mutations are serialized: each one waits for the previous to settle, so it always starts from
/// a view without a speculative value. Authoritative updates may arrive at any time.
pub struct Reconciler<T, A, E = OperationError> {
    apply: ApplyFn<T, A>,
    on_error: Option<ErrorFn<T, E>>,
    view: watch::Sender<OptimisticView<T>>,
    queue: Mutex<()>,
}

impl<T, A, E> Reconciler<T, A, E>
where T: Clone + Send + Sync
{
    pub fn new(initial: T, apply: impl Fn(&T, &A) -> T + Send + Sync + 'static) -> Self {
        let (view, _) = watch::channel(OptimisticView::new(initial));
        Reconciler { apply: Box::new(apply), on_error: None, view, queue: Mutex::new(()) }
    }

    /// Sets callback invoked with the error and the restored value whenever a mutation fails.
    pub fn on_error(mut self, callback: impl Fn(&E, &T) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn view(&self) -> OptimisticView<T> { self.view.borrow().clone() }

    pub fn effective(&self) -> T { self.view.borrow().effective().clone() }

    pub fn authoritative(&self) -> T { self.view.borrow().authoritative.clone() }

    pub fn is_pending(&self) -> bool { self.view.borrow().is_pending() }

    pub fn subscribe(&self) -> watch::Receiver<OptimisticView<T>> { self.view.subscribe() }

    /// Replaces the authoritative value with a fresh read.
    pub fn set_authoritative(&self, value: T) {
        self.view.send_modify(|view| {
            view.authoritative = value;
            view.revision += 1;
        });
    }

    /// Publishes `apply(effective, action)` immediately and awaits `operation`.
    ///
    /// On success the speculative value is dropped and the authoritative value is left for the
    /// next refresh to update. On failure the view returns to the value it had before the mutation,
    /// unless a fresher authoritative value has arrived meanwhile.
    pub async fn mutate<R>(
        &self,
        action: A,
        operation: impl Future<Output = Result<R, E>>,
    ) -> Result<R, E> {
        let _turn = self.queue.lock().await;

        let (previous, revision) = {
            let view = self.view.borrow();
            (view.effective().clone(), view.revision)
        };
        let speculative = (self.apply)(&previous, &action);
        self.view
            .send_modify(|view| view.speculative = Some(speculative));
        trace!("Published speculative value; awaiting mutation");

        let mut mutation = Mutation { view: &self.view, previous, revision, settled: false };
        match operation.await {
            Ok(res) => {
                mutation.commit();
                Ok(res)
            }
            Err(err) => {
                let restored = mutation.rollback();
                if let Some(callback) = &self.on_error {
                    callback(&err, &restored);
                }
                Err(err)
            }
        }
    }
}

/// Clears the speculative value exactly once; rolls back if dropped unsettled.
struct Mutation<'a, T> {
    view: &'a watch::Sender<OptimisticView<T>>,
    previous: T,
    revision: u64,
    settled: bool,
}

impl<T: Clone> Mutation<'_, T> {
    fn commit(&mut self) {
        self.settled = true;
        self.view.send_modify(|view| view.speculative = None);
        trace!("Mutation succeeded; speculative value cleared");
    }

    fn rollback(&mut self) -> T {
        self.settled = true;
        let revision = self.revision;
        let previous = self.previous.clone();
        let mut restored = previous.clone();
        self.view.send_modify(|view| {
            view.speculative = None;
            if view.revision == revision {
                view.authoritative = previous;
            } else {
                restored = view.authoritative.clone();
            }
        });
        debug!("Mutation failed; optimistic value rolled back");
        restored
    }
}

impl<T> Drop for Mutation<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            let revision = self.revision;
            self.view.send_modify(|view| {
                view.speculative = None;
                if view.revision == revision {
                    std::mem::swap(&mut view.authoritative, &mut self.previous);
                }
            });
        }
    }
}

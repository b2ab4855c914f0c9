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

use tokio::sync::watch;

/// Cooperative cancellation signal shared between the party requesting an operation and the
/// suspension points serving it.
///
/// Cloned tokens observe the same signal. Once cancelled, a token stays cancelled.
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<watch::Sender<bool>>);

impl Default for CancelToken {
    fn default() -> Self { Self::new() }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        CancelToken(Arc::new(sender))
    }

    pub fn cancel(&self) { self.0.send_replace(true); }

    pub fn is_cancelled(&self) -> bool { *self.0.borrow() }

    /// Completes once the token gets cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.0.subscribe();
        // The sender is owned by `self`, so the channel can't be closed while we wait.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

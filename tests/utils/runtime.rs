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

use std::ops::Deref;
use std::sync::Arc;

use guestbook::{
    Guestbook, GuestbookConfig, Mining, OperationKind, SandboxLedger, StaticSession, TxController,
    TxStatus,
};

use super::{alice, chain, fee, Recorder};

/// Guestbook façade bound to a sandbox ledger and a session connected as Alice.
pub struct TestGuestbook {
    gb: Guestbook,
    pub ledger: SandboxLedger,
    pub session: Arc<StaticSession>,
}

impl Deref for TestGuestbook {
    type Target = Guestbook;
    fn deref(&self) -> &Self::Target { &self.gb }
}

impl TestGuestbook {
    pub fn new(mining: Mining) -> Self { Self::with_config(Self::config(), mining) }

    pub fn config() -> GuestbookConfig {
        GuestbookConfig { chain: chain(), signature_fee: fee(), ..Default::default() }
    }

    pub fn with_config(config: GuestbookConfig, mining: Mining) -> Self {
        let ledger = SandboxLedger::new(mining);
        let session = Arc::new(StaticSession::connected(alice(), chain()));
        let gb = Guestbook::new(config, Arc::new(ledger.clone()), session.clone());
        TestGuestbook { gb, ledger, session }
    }

    pub fn record_transitions(&self, kind: OperationKind) -> Recorder {
        let recorder = Recorder::default();
        self.subscribe(kind, recorder.listener());
        recorder
    }
}

/// Yields to other tasks until the controller reaches `status`.
pub async fn wait_status(controller: &TxController, status: TxStatus) {
    for _ in 0..1000 {
        if controller.status() == status {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("controller has not reached {status}, staying {}", controller.status());
}

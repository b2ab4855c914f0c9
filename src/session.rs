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

use parking_lot::RwLock;

use crate::{Address, ChainId};

/// Wallet session provider: the account currently connected and the chain it operates on.
///
/// Signing and submission capability of the connected wallet is exposed through
/// [`crate::LedgerClient::submit`].
pub trait Session: Send + Sync {
    fn account(&self) -> Option<Address>;
    fn chain(&self) -> ChainId;

    fn is_connected(&self) -> bool { self.account().is_some() }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
struct SessionState {
    account: Option<Address>,
    chain: ChainId,
}

/// Session with an externally managed connection state.
#[derive(Debug, Default)]
pub struct StaticSession(RwLock<SessionState>);

impl StaticSession {
    pub fn disconnected(chain: ChainId) -> Self {
        StaticSession(RwLock::new(SessionState { account: None, chain }))
    }

    pub fn connected(account: Address, chain: ChainId) -> Self {
        StaticSession(RwLock::new(SessionState { account: Some(account), chain }))
    }

    pub fn connect(&self, account: Address) {
        debug!("Wallet session connected as {account}");
        self.0.write().account = Some(account);
    }

    pub fn disconnect(&self) {
        debug!("Wallet session disconnected");
        self.0.write().account = None;
    }

    pub fn switch_chain(&self, chain: ChainId) {
        debug!("Wallet session switched to chain {chain}");
        self.0.write().chain = chain;
    }
}

impl Session for StaticSession {
    fn account(&self) -> Option<Address> { self.0.read().account }
    fn chain(&self) -> ChainId { self.0.read().chain }
}

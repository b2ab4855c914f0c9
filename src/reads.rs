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

use chrono::{DateTime, Utc};

use crate::{Address, CallArg, Contracts, LedgerClient, LedgerError, ReadCall, StateValue};

/// Guestbook activity of an account, as computed by the contracts.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct ProfileStats {
    pub points: u128,
    pub signatures_given: u64,
    pub signatures_received: u64,
    pub streak: u64,
}

/// Signature left in a guestbook.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct Signature {
    pub signer: Address,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: u64,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct LeaderboardEntry {
    pub account: Address,
    pub points: u128,
}

fn protocol(method: &str, expected: &str, value: &StateValue) -> LedgerError {
    LedgerError::Protocol(format!("`{method}` returned {value:?} while {expected} was expected"))
}

fn uint(method: &str, value: &StateValue) -> Result<u128, LedgerError> {
    value
        .as_uint()
        .ok_or_else(|| protocol(method, "an integer", value))
}

fn uint64(method: &str, value: &StateValue) -> Result<u64, LedgerError> {
    u64::try_from(uint(method, value)?).map_err(|_| protocol(method, "a 64-bit integer", value))
}

fn list<'v>(
    method: &str,
    value: &'v StateValue,
    len: Option<usize>,
) -> Result<&'v [StateValue], LedgerError> {
    match (value.as_list(), len) {
        (Some(items), Some(len)) if items.len() == len => Ok(items),
        (Some(items), None) => Ok(items),
        _ => Err(protocol(method, "a list", value)),
    }
}

/// Typed read-only queries of the guestbook contracts.
#[derive(Clone)]
pub struct Reader {
    ledger: Arc<dyn LedgerClient>,
    contracts: Contracts,
}

impl Reader {
    pub fn new(ledger: Arc<dyn LedgerClient>, contracts: Contracts) -> Self {
        Reader { ledger, contracts }
    }

    #[inline]
    pub fn contracts(&self) -> &Contracts { &self.contracts }

    async fn read(
        &self,
        contract: Address,
        method: &str,
        args: Vec<CallArg>,
    ) -> Result<StateValue, LedgerError> {
        trace!("Reading `{method}` from {contract}");
        self.ledger
            .read(&ReadCall::new(contract, method, args))
            .await
    }

    pub async fn profile(&self, account: Address) -> Result<ProfileStats, LedgerError> {
        const METHOD: &str = "getProfile";
        let value = self
            .read(self.contracts.guestbook, METHOD, vec![CallArg::Address(account)])
            .await?;
        let items = list(METHOD, &value, Some(4))?;
        Ok(ProfileStats {
            points: uint(METHOD, &items[0])?,
            signatures_given: uint64(METHOD, &items[1])?,
            signatures_received: uint64(METHOD, &items[2])?,
            streak: uint64(METHOD, &items[3])?,
        })
    }

    pub async fn signature_count(&self, owner: Address) -> Result<u64, LedgerError> {
        const METHOD: &str = "getSignatureCount";
        let value = self
            .read(self.contracts.guestbook, METHOD, vec![CallArg::Address(owner)])
            .await?;
        uint64(METHOD, &value)
    }

    pub async fn signature(&self, owner: Address, index: u64) -> Result<Signature, LedgerError> {
        const METHOD: &str = "getSignature";
        let value = self
            .read(self.contracts.guestbook, METHOD, vec![
                CallArg::Address(owner),
                CallArg::Uint(index as u128),
            ])
            .await?;
        let items = list(METHOD, &value, Some(4))?;
        let signer = items[0]
            .as_address()
            .ok_or_else(|| protocol(METHOD, "an address", &items[0]))?;
        let StateValue::Text(message) = &items[1] else {
            return Err(protocol(METHOD, "a text", &items[1]));
        };
        let secs = i64::try_from(uint(METHOD, &items[2])?)
            .map_err(|_| protocol(METHOD, "a timestamp", &items[2]))?;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| protocol(METHOD, "a timestamp", &items[2]))?;
        Ok(Signature {
            signer,
            message: message.clone(),
            timestamp,
            reactions: uint64(METHOD, &items[3])?,
        })
    }

    pub async fn reaction_count(&self, owner: Address, index: u64) -> Result<u64, LedgerError> {
        const METHOD: &str = "getReactionCount";
        let value = self
            .read(self.contracts.guestbook, METHOD, vec![
                CallArg::Address(owner),
                CallArg::Uint(index as u128),
            ])
            .await?;
        uint64(METHOD, &value)
    }

    pub async fn has_reacted(
        &self,
        owner: Address,
        index: u64,
        account: Address,
    ) -> Result<bool, LedgerError> {
        const METHOD: &str = "hasReacted";
        let value = self
            .read(self.contracts.guestbook, METHOD, vec![
                CallArg::Address(owner),
                CallArg::Uint(index as u128),
                CallArg::Address(account),
            ])
            .await?;
        value
            .as_bool()
            .ok_or_else(|| protocol(METHOD, "a boolean", &value))
    }

    /// Index of the signature pinned by the guestbook owner, if any.
    pub async fn pinned_signature(&self, owner: Address) -> Result<Option<u64>, LedgerError> {
        const METHOD: &str = "getPinnedSignature";
        let value = self
            .read(self.contracts.guestbook, METHOD, vec![CallArg::Address(owner)])
            .await?;
        if value.is_empty() {
            return Ok(None);
        }
        uint64(METHOD, &value).map(Some)
    }

    pub async fn leaderboard(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        const METHOD: &str = "getLeaderboard";
        let value = self
            .read(self.contracts.leaderboard, METHOD, vec![
                CallArg::Uint(offset as u128),
                CallArg::Uint(limit as u128),
            ])
            .await?;
        list(METHOD, &value, None)?
            .iter()
            .map(|entry| {
                let pair = list(METHOD, entry, Some(2))?;
                let account = pair[0]
                    .as_address()
                    .ok_or_else(|| protocol(METHOD, "an address", &pair[0]))?;
                Ok(LeaderboardEntry { account, points: uint(METHOD, &pair[1])? })
            })
            .collect()
    }

    /// Identifiers of the badges owned by an account.
    pub async fn badges(&self, account: Address) -> Result<Vec<u64>, LedgerError> {
        const METHOD: &str = "getBadges";
        let value = self
            .read(self.contracts.badges, METHOD, vec![CallArg::Address(account)])
            .await?;
        list(METHOD, &value, None)?
            .iter()
            .map(|id| uint64(METHOD, id))
            .collect()
    }
}

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

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::ValueHint;
use guestbook::{
    Address, ChainId, Guestbook, GuestbookConfig, Mining, OperationKind, SandboxLedger,
    StaticSession, SubmitOptions,
};

use crate::Cmd;

pub const GUESTBOOK_CONFIG_ENV: &str = "GUESTBOOK_CONFIG";
pub const GUESTBOOK_ACCOUNT_ENV: &str = "GUESTBOOK_ACCOUNT";
pub const GUESTBOOK_CHAIN_ENV: &str = "GUESTBOOK_CHAIN";

#[cfg(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
pub const GUESTBOOK_CONFIG: &str = "~/.guestbook/config.toml";
#[cfg(target_os = "macos")]
pub const GUESTBOOK_CONFIG: &str = "~/Library/Application Support/Guestbook/config.toml";
#[cfg(target_os = "windows")]
pub const GUESTBOOK_CONFIG: &str = "~\\AppData\\Local\\Guestbook\\config.toml";
#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "macos",
    target_os = "windows"
)))]
pub const GUESTBOOK_CONFIG: &str = "guestbook.toml";

/// Command-line wallet for on-chain guestbooks.
///
/// Operations are executed against an in-memory sandbox ledger, which makes the tool suitable for
/// rehearsing transaction flows and checking validation rules.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Set verbosity level.
    ///
    /// Can be used multiple times to increase verbosity.
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file in TOML or YAML format
    #[clap(
        short,
        long,
        global = true,
        default_value = GUESTBOOK_CONFIG,
        env = GUESTBOOK_CONFIG_ENV,
        value_hint = ValueHint::FilePath
    )]
    pub config: PathBuf,

    /// Account of the connected wallet; operations fail if none is given
    #[clap(short, long, global = true, env = GUESTBOOK_ACCOUNT_ENV)]
    pub account: Option<Address>,

    /// Chain the wallet is connected to; defaults to the configured one
    #[clap(long, global = true, env = GUESTBOOK_CHAIN_ENV)]
    pub chain: Option<ChainId>,

    /// Number of confirmations to wait for, overriding the configuration
    #[clap(long, global = true)]
    pub confirmations: Option<u32>,

    /// Produce sandbox blocks every given number of seconds, instead of on each submission
    #[clap(long, global = true, value_name = "SECS")]
    pub block_time: Option<u64>,

    /// Print results as JSON
    #[clap(long, global = true)]
    pub json: bool,

    /// Command to execute
    #[clap(subcommand)]
    pub command: Cmd,
}

impl Args {
    pub fn config_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.config.display().to_string()).to_string())
    }

    /// Reads the configuration file, falling back to the defaults if it doesn't exist.
    pub fn load_config(&self) -> anyhow::Result<GuestbookConfig> {
        let path = self.config_path();
        if !path.exists() {
            info!("No configuration file at '{}'; using defaults", path.display());
            return Ok(GuestbookConfig::default());
        }
        GuestbookConfig::load(&path)
            .with_context(|| format!("Unable to load configuration from '{}'", path.display()))
    }

    pub fn mining(&self) -> Mining {
        match self.block_time {
            Some(_) => Mining::Manual,
            None => Mining::Auto,
        }
    }

    pub fn block_time(&self) -> Option<Duration> {
        self.block_time.map(|secs| Duration::from_secs(secs.max(1)))
    }

    pub fn submit_options(&self) -> SubmitOptions {
        let opts = SubmitOptions::default();
        match self.confirmations {
            Some(confirmations) => opts.with_confirmations(confirmations),
            None => opts,
        }
    }

    /// Builds the guestbook façade over a fresh sandbox ledger, printing each transaction
    /// transition to `stderr`.
    pub fn guestbook(&self, config: GuestbookConfig) -> (Guestbook, SandboxLedger) {
        let chain = self.chain.unwrap_or(config.chain);
        let session = match self.account {
            Some(account) => StaticSession::connected(account, chain),
            None => StaticSession::disconnected(chain),
        };
        let ledger = SandboxLedger::new(self.mining());
        let gb = Guestbook::new(config, Arc::new(ledger.clone()), Arc::new(session));
        for kind in OperationKind::ALL {
            gb.subscribe(kind, move |record| match record.id() {
                Some(tx_id) if record.confirmations_seen() > 0 => eprintln!(
                    "{kind}: {} {tx_id} ({} confirmations)",
                    record.status(),
                    record.confirmations_seen()
                ),
                Some(tx_id) => eprintln!("{kind}: {} {tx_id}", record.status()),
                None => eprintln!("{kind}: {}", record.status()),
            });
        }
        (gb, ledger)
    }
}

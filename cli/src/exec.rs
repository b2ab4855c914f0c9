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

use anyhow::Context;
use guestbook::{
    GuestbookConfig, LedgerClient, OperationError, Payload, PollOptions, Poller, Receipt,
    Reconciler, SandboxLedger,
};
use tokio::task::JoinHandle;

use crate::args::Args;
use crate::cmd::Cmd;

impl Args {
    pub async fn exec(&self) -> anyhow::Result<()> {
        let config = self.load_config()?;
        if let Cmd::Config { save } = &self.command {
            return self.exec_config(&config, *save);
        }

        let (gb, ledger) = self.guestbook(config);
        let miner = self.spawn_miner(&ledger);
        let opts = self.submit_options();

        match &self.command {
            Cmd::Sign { target, message, referrer: None } => {
                let payload = Payload::Sign { target: *target, message: message.clone() };
                let receipt = gb.execute_with(payload, opts).await?;
                self.print_receipt(&receipt)?;
            }

            Cmd::Sign { target, message, referrer: Some(referrer) } => {
                let payload = Payload::SignWithReferral {
                    target: *target,
                    message: message.clone(),
                    referrer: *referrer,
                };
                let receipt = gb.execute_with(payload, opts).await?;
                self.print_receipt(&receipt)?;
            }

            Cmd::BatchSign { targets, messages } => {
                let outcome = gb
                    .batch_sign_with(targets.clone(), messages.clone(), opts)
                    .await?;
                eprintln!(
                    "Signed {} guestbooks in {} carrying {}",
                    outcome.count, outcome.tx_id, outcome.value
                );
                self.print_receipt(&outcome.receipt)?;
            }

            Cmd::React { owner, index } | Cmd::Unreact { owner, index } => {
                let add = matches!(self.command, Cmd::React { .. });
                let initial = match gb.reader().reaction_count(*owner, *index).await {
                    Ok(count) => count,
                    Err(err) => {
                        warn!("Unable to read reaction count: {err}");
                        0
                    }
                };
                let reactions = Reconciler::new(initial, |count: &u64, add: &bool| {
                    if *add {
                        count + 1
                    } else {
                        count.saturating_sub(1)
                    }
                })
                .on_error(|err: &OperationError, restored: &u64| {
                    eprintln!("Reaction count is restored to {restored}: {err}")
                });
                let payload = if add {
                    Payload::React { owner: *owner, index: *index }
                } else {
                    Payload::Unreact { owner: *owner, index: *index }
                };
                let receipt = reactions
                    .mutate(add, async {
                        eprintln!("Reactions: {} (pending)", reactions.effective());
                        gb.execute_with(payload, opts).await
                    })
                    .await?;
                self.print_receipt(&receipt)?;
            }

            Cmd::Edit { owner, index, message } => {
                let payload =
                    Payload::EditSignature { owner: *owner, index: *index, message: message.clone() };
                let receipt = gb.execute_with(payload, opts).await?;
                self.print_receipt(&receipt)?;
            }

            Cmd::Pin { index } => {
                let receipt = gb
                    .execute_with(Payload::PinSignature { index: *index }, opts)
                    .await?;
                self.print_receipt(&receipt)?;
            }

            Cmd::Unpin => {
                let receipt = gb.execute_with(Payload::UnpinSignature, opts).await?;
                self.print_receipt(&receipt)?;
            }

            Cmd::Tip { recipient, amount } => {
                let payload = Payload::Tip { recipient: *recipient, amount: *amount };
                let receipt = gb.execute_with(payload, opts).await?;
                self.print_receipt(&receipt)?;
            }

            Cmd::Estimate { target, message } => {
                let operation =
                    gb.prepare(Payload::Sign { target: *target, message: message.clone() })?;
                let estimate = gb.estimate(&operation).await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&estimate)?);
                } else {
                    println!("Fee:   {estimate}");
                    println!(
                        "Total: {} including signature fee of {}",
                        estimate.total_with_value(operation.required_value()),
                        operation.required_value()
                    );
                }
            }

            Cmd::Watch { blocks } => self.exec_watch(&ledger, gb.config(), *blocks).await?,

            Cmd::Config { .. } => unreachable!("processed above"),
        }

        if let Some(miner) = miner {
            miner.abort();
        }
        Ok(())
    }

    fn exec_config(&self, config: &GuestbookConfig, save: bool) -> anyhow::Result<()> {
        if save {
            let path = self.config_path();
            config
                .store(&path)
                .with_context(|| format!("Unable to save configuration to '{}'", path.display()))?;
            eprintln!("Configuration is saved to '{}'", path.display());
        }
        if self.json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            print!("{}", serde_yaml::to_string(config)?);
        }
        Ok(())
    }

    async fn exec_watch(
        &self,
        ledger: &SandboxLedger,
        config: &GuestbookConfig,
        blocks: u64,
    ) -> anyhow::Result<()> {
        let poller = Poller::spawn(
            {
                let ledger = ledger.clone();
                move || {
                    let ledger = ledger.clone();
                    async move { ledger.block().await }
                }
            },
            PollOptions::with_interval(config.poll_interval()),
        );
        let _subscription = poller.refetch_on_blocks(ledger);
        let mut state = poller.subscribe();

        let target = ledger.height() + blocks;
        let mut last = None;
        while last.map(|number| number < target).unwrap_or(true) {
            if self.block_time.is_none() {
                ledger.mine(1);
            }
            let block = state
                .wait_for(|state| {
                    let number = state.value.as_ref().map(|block| block.number);
                    number.is_some() && number != last
                })
                .await?
                .value;
            let Some(block) = block else { continue };
            last = Some(block.number);
            if self.json {
                println!("{}", serde_json::to_string(&block)?);
            } else {
                println!("Block {} at {}", block.number, block.timestamp);
            }
        }
        poller.shutdown();
        Ok(())
    }

    fn spawn_miner(&self, ledger: &SandboxLedger) -> Option<JoinHandle<()>> {
        let block_time = self.block_time()?;
        let ledger = ledger.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(block_time);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                ledger.mine(1);
            }
        }))
    }

    fn print_receipt(&self, receipt: &Receipt) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(receipt)?);
        } else {
            println!(
                "{} is confirmed in block {} ({} confirmations, {} units used)",
                receipt.tx_id, receipt.block.number, receipt.confirmations, receipt.units_used
            );
        }
        Ok(())
    }
}

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

use guestbook::{Address, Amount};

#[derive(Subcommand, Clone, PartialEq, Eq, Debug, Display)]
#[display(lowercase)]
pub enum Cmd {
    /// Sign someone's guestbook, paying the signature fee
    Sign {
        /// Owner of the guestbook to sign
        target: Address,

        /// Message to leave
        message: String,

        /// Account which has referred the signer
        #[clap(short, long)]
        referrer: Option<Address>,
    },

    /// Sign several guestbooks with a single transaction
    #[display("batch-sign")]
    BatchSign {
        /// Guestbook owners; give the option once per signature
        #[clap(short, long = "to", required = true)]
        targets: Vec<Address>,

        /// Messages, in the same order as the guestbook owners
        #[clap(short, long = "message", required = true)]
        messages: Vec<String>,
    },

    /// React to a signature
    React {
        /// Owner of the guestbook holding the signature
        owner: Address,

        /// Index of the signature in the guestbook
        index: u64,
    },

    /// Withdraw a reaction from a signature
    Unreact {
        /// Owner of the guestbook holding the signature
        owner: Address,

        /// Index of the signature in the guestbook
        index: u64,
    },

    /// Replace the message of a signature left earlier
    Edit {
        /// Owner of the guestbook holding the signature
        owner: Address,

        /// Index of the signature in the guestbook
        index: u64,

        /// New message
        message: String,
    },

    /// Pin a signature at the top of the own guestbook
    Pin {
        /// Index of the signature to pin
        index: u64,
    },

    /// Remove the pinned signature from the own guestbook
    Unpin,

    /// Send a tip to a guestbook owner
    Tip {
        /// Recipient of the tip
        recipient: Address,

        /// Amount, in base units of the native currency
        amount: Amount,
    },

    /// Estimate the cost of signing a guestbook, without submitting anything
    Estimate {
        /// Owner of the guestbook to sign
        target: Address,

        /// Message to leave
        message: String,
    },

    /// Follow the ledger head for a number of blocks
    Watch {
        /// Number of blocks to wait for
        #[clap(short, long, default_value = "3")]
        blocks: u64,
    },

    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the configuration file
        #[clap(long)]
        save: bool,
    },
}

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

use std::time::Duration;

#[cfg(feature = "fs")]
use std::{fs, io, path::Path};

#[cfg(feature = "fs")]
use amplify::IoError;

use crate::{
    Address, Amount, ChainId, LifecycleConfig, OperationPolicy, DEFAULT_CONFIRMATIONS,
    DEFAULT_POLL_INTERVAL, MAX_BATCH_SIZE, MAX_MESSAGE_LEN,
};

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ConfigError {
    /// polling interval must be positive.
    ZeroPollInterval,

    /// at least one confirmation must be required.
    ZeroConfirmations,

    /// confirmation timeout must be positive.
    ZeroTimeout,

    /// batch size limit {0} is outside of the allowed range 1..={1}.
    BatchSizeLimit(usize, usize),

    /// message length limit {0} is outside of the allowed range 1..={1}.
    MessageLenLimit(usize, usize),

    /// unsupported configuration file format '{0}'; use .yaml, .yml or .toml files.
    UnknownFormat(String),

    #[cfg(feature = "fs")]
    #[from]
    #[from(io::Error)]
    #[display(inner)]
    File(IoError),

    #[cfg(feature = "fs")]
    #[from]
    #[display(inner)]
    Yaml(serde_yaml::Error),

    #[cfg(feature = "fs")]
    #[from]
    #[display(inner)]
    TomlDecode(toml::de::Error),

    #[cfg(feature = "fs")]
    #[from]
    #[display(inner)]
    TomlEncode(toml::ser::Error),
}

/// Addresses of the contracts the runtime talks to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
pub struct Contracts {
    pub guestbook: Address,
    pub leaderboard: Address,
    pub badges: Address,
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase", default)
)]
pub struct GuestbookConfig {
    /// Chain the guestbook contracts are deployed on.
    pub chain: ChainId,
    pub contracts: Contracts,
    /// Value attached to each signature.
    pub signature_fee: Amount,
    pub min_tip: Amount,
    pub confirmations: u32,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub confirmation_timeout_ms: Option<u64>,
    pub poll_interval_ms: u64,
    pub max_batch_size: usize,
    pub max_message_len: usize,
}

impl Default for GuestbookConfig {
    fn default() -> Self {
        GuestbookConfig {
            chain: ChainId::default(),
            contracts: Contracts::default(),
            signature_fee: Amount::ZERO,
            min_tip: Amount::from_units(1),
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout_ms: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_batch_size: MAX_BATCH_SIZE,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }
}

impl GuestbookConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.confirmations == 0 {
            return Err(ConfigError::ZeroConfirmations);
        }
        if self.confirmation_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.max_batch_size) {
            return Err(ConfigError::BatchSizeLimit(self.max_batch_size, MAX_BATCH_SIZE));
        }
        if !(1..=MAX_MESSAGE_LEN).contains(&self.max_message_len) {
            return Err(ConfigError::MessageLenLimit(self.max_message_len, MAX_MESSAGE_LEN));
        }
        Ok(())
    }

    pub fn policy(&self) -> OperationPolicy {
        OperationPolicy {
            max_message_len: self.max_message_len,
            max_batch_size: self.max_batch_size,
            signature_fee: self.signature_fee,
            min_tip: self.min_tip,
        }
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            confirmations: self.confirmations,
            timeout: self.confirmation_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
}

#[cfg(feature = "fs")]
impl GuestbookConfig {
    /// Reads configuration from a YAML or TOML file, depending on its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let config: GuestbookConfig = match Format::detect(path)? {
            Format::Yaml => serde_yaml::from_str(&data)?,
            Format::Toml => toml::from_str(&data)?,
        };
        config.validate()?;
        debug!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }

    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let data = match Format::detect(path)? {
            Format::Yaml => serde_yaml::to_string(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(feature = "fs")]
enum Format {
    Yaml,
    Toml,
}

#[cfg(feature = "fs")]
impl Format {
    fn detect(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnknownFormat(other.unwrap_or_default().to_owned())),
        }
    }
}

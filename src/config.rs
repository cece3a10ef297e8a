// Copyright (C) 2024, 2025 Firopool Developers (see AUTHORS)
//
// This file is part of Firopool
//
// Firopool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Firopool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Firopool. If not, see <https://www.gnu.org/licenses/>.

use serde::Deserialize;

/// A configured payout recipient that receives a fixed share of the block reward.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RecipientConfig {
    /// Base58 address of the recipient
    pub address: String,
    /// Fraction of the coinbase value, e.g. 0.05 for five percent
    pub percentage: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrimaryConfig {
    /// The pool's own payout address, receives the first coinbase output
    pub address: String,
    /// Additional fee recipients
    #[serde(default)]
    pub recipients: Vec<RecipientConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuxiliaryCoinConfig {
    /// Merge mining tag written before the aux hash in the coinbase script, as hex
    pub header: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuxiliaryConfig {
    #[serde(default)]
    pub enabled: bool,
    pub coin: AuxiliaryCoinConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    /// Use testnet address versions and founder addresses
    #[serde(default)]
    pub testnet: bool,
    /// Pool identifier attached to every share record
    #[serde(default)]
    pub identifier: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log to file if specified
    pub file: Option<String>,
    /// Log level (defaults to "info")
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log to console, enabled when not set
    pub console: Option<bool>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
            console: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub primary: PrimaryConfig,
    pub auxiliary: Option<AuxiliaryConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PoolConfig {
    /// Load the pool config from a file, with FIROPOOL_ prefixed
    /// environment variables overriding file values.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FIROPOOL").separator("_"))
            .build()?
            .try_deserialize()
    }

    /// Returns true when merge mining data should be committed in the coinbase
    pub fn auxiliary_enabled(&self) -> bool {
        self.auxiliary.as_ref().is_some_and(|aux| aux.enabled)
    }

    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.settings.testnet = testnet;
        self
    }

    pub fn with_identifier(mut self, identifier: String) -> Self {
        self.settings.identifier = identifier;
        self
    }

    pub fn with_primary_address(mut self, address: String) -> Self {
        self.primary.address = address;
        self
    }

    pub fn with_recipient(mut self, address: String, percentage: f64) -> Self {
        self.primary.recipients.push(RecipientConfig {
            address,
            percentage,
        });
        self
    }

    pub fn with_auxiliary(mut self, enabled: bool, header: String) -> Self {
        self.auxiliary = Some(AuxiliaryConfig {
            enabled,
            coin: AuxiliaryCoinConfig { header },
        });
        self
    }

    pub fn with_log_level(mut self, level: String) -> Self {
        self.logging.level = level;
        self
    }
}

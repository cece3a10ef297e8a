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

use serde_json::{json, Value};

/// Reasons a miner submission is rejected.
///
/// Each variant maps to a stable Stratum error code that is reported back
/// to the miner together with the message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShareError {
    #[error("{0}")]
    InvalidSubmission(String),
    #[error("job not found")]
    JobNotFound,
    #[error("duplicate share")]
    DuplicateShare,
    #[error("low difficulty share of {}", format_difficulty(*.0))]
    LowDifficulty(f64),
    #[error("nonce out of worker range")]
    NonceOutOfRange,
}

/// Format a difficulty the way miners and accounting expect to read it:
/// plain decimals, switching to exponent notation below 1e-6 and from 1e21.
pub fn format_difficulty(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    format!("{value}")
}

impl ShareError {
    pub(crate) fn invalid(message: &str) -> Self {
        Self::InvalidSubmission(message.to_string())
    }

    /// Stratum error code for this rejection
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidSubmission(_) => 20,
            Self::JobNotFound => 21,
            Self::DuplicateShare => 22,
            Self::LowDifficulty(_) => 23,
            Self::NonceOutOfRange => 24,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Render as the Stratum error triple `[code, message, null]`
    pub fn to_json(&self) -> Value {
        json!([self.code(), self.message(), null])
    }
}

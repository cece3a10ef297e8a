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

/// Errors raised while turning a block template into a job.
///
/// Any of these abandons the template cycle, the previous job stays current.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Invalid hex in {field}: {value}")]
    InvalidHex { field: &'static str, value: String },
    #[error("Invalid block template: {0}")]
    InvalidTemplate(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkError {
    pub(crate) fn invalid_hex(field: &'static str, value: &str) -> Self {
        Self::InvalidHex {
            field,
            value: value.to_string(),
        }
    }
}

/// Decode a hex field, naming the field on failure
pub(crate) fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, WorkError> {
    hex::decode(value).map_err(|_| WorkError::invalid_hex(field, value))
}

/// Decode a hex field of exactly N bytes
pub(crate) fn decode_hex_array<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<[u8; N], WorkError> {
    decode_hex(field, value)?
        .try_into()
        .map_err(|_| WorkError::invalid_hex(field, value))
}

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

use super::block_template::BlockTemplate;
use super::error::{decode_hex, decode_hex_array, WorkError};
use crate::config::PoolConfig;
use crate::stratum::util::{serialize_number, var_int};
use crate::utils::time_provider::TimeProvider;
use tracing::{debug, warn};

/// Coinbase transaction version before any adjustment
const COINBASE_VERSION: u32 = 3;

/// Transaction type 5 (coinbase payload) lives in the upper half of the version
const COINBASE_PAYLOAD_VERSION: u32 = 5 << 16;

/// Address version bytes and founder payouts for one Firo network
#[derive(Debug, Clone, Copy)]
pub struct NetworkParams {
    pub pub_key_hash: u8,
    pub script_hash: u8,
    pub founders: &'static [(&'static str, u64)],
}

pub const MAINNET: NetworkParams = NetworkParams {
    pub_key_hash: 0x52,
    script_hash: 0x07,
    founders: &[
        ("aLgRaYSFk6iVw2FqY1oei8Tdn2aTsGPVmP", 93_750_000),
        ("aFA2TbqG9cnhhzX5Yny2pBJRK5EaEqLCH7", 62_500_000),
    ],
};

pub const TESTNET: NetworkParams = NetworkParams {
    pub_key_hash: 0x41,
    script_hash: 0xb2,
    founders: &[
        ("TWDxLLKsFp6qcV1LL4U2uNmW4HwMcapmMU", 93_750_000),
        ("TCkC4uoErEyCB4MK3d6ouyJELoXnuyqe9L", 62_500_000),
    ],
};

impl NetworkParams {
    pub fn for_testnet(testnet: bool) -> &'static NetworkParams {
        if testnet {
            &TESTNET
        } else {
            &MAINNET
        }
    }
}

/// The coinbase transaction split around the extranonce.
///
/// A miner's coinbase is `prefix || extranonce1 || suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub prefix: Vec<u8>,
    pub suffix: Vec<u8>,
}

/// Convert a base58check address to its output script.
///
/// Pay to pubkey hash and pay to script hash are supported, the version
/// byte must belong to the given network.
pub fn address_to_script(address: &str, network: &NetworkParams) -> Result<Vec<u8>, WorkError> {
    let invalid = |reason: &str| WorkError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };
    let decoded =
        bitcoin::base58::decode_check(address).map_err(|e| invalid(&format!("{e}")))?;
    if decoded.len() != 21 {
        return Err(invalid("expected a 20 byte hash with a version byte"));
    }
    let (version, hash) = (decoded[0], &decoded[1..]);

    let mut script = Vec::with_capacity(25);
    if version == network.pub_key_hash {
        script.extend([0x76, 0xa9, 0x14]);
        script.extend_from_slice(hash);
        script.extend([0x88, 0xac]);
    } else if version == network.script_hash {
        script.extend([0xa9, 0x14]);
        script.extend_from_slice(hash);
        script.push(0x87);
    } else {
        return Err(invalid(&format!("unknown version byte {version:#04x}")));
    }
    Ok(script)
}

fn push_output(outputs: &mut Vec<Vec<u8>>, amount: u64, script: &[u8]) {
    let mut output = Vec::with_capacity(8 + 9 + script.len());
    output.extend(amount.to_le_bytes());
    output.extend(var_int(script.len() as u64));
    output.extend_from_slice(script);
    outputs.push(output);
}

fn coinbase_version(template: &BlockTemplate) -> Result<u32, WorkError> {
    let mut version = COINBASE_VERSION;
    if let Some(data) = template.coinbasetxn.as_ref().and_then(|txn| txn.data.as_deref()) {
        let head = data
            .get(..8)
            .ok_or_else(|| WorkError::invalid_hex("coinbasetxn.data", data))?;
        version = u32::from_le_bytes(decode_hex_array("coinbasetxn.data", head)?);
    }
    if template.coinbase_payload.as_deref().is_some_and(|p| !p.is_empty()) {
        version = version.wrapping_add(COINBASE_PAYLOAD_VERSION);
    }
    Ok(version)
}

fn coinbase_flags(template: &BlockTemplate) -> Vec<u8> {
    let flags = template.coinbase_flags();
    hex::decode(flags).unwrap_or_else(|_| {
        warn!("Ignoring coinbaseaux flags that are not hex: {}", flags);
        Vec::new()
    })
}

/// Build the coinbase script sig, without the extranonce placeholder itself
fn build_script_sig(
    config: &PoolConfig,
    template: &BlockTemplate,
    placeholder: &[u8],
    time_provider: &dyn TimeProvider,
) -> Result<Vec<u8>, WorkError> {
    let mut script_sig = serialize_number(template.height as u64);
    script_sig.extend(coinbase_flags(template));
    script_sig.extend(serialize_number(time_provider.seconds_since_epoch()));
    script_sig.push(placeholder.len() as u8);

    if let (Some(auxiliary), Some(aux_data)) = (&config.auxiliary, &template.aux_data) {
        if auxiliary.enabled {
            script_sig.extend(decode_hex("auxiliary.coin.header", &auxiliary.coin.header)?);
            script_sig.extend(decode_hex_array::<32>("auxData.hash", &aux_data.hash)?);
            script_sig.extend(1u32.to_le_bytes());
            script_sig.extend(0u32.to_le_bytes());
        }
    }
    Ok(script_sig)
}

/// Build the generation transaction for a template.
///
/// Outputs are ordered pool, masternodes, founders, recipients. Only the
/// configured recipients are deducted from the pool's reward.
pub fn build_generation(
    config: &PoolConfig,
    template: &BlockTemplate,
    placeholder: &[u8],
    time_provider: &dyn TimeProvider,
) -> Result<Generation, WorkError> {
    let network = NetworkParams::for_testnet(config.settings.testnet);
    let version = coinbase_version(template)?;
    let payload = match template.coinbase_payload.as_deref() {
        Some(payload) => decode_hex("coinbase_payload", payload)?,
        None => Vec::new(),
    };
    let pool_script = address_to_script(&config.primary.address, network)?;
    let script_sig = build_script_sig(config, template, placeholder, time_provider)?;

    let mut prefix = Vec::with_capacity(64 + script_sig.len());
    prefix.extend(version.to_le_bytes());
    prefix.extend(var_int(1));
    prefix.extend([0u8; 32]);
    prefix.extend(u32::MAX.to_le_bytes());
    prefix.extend(var_int((script_sig.len() + placeholder.len()) as u64));
    prefix.extend(script_sig);

    let mut outputs = Vec::new();
    if template.znode_payments_started && template.znode_payments_enforced {
        for payee in &template.znode {
            let script = match &payee.script {
                Some(script) => decode_hex("znode.script", script)?,
                None => address_to_script(&payee.payee, network)?,
            };
            push_output(&mut outputs, payee.amount, &script);
        }
    }

    for (address, amount) in network.founders {
        push_output(&mut outputs, *amount, &address_to_script(address, network)?);
    }

    let mut recipient_total: u64 = 0;
    for recipient in &config.primary.recipients {
        if !(0.0..=1.0).contains(&recipient.percentage) {
            return Err(WorkError::InvalidConfig(format!(
                "recipient {} percentage {} is outside 0 to 1",
                recipient.address, recipient.percentage
            )));
        }
        let amount = (recipient.percentage * template.coinbasevalue as f64).floor() as u64;
        recipient_total = recipient_total.checked_add(amount).ok_or_else(|| {
            WorkError::InvalidConfig("recipient amounts overflow".to_string())
        })?;
        push_output(
            &mut outputs,
            amount,
            &address_to_script(&recipient.address, network)?,
        );
    }

    let pool_reward = template
        .coinbasevalue
        .checked_sub(recipient_total)
        .ok_or_else(|| {
            WorkError::InvalidConfig("recipient percentages exceed the block reward".to_string())
        })?;
    let mut pool_output = Vec::new();
    push_output(&mut pool_output, pool_reward, &pool_script);
    outputs.splice(0..0, pool_output);

    let mut suffix = Vec::new();
    suffix.extend(0u32.to_le_bytes());
    suffix.extend(var_int(outputs.len() as u64));
    for output in outputs {
        suffix.extend(output);
    }
    suffix.extend(0u32.to_le_bytes());
    suffix.extend(var_int(payload.len() as u64));
    suffix.extend(payload);

    debug!(
        "Built generation for height {} with version {:#010x}, prefix {} bytes, suffix {} bytes",
        template.height,
        version,
        prefix.len(),
        suffix.len()
    );
    Ok(Generation { prefix, suffix })
}

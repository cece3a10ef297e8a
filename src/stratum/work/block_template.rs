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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The getblocktemplate response from a Firo daemon.
///
/// Only the fields the pool uses are kept, everything else the daemon sends
/// is ignored.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BlockTemplate {
    pub version: u32,
    pub previousblockhash: String,
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
    #[serde(default)]
    pub coinbaseaux: HashMap<String, String>,
    pub coinbasevalue: u64,
    /// Explicit 256 bit target, preferred over bits when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub curtime: u32,
    pub bits: String,
    pub height: u32,
    #[serde(default)]
    pub znode: Vec<ZnodePayee>,
    #[serde(default)]
    pub znode_payments_started: bool,
    #[serde(default)]
    pub znode_payments_enforced: bool,
    /// Special transaction payload, bumps the coinbase to version 3 type 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbasetxn: Option<CoinbaseTxn>,
    /// Merge mining commitment, attached by the pool from getauxblock
    #[serde(rename = "auxData", default, skip_serializing_if = "Option::is_none")]
    pub aux_data: Option<AuxData>,
}

/// Transaction data in the block template
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TemplateTransaction {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub fee: i64,
    #[serde(default)]
    pub sigops: u32,
}

impl TemplateTransaction {
    /// The id used in the merkle tree, txid when the daemon sends one
    pub fn merkle_id(&self) -> &str {
        self.txid.as_deref().unwrap_or(&self.hash)
    }
}

/// A masternode payment the coinbase must carry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ZnodePayee {
    pub payee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub amount: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CoinbaseTxn {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuxData {
    pub chainid: u32,
    pub hash: String,
}

/// The getauxblock response from a merge mined daemon
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuxBlock {
    pub chainid: u32,
    pub height: u64,
    pub hash: String,
    #[serde(default)]
    pub target: Option<String>,
}

impl BlockTemplate {
    /// Attach the merge mining data from an aux block
    pub fn with_aux_block(mut self, aux_block: &AuxBlock) -> Self {
        self.aux_data = Some(AuxData {
            chainid: aux_block.chainid,
            hash: aux_block.hash.clone(),
        });
        self
    }

    /// The coinbaseaux flags, empty when the daemon sends none
    pub fn coinbase_flags(&self) -> &str {
        self.coinbaseaux.get("flags").map(String::as_str).unwrap_or("")
    }

    /// The explicit target when present and non empty
    pub fn explicit_target(&self) -> Option<&str> {
        self.target.as_deref().filter(|target| !target.is_empty())
    }
}

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
use super::coinbase::{build_generation, Generation};
use super::counters::ExtraNonceCounter;
use super::error::{decode_hex, decode_hex_array, WorkError};
use crate::config::PoolConfig;
use crate::stratum::algorithms::{target_to_f64, Algorithms};
use crate::stratum::session::MinerClient;
use crate::stratum::util::{reversed, var_int};
use crate::utils::time_provider::TimeProvider;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{CompactTarget, Target};
use dashmap::DashSet;
use num_bigint::BigUint;
use num_traits::FromPrimitive;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Hex width of a 256 bit target sent to miners
const TARGET_HEX_WIDTH: usize = 64;

/// Parameters of a mining.notify for one miner.
///
/// Serialized as a JSON array in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct JobParams {
    pub job_id: String,
    pub header_hash: String,
    pub seed_hash: String,
    pub target: String,
    pub clean_jobs: bool,
    pub height: u32,
    pub bits: String,
}

impl From<JobParams> for Value {
    fn from(params: JobParams) -> Self {
        json!([
            params.job_id,
            params.header_hash,
            params.seed_hash,
            params.target,
            params.clean_jobs,
            params.height,
            params.bits,
        ])
    }
}

/// One unit of work built from a block template.
///
/// Everything derived from the template is computed once in `new`, so the
/// serializers cannot fail while validating shares.
#[derive(Debug)]
pub struct Job {
    pub job_id: String,
    pub template: Arc<BlockTemplate>,
    /// Block target, from the explicit template target or else from bits
    pub target: Target,
    /// Block difficulty rounded to 9 decimals
    pub difficulty: f64,
    pub generation: Generation,
    algorithms: Algorithms,
    bits: [u8; 4],
    previous_hash: [u8; 32],
    transaction_hashes: Vec<sha256d::Hash>,
    transaction_data: Vec<Vec<u8>>,
    submissions: DashSet<String>,
}

fn template_target(template: &BlockTemplate) -> Result<Target, WorkError> {
    match template.explicit_target() {
        Some(target) => Ok(Target::from_be_bytes(decode_hex_array("target", target)?)),
        None => {
            let compact = CompactTarget::from_unprefixed_hex(&template.bits)
                .map_err(|_| WorkError::invalid_hex("bits", &template.bits))?;
            Ok(Target::from_compact(compact))
        }
    }
}

fn round_to_9_decimals(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}

impl Job {
    pub fn new(
        job_id: String,
        config: &PoolConfig,
        algorithms: &Algorithms,
        template: BlockTemplate,
        placeholder: &[u8],
        time_provider: &dyn TimeProvider,
    ) -> Result<Self, WorkError> {
        let target = template_target(&template)?;
        if target == Target::ZERO {
            return Err(WorkError::InvalidTemplate("target is zero".to_string()));
        }
        let difficulty =
            round_to_9_decimals(algorithms.firopow.diff_f64() / target_to_f64(&target));

        let bits = decode_hex_array("bits", &template.bits)?;
        let previous_hash = decode_hex_array("previousblockhash", &template.previousblockhash)?;
        let transaction_hashes = template
            .transactions
            .iter()
            .map(|tx| {
                sha256d::Hash::from_str(tx.merkle_id())
                    .map_err(|_| WorkError::invalid_hex("transactions.txid", tx.merkle_id()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let transaction_data = template
            .transactions
            .iter()
            .map(|tx| decode_hex("transactions.data", &tx.data))
            .collect::<Result<Vec<_>, _>>()?;

        let generation = build_generation(config, &template, placeholder, time_provider)?;

        debug!(
            "Built job {} for height {} with difficulty {}",
            job_id, template.height, difficulty
        );
        Ok(Self {
            job_id,
            template: Arc::new(template),
            target,
            difficulty,
            generation,
            algorithms: algorithms.clone(),
            bits,
            previous_hash,
            transaction_hashes,
            transaction_data,
            submissions: DashSet::new(),
        })
    }

    pub fn height(&self) -> u32 {
        self.template.height
    }

    /// Serialize the 80 byte block header.
    ///
    /// Fields are laid out big endian in reverse order, then the whole
    /// buffer is reversed into the daemon's byte order.
    pub fn serialize_header(&self, version: u32, merkle_root: &[u8; 32], n_time: u32) -> [u8; 80] {
        let mut header = [0u8; 80];
        header[0..4].copy_from_slice(&self.template.height.to_be_bytes());
        header[4..8].copy_from_slice(&self.bits);
        header[8..12].copy_from_slice(&n_time.to_be_bytes());
        header[12..44].copy_from_slice(&reversed(merkle_root));
        header[44..76].copy_from_slice(&self.previous_hash);
        header[76..80].copy_from_slice(&version.to_be_bytes());
        header.reverse();
        header
    }

    /// The coinbase transaction for a miner's extranonce1
    pub fn serialize_coinbase(&self, extra_nonce1: &[u8]) -> Vec<u8> {
        let mut coinbase = Vec::with_capacity(
            self.generation.prefix.len() + extra_nonce1.len() + self.generation.suffix.len(),
        );
        coinbase.extend_from_slice(&self.generation.prefix);
        coinbase.extend_from_slice(extra_nonce1);
        coinbase.extend_from_slice(&self.generation.suffix);
        coinbase
    }

    /// Serialize a full block. The nonce is in block byte order, the mix
    /// hash as submitted.
    pub fn serialize_block(
        &self,
        header: &[u8; 80],
        coinbase: &[u8],
        nonce: &[u8; 8],
        mix_hash: &[u8; 32],
    ) -> Vec<u8> {
        let mut block = Vec::with_capacity(
            80 + 8 + 32 + 9 + coinbase.len() + self.transaction_data.iter().map(Vec::len).sum::<usize>(),
        );
        block.extend_from_slice(header);
        block.extend_from_slice(nonce);
        block.extend(reversed(mix_hash));
        block.extend(var_int(self.transaction_data.len() as u64 + 1));
        block.extend_from_slice(coinbase);
        for tx in &self.transaction_data {
            block.extend_from_slice(tx);
        }
        block
    }

    /// Merkle root over the coinbase and the template transactions, in
    /// internal byte order
    pub fn merkle_root(&self, coinbase: &[u8]) -> [u8; 32] {
        let hashes = std::iter::once(sha256d::Hash::hash(coinbase))
            .chain(self.transaction_hashes.iter().copied());
        bitcoin::merkle_tree::calculate_root(hashes)
            .map(|root| root.to_byte_array())
            .unwrap_or_default()
    }

    /// Header hash handed to miners, reversed double SHA-256 of the header
    pub fn header_hash(&self, header: &[u8; 80]) -> [u8; 32] {
        let mut hash = Algorithms::sha256d(header);
        hash.reverse();
        hash
    }

    /// Block hash over the header, nonce and mix hash
    pub fn block_hash(&self, header: &[u8; 80], nonce: &[u8; 8], mix_hash: &[u8; 32]) -> [u8; 32] {
        let mut combined = [0u8; 120];
        combined[..80].copy_from_slice(header);
        combined[80..88].copy_from_slice(nonce);
        combined[88..].copy_from_slice(&reversed(mix_hash));
        let mut hash = Algorithms::sha256d(&combined);
        hash.reverse();
        hash
    }

    /// Build header hash for a miner's coinbase, with the template's version and time
    pub fn header_for(&self, extra_nonce1: &[u8]) -> (Vec<u8>, [u8; 80], [u8; 32]) {
        let coinbase = self.serialize_coinbase(extra_nonce1);
        let merkle_root = self.merkle_root(&coinbase);
        let header =
            self.serialize_header(self.template.version, &merkle_root, self.template.curtime);
        let header_hash = self.header_hash(&header);
        (coinbase, header, header_hash)
    }

    /// DAG seed for the job's epoch
    pub fn seed_hash(&self) -> [u8; 32] {
        let epoch_length = self.algorithms.firopow.epoch_length.unwrap_or(1).max(1);
        let epoch = self.template.height / epoch_length;
        let mut seed = [0u8; 32];
        for _ in 0..epoch {
            let next = Keccak256::digest(seed);
            seed.copy_from_slice(&next);
        }
        seed
    }

    /// Share target sent to miners, 64 hex characters
    pub fn share_target_hex(&self) -> String {
        if self.difficulty <= 0.0 {
            return hex::encode(self.target.to_be_bytes());
        }
        let adjusted = self.algorithms.firopow.diff_f64() / self.difficulty;
        let digits = BigUint::from_f64(adjusted)
            .map(|value| value.to_str_radix(16))
            .unwrap_or_default();
        let mut target = format!("{:0>width$}", digits, width = TARGET_HEX_WIDTH);
        target.truncate(TARGET_HEX_WIDTH);
        target
    }

    /// Build the notify parameters for a miner, assigning an extranonce1
    /// from the counter when the miner has none yet
    pub fn build_job_parameters(
        &self,
        client: &mut MinerClient,
        clean_jobs: bool,
        counter: &ExtraNonceCounter,
    ) -> Result<JobParams, WorkError> {
        let extra_nonce1 = client
            .extra_nonce1
            .get_or_insert_with(|| counter.next())
            .clone();
        let extra_nonce1 = decode_hex("extra_nonce1", &extra_nonce1)?;
        let (_, _, header_hash) = self.header_for(&extra_nonce1);

        Ok(JobParams {
            job_id: self.job_id.clone(),
            header_hash: hex::encode(header_hash),
            seed_hash: hex::encode(self.seed_hash()),
            target: self.share_target_hex(),
            clean_jobs,
            height: self.template.height,
            bits: self.template.bits.clone(),
        })
    }

    /// Record a submission, returns false if it was seen before on this job
    pub fn record_submission(&self, parts: &[&str]) -> bool {
        self.submissions.insert(parts.concat().to_lowercase())
    }
}

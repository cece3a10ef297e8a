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

use firopool::config::PoolConfig;
use firopool::stratum::algorithms::{PowOutcome, ProofOfWork};
use firopool::stratum::session::{MinerClient, ShareSubmission};
use firopool::stratum::work::block_template::BlockTemplate;

pub const FIXTURE_TIME: u64 = 1655318189;
pub const POOL_ADDRESS: &str = "aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj";
pub const HEADER_HASH: &str = "20b528c61725e1c0ffe3d160efde1e0a2143bac0a9ac49bbabc6f34400426ae5";
pub const MIX_HASH: &str = "ab1957f31544c9a133eebccdd30dfefc3deda8ab3015aa12aac8b164346152ab";

/// Verifier that accepts every solution and returns a fixed digest.
/// WARNING: This is a test fixture and should not be used anywhere else.
pub struct FixedProofOfWork {
    pub digest: [u8; 32],
}

impl ProofOfWork for FixedProofOfWork {
    fn verify(&self, _: &[u8; 32], _: u64, _: u32, _: &[u8; 32]) -> PowOutcome {
        PowOutcome {
            valid: true,
            digest: self.digest,
        }
    }
}

/// A digest one bit above the fixture's block target
pub fn share_digest() -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest[0] = 0x01;
    digest
}

pub fn fixture_template() -> BlockTemplate {
    serde_json::from_str(include_str!("../test_data/gbt/firo/template.json"))
        .expect("Failed to parse template fixture")
}

pub fn default_test_config() -> PoolConfig {
    serde_json::from_value(serde_json::json!({
        "settings": {"testnet": false, "identifier": "firopool-test"},
        "primary": {"address": POOL_ADDRESS, "recipients": []}
    }))
    .expect("Failed to build test config")
}

pub fn miner(extra_nonce1: &str, difficulty: f64) -> MinerClient {
    let mut client = MinerClient::new(format!("miner-{extra_nonce1}"), difficulty)
        .with_addresses(Some(POOL_ADDRESS.to_string()), None)
        .with_socket("127.0.0.1".to_string(), 3002);
    client.extra_nonce1 = Some(extra_nonce1.to_string());
    client
}

pub fn submission(extra_nonce1: &str, nonce: &str, header_hash: &str) -> ShareSubmission {
    ShareSubmission {
        extra_nonce1: extra_nonce1.to_string(),
        nonce: nonce.to_string(),
        header_hash: header_hash.to_string(),
        mix_hash: MIX_HASH.to_string(),
    }
}

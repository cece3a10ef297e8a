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

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::Target;
#[cfg(test)]
use mockall::automock;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use std::sync::Arc;

/// Difficulty 1 target shared by both algorithms, 0xffff << 208
const DIFF1_TARGET: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Number of blocks sharing one FiroPoW DAG seed
pub const FIROPOW_EPOCH_LENGTH: u32 = 1300;

/// Result of running the memory hard hash over a submitted solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowOutcome {
    /// True when the recomputed mix hash matches the submitted one
    pub valid: bool,
    /// Final hash, compared as a big endian number against targets
    pub digest: [u8; 32],
}

/// FiroPoW verification, supplied by a native implementation.
///
/// Implementations must be reentrant, shares are validated concurrently.
#[cfg_attr(test, automock)]
pub trait ProofOfWork: Send + Sync {
    fn verify(
        &self,
        header_hash: &[u8; 32],
        nonce: u64,
        height: u32,
        mix_hash: &[u8; 32],
    ) -> PowOutcome;
}

/// Static parameters of one hashing algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct Algorithm {
    pub name: &'static str,
    pub multiplier: f64,
    /// The difficulty 1 target
    pub diff: Target,
    pub epoch_length: Option<u32>,
}

impl Algorithm {
    /// Difficulty 1 target as a float, used for share difficulty arithmetic
    pub fn diff_f64(&self) -> f64 {
        target_to_f64(&self.diff)
    }
}

/// Registry of the algorithms used to validate work.
///
/// Built once when the manager starts and never changed afterwards.
#[derive(Clone)]
pub struct Algorithms {
    pub firopow: Algorithm,
    pub sha256d: Algorithm,
    pow: Arc<dyn ProofOfWork>,
}

impl std::fmt::Debug for Algorithms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Algorithms")
            .field("firopow", &self.firopow)
            .field("sha256d", &self.sha256d)
            .finish_non_exhaustive()
    }
}

impl Algorithms {
    pub fn new(pow: Arc<dyn ProofOfWork>) -> Self {
        Self {
            firopow: Algorithm {
                name: "firopow",
                multiplier: 1.0,
                diff: Target::from_be_bytes(DIFF1_TARGET),
                epoch_length: Some(FIROPOW_EPOCH_LENGTH),
            },
            sha256d: Algorithm {
                name: "sha256d",
                multiplier: 1.0,
                diff: Target::from_be_bytes(DIFF1_TARGET),
                epoch_length: None,
            },
            pow,
        }
    }

    /// Look up an algorithm by name
    pub fn get(&self, name: &str) -> Option<&Algorithm> {
        match name {
            "firopow" => Some(&self.firopow),
            "sha256d" => Some(&self.sha256d),
            _ => None,
        }
    }

    /// Double SHA-256 of the input, in internal byte order
    pub fn sha256d(data: &[u8]) -> [u8; 32] {
        sha256d::Hash::hash(data).to_byte_array()
    }

    /// Run the FiroPoW verifier for a submitted solution
    pub fn firopow(
        &self,
        header_hash: &[u8; 32],
        nonce: u64,
        height: u32,
        mix_hash: &[u8; 32],
    ) -> PowOutcome {
        self.pow.verify(header_hash, nonce, height, mix_hash)
    }
}

/// Convert a 256 bit target to the nearest float
pub fn target_to_f64(target: &Target) -> f64 {
    BigUint::from_bytes_be(&target.to_be_bytes())
        .to_f64()
        .unwrap_or(f64::INFINITY)
}

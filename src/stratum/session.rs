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

/// The manager's view of a connected miner.
///
/// The socket layer owns the connection, this only carries what share
/// validation and job building need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinerClient {
    /// Connection id assigned by the socket layer
    pub id: String,
    /// extranonce1 assigned to the miner, set when the first job is built
    pub extra_nonce1: Option<String>,
    /// The current share difficulty for the miner
    pub difficulty: f64,
    /// Difficulty before the latest retarget, still accepted once
    pub previous_difficulty: Option<f64>,
    /// Payout address on the primary chain
    pub addr_primary: Option<String>,
    /// Payout address on the merge mined chain
    pub addr_auxiliary: Option<String>,
    pub ip: String,
    pub port: u16,
}

impl MinerClient {
    pub fn new(id: String, difficulty: f64) -> Self {
        Self {
            id,
            difficulty,
            ..Default::default()
        }
    }

    pub fn with_addresses(mut self, primary: Option<String>, auxiliary: Option<String>) -> Self {
        self.addr_primary = primary;
        self.addr_auxiliary = auxiliary;
        self
    }

    pub fn with_socket(mut self, ip: String, port: u16) -> Self {
        self.ip = ip;
        self.port = port;
        self
    }

    /// Switch to a new difficulty, remembering the old one so shares
    /// already in flight are not rejected.
    pub fn set_difficulty(&mut self, difficulty: f64) {
        if difficulty != self.difficulty {
            self.previous_difficulty = Some(self.difficulty);
            self.difficulty = difficulty;
        }
    }
}

/// A mining.submit from a miner, all fields as hex strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSubmission {
    pub extra_nonce1: String,
    pub nonce: String,
    pub header_hash: String,
    pub mix_hash: String,
}

impl ShareSubmission {
    /// The parts identifying a unique submission within a job
    pub fn dedup_parts(&self) -> [&str; 4] {
        [
            &self.extra_nonce1,
            &self.nonce,
            &self.header_hash,
            &self.mix_hash,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client() {
        let client = MinerClient::new("client-1".to_string(), 0.5)
            .with_addresses(Some("aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj".to_string()), None)
            .with_socket("127.0.0.1".to_string(), 3002);

        assert_eq!(client.id, "client-1");
        assert_eq!(client.difficulty, 0.5);
        assert!(client.extra_nonce1.is_none());
        assert!(client.previous_difficulty.is_none());
        assert_eq!(
            client.addr_primary.as_deref(),
            Some("aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj")
        );
        assert!(client.addr_auxiliary.is_none());
        assert_eq!(client.port, 3002);
    }

    #[test]
    fn test_set_difficulty_keeps_previous() {
        let mut client = MinerClient::new("client-1".to_string(), 8.0);
        client.set_difficulty(8.0);
        assert!(client.previous_difficulty.is_none());

        client.set_difficulty(16.0);
        assert_eq!(client.difficulty, 16.0);
        assert_eq!(client.previous_difficulty, Some(8.0));
    }

    #[test]
    fn test_deserialize_submission() {
        let submission: ShareSubmission = serde_json::from_str(
            r#"{"extra_nonce1": "b750", "nonce": "b7502aaaac75284c",
                "header_hash": "00", "mix_hash": "11"}"#,
        )
        .unwrap();
        assert_eq!(submission.dedup_parts(), ["b750", "b7502aaaac75284c", "00", "11"]);
    }
}

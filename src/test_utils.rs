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

use crate::config::PoolConfig;
use crate::stratum::algorithms::{Algorithms, MockProofOfWork, PowOutcome};
use crate::stratum::work::block_template::BlockTemplate;
use crate::utils::time_provider::TestTimeProvider;
use serde_json::json;
use std::sync::Arc;

/// Time used by the fixture vectors
pub const FIXTURE_TIME: u64 = 1655318189;

pub const POOL_ADDRESS: &str = "aKoefNw7AeYKosEYwjCi4RQpVhBWRwU5Mj";

/// Load the firo getblocktemplate fixture
pub fn fixture_template() -> BlockTemplate {
    serde_json::from_str(include_str!(
        "../tests/test_data/gbt/firo/template.json"
    ))
    .unwrap()
}

/// Mainnet config paying the pool address, with no recipients or aux chain
pub fn test_config() -> PoolConfig {
    serde_json::from_value(json!({
        "settings": {"testnet": false, "identifier": "firopool"},
        "primary": {"address": POOL_ADDRESS, "recipients": []}
    }))
    .unwrap()
}

pub fn test_time_provider() -> TestTimeProvider {
    TestTimeProvider::at(FIXTURE_TIME)
}

/// Algorithms whose verifier must not be called
pub fn test_algorithms() -> Algorithms {
    Algorithms::new(Arc::new(MockProofOfWork::new()))
}

/// Algorithms whose verifier always returns the outcome
pub fn test_algorithms_with(outcome: PowOutcome) -> Algorithms {
    let mut pow = MockProofOfWork::new();
    pow.expect_verify().returning(move |_, _, _, _| outcome);
    Algorithms::new(Arc::new(pow))
}

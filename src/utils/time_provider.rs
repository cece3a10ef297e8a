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

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Trait to get current system time, allowing for mocking in tests
///
/// The coinbase script embeds the time the job was generated, so every
/// job builder takes a provider instead of reading the clock directly.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> SystemTime;

    fn seconds_since_epoch(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Default implementation that uses actual system time
#[derive(Clone, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mock time provider for testing
#[derive(Clone, Debug)]
pub struct TestTimeProvider {
    time: Arc<Mutex<SystemTime>>,
}

impl TestTimeProvider {
    pub fn new(time: SystemTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Build a provider frozen at the given unix timestamp
    pub fn at(seconds: u64) -> Self {
        Self::new(UNIX_EPOCH + Duration::from_secs(seconds))
    }

    pub fn set_since_epoch(&self, seconds: u64) {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time = UNIX_EPOCH + Duration::from_secs(seconds);
    }
}

impl TimeProvider for TestTimeProvider {
    fn now(&self) -> SystemTime {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

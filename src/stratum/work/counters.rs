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

use std::sync::atomic::{AtomicU64, Ordering};

/// Job ids roll over to 1 after this many jobs
const JOB_ID_WRAP: u64 = 0xffff;

/// Size of extranonce1 handed to each miner, in bytes
pub const EXTRA_NONCE1_SIZE: usize = 2;

/// Generates job ids as lower case hex strings, starting at "1".
#[derive(Debug, Default)]
pub struct JobCounter {
    counter: AtomicU64,
}

impl JobCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the next job id, incrementing the counter atomically
    pub fn next(&self) -> String {
        let previous = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(Self::advance(current))
            })
            .unwrap_or_default();
        format!("{:x}", Self::advance(previous))
    }

    fn advance(current: u64) -> u64 {
        let next = current + 1;
        if next % JOB_ID_WRAP == 0 {
            1
        } else {
            next
        }
    }

    /// The most recently issued job id
    pub fn current(&self) -> String {
        format!("{:x}", self.counter.load(Ordering::SeqCst))
    }
}

/// Hands out extranonce1 values to miners, wrapping at the configured size.
#[derive(Debug)]
pub struct ExtraNonceCounter {
    counter: AtomicU64,
    size: usize,
}

impl ExtraNonceCounter {
    /// Create a counter seeded from the current time, so restarts do not
    /// hand out the same sequence again
    pub fn new(size: usize) -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self::with_start(size, seed)
    }

    pub fn with_start(size: usize, start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
            size,
        }
    }

    /// Number of bytes in each extranonce1
    pub fn size(&self) -> usize {
        self.size
    }

    /// Next extranonce1 as hex, always `2 * size` characters wide
    pub fn next(&self) -> String {
        let value = self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let bits = (self.size * 8) as u32;
        let masked = if bits >= 64 {
            value
        } else {
            value & ((1u64 << bits) - 1)
        };
        format!("{:0width$x}", masked, width = self.size * 2)
    }
}

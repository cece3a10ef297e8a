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

use bitcoin::consensus::encode::{serialize, VarInt};

/// Encode a number the way coinbase script heights and timestamps are pushed.
///
/// Values 1 to 16 use the single byte small integer form. Everything else is
/// a length byte followed by the little endian bytes, with an extra byte kept
/// when the top byte would set the sign bit.
pub fn serialize_number(mut n: u64) -> Vec<u8> {
    if (1..=16).contains(&n) {
        return vec![0x50 + n as u8];
    }
    let mut bytes = Vec::with_capacity(9);
    while n > 0x7f {
        bytes.push((n & 0xff) as u8);
        n >>= 8;
    }
    bytes.push(n as u8);
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(bytes.len() as u8);
    out.extend(bytes);
    out
}

/// Bitcoin compact size encoding
pub fn var_int(n: u64) -> Vec<u8> {
    serialize(&VarInt(n))
}

/// True when the string is even length hex. The empty string is hex, length
/// checks happen separately.
pub fn is_hex(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Return a reversed copy of the bytes
pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

// SPDX-License-Identifier: MIT
//
// Content hash for the Kitty image cache. FNV-1a is enough: a collision
// only costs a wrong cache hit between two images of identical dimensions,
// and the hash must be stable across runs (no random seed).

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a of `bytes`.
#[must_use]
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(OFFSET_BASIS, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

// SPDX-License-Identifier: MIT

//! Fletcher-16 running-sum checksum.
//!
//! Every update-protocol frame, request or answer, ends with this checksum
//! computed over all preceding bytes and appended little-endian. The sum is
//! order-sensitive and catches most single- and double-byte corruption and
//! byte reordering; it is not cryptographic, and the modulo-256 running sums
//! admit a small set of algebraic collisions (e.g. `0x00` and `0xFF` are
//! congruent in either accumulator).

/// Compute the Fletcher-16 checksum of `bytes`.
///
/// Two 8-bit accumulators: for each byte, `lo += byte`, then `hi += lo`,
/// both wrapping. The result packs as `(hi << 8) | lo`.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut lo: u8 = 0;
    let mut hi: u8 = 0;
    for &b in bytes {
        lo = lo.wrapping_add(b);
        hi = hi.wrapping_add(lo);
    }
    u16::from(hi) << 8 | u16::from(lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn known_vectors() {
        // Hand-computed: lo = 1, hi = 1.
        assert_eq!(checksum(&[0x01]), 0x0101);
        // lo = 1+2 = 3, hi = 1+3 = 4.
        assert_eq!(checksum(&[0x01, 0x02]), 0x0403);
        // lo = 0xEF, hi = 0xC3 (mod-256 running sums, not the mod-255 variant).
        assert_eq!(checksum(b"abcde"), 0xC3EF);
    }

    #[test]
    fn deterministic() {
        let data = [0xF2, 0x00, 0x20, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04];
        assert_eq!(checksum(&data), checksum(&data));
    }

    #[test]
    fn order_sensitive() {
        assert_ne!(checksum(&[0x01, 0x02, 0x03]), checksum(&[0x03, 0x02, 0x01]));
    }

    #[test]
    fn single_byte_mutation_detected() {
        let data = [0xF0u8, 0x12, 0x34, 0x56];
        let base = checksum(&data);
        // Mutating any single byte by a non-congruent delta changes the sum.
        for i in 0..data.len() {
            let mut corrupted = data;
            corrupted[i] ^= 0x5A;
            assert_ne!(checksum(&corrupted), base, "mutation at {} undetected", i);
        }
    }

    #[test]
    fn wrapping_accumulators() {
        // 256 bytes of 0xFF wrap both accumulators without panicking.
        let data = [0xFFu8; 256];
        let _ = checksum(&data);
    }
}

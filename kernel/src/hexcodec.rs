// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ASCII-hex encoding between raw memory and the wire format.
//!
//! Matches `mem2hex`/`hex2mem` in the original stub: a byte encodes to two
//! lowercase hex characters, most-significant nibble first, and aligned
//! buffers take a word- or halfword-wide fast path that still preserves the
//! native little-endian byte sequence (the fast path only changes how many
//! bytes are processed per loop iteration, never the output bytes).

pub(crate) const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Not a hex digit, returned by [`nibble_from_hex`] on invalid input.
pub const INVALID_NIBBLE: u8 = 0xFF;

/// Parses one ASCII hex character (either case) into its nibble value, or
/// [`INVALID_NIBBLE`] if `c` is not a hex digit.
pub fn nibble_from_hex(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => INVALID_NIBBLE,
    }
}

/// Parses up to 8 leading hex nibbles of `src` into a `u32`, returning the
/// value and the count of characters consumed. Stops at the first
/// non-hex character or after 8 nibbles, whichever comes first.
pub fn parse_hex_u32(src: &[u8]) -> (u32, usize) {
    let mut value: u32 = 0;
    let mut consumed = 0;
    for &c in src.iter().take(8) {
        let nibble = nibble_from_hex(c);
        if nibble == INVALID_NIBBLE {
            break;
        }
        value = (value << 4) | nibble as u32;
        consumed += 1;
    }
    (value, consumed)
}

fn encode_one(dst: &mut [u8], byte: u8) {
    dst[0] = HEX_DIGITS[(byte >> 4) as usize];
    dst[1] = HEX_DIGITS[(byte & 0x0F) as usize];
}

/// Encodes `src` as lowercase hex into `dst`, which must be at least
/// `2 * src.len()` bytes. The word/halfword fast path only changes the
/// access granularity of the read from `src`; the emitted characters are
/// identical to the byte-at-a-time path since this target is little-endian.
pub fn encode(dst: &mut [u8], src: &[u8]) {
    assert!(dst.len() >= src.len() * 2);
    if src.len() % 4 == 0 && (src.as_ptr() as usize) % 4 == 0 {
        for (chunk, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(8)) {
            let word = u32::from_le_bytes(chunk.try_into().unwrap());
            for (i, byte_out) in out.chunks_exact_mut(2).enumerate() {
                encode_one(byte_out, (word >> (i * 8)) as u8);
            }
        }
    } else if src.len() % 2 == 0 && (src.as_ptr() as usize) % 2 == 0 {
        for (chunk, out) in src.chunks_exact(2).zip(dst.chunks_exact_mut(4)) {
            let half = u16::from_le_bytes(chunk.try_into().unwrap());
            for (i, byte_out) in out.chunks_exact_mut(2).enumerate() {
                encode_one(byte_out, (half >> (i * 8)) as u8);
            }
        }
    } else {
        for (byte, out) in src.iter().zip(dst.chunks_exact_mut(2)) {
            encode_one(out, *byte);
        }
    }
}

/// Decodes `src`, an ASCII hex string of `dst.len() * 2` characters
/// (either case), into `dst`.
pub fn decode(dst: &mut [u8], src: &[u8]) {
    assert!(src.len() >= dst.len() * 2);
    for (byte, pair) in dst.iter_mut().zip(src.chunks_exact(2)) {
        *byte = (nibble_from_hex(pair[0]) << 4) | nibble_from_hex(pair[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_big_endian_nibble_order() {
        let mut out = [0u8; 2];
        encode(&mut out, &[0xA5]);
        assert_eq!(&out, b"a5");
    }

    #[test]
    fn decode_accepts_either_case() {
        let mut out = [0u8; 2];
        decode(&mut out, b"Bc1F");
        assert_eq!(out, [0xBC, 0x1F]);
    }

    #[test]
    fn round_trips_unaligned_buffers() {
        let src: [u8; 5] = [0x00, 0xFF, 0x10, 0x7E, 0x81];
        let mut hex = [0u8; 10];
        encode(&mut hex, &src);
        let mut back = [0u8; 5];
        decode(&mut back, &hex);
        assert_eq!(src, back);
    }

    #[test]
    fn round_trips_word_aligned_buffers() {
        let src: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut hex = [0u8; 16];
        encode(&mut hex, &src);
        let mut back = [0u8; 8];
        decode(&mut back, &hex);
        assert_eq!(src, back);
    }

    #[test]
    fn parse_hex_u32_stops_at_first_non_hex_char() {
        let (value, consumed) = parse_hex_u32(b"1a2b,rest");
        assert_eq!(value, 0x1a2b);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn parse_hex_u32_caps_at_eight_nibbles() {
        let (value, consumed) = parse_hex_u32(b"deadbeef00");
        assert_eq!(value, 0xdeadbeef);
        assert_eq!(consumed, 8);
    }

    #[test]
    fn nibble_from_hex_rejects_non_hex() {
        assert_eq!(nibble_from_hex(b'g'), INVALID_NIBBLE);
        assert_eq!(nibble_from_hex(b'$'), INVALID_NIBBLE);
    }

    proptest::proptest! {
        #[test]
        fn decode_of_encode_is_identity(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64)) {
            let mut hex = vec![0u8; bytes.len() * 2];
            encode(&mut hex, &bytes);
            let mut back = vec![0u8; bytes.len()];
            decode(&mut back, &hex);
            proptest::prop_assert_eq!(bytes, back);
        }
    }
}

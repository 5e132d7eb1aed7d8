//! StreamKey derivation
//!
//! Shards index payloads by a key derived from the entry's identity hash and
//! its mip/variant count. The transform works on the hex digit string of the
//! byte-swapped identity and is reproduced here step by step, since shard
//! files are built with exactly this sequence.

/// Number the variant count is offset by before it is folded into the key.
pub const VARIANT_BIAS: i32 = 6;

/// Derive the shard lookup key for `identity` at `variant_count`.
#[must_use]
pub fn stream_key(identity: u64, variant_count: i32) -> u64 {
    let mut digits = format!("{:016x}", identity.swap_bytes()).into_bytes();

    swap_digit_pairs(&mut digits);
    digits.rotate_right(1);
    swap_digit_pairs(&mut digits);

    let marker = VARIANT_BIAS.wrapping_add(variant_count) as u8;
    digits[1] = hex_digit(marker & 0x0F);

    parse_hex(&digits).swap_bytes()
}

/// The key searched when `key` misses in every shard.
#[must_use]
pub fn retry_key(key: u64) -> u64 {
    key.wrapping_sub(1)
}

fn swap_digit_pairs(digits: &mut [u8]) {
    for pair in digits.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

fn hex_digit(nibble: u8) -> u8 {
    match nibble {
        0..=9 => b'0' + nibble,
        _ => b'a' + nibble - 10,
    }
}

fn parse_hex(digits: &[u8]) -> u64 {
    digits.iter().fold(0u64, |acc, &d| {
        let nibble = match d {
            b'0'..=b'9' => d - b'0',
            b'a'..=b'f' => d - b'a' + 10,
            b'A'..=b'F' => d - b'A' + 10,
            _ => 0,
        };
        (acc << 4) | u64::from(nibble)
    })
}

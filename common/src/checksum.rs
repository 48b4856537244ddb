// Licensed under the Apache-2.0 license

/// Calculate the inverted-sum checksum
/// !(SUM(words)) with wrapping 32-bit addition
pub fn calc_inverted_checksum(words: &[u32]) -> u32 {
    !words.iter().fold(0u32, |acc, w| acc.wrapping_add(*w))
}

/// Verify an inverted-sum checksum
pub fn verify_inverted_checksum(checksum: u32, words: &[u32]) -> bool {
    calc_inverted_checksum(words) == checksum
}

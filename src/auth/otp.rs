//! One-time code generation for email verification and password reset.

use rand::Rng;
use time::Duration;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

pub const CODE_LEN: usize = 6;

/// Every code is valid for exactly 15 minutes from issuance.
pub const CODE_TTL: Duration = Duration::minutes(15);

/// Generate a 6-character code. Each position flips a fair coin between the
/// letter and digit alphabets, then picks uniformly inside the chosen one.
///
/// No cross-user uniqueness check: with 62^6 letter-or-digit combinations
/// weighted toward letters, the chance of two live codes colliding inside
/// one 15-minute window is negligible, and a collision is non-fatal (the
/// lookup is keyed by email as well).
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| {
            let alphabet = if rng.gen_bool(0.5) { LETTERS } else { DIGITS };
            alphabet[rng.gen_range(0..alphabet.len())] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_six_chars() {
        for _ in 0..100 {
            assert_eq!(generate_code().len(), CODE_LEN);
        }
    }

    #[test]
    fn code_is_alphanumeric() {
        for _ in 0..100 {
            assert!(generate_code().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn code_mixes_both_alphabets_over_many_draws() {
        // each position is a coin flip, so 100 codes (600 chars) without a
        // digit or without a letter would be astronomically unlikely
        let chars: String = (0..100).map(|_| generate_code()).collect();
        assert!(chars.chars().any(|c| c.is_ascii_digit()));
        assert!(chars.chars().any(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn codes_are_mostly_unique() {
        use std::collections::HashSet;
        let codes: HashSet<String> = (0..100).map(|_| generate_code()).collect();
        assert!(codes.len() > 95, "should generate mostly unique codes");
    }
}

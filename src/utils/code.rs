// src/utils/code.rs

use rand::SeedableRng;
use rand::distributions::{Alphanumeric, Distribution};
use rand::rngs::StdRng;

const CODE_LENGTH: usize = 16;

/// Generates a fresh confirmation code from OS entropy.
///
/// Codes must be unpredictable; they are the only credential a signup
/// carries until the first token exchange.
pub fn generate_confirmation_code() -> String {
    let mut rng = StdRng::from_entropy();
    String::from_iter((0..CODE_LENGTH).map(|_| Alphanumeric.sample(&mut rng) as char))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_expected_length_and_charset() {
        let code = generate_confirmation_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_are_not_repeated() {
        // Not a randomness proof, but catches a broken generator.
        let a = generate_confirmation_code();
        let b = generate_confirmation_code();
        assert_ne!(a, b);
    }
}

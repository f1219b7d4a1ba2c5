use rand::Rng;

use crate::error::{BookingError, BookingResult};

/// Alphabet for code suffixes. Ambiguous glyphs (0/O, 1/I) are left out so
/// codes survive being read over the phone.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const DEFAULT_CODE_PREFIX: &str = "VYR";
pub const DEFAULT_CODE_LENGTH: u32 = 8;
pub const DEFAULT_CODE_ATTEMPTS: u32 = 8;

/// Generates human-readable reservation codes.
///
/// Codes are random, so uniqueness is checked against storage and colliding
/// candidates are regenerated. The retry budget is bounded; exhausting it is
/// a fatal `CodeGenerationFailed`, expected to be astronomically rare.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    prefix: String,
    suffix_len: u32,
    max_attempts: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_PREFIX, DEFAULT_CODE_LENGTH, DEFAULT_CODE_ATTEMPTS)
    }
}

impl CodeGenerator {
    pub fn new(prefix: &str, suffix_len: u32, max_attempts: u32) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix_len: suffix_len.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// One random candidate, e.g. `VYR-K7TQ2MWP`.
    pub fn candidate(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..self.suffix_len)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        format!("{}-{}", self.prefix, suffix)
    }

    /// Generate a code not yet taken according to `is_taken`, within the
    /// retry budget.
    pub fn generate(&self, mut is_taken: impl FnMut(&str) -> bool) -> BookingResult<String> {
        for _ in 0..self.max_attempts {
            let code = self.candidate();
            if !is_taken(&code) {
                return Ok(code);
            }
        }
        Err(BookingError::CodeGenerationFailed {
            attempts: self.max_attempts,
        })
    }
}

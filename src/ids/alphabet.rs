use std::fmt;

use serde::Deserialize;
use shorty_error::ValidationError;

const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Character set random identifiers are drawn from.
///
/// Between 2 and 256 distinct printable ASCII characters, none of them `:`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Alphabet {
    chars: Vec<u8>,
    /// Bytes at or above this bound are rejected so every character is
    /// equally likely.
    limit: u16,
}

impl Alphabet {
    pub fn new(chars: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidArgument {
            reason: format!("alphabet {reason}"),
        };

        let bytes = chars.as_bytes();
        if !(2..=256).contains(&bytes.len()) {
            return Err(invalid("must have between 2 and 256 characters"));
        }
        if !bytes.iter().all(|b| b.is_ascii_graphic() && *b != b':') {
            return Err(invalid("must be printable ASCII without ':'"));
        }
        let mut seen = [false; 128];
        for &b in bytes {
            if seen[b as usize] {
                return Err(invalid("must not repeat characters"));
            }
            seen[b as usize] = true;
        }

        let n = bytes.len() as u16;
        Ok(Self {
            chars: bytes.to_vec(),
            limit: 256 - (256 % n),
        })
    }

    pub fn alphanumeric() -> Self {
        Self {
            chars: ALPHANUMERIC.as_bytes().to_vec(),
            limit: 256 - (256 % ALPHANUMERIC.len() as u16),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn contains(
        &self,
        c: char,
    ) -> bool {
        c.is_ascii() && self.chars.contains(&(c as u8))
    }

    /// Maps a random byte to a character, or `None` if the byte is rejected.
    pub fn map_byte(
        &self,
        byte: u8,
    ) -> Option<char> {
        if u16::from(byte) >= self.limit {
            return None;
        }
        Some(self.chars[byte as usize % self.chars.len()] as char)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::alphanumeric()
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        // Characters are all ASCII, checked in `new`.
        write!(f, "Alphabet({:?})", String::from_utf8_lossy(&self.chars))
    }
}

impl TryFrom<String> for Alphabet {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier codec: short symbolic names packed into a `u64`.
//!
//! The alphabet is `.12345abcdefghijklmnopqrstuvwxyz` (symbol values 0..31).
//! The first 12 characters take 5 bits each starting at the most significant
//! bit; a 13th character takes the low 4 bits, so it is limited to `.`,
//! `1`-`5` and `a`-`j`. Unused positions are zero, which decodes as `.` and
//! is trimmed from the text form.
#![allow(clippy::cast_possible_truncation)]

use core::fmt;
use core::str::FromStr;

use crate::error::{AbiError, Result};

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Longest name the 64-bit form can hold.
pub const MAX_NAME_LEN: usize = 13;

/// A name in its packed 64-bit form.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

impl Name {
    /// Wrap a raw packed value. Every `u64` is a valid name.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Packed value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Encode text into a name.
    pub fn encode(text: &str) -> Result<Self> {
        string_to_name(text).map(Self)
    }

    /// Text form with trailing `.` trimmed.
    #[must_use]
    pub fn decode(self) -> String {
        name_to_string(self.0)
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'.' => Some(0),
        _ => None,
    }
}

/// Pack `text` into its 64-bit form.
pub fn string_to_name(text: &str) -> Result<u64> {
    if text.chars().count() > MAX_NAME_LEN {
        return Err(AbiError::TooLong);
    }
    let mut value = 0u64;
    for (i, c) in text.chars().enumerate() {
        let sym = u8::try_from(c)
            .ok()
            .and_then(char_to_symbol)
            .ok_or(AbiError::InvalidCharacter(c))?;
        if i < MAX_NAME_LEN - 1 {
            value |= sym << (64 - 5 * (i + 1));
        } else {
            if sym > 0x0f {
                return Err(AbiError::InvalidCharacter(c));
            }
            value |= sym;
        }
    }
    Ok(value)
}

/// Unpack a 64-bit name. Never fails.
#[must_use]
pub fn name_to_string(value: u64) -> String {
    let mut out = [b'.'; MAX_NAME_LEN];
    let mut tmp = value;
    for i in 0..MAX_NAME_LEN {
        let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
        // mask keeps the index below 32
        out[MAX_NAME_LEN - 1 - i] = CHARMAP[(tmp & mask) as usize];
        tmp >>= shift;
    }
    let len = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
    out[..len].iter().map(|&c| char::from(c)).collect()
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&name_to_string(self.0))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", name_to_string(self.0))
    }
}

impl FromStr for Name {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::encode(s)
    }
}

impl TryFrom<&str> for Name {
    type Error = AbiError;

    fn try_from(value: &str) -> Result<Self> {
        Self::encode(value)
    }
}

impl From<u64> for Name {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Name> for u64 {
    fn from(value: Name) -> Self {
        value.0
    }
}

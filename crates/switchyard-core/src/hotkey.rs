//! Global hotkey values.
//!
//! A [`Hotkey`] is a key letter from `A` to `Z` plus a set of
//! [`Modifiers`]. Its canonical string form lists modifier tokens separated
//! by single spaces, followed by the key letter:
//!
//! ```
//! use switchyard_core::{Hotkey, Modifiers};
//!
//! let hk: Hotkey = "ctrl alt A".parse().unwrap();
//! assert_eq!(hk.modifiers(), Modifiers::CONTROL | Modifiers::ALT);
//! assert_eq!(hk.key(), 'A');
//! assert_eq!(hk.to_string(), "alt ctrl A");
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::{LiteralError, ReactorError, Result};

bitflags! {
    /// Modifier keys of a hotkey combination.
    ///
    /// Bit values match the native registration flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        /// Either Alt key.
        const ALT = 0x0001;
        /// Either Control key.
        const CONTROL = 0x0002;
        /// Either Shift key.
        const SHIFT = 0x0004;
        /// Either platform (Windows/Super) key.
        const WIN = 0x0008;
        /// Holding the combination down counts as a single press.
        const NO_REPEAT = 0x4000;
    }
}

/// Modifier tokens in canonical order.
const MODIFIER_TOKENS: [(&str, Modifiers); 5] = [
    ("alt", Modifiers::ALT),
    ("ctrl", Modifiers::CONTROL),
    ("shift", Modifiers::SHIFT),
    ("win", Modifiers::WIN),
    ("nr", Modifiers::NO_REPEAT),
];

const DELIMITER: char = ' ';

/// A key letter combined with modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    key: u8,
    modifiers: Modifiers,
}

impl Hotkey {
    /// Create a hotkey.
    ///
    /// # Errors
    ///
    /// Fails with [`LiteralError::InvalidKey`] unless `key` is in `A..=Z`.
    pub fn new(key: char, modifiers: Modifiers) -> Result<Self> {
        if !key.is_ascii_uppercase() {
            return Err(LiteralError::InvalidKey(key).into());
        }
        Ok(Self {
            key: key as u8,
            modifiers,
        })
    }

    /// Create a hotkey from a letter known at compile time.
    ///
    /// Meant for constants; evaluation fails to compile if `key` is not in
    /// `A..=Z`.
    pub const fn letter(key: char, modifiers: Modifiers) -> Self {
        assert!(key.is_ascii_uppercase(), "hotkey key must be in A..=Z");
        Self {
            key: key as u8,
            modifiers,
        }
    }

    /// Parse the canonical string form.
    pub fn parse(literal: &str) -> std::result::Result<Self, LiteralError> {
        if literal.is_empty() {
            return Err(LiteralError::Empty);
        }

        let mut modifiers = Modifiers::empty();
        let mut key = None;
        let mut tokens = literal.split(DELIMITER).peekable();

        while let Some(token) = tokens.next() {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (None, _) => return Err(LiteralError::EmptyToken),
                (Some(c), None) => {
                    if tokens.peek().is_some() {
                        return Err(LiteralError::KeyNotLast);
                    }
                    if !c.is_ascii_uppercase() {
                        return Err(LiteralError::InvalidKey(c));
                    }
                    key = Some(c as u8);
                }
                _ => {
                    let (name, modifier) = MODIFIER_TOKENS
                        .iter()
                        .find(|(name, _)| *name == token)
                        .copied()
                        .ok_or_else(|| LiteralError::UnknownModifier(token.to_string()))?;
                    if modifiers.contains(modifier) {
                        return Err(LiteralError::DuplicateModifier(name));
                    }
                    modifiers |= modifier;
                }
            }
        }

        let key = key.ok_or(LiteralError::MissingKey)?;
        Ok(Self { key, modifiers })
    }

    /// The key letter.
    pub fn key(&self) -> char {
        self.key as char
    }

    /// The native virtual key code (equal to the ASCII letter).
    pub fn key_code(&self) -> u32 {
        u32::from(self.key)
    }

    /// The modifier set.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// The same key with a different modifier set.
    pub fn with_modifiers(self, modifiers: Modifiers) -> Self {
        Self { modifiers, ..self }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, modifier) in MODIFIER_TOKENS {
            if self.modifiers.contains(modifier) {
                write!(f, "{name}{DELIMITER}")?;
            }
        }
        write!(f, "{}", self.key())
    }
}

impl FromStr for Hotkey {
    type Err = ReactorError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::parse(s)?)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Hotkey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Hotkey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        Hotkey::parse(&literal).map_err(serde::de::Error::custom)
    }
}

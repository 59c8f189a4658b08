//! Error types for the Switchyard reactor core.

use crate::hotkey::Hotkey;

/// The main error type for reactor operations.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    /// The hotkey combination is already claimed, either by the host
    /// environment or by this process under a different identity.
    #[error("couldn't register <{hotkey}> key combination: {reason}")]
    RegistrationConflict {
        /// The combination that could not be claimed.
        hotkey: Hotkey,
        /// Platform-provided description of the refusal.
        reason: String,
    },

    /// A hotkey or color literal violates its grammar.
    #[error("malformed literal: {0}")]
    MalformedLiteral(#[from] LiteralError),

    /// A method callback cannot be matched to the composite's dynamic type.
    #[error("cannot bind a method of `{component}` to composite `{composite}`")]
    Binding {
        /// Type that declares the requested method.
        component: &'static str,
        /// Type of the composite the registry is anchored to.
        composite: &'static str,
    },

    /// The operation is not valid in the current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The platform failed to create a target.
    #[error("failed to create target: {0}")]
    TargetCreation(String),
}

impl ReactorError {
    /// Create a registration conflict error.
    pub fn conflict(hotkey: Hotkey, reason: impl Into<String>) -> Self {
        Self::RegistrationConflict {
            hotkey,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a registration conflict.
    ///
    /// Callers implementing a fallback policy retry only on this kind.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RegistrationConflict { .. })
    }
}

/// Grammar violations for hotkey and color literals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    /// The literal is empty.
    #[error("literal is empty")]
    Empty,
    /// The literal contains an empty token (only whitespace, or repeated separators).
    #[error("literal contains only whitespace or an empty token")]
    EmptyToken,
    /// A modifier token is not recognized.
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    /// A modifier appears more than once.
    #[error("duplicate modifier `{0}`")]
    DuplicateModifier(&'static str),
    /// The key token is followed by more tokens.
    #[error("key code character must be last")]
    KeyNotLast,
    /// The literal has no key token.
    #[error("literal has no key code character")]
    MissingKey,
    /// The key is outside the `A`..=`Z` range.
    #[error("acceptable key codes are chars from [A, Z], got `{0}`")]
    InvalidKey(char),
    /// A color channel is above 255.
    #[error("channel value {0} must not be greater than 255")]
    ChannelOutOfRange(u32),
    /// A color literal contains something other than digits and commas.
    #[error("invalid character `{0}`")]
    InvalidCharacter(char),
    /// A color literal does not have exactly three channels.
    #[error("expected 3 channels, got {0}")]
    ChannelCount(usize),
}

/// A specialized Result type for reactor operations.
pub type Result<T> = std::result::Result<T, ReactorError>;

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy shared by the name codec, resolver, codecs and registry.

use thiserror::Error;

/// Errors produced by every fallible operation in this crate.
///
/// Lower-level failures are wrapped in [`AbiError::Context`] as they bubble
/// up so the message names the field, type or message being processed. Use
/// [`AbiError::root`] to match on the underlying kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    /// A name contained a character outside `.12345a-z` (or above `j` in the
    /// 13th position).
    #[error("invalid character {0:?} in name")]
    InvalidCharacter(char),
    /// A name was longer than 13 characters.
    #[error("name is longer than 13 characters")]
    TooLong,
    /// An alias chain revisited a name.
    #[error("alias cycle through \"{0}\"")]
    CyclicAlias(String),
    /// A struct base chain revisited a struct.
    #[error("struct base cycle through \"{0}\"")]
    CyclicBase(String),
    /// A type name is not a built-in, alias, struct, variant or wrapper.
    #[error("unknown type \"{0}\"")]
    UnknownType(String),
    /// A variant definition is unusable.
    #[error("invalid variant \"{name}\": {reason}")]
    InvalidVariant {
        /// Variant name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A type definition breaks a structural rule (redefinition, misplaced
    /// extension, bad wrapper nesting, non-struct base).
    #[error("invalid definition of \"{name}\": {reason}")]
    InvalidDefinition {
        /// Offending type name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The schema document declares a version outside the supported set.
    #[error("unsupported abi version \"{0}\"")]
    UnsupportedVersion(String),
    /// The binary input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// Bytes were left over after the top-level value.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    /// A numeric literal does not fit the target width.
    #[error("numeric overflow: {0}")]
    NumericOverflow(String),
    /// A variant selector matched no alternative.
    #[error("unknown variant alternative {0}")]
    UnknownVariantAlternative(String),
    /// The JSON text could not be parsed.
    #[error("malformed json: {0}")]
    Json(String),
    /// A JSON object repeated a key.
    #[error("duplicate key \"{0}\"")]
    DuplicateKey(String),
    /// Strict mode found a key belonging to a later field.
    #[error("expected field \"{expected}\", found \"{found}\"")]
    FieldOrder {
        /// Field the encoder was positioned at.
        expected: String,
        /// Key actually present.
        found: String,
    },
    /// A required field was absent from a JSON object.
    #[error("missing field \"{0}\"")]
    MissingField(String),
    /// A JSON object carried a key no field claims.
    #[error("unknown field \"{0}\"")]
    UnknownField(String),
    /// A JSON or binary value has the wrong shape for its type.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// Nesting exceeded the codec depth bound.
    #[error("recursion limit reached")]
    RecursionLimit,
    /// A message name, type name or contract is not known.
    #[error("{0} not found")]
    NotFound(String),
    /// An inner error with the location it occurred at.
    #[error("{context}: {source}")]
    Context {
        /// Field, type or message being processed.
        context: String,
        /// Underlying failure.
        source: Box<AbiError>,
    },
}

impl AbiError {
    /// Wrap `self` with a location description.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error with every [`AbiError::Context`] layer removed.
    #[must_use]
    pub fn root(&self) -> &AbiError {
        let mut err = self;
        while let Self::Context { source, .. } = err {
            err = source;
        }
        err
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidValue(what.into())
    }

    pub(crate) fn definition(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AbiError>;

/// Extension for attaching context to results lazily.
pub(crate) trait ResultExt<T> {
    fn context_with<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context_with<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

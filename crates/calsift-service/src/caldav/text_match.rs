//! RFC 4790 collations for `CALDAV:text-match`.

use calsift_core::constants::{COLLATION_ASCII_CASEMAP, COLLATION_OCTET};
use calsift_rfc::rfc::dav::core::TextMatch;

use crate::error::{FilterError, FilterResult};

/// Supported casemap modes for text matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casemap {
    /// Case-sensitive (i;octet).
    Octet,
    /// ASCII-only casemap (i;ascii-casemap).
    Ascii,
}

impl Casemap {
    /// Converts a collation name to a casemap mode.
    ///
    /// ## Errors
    /// Returns [`FilterError::UnsupportedCollation`] if the collation is unknown.
    pub fn from_collation(collation: &str) -> FilterResult<Self> {
        match collation {
            COLLATION_OCTET => Ok(Self::Octet),
            COLLATION_ASCII_CASEMAP => Ok(Self::Ascii),
            unsupported => Err(FilterError::UnsupportedCollation(unsupported.to_owned())),
        }
    }

    /// Substring search of `pattern` in `text` under this casemap.
    ///
    /// ASCII casemap only folds `A-Z`; other bytes compare as they are.
    #[must_use]
    pub fn contains(self, text: &str, pattern: &str) -> bool {
        match self {
            Self::Octet => text.contains(pattern),
            Self::Ascii => text
                .to_ascii_lowercase()
                .contains(&pattern.to_ascii_lowercase()),
        }
    }
}

/// ## Summary
/// Applies a text-match to one value, including `negate-condition`.
///
/// ## Errors
/// Returns [`FilterError::UnsupportedCollation`] for unknown collations.
pub fn text_matches(text_match: &TextMatch, text: &str) -> FilterResult<bool> {
    let casemap = Casemap::from_collation(&text_match.collation)?;
    let found = casemap.contains(text, &text_match.value);
    tracing::trace!(
        pattern = %text_match.value,
        collation = %text_match.collation,
        negate = text_match.negate,
        found,
        "Evaluated text-match"
    );
    Ok(found != text_match.negate)
}

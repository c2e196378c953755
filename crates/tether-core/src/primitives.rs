//! # Keying Primitives
//!
//! Fixed constants and key builders for the tether cache.
//!
//! Every relationship side is addressed by a side key `"type:relationship"`.
//! A relationship pair is addressed by a canonical pair key built from both
//! side keys, so that looking a pair up from either side lands on the same
//! ledger.

/// Separator between the type name and relationship name in a side key.
pub const SIDE_KEY_SEPARATOR: char = ':';

/// Separator between the two side keys in a canonical pair key.
///
/// Chosen so it cannot collide with `SIDE_KEY_SEPARATOR`.
pub const PAIR_KEY_SEPARATOR: char = '|';

/// Build the side key for one relationship side.
///
/// A side with no type and no relationship (a relationship without an
/// inverse) yields the bare separator.
#[must_use]
pub fn side_key(type_name: &str, relationship: &str) -> String {
    format!("{type_name}{SIDE_KEY_SEPARATOR}{relationship}")
}

/// Build the canonical pair key from both side keys.
///
/// The lexically smaller side key always comes first.
#[must_use]
pub fn canonical_pair_key(lhs: &str, rhs: &str) -> String {
    let (first, second) = if lhs <= rhs { (lhs, rhs) } else { (rhs, lhs) };
    format!("{first}{PAIR_KEY_SEPARATOR}{second}")
}

//! Field comparison between claimed and authoritative names
//!
//! Exact, case-insensitive equality per field. No fuzzy or partial matching.

use crate::record::{MatchFlags, NameFields};

/// Compute independent match flags for the three name fields.
pub fn compare(input: &NameFields, authoritative: &NameFields) -> MatchFlags {
    MatchFlags {
        given_name: equal_ignore_case(&input.given_name, &authoritative.given_name),
        first_surname: equal_ignore_case(&input.first_surname, &authoritative.first_surname),
        second_surname: equal_ignore_case(&input.second_surname, &authoritative.second_surname),
    }
}

/// Unicode-aware case-insensitive equality (handles Ñ, accented vowels).
pub fn equal_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

//! # Truncate
//!
//! Byte-budgeted text shortening that never splits a multi-byte character.
//!
//! Credential hashing downstream accepts at most [`PASSWORD_MAX_BYTES`] bytes
//! of UTF-8. Rather than letting the hasher silently cut inside a character,
//! the client shortens the input itself and reports whether it did.
//!
//! The budget is a [`NonZeroUsize`]: a zero budget cannot be expressed, so
//! [`truncate`] has no error path.

use std::num::NonZeroUsize;

/// Byte limit of the credential hasher used by the remote API.
pub const PASSWORD_MAX_BYTES: NonZeroUsize = match NonZeroUsize::new(72) {
    Some(n) => n,
    None => panic!("password byte limit must be non-zero"),
};

/// Outcome of [`truncate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// The (possibly shortened) text; always within the budget.
    pub value: String,
    /// `true` iff `value` differs from the input.
    pub was_truncated: bool,
}

/// Shorten `input` to the longest character-aligned prefix whose UTF-8
/// encoding fits in `max_bytes`.
pub fn truncate(input: &str, max_bytes: NonZeroUsize) -> Truncation {
    let budget = max_bytes.get();
    if input.len() <= budget {
        return Truncation {
            value: input.to_string(),
            was_truncated: false,
        };
    }

    // cuts[k] is the byte length of the first k characters.
    let cuts: Vec<usize> = input
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(input.len()))
        .collect();

    // Invariant: the prefix of `low` characters fits; the prefix of `high`
    // characters does not (high starts at the full input, which overflows).
    let mut low = 0usize;
    let mut high = cuts.len() - 1;
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if cuts[mid] <= budget {
            low = mid;
        } else {
            high = mid;
        }
    }

    let mut value = input[..cuts[low]].to_string();
    while value.len() > budget && value.pop().is_some() {}

    Truncation {
        value,
        was_truncated: true,
    }
}

/// [`truncate`] with the credential hasher's 72-byte limit.
pub fn truncate_password(input: &str) -> Truncation {
    truncate(input, PASSWORD_MAX_BYTES)
}

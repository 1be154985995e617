//! Contract checks for [`truncate`](crate::truncate::truncate), shared by the
//! unit and property tests.

#![allow(dead_code)]

use crate::truncate::Truncation;

/// The result never exceeds the byte budget.
pub fn assert_within_budget(result: &Truncation, budget: usize) {
    assert!(
        result.value.len() <= budget,
        "truncated value is {} bytes, budget is {}",
        result.value.len(),
        budget
    );
}

/// The result is a prefix of the input ending on a character boundary.
pub fn assert_char_aligned_prefix(input: &str, result: &Truncation) {
    let end = result.value.len();
    assert!(
        input.is_char_boundary(end),
        "cut at byte {end} splits a character"
    );
    assert_eq!(&input[..end], result.value, "result is not a prefix of the input");
}

/// `was_truncated` is set exactly when the value changed, and a truncated
/// value only appears when the input did not fit.
pub fn assert_flag_consistent(input: &str, result: &Truncation, budget: usize) {
    if result.was_truncated {
        assert!(input.len() > budget, "fitting input reported as truncated");
        assert_ne!(result.value, input);
    } else {
        assert_eq!(result.value, input);
    }
}

/// No longer character-aligned prefix would still fit.
pub fn assert_maximal(input: &str, result: &Truncation, budget: usize) {
    if !result.was_truncated {
        return;
    }
    if let Some(next) = input[result.value.len()..].chars().next() {
        assert!(
            result.value.len() + next.len_utf8() > budget,
            "a longer prefix ({} bytes) would fit the budget {}",
            result.value.len() + next.len_utf8(),
            budget
        );
    }
}

pub fn assert_truncation_contract(input: &str, result: &Truncation, budget: usize) {
    assert_within_budget(result, budget);
    assert_char_aligned_prefix(input, result);
    assert_flag_consistent(input, result, budget);
    assert_maximal(input, result, budget);
}

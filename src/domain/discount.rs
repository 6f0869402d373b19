//! Fixed discount code table.

/// Valid codes and the percentage they take off the subtotal.
///
/// Lookups are exact and case-sensitive.
pub const DISCOUNT_CODES: &[(&str, i32)] = &[("SAVE10", 10), ("SAVE20", 20), ("WELCOME", 15)];

/// Percentage for `code`, or `None` if the code is not in the table.
pub fn percent_for(code: &str) -> Option<i32> {
    DISCOUNT_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, percent)| *percent)
}

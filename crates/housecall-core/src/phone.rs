//! Phone number normalization.
//!
//! Everything that matches callers to leads keys on the canonical form
//! produced here, so lookups, lead creation, and the CRM sync all have to
//! agree on it. The rules are deliberately simple: strip formatting,
//! assume US for bare ten-digit numbers, and when a value cannot
//! plausibly be a phone number at all, pass it through unchanged rather
//! than guess.

/// Normalizes a raw phone string to E.164 where possible.
///
/// Rules, in order:
/// - Input starting with `+`: keep the digits, reattach the `+`.
/// - Exactly 10 digits: assume US, prefix `+1`.
/// - Exactly 11 digits starting with `1`: US with country code, prefix `+`.
/// - Any other digit count between 7 and 15: prefix `+` and keep as-is.
/// - Fewer than 7 or more than 15 digits: return the input unchanged.
///
/// The unchanged-input fallback means two sides that both store the
/// "un-normalizable" raw value still match each other.
///
/// # Example
///
/// ```
/// use housecall_core::phone::normalize;
/// assert_eq!(normalize("(555) 123-4567"), "+15551234567");
/// assert_eq!(normalize("+44 20 7946 0958"), "+442079460958");
/// assert_eq!(normalize("ext. 42"), "ext. 42");
/// ```
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < 7 || digits.len() > 15 {
        return raw.to_string();
    }

    if trimmed.starts_with('+') {
        return format!("+{digits}");
    }

    match digits.len() {
        10 => format!("+1{digits}"),
        11 if digits.starts_with('1') => format!("+{digits}"),
        _ => format!("+{digits}"),
    }
}

/// Normalizes an optional phone, mapping empty or whitespace-only input
/// to `None`.
pub fn normalize_opt(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(normalize(raw))
}

/// Whether a string is already in canonical E.164 shape.
pub fn is_e164(value: &str) -> bool {
    let Some(rest) = value.strip_prefix('+') else {
        return false;
    };
    (7..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
}

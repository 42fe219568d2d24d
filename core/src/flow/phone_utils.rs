//! Phone number utilities for the verification flow.

use once_cell::sync::Lazy;
use regex::Regex;

/// Regular expression for valid E.164 format
/// E.164 format: + followed by 1-3 digit country code (no leading 0) and up to 14 total digits
static E164_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{6,14}$").unwrap()
});

/// Checks whether a phone number is plausibly in E.164 format
///
/// This is a syntactic gate only; the provider remains the authority on
/// whether the number can actually receive a code.
///
/// # Arguments
///
/// * `phone` - Phone number to check
///
/// # Returns
///
/// * `bool` - True if the number looks like valid E.164, false otherwise
pub fn is_plausible_e164(phone: &str) -> bool {
    E164_REGEX.is_match(phone)
}

/// Masks a phone number for logging, keeping only the last 4 characters
///
/// Counts characters rather than bytes: the input has not necessarily
/// passed the E.164 gate and may contain multibyte characters.
///
/// # Arguments
///
/// * `phone` - Phone number to mask
///
/// # Returns
///
/// * `String` - Masked phone number (e.g., "***7890")
pub fn mask_phone(phone: &str) -> String {
    let count = phone.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = phone.chars().skip(count - 4).collect();
    format!("***{}", tail)
}

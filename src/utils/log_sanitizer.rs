// ============================================================================
// Log Sanitization
// ============================================================================
//
// Record ids arrive in request paths and record-store text arrives from
// whoever edited the base. Both are cleaned before they reach a log line:
// newlines and ANSI sequences are stripped so a value cannot forge entries
// or repaint a terminal, and long values are truncated.
//
// ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters kept from a logged value
const MAX_LOG_LENGTH: usize = 200;

static ANSI_ESCAPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("static ANSI pattern"));

/// Sanitize untrusted text for a single log line.
///
/// ```
/// use freight_erp_sync::utils::log_sanitizer::sanitize_for_log;
///
/// assert_eq!(sanitize_for_log("recA1\nINFO forged"), "recA1 INFO forged");
/// assert_eq!(sanitize_for_log("M-7\x1b[31m"), "M-7");
/// ```
pub fn sanitize_for_log(input: &str) -> String {
    let no_ansi = ANSI_ESCAPE_REGEX.replace_all(input, "");

    let cleaned: String = no_ansi
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    // Truncate on a char boundary; record-store text is often non-ASCII.
    match cleaned.char_indices().nth(MAX_LOG_LENGTH) {
        Some((cut, _)) => format!("{}...", &cleaned[..cut]),
        None => cleaned,
    }
}

pub fn sanitize_option_for_log(input: Option<&str>) -> String {
    input.map(sanitize_for_log).unwrap_or_else(|| "None".to_string())
}

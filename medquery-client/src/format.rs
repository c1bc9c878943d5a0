//! Pure display formatters.
//!
//! Total over their inputs: absent, empty or unparseable values render as
//! `"N/A"` (counts as `"0"`), never as an error. Truncation works on
//! characters, not bytes, so multi-byte input cannot split a boundary.

use chrono::DateTime;

const NOT_AVAILABLE: &str = "N/A";

/// Shortens a wallet address for display.
///
/// Addresses up to 12 characters render unchanged; longer ones keep the
/// first and last 6 characters around an ellipsis.
///
/// ```
/// use medquery_client::format;
///
/// assert_eq!(
///     format::wallet_address(Some("0x1234567890abcdef1234")),
///     "0x1234...ef1234"
/// );
/// assert_eq!(format::wallet_address(Some("0xabc")), "0xabc");
/// assert_eq!(format::wallet_address(None), "N/A");
/// ```
pub fn wallet_address(value: Option<&str>) -> String {
    truncate_middle(value, 12, 6, 6)
}

/// Shortens a transaction hash or signature for display.
///
/// Values up to 16 characters render unchanged; longer ones keep the first
/// and last 8 characters around an ellipsis.
pub fn tx_hash(value: Option<&str>) -> String {
    truncate_middle(value, 16, 8, 8)
}

/// Formats an RFC 3339 timestamp as a date, `2026-08-25`.
pub fn date(value: Option<&str>) -> String {
    rfc3339(value, "%Y-%m-%d")
}

/// Formats an RFC 3339 timestamp with time of day, `2026-08-25 14:05`.
pub fn datetime(value: Option<&str>) -> String {
    rfc3339(value, "%Y-%m-%d %H:%M")
}

/// Formats a counter with thousands separators; absent counts render as
/// `"0"`.
pub fn count(value: Option<u64>) -> String {
    let mut digits = value.unwrap_or(0).to_string();
    let mut at = digits.len() as isize - 3;
    while at > 0 {
        digits.insert(at as usize, ',');
        at -= 3;
    }
    digits
}

fn truncate_middle(value: Option<&str>, max: usize, head: usize, tail: usize) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    let head: String = chars[..head].iter().collect();
    let tail: String = chars[chars.len() - tail..].iter().collect();
    format!("{head}...{tail}")
}

fn rfc3339(value: Option<&str>, pattern: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|parsed| parsed.format(pattern).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_truncates_long_addresses() {
        assert_eq!(
            wallet_address(Some("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb1")),
            "0x742d...f0bEb1"
        );
    }

    #[test]
    fn wallet_at_threshold_is_unchanged() {
        assert_eq!(wallet_address(Some("0x1234567890")), "0x1234567890");
        assert_eq!(wallet_address(Some("0x1234567890ab")), "0x1234567890ab");
    }

    #[test]
    fn wallet_absent_or_empty_is_not_available() {
        assert_eq!(wallet_address(None), "N/A");
        assert_eq!(wallet_address(Some("")), "N/A");
    }

    #[test]
    fn hash_truncates_past_sixteen_chars() {
        assert_eq!(
            tx_hash(Some("0xdeadbeefcafef00d0123456789abcdef")),
            "0xdeadbe...89abcdef"
        );
        assert_eq!(tx_hash(Some("0xdeadbeefcafe00")), "0xdeadbeefcafe00");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 13 two-byte characters must not split mid-character.
        let wide = "ééééééééééééé";
        assert_eq!(wallet_address(Some(wide)), "éééééé...éééééé");
    }

    #[test]
    fn dates_parse_rfc3339() {
        assert_eq!(date(Some("2026-08-25T14:05:00Z")), "2026-08-25");
        assert_eq!(datetime(Some("2026-08-25T14:05:00+02:00")), "2026-08-25 14:05");
    }

    #[test]
    fn unparseable_dates_are_not_available() {
        assert_eq!(date(Some("yesterday")), "N/A");
        assert_eq!(datetime(None), "N/A");
        assert_eq!(datetime(Some("")), "N/A");
    }

    #[test]
    fn counts_group_thousands() {
        assert_eq!(count(None), "0");
        assert_eq!(count(Some(0)), "0");
        assert_eq!(count(Some(999)), "999");
        assert_eq!(count(Some(1_000)), "1,000");
        assert_eq!(count(Some(1_234_567)), "1,234,567");
    }
}

//! Timestamp helpers.
//!
//! All persisted timestamps are RFC 3339 strings in UTC with millisecond
//! precision, matching the wire format clients expect.

/// Current UTC time as an RFC 3339 string with millisecond precision.
#[must_use]
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_iso_parses_back() {
        let ts = now_iso();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn now_iso_is_utc() {
        assert!(now_iso().ends_with('Z'));
    }
}

use chrono::{DateTime, Local};

/// Returns true if the given string is a well-formed AWS account id
/// (exactly 12 ASCII digits).
pub fn validate_account_id(account_id: &str) -> bool {
    account_id.len() == 12 && account_id.bytes().all(|b| b.is_ascii_digit())
}

/// Formats a timestamp the way report filenames expect it
/// (`YYYYMMDD_HHMMSS`, local time).
pub fn filename_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_validate_account_id_accepts_twelve_digits() {
        assert!(validate_account_id("123456789012"));
        assert!(validate_account_id("000000000000"));
    }

    #[test]
    fn test_validate_account_id_rejects_malformed_ids() {
        let negatives = [
            "",
            "12345678901",   // 11 digits
            "1234567890123", // 13 digits
            "12345678901a",
            "123-45678901",
            " 123456789012",
        ];
        for id in negatives {
            assert!(!validate_account_id(id), "account id {id:?} should be rejected");
        }
    }

    #[test]
    fn test_filename_timestamp_format() {
        let ts = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 42).unwrap();
        assert_eq!(filename_timestamp(ts), "20240307_090542");
    }
}

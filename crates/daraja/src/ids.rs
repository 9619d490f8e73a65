//! Timestamps, STK passwords and correlation IDs.

use base64::Engine;
use chrono::{DateTime, FixedOffset, Local, Utc};
use rand::Rng;

/// Daraja's `Timestamp` field format.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_RANDOM_LEN: usize = 8;

/// Current time as `YYYYMMDDHHMMSS`, in the given UTC offset or the local zone.
pub fn timestamp(utc_offset_minutes: Option<i32>) -> String {
    format_timestamp(Utc::now(), utc_offset_minutes)
}

pub(crate) fn format_timestamp(now: DateTime<Utc>, utc_offset_minutes: Option<i32>) -> String {
    let fixed = utc_offset_minutes
        .and_then(|m| m.checked_mul(60))
        .and_then(FixedOffset::east_opt);

    match fixed {
        Some(tz) => now.with_timezone(&tz).format(TIMESTAMP_FORMAT).to_string(),
        None => {
            if utc_offset_minutes.is_some() {
                log::warn!("utc_offset_minutes out of range, using local time zone");
            }
            now.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
        }
    }
}

/// Shortcode, passkey and timestamp joined: the secret behind STK passwords.
pub fn stk_password_input(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    format!("{}{}{}", shortcode, passkey, timestamp)
}

/// Lipa Na M-Pesa Online password: base64(shortcode + passkey + timestamp).
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    let input = stk_password_input(shortcode, passkey, timestamp);
    base64::engine::general_purpose::STANDARD.encode(input)
}

/// `PREFIX-XXXXXXXX-<unix seconds>` where X is `[A-Z0-9]`.
pub fn originator_conversation_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..ID_RANDOM_LEN)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, random, Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_with_offset() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 22, 5, 9).unwrap();
        // EAT rolls over into the new year
        assert_eq!(format_timestamp(now, Some(180)), "20250101010509");
        assert_eq!(format_timestamp(now, Some(0)), "20241231220509");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp(None);
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()), "timestamp: {}", ts);
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_local() {
        let ts = format_timestamp(Utc::now(), Some(i32::MAX));
        assert_eq!(ts.len(), 14);
    }

    #[test]
    fn test_stk_password_known_value() {
        // Daraja sandbox shortcode/passkey pair
        let pw = stk_password(
            "174379",
            "bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919",
            "20160216165627",
        );
        assert_eq!(
            pw,
            "MTc0Mzc5YmZiMjc5ZjlhYTliZGJjZjE1OGU5N2RkNzFhNDY3Y2QyZTBjODkzMDU5YjEwZjc4ZTZiNzJhZGExZWQyYzkxOTIwMTYwMjE2MTY1NjI3"
        );
    }

    #[test]
    fn test_conversation_id_shape() {
        let before = Utc::now().timestamp();
        let id = originator_conversation_id("VAPOR");
        let after = Utc::now().timestamp();

        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3, "id: {}", id);
        assert_eq!(parts[0], "VAPOR");
        assert_eq!(parts[1].len(), 8);
        assert!(
            parts[1].bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()),
            "id: {}",
            id
        );

        let ts: i64 = parts[2].parse().unwrap();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_conversation_id_timestamps_non_decreasing() {
        let stamps: Vec<i64> = (0..50)
            .map(|_| {
                let id = originator_conversation_id("X");
                id.rsplit('-').next().unwrap().parse().unwrap()
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_conversation_ids_differ() {
        let a = originator_conversation_id("VAPOR");
        let b = originator_conversation_id("VAPOR");
        assert_ne!(a, b);
    }
}

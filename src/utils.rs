//! Common utilities shared across modules.

use chrono::Utc;

/// Current UTC timestamp in seconds since UNIX_EPOCH.
pub fn get_utc_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

/// Cut `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Split a `key=value` pair. The value may itself contain `=`.
pub fn parse_key_value(pair: &str) -> Result<(String, String), String> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{pair}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_utc_timestamp() {
        let ts = get_utc_timestamp();
        assert!(ts > 1577836800, "Timestamp should be after 2020-01-01");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("recategorización", 6), "recat…");
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("respuesta=a=b").unwrap(),
            ("respuesta".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}

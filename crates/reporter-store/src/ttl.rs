//! Duration grammar for artifact TTLs.

use std::time::Duration;

use crate::StoreError;

/// Parse a TTL string like `30d`, `12h`, `45m` or `90s`.
///
/// Bare digits default to days, matching how retention windows are usually
/// written upstream.
pub fn parse_ttl(value: &str) -> Result<Duration, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidTtl {
            value: value.to_string(),
            reason: "empty duration".to_string(),
        });
    }

    let (number, unit) = match trimmed.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&trimmed[..trimmed.len() - 1], Some(c)),
        _ => (trimmed, None),
    };

    let amount: u64 = number.parse().map_err(|_| StoreError::InvalidTtl {
        value: value.to_string(),
        reason: format!("invalid number {number:?}"),
    })?;

    let seconds = match unit {
        Some('s') => amount,
        Some('m') => amount * 60,
        Some('h') => amount * 3600,
        Some('d') | None => amount * 86_400,
        Some(other) => {
            return Err(StoreError::InvalidTtl {
                value: value.to_string(),
                reason: format!("unknown unit {other:?}"),
            });
        }
    };

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_each_unit() {
        assert_eq!(parse_ttl("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_ttl("45m").unwrap(), Duration::from_secs(45 * 60));
        assert_eq!(parse_ttl("12h").unwrap(), Duration::from_secs(12 * 3600));
        assert_eq!(parse_ttl("30d").unwrap(), Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn test_bare_digits_default_to_days() {
        assert_eq!(parse_ttl("7").unwrap(), Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_ttl("").is_err());
        assert!(parse_ttl("abc").is_err());
        assert!(parse_ttl("7x").is_err());
        assert!(parse_ttl("-3d").is_err());
    }
}

use std::sync::OnceLock;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Token meaning a paste never expires.
pub const NEVER: &str = "never";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExpiryError {
    #[error("malformed expiry token")]
    Malformed,
    #[error("expiry is too far in the future")]
    OutOfRange,
}

/// Compute the expiration instant for a paste created at `created_at`.
///
/// Tokens look like `10m`, `2h` or `3d`. Anything that is not a valid token
/// is treated like `never`, with a warning.
pub fn parse_expiry(created_at: DateTime<Utc>, token: &str) -> Option<DateTime<Utc>> {
    match parse_duration(token) {
        Ok(None) => None,
        Ok(Some(duration)) => match created_at.checked_add_signed(duration) {
            Some(expires_at) => Some(expires_at),
            None => {
                warn!("expiry token '{token}' overflows, treating as never");
                None
            }
        },
        Err(error) => {
            warn!("{error} '{token}', treating as never");
            None
        }
    }
}

/// Parse a token into a duration, `None` for `never`.
pub fn parse_duration(token: &str) -> Result<Option<Duration>, ExpiryError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();

    if token == NEVER {
        return Ok(None);
    }

    let pattern = PATTERN.get_or_init(|| Regex::new(r"^(\d+)([smhd])$").unwrap());
    let captures = pattern.captures(token).ok_or(ExpiryError::Malformed)?;

    let amount: u64 = captures[1].parse().map_err(|_| ExpiryError::OutOfRange)?;
    let unit_secs = match &captures[2] {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => unreachable!(),
    };

    let secs = amount
        .checked_mul(unit_secs)
        .ok_or(ExpiryError::OutOfRange)?;
    let duration =
        Duration::from_std(StdDuration::from_secs(secs)).map_err(|_| ExpiryError::OutOfRange)?;

    Ok(Some(duration))
}

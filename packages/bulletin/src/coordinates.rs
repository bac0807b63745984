//! `BasePoint` coordinate strings.
//!
//! JMA base points encode a position as `+<lat>+<lon>/`, where each number
//! is either decimal degrees (`35.4`) or a compact form with no decimal
//! point whose final two digits are the fractional part (`3543` -> `35.43`).

use std::num::ParseFloatError;

/// A parsed (longitude, latitude) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

/// Why a `BasePoint` text did not yield a position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    /// Fewer than three `+`-separated tokens.
    #[error("expected at least three '+'-separated tokens in {0:?}")]
    TooFewTokens(String),

    /// A latitude or longitude token is not a number.
    #[error("invalid coordinate {token:?}: {source}")]
    InvalidNumber {
        /// The token after `/` removal.
        token: String,
        /// Underlying parse error.
        source: ParseFloatError,
    },
}

/// Parses a single coordinate token.
///
/// `/` characters are removed first. A token containing `.` is decimal
/// degrees; otherwise a decimal point is inserted before the last two
/// characters.
///
/// # Errors
///
/// Returns [`CoordinateError::InvalidNumber`] if the result is not a number.
pub fn parse_coordinate(token: &str) -> Result<f64, CoordinateError> {
    let token = token.replace('/', "");

    let decimal = if token.contains('.') {
        token.clone()
    } else {
        let chars: Vec<char> = token.chars().collect();
        let split = chars.len().saturating_sub(2);
        let whole: String = chars[..split].iter().collect();
        let fraction: String = chars[split..].iter().collect();
        format!("{whole}.{fraction}")
    };

    decimal
        .trim()
        .parse::<f64>()
        .map_err(|source| CoordinateError::InvalidNumber { token, source })
}

/// Parses the text of a `BasePoint` element.
///
/// The text is trimmed and split on `+`. At least three tokens are
/// required; a leading empty token is skipped, then the first two tokens
/// are latitude and longitude. Any further tokens are ignored.
///
/// # Errors
///
/// Returns a [`CoordinateError`] if there are too few tokens or either
/// number is malformed.
pub fn parse_base_point(text: &str) -> Result<Position, CoordinateError> {
    let tokens: Vec<&str> = text.trim().split('+').collect();
    if tokens.len() < 3 {
        return Err(CoordinateError::TooFewTokens(text.to_string()));
    }

    let tokens = if tokens[0].is_empty() {
        &tokens[1..]
    } else {
        tokens.as_slice()
    };

    let lat = parse_coordinate(tokens[0])?;
    let lon = parse_coordinate(tokens[1])?;

    Ok(Position { lon, lat })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    #[test]
    fn decimal_token_parses_directly() {
        assert_close(parse_coordinate("/35.433/").unwrap(), 35.433);
    }

    #[test]
    fn compact_token_inserts_decimal_point() {
        assert_close(parse_coordinate("/35433/").unwrap(), 354.33);
        assert_close(parse_coordinate("3543").unwrap(), 35.43);
        assert_close(parse_coordinate("13970/").unwrap(), 139.70);
    }

    #[test]
    fn short_compact_token_is_all_fraction() {
        assert_close(parse_coordinate("5").unwrap(), 0.5);
    }

    #[test]
    fn empty_token_is_invalid() {
        assert!(matches!(
            parse_coordinate("/"),
            Err(CoordinateError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn parses_typhoon_position() {
        let position = parse_base_point(" +21.9+127.4/ ").unwrap();
        assert_close(position.lat, 21.9);
        assert_close(position.lon, 127.4);
    }

    #[test]
    fn parses_compact_position() {
        let position = parse_base_point("+3543+13970/").unwrap();
        assert_close(position.lat, 35.43);
        assert_close(position.lon, 139.70);
    }

    #[test]
    fn ignores_trailing_tokens() {
        let position = parse_base_point("+35.1+139.2+10/").unwrap();
        assert_close(position.lat, 35.1);
        assert_close(position.lon, 139.2);
    }

    #[test]
    fn rejects_too_few_tokens() {
        assert!(matches!(
            parse_base_point("35.1/"),
            Err(CoordinateError::TooFewTokens(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert!(parse_base_point("+north+east/").is_err());
    }
}

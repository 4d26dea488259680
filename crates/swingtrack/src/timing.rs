//! Time tokens used by experiment files.
//!
//! `12.5s` is seconds, `300f` is a frame count divided by the frame rate,
//! `1500ms` and a bare `1500` are milliseconds. All values resolve to
//! milliseconds.

/// Frame rate assumed when none is configured.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// A time token that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParseError {
    pub token: String,
    pub reason: String,
}

impl std::fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid time '{}': {}", self.token, self.reason)
    }
}

impl std::error::Error for TimeParseError {}

fn invalid(token: &str, reason: impl Into<String>) -> TimeParseError {
    TimeParseError {
        token: token.to_string(),
        reason: reason.into(),
    }
}

/// Resolve a single time token to milliseconds.
pub fn parse_time_ms(token: &str, frame_rate: f64) -> Result<f64, TimeParseError> {
    let t = token.trim();
    let number = |raw: &str| {
        raw.parse::<f64>()
            .map_err(|e| invalid(token, e.to_string()))
    };
    let ms = if let Some(raw) = t.strip_suffix("ms") {
        number(raw)?
    } else if let Some(raw) = t.strip_suffix('s') {
        number(raw)? * 1000.0
    } else if let Some(raw) = t.strip_suffix('f') {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(invalid(token, "frame count needs a positive frame rate"));
        }
        let frames: u64 = raw.parse().map_err(|e| invalid(token, format!("{}", e)))?;
        frames as f64 / frame_rate * 1000.0
    } else {
        number(t)?
    };
    if !ms.is_finite() {
        return Err(invalid(token, "not a finite time"));
    }
    Ok(ms)
}

/// Parse a `start-stop` range such as `2s-14.5s` into milliseconds.
pub fn parse_time_range(range: &str, frame_rate: f64) -> Result<(f64, f64), TimeParseError> {
    let (start, stop) = range
        .trim()
        .split_once('-')
        .ok_or_else(|| invalid(range, "expected <start>-<stop>"))?;
    let start = parse_time_ms(start, frame_rate)?;
    let stop = parse_time_ms(stop, frame_rate)?;
    if stop < start {
        return Err(invalid(range, "stop is before start"));
    }
    Ok((start, stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn suffixes_select_units() {
        assert_relative_eq!(parse_time_ms("2.5s", 30.0).unwrap(), 2500.0);
        assert_relative_eq!(parse_time_ms("90f", 30.0).unwrap(), 3000.0);
        assert_relative_eq!(parse_time_ms("120ms", 30.0).unwrap(), 120.0);
        assert_relative_eq!(parse_time_ms("750", 30.0).unwrap(), 750.0);
    }

    #[test]
    fn frame_tokens_use_configured_rate() {
        assert_relative_eq!(parse_time_ms("60f", 60.0).unwrap(), 1000.0);
        assert!(parse_time_ms("60f", 0.0).is_err());
        assert!(parse_time_ms("1.5f", 30.0).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = parse_time_ms("abc", 30.0).expect_err("not a number");
        assert_eq!(err.token, "abc");
        assert!(parse_time_ms("", 30.0).is_err());
    }

    #[test]
    fn ranges_split_on_dash() {
        let (a, b) = parse_time_range("1s-450f", 30.0).unwrap();
        assert_relative_eq!(a, 1000.0);
        assert_relative_eq!(b, 15000.0);
        assert!(parse_time_range("10s", 30.0).is_err());
        assert!(parse_time_range("10s-2s", 30.0).is_err());
    }
}

//! Argument normalization
//!
//! Every argument set is normalized on its own: bad values fall back to
//! fixed defaults instead of failing, so one malformed rule never keeps the
//! others from being installed.

use crate::pattern::NeedlePattern;
use crate::types::ArgumentSet;

/// Delay used when the threshold argument is missing or not a number.
pub const DEFAULT_DELAY: f64 = 1000.0;
/// Boost used when the boost argument is missing or not a number.
pub const DEFAULT_BOOST: f64 = 0.05;
pub const MIN_BOOST: f64 = 0.001;
pub const MAX_BOOST: f64 = 50.0;

/// Token that makes a threshold match any delay.
pub const ANY_DELAY: &str = "*";

/// Which interval delays an adjustment applies to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelayThreshold {
    Any,
    Exactly(f64),
}

impl DelayThreshold {
    #[inline]
    pub fn matches(&self, delay: f64) -> bool {
        match *self {
            Self::Any => true,
            Self::Exactly(threshold) => delay == threshold,
        }
    }
}

/// Delay value that generated scriptlets treat the same as `*`.
const ANY_DELAY_VALUE: f64 = -1.0;

/// Normalize the delay threshold argument.
///
/// `*` and any value that parses to -1 (`"-1"`, `"-1ms"`) match every
/// delay.
pub fn parse_delay(arg: &str) -> DelayThreshold {
    if arg == ANY_DELAY {
        return DelayThreshold::Any;
    }
    match parse_int_prefix(arg) {
        Some(delay) if delay == ANY_DELAY_VALUE => DelayThreshold::Any,
        Some(delay) if delay.is_finite() => DelayThreshold::Exactly(delay),
        _ => DelayThreshold::Exactly(DEFAULT_DELAY),
    }
}

/// Normalize the boost argument into `[MIN_BOOST, MAX_BOOST]`.
pub fn parse_boost(arg: &str) -> f64 {
    match parse_float_prefix(arg) {
        Some(boost) if boost.is_finite() => boost.clamp(MIN_BOOST, MAX_BOOST),
        _ => DEFAULT_BOOST,
    }
}

/// Parse a leading base-10 integer, ignoring anything after the digits.
///
/// `"2000ms"` is 2000, `"  -5"` is -5, `""` and `"abc"` are `None`. The
/// value is returned as `f64` so very long digit runs overflow to infinity
/// rather than wrapping.
fn parse_int_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value: f64 = rest[..digits].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Parse the longest leading decimal float literal.
///
/// Accepts an optional sign, digits with an optional fraction and an
/// optional exponent, or `Infinity`. Trailing text is ignored.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return s[..end + "Infinity".len()].parse().ok();
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

// =============================================================================
// Interval Adjustment
// =============================================================================

/// A normalized argument set, ready to intercept `setInterval` calls.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalAdjustment {
    /// Index of the argument set this was built from
    pub index: usize,
    pub needle: NeedlePattern,
    pub delay: DelayThreshold,
    pub boost: f64,
}

impl IntervalAdjustment {
    pub fn from_args(index: usize, args: &ArgumentSet) -> Self {
        Self {
            index,
            needle: NeedlePattern::parse(&args.needle),
            delay: parse_delay(&args.delay),
            boost: parse_boost(&args.boost),
        }
    }

    /// Does a `setInterval(callback, delay)` call match this adjustment?
    #[inline]
    pub fn matches(&self, callback_source: &str, delay: f64) -> bool {
        self.delay.matches(delay) && self.needle.is_match(callback_source)
    }

    /// The delay the timer primitive should receive for this call.
    pub fn adjusted_delay(&self, callback_source: &str, delay: f64) -> f64 {
        if self.matches(callback_source, delay) {
            delay * self.boost
        } else {
            delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay("*"), DelayThreshold::Any);
        assert_eq!(parse_delay("1500"), DelayThreshold::Exactly(1500.0));
        assert_eq!(parse_delay("2000ms"), DelayThreshold::Exactly(2000.0));
        assert_eq!(parse_delay(" 100"), DelayThreshold::Exactly(100.0));
        assert_eq!(parse_delay(""), DelayThreshold::Exactly(DEFAULT_DELAY));
        assert_eq!(parse_delay("abc"), DelayThreshold::Exactly(DEFAULT_DELAY));
        assert_eq!(parse_delay("-"), DelayThreshold::Exactly(DEFAULT_DELAY));
    }

    #[test]
    fn test_minus_one_delay_matches_any() {
        assert_eq!(parse_delay("-1"), DelayThreshold::Any);
        assert_eq!(parse_delay(" -1ms"), DelayThreshold::Any);
        assert!(parse_delay("-1").matches(1000.0));
        assert_eq!(parse_delay("-2"), DelayThreshold::Exactly(-2.0));
    }

    #[test]
    fn test_parse_delay_overflow_uses_default() {
        let huge = "9".repeat(400);
        assert_eq!(parse_delay(&huge), DelayThreshold::Exactly(DEFAULT_DELAY));
    }

    #[test]
    fn test_parse_boost() {
        assert_eq!(parse_boost("0.02"), 0.02);
        assert_eq!(parse_boost("100"), 50.0);
        assert_eq!(parse_boost("0.0001"), 0.001);
        assert_eq!(parse_boost("0"), 0.001);
        assert_eq!(parse_boost("abc"), DEFAULT_BOOST);
        assert_eq!(parse_boost(""), DEFAULT_BOOST);
        assert_eq!(parse_boost("Infinity"), DEFAULT_BOOST);
        assert_eq!(parse_boost(".5x"), 0.5);
        assert_eq!(parse_boost("1e-2"), 0.01);
        assert_eq!(parse_boost("2e"), 2.0);
    }

    #[test]
    fn test_threshold_matches() {
        assert!(DelayThreshold::Any.matches(1.0));
        assert!(DelayThreshold::Any.matches(123456.0));
        assert!(DelayThreshold::Exactly(1000.0).matches(1000.0));
        assert!(!DelayThreshold::Exactly(1000.0).matches(999.0));
    }

    #[test]
    fn test_adjusted_delay() {
        let args = ArgumentSet::new("generalTimeLeft", "*", "0.02");
        let adj = IntervalAdjustment::from_args(2, &args);
        assert_eq!(adj.index, 2);
        assert_eq!(adj.delay, DelayThreshold::Any);
        assert_eq!(adj.boost, 0.02);

        let adjusted = adj.adjusted_delay("function(){ generalTimeLeft--; }", 1000.0);
        assert!((adjusted - 20.0).abs() < 1e-9);
        assert_eq!(adj.adjusted_delay("function(){ other(); }", 1000.0), 1000.0);
    }

    #[test]
    fn test_defaults_for_empty_args() {
        let adj = IntervalAdjustment::from_args(0, &ArgumentSet::default());
        assert_eq!(adj.needle, NeedlePattern::MatchAll);
        assert_eq!(adj.delay, DelayThreshold::Exactly(1000.0));
        assert_eq!(adj.boost, DEFAULT_BOOST);

        assert!(adj.matches("anything", 1000.0));
        assert!(!adj.matches("anything", 1001.0));
    }
}

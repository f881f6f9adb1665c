//! Human-readable durations and token amounts for rejection messages.

use num_bigint::BigUint;
use num_traits::Zero;

/// Renders a duration in seconds with at most two non-zero units.
///
/// `90061` → `1d 1h`, `3600` → `1h`, `75` → `1min 15sec`, `0` → `0sec`.
pub fn render_timespan(secs: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "min"), (1, "sec")];

    let mut parts = Vec::with_capacity(2);
    let mut rest = secs;
    for (size, name) in UNITS {
        let value = rest / size;
        rest %= size;
        if value > 0 {
            parts.push(format!("{value}{name}"));
        }
        if parts.len() == 2 {
            break;
        }
    }

    if parts.is_empty() {
        "0sec".to_string()
    } else {
        parts.join(" ")
    }
}

/// Renders a base-unit amount scaled by `decimals`, trailing zeros trimmed.
///
/// `1500000000000000000` with 18 decimals and `ETH` → `1.5 ETH`.
pub fn readable_amount(amount: &BigUint, decimals: u32, symbol: &str) -> String {
    let scale = BigUint::from(10u32).pow(decimals);
    let whole = amount / &scale;
    let frac = amount % &scale;

    let mut text = whole.to_string();
    if !frac.is_zero() {
        let digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
        text.push('.');
        text.push_str(digits.trim_end_matches('0'));
    }
    if !symbol.is_empty() {
        text.push(' ');
        text.push_str(symbol);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_timespan_keeps_two_largest_units() {
        assert_eq!(render_timespan(90_061), "1d 1h");
        assert_eq!(render_timespan(86_400), "1d");
        assert_eq!(render_timespan(3_660), "1h 1min");
        assert_eq!(render_timespan(75), "1min 15sec");
        assert_eq!(render_timespan(0), "0sec");
    }

    #[test]
    fn test_render_timespan_skips_zero_units() {
        // 1d 0h 0min 5sec: the two non-zero units are d and sec.
        assert_eq!(render_timespan(86_405), "1d 5sec");
    }

    #[test]
    fn test_readable_amount_trims_trailing_zeros() {
        let amount: BigUint = "1500000000000000000".parse().unwrap();
        assert_eq!(readable_amount(&amount, 18, "ETH"), "1.5 ETH");
    }

    #[test]
    fn test_readable_amount_whole_and_tiny_values() {
        let two: BigUint = "2000000000000000000".parse().unwrap();
        assert_eq!(readable_amount(&two, 18, "ETH"), "2 ETH");
        assert_eq!(readable_amount(&BigUint::from(1u32), 18, "ETH"), "0.000000000000000001 ETH");
        assert_eq!(readable_amount(&BigUint::from(7u32), 0, ""), "7");
    }
}

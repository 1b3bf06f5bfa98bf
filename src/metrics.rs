use serde::{Deserialize, Serialize};

/// Typing speed derived from one finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Speed {
    pub chars_per_minute: u32,
    pub chars_per_second: u32,
}

/// Converts a typed length and the elapsed wall time into whole-number speeds.
///
/// Both figures truncate toward zero. A non-positive or non-finite elapsed
/// time yields zero for both rather than dividing by it.
pub fn compute(typed_len: usize, elapsed_secs: f64) -> Speed {
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return Speed::default();
    }

    let typed = typed_len as f64;

    Speed {
        chars_per_minute: truncate(typed / (elapsed_secs / 60.0)),
        chars_per_second: truncate(typed / elapsed_secs),
    }
}

// `as` saturates at the bounds and maps NaN to 0
fn truncate(value: f64) -> u32 {
    value.trunc() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_one_minute() {
        let speed = compute(120, 60.0);
        assert_eq!(speed.chars_per_minute, 120);
        assert_eq!(speed.chars_per_second, 2);
    }

    #[test]
    fn test_compute_truncates() {
        // 10 chars in 7s: 85.71 cpm, 1.43 cps
        let speed = compute(10, 7.0);
        assert_eq!(speed.chars_per_minute, 85);
        assert_eq!(speed.chars_per_second, 1);
    }

    #[test]
    fn test_compute_fractional_seconds() {
        let speed = compute(30, 7.5);
        assert_eq!(speed.chars_per_minute, 240);
        assert_eq!(speed.chars_per_second, 4);
    }

    #[test]
    fn test_compute_nothing_typed() {
        assert_eq!(compute(0, 42.0), Speed::default());
    }

    #[test]
    fn test_compute_zero_elapsed() {
        assert_eq!(compute(15, 0.0), Speed::default());
    }

    #[test]
    fn test_compute_invalid_elapsed() {
        assert_eq!(compute(15, -1.0), Speed::default());
        assert_eq!(compute(15, f64::NAN), Speed::default());
        assert_eq!(compute(15, f64::INFINITY), Speed::default());
    }

    #[test]
    fn test_compute_matches_floor_formula() {
        for typed in [0usize, 1, 7, 59, 250, 1000] {
            for elapsed in [0.25, 1.0, 3.3, 17.9, 60.0, 61.5] {
                let speed = compute(typed, elapsed);
                let cps = (typed as f64 / elapsed).floor() as u32;
                let cpm = (typed as f64 / (elapsed / 60.0)).floor() as u32;
                assert_eq!(speed.chars_per_second, cps, "cps {typed}/{elapsed}");
                assert_eq!(speed.chars_per_minute, cpm, "cpm {typed}/{elapsed}");
            }
        }
    }
}

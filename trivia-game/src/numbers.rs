//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the u32 range, returning 0 for NaN or negative values.
#[must_use]
pub fn round_f64_to_u32(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(0.0, max).round();
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Convert u32 to f64 in a single location.
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// XP awarded for one answer.
///
/// Every bonus is folded in as a multiplication before this call, and the
/// product is rounded exactly once.
#[must_use]
pub fn award_xp(base_xp: u32, bonus_multiplier: f64, xp_multiplier: f64) -> u32 {
    round_f64_to_u32(u32_to_f64(base_xp) * bonus_multiplier * xp_multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f64_to_u32(1.6), 2);
        assert_eq!(round_f64_to_u32(2.5), 3);
        assert_eq!(round_f64_to_u32(f64::NAN), 0);
        assert_eq!(round_f64_to_u32(-4.0), 0);
        assert_eq!(round_f64_to_u32(f64::from(u32::MAX) * 2.0), u32::MAX);
    }

    #[test]
    fn award_rounds_once_after_all_multipliers() {
        assert_eq!(award_xp(30, 1.2 * 1.5, 1.0), 54);
        // 10 * 1.15 * 1.25 = 14.375 -> 14
        assert_eq!(award_xp(10, 1.15 * 1.25, 1.0), 14);
        // 50 * 1.2 * 1.4 * 3 = 252
        assert_eq!(award_xp(50, 1.2 * 1.4, 3.0), 252);
    }

    #[test]
    fn award_is_pure() {
        let first = award_xp(40, 1.2 * 1.3, 2.0);
        let second = award_xp(40, 1.2 * 1.3, 2.0);
        assert_eq!(first, second);
        assert_eq!(first, 125);
    }
}

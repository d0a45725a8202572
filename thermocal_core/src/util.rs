//! Formatting helpers for status lines.

/// Two decimals with a leading space for non-negative values, so columns of
/// positive and negative slopes line up.
pub fn signed_2dp(v: f64) -> String {
    if v < 0.0 {
        format!("{v:.2}")
    } else {
        format!(" {v:.2}")
    }
}

/// Clamp an `i32` into the `i16` sample domain.
#[inline]
pub fn saturate_i16(v: i32) -> i16 {
    // Clamped into range, so the cast is exact.
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_values_share_a_column() {
        assert_eq!(signed_2dp(1.234), " 1.23");
        assert_eq!(signed_2dp(-1.236), "-1.24");
        assert_eq!(signed_2dp(0.0), " 0.00");
    }

    #[test]
    fn saturates_at_the_i16_limits() {
        assert_eq!(saturate_i16(40_000), i16::MAX);
        assert_eq!(saturate_i16(-40_000), i16::MIN);
        assert_eq!(saturate_i16(123), 123);
    }
}

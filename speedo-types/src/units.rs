/// Коэффициент перевода м/с → км/ч.
pub const MPS_TO_KMPH: f64 = 3.6;

/// Переводит скорость из м/с в км/ч.
#[inline]
pub fn mps_to_kmph(speed_mps: f64) -> f64 {
    speed_mps * MPS_TO_KMPH
}

/// Переводит скорость из км/ч в м/с.
#[inline]
pub fn kmph_to_mps(speed_kmph: f64) -> f64 {
    speed_kmph / MPS_TO_KMPH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mps_to_kmph() {
        assert_eq!(mps_to_kmph(0.0), 0.0);
        assert_eq!(mps_to_kmph(10.0), 36.0);
        assert!((mps_to_kmph(kmph_to_mps(123.0)) - 123.0).abs() < 1e-9);
    }
}

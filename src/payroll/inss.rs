use super::round2;

/// Employee contribution table in force from January 2025: (upper bound, rate).
pub const INSS_BRACKETS: [(f64, f64); 4] = [
    (1518.00, 0.075),
    (2793.88, 0.09),
    (4190.83, 0.12),
    (8157.41, 0.14),
];

/// Contribution base ceiling; earnings above it pay nothing extra.
pub const INSS_CEILING: f64 = 8157.41;

/// Progressive employee INSS: each slice of the base pays its own bracket rate.
pub fn employee_inss(base: f64) -> f64 {
    if !base.is_finite() || base <= 0.0 {
        return 0.0;
    }

    let mut lower = 0.0;
    let mut total = 0.0;
    for (upper, rate) in INSS_BRACKETS {
        if base <= lower {
            break;
        }
        total += (base.min(upper) - lower) * rate;
        lower = upper;
    }
    round2(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_bracket_is_flat() {
        assert_eq!(employee_inss(1518.00), 113.85);
        assert_eq!(employee_inss(1400.00), 105.00);
    }

    #[test]
    fn slices_are_taxed_progressively() {
        assert_eq!(employee_inss(3000.00), 253.41);
        assert_eq!(employee_inss(5000.00), 509.60);
    }

    #[test]
    fn contribution_is_capped_at_the_ceiling() {
        assert_eq!(employee_inss(INSS_CEILING), 951.63);
        assert_eq!(employee_inss(25_000.00), 951.63);
    }

    #[test]
    fn empty_base_pays_nothing() {
        assert_eq!(employee_inss(0.0), 0.0);
        assert_eq!(employee_inss(-10.0), 0.0);
    }
}

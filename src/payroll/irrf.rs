use super::round2;

/// Monthly withholding table from May 2025: (upper bound, rate, deduction).
const IRRF_BRACKETS: [(f64, f64, f64); 5] = [
    (2428.80, 0.0, 0.0),
    (2826.65, 0.075, 182.16),
    (3751.05, 0.15, 394.16),
    (4664.68, 0.225, 675.49),
    (f64::INFINITY, 0.275, 908.73),
];

pub const DEPENDENT_DEDUCTION: f64 = 189.59;

/// Optional flat discount replacing legal deductions when it is larger.
pub const SIMPLIFIED_DISCOUNT: f64 = 607.20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Irrf {
    pub base: f64,
    pub tax: f64,
    pub simplified: bool,
}

/// Tax due over an already-reduced base.
pub fn tax_on_base(base: f64) -> f64 {
    if !base.is_finite() || base <= 0.0 {
        return 0.0;
    }
    let (_, rate, deduction) = IRRF_BRACKETS
        .iter()
        .copied()
        .find(|(upper, _, _)| base <= *upper)
        .unwrap_or(IRRF_BRACKETS[IRRF_BRACKETS.len() - 1]);
    round2((base * rate - deduction).max(0.0))
}

/// Withholding over monthly income (salary, vacation).
pub fn monthly_irrf(gross: f64, inss: f64, dependents: u32) -> Irrf {
    let legal = inss + f64::from(dependents) * DEPENDENT_DEDUCTION;
    let simplified = SIMPLIFIED_DISCOUNT > legal;
    let base = round2((gross - legal.max(SIMPLIFIED_DISCOUNT)).max(0.0));
    Irrf {
        base,
        tax: tax_on_base(base),
        simplified,
    }
}

/// The 13th salary is taxed on its own with legal deductions only.
pub fn thirteenth_irrf(gross: f64, inss: f64, dependents: u32) -> Irrf {
    let legal = inss + f64::from(dependents) * DEPENDENT_DEDUCTION;
    let base = round2((gross - legal).max(0.0));
    Irrf {
        base,
        tax: tax_on_base(base),
        simplified: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::inss::employee_inss;

    #[test]
    fn table_brackets() {
        assert_eq!(tax_on_base(2428.80), 0.0);
        assert_eq!(tax_on_base(3000.00), 55.84);
        assert_eq!(tax_on_base(4392.80), 312.89);
    }

    #[test]
    fn simplified_discount_wins_for_low_deductions() {
        let irrf = monthly_irrf(5000.00, employee_inss(5000.00), 0);
        assert!(irrf.simplified);
        assert_eq!(irrf.base, 4392.80);
        assert_eq!(irrf.tax, 312.89);
    }

    #[test]
    fn salary_up_to_around_two_minimum_wages_is_exempt() {
        let irrf = monthly_irrf(3000.00, employee_inss(3000.00), 0);
        assert_eq!(irrf.tax, 0.0);
    }

    #[test]
    fn dependents_and_inss_win_for_high_salaries() {
        let irrf = monthly_irrf(10_000.00, employee_inss(10_000.00), 2);
        assert!(!irrf.simplified);
        assert_eq!(irrf.base, 8669.19);
        assert_eq!(irrf.tax, 1475.30);
    }

    #[test]
    fn thirteenth_ignores_the_simplified_discount() {
        let monthly = monthly_irrf(3500.00, 0.0, 0);
        let thirteenth = thirteenth_irrf(3500.00, 0.0, 0);
        assert_eq!(monthly.base, 2892.80);
        assert_eq!(thirteenth.base, 3500.00);
        assert!(thirteenth.tax > monthly.tax);
    }
}

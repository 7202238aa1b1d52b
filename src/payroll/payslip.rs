use crate::model::benefit::BenefitType;

use super::fgts::monthly_deposit;
use super::inss::employee_inss;
use super::irrf::monthly_irrf;
use super::{LineItem, PayrollError, require_non_negative, require_positive, round2, totals};

/// Standard monthly workload used to derive the hourly rate.
pub const MONTHLY_HOURS: f64 = 220.0;
/// Transport voucher discount is capped at 6% of the base salary.
pub const TRANSPORT_VOUCHER_CAP: f64 = 0.06;

#[derive(Debug, Clone)]
pub struct BenefitCharge {
    pub name: String,
    pub benefit_type: BenefitType,
    pub monthly_value: f64,
    pub employee_share_pct: f64,
}

pub fn benefit_deduction(charge: &BenefitCharge, base_salary: f64) -> f64 {
    match charge.benefit_type {
        BenefitType::TransportVoucher => {
            round2((base_salary * TRANSPORT_VOUCHER_CAP).min(charge.monthly_value))
        }
        _ => round2(charge.monthly_value * charge.employee_share_pct.clamp(0.0, 100.0) / 100.0),
    }
}

#[derive(Debug, Clone, Default)]
pub struct PayslipInput {
    pub base_salary: f64,
    pub overtime_50_hours: f64,
    pub overtime_100_hours: f64,
    pub other_earnings: f64,
    /// Unjustified absence days discounted at salary / 30 each.
    pub absence_days: u32,
    pub benefits: Vec<BenefitCharge>,
    pub other_deductions: f64,
    pub dependents: u32,
    /// Employer social security rate from the company tax regime.
    pub employer_inss_rate: f64,
}

#[derive(Debug, Clone)]
pub struct PayslipCalculation {
    pub items: Vec<LineItem>,
    pub gross_earnings: f64,
    pub total_deductions: f64,
    pub net_pay: f64,
    pub inss: f64,
    pub irrf: f64,
    pub fgts: f64,
    pub employer_cost: f64,
}

pub fn calculate_payslip(input: &PayslipInput) -> Result<PayslipCalculation, PayrollError> {
    require_positive(input.base_salary, "base_salary")?;
    require_non_negative(input.overtime_50_hours, "overtime_50_hours")?;
    require_non_negative(input.overtime_100_hours, "overtime_100_hours")?;
    require_non_negative(input.other_earnings, "other_earnings")?;
    require_non_negative(input.other_deductions, "other_deductions")?;
    if input.absence_days > 30 {
        return Err(PayrollError::InvalidInput("absence_days cannot exceed 30".to_string()));
    }

    let base = input.base_salary;
    let hourly = base / MONTHLY_HOURS;

    let mut items = vec![LineItem::earning("salary", "Base salary", Some("30 days".into()), base)];

    if input.overtime_50_hours > 0.0 {
        items.push(LineItem::earning(
            "overtime_50",
            "Overtime 50%",
            Some(format!("{}h", input.overtime_50_hours)),
            input.overtime_50_hours * hourly * 1.5,
        ));
    }
    if input.overtime_100_hours > 0.0 {
        items.push(LineItem::earning(
            "overtime_100",
            "Overtime 100%",
            Some(format!("{}h", input.overtime_100_hours)),
            input.overtime_100_hours * hourly * 2.0,
        ));
    }
    if input.other_earnings > 0.0 {
        items.push(LineItem::earning("other_earnings", "Other earnings", None, input.other_earnings));
    }

    let absence = round2(base / 30.0 * f64::from(input.absence_days));
    if absence > 0.0 {
        items.push(LineItem::deduction(
            "absences",
            "Unjustified absences",
            Some(format!("{} days", input.absence_days)),
            absence,
        ));
    }

    let (gross, _) = totals(&items);
    let taxable = round2(gross - absence);

    let inss = employee_inss(taxable);
    let irrf = monthly_irrf(taxable, inss, input.dependents).tax;
    items.push(LineItem::deduction("inss", "INSS", None, inss));
    if irrf > 0.0 {
        items.push(LineItem::deduction(
            "irrf",
            "IRRF",
            Some(format!("{} dependents", input.dependents)),
            irrf,
        ));
    }

    for charge in &input.benefits {
        let amount = benefit_deduction(charge, base);
        if amount > 0.0 {
            items.push(LineItem::deduction("benefit", &charge.name, None, amount));
        }
    }

    if input.other_deductions > 0.0 {
        items.push(LineItem::deduction("other_deductions", "Other deductions", None, input.other_deductions));
    }

    let fgts = monthly_deposit(taxable);
    let employer_inss = round2(taxable * input.employer_inss_rate.max(0.0));
    items.push(LineItem::informative("fgts", "FGTS deposit", Some("8%".into()), fgts));
    if employer_inss > 0.0 {
        items.push(LineItem::informative("employer_inss", "Employer INSS", None, employer_inss));
    }

    let (gross_earnings, total_deductions) = totals(&items);

    Ok(PayslipCalculation {
        net_pay: round2(gross_earnings - total_deductions),
        gross_earnings,
        total_deductions,
        inss,
        irrf,
        fgts,
        employer_cost: round2(taxable + employer_inss + fgts),
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::assert_close;

    fn transport(value: f64) -> BenefitCharge {
        BenefitCharge {
            name: "Transport voucher".into(),
            benefit_type: BenefitType::TransportVoucher,
            monthly_value: value,
            employee_share_pct: 0.0,
        }
    }

    #[test]
    fn transport_voucher_is_capped_at_six_percent() {
        assert_eq!(benefit_deduction(&transport(200.0), 3000.0), 180.0);
        assert_eq!(benefit_deduction(&transport(120.0), 3000.0), 120.0);
    }

    #[test]
    fn other_benefits_use_the_employee_share() {
        let health = BenefitCharge {
            name: "Health plan".into(),
            benefit_type: BenefitType::HealthPlan,
            monthly_value: 450.0,
            employee_share_pct: 20.0,
        };
        assert_eq!(benefit_deduction(&health, 3000.0), 90.0);
    }

    #[test]
    fn full_payslip_with_overtime_absence_and_transport() {
        let calc = calculate_payslip(&PayslipInput {
            base_salary: 3000.0,
            overtime_50_hours: 10.0,
            absence_days: 1,
            benefits: vec![transport(200.0)],
            ..Default::default()
        })
        .unwrap();

        let overtime = calc.items.iter().find(|i| i.code == "overtime_50").unwrap();
        assert_close(overtime.amount, 204.55);
        assert_close(calc.gross_earnings, 3204.55);
        assert_close(calc.inss, 265.96);
        assert_close(calc.irrf, 5.14);
        assert_close(calc.total_deductions, 551.10);
        assert_close(calc.net_pay, 2653.45);
        assert_close(calc.fgts, 248.36);
        assert_close(calc.employer_cost, 3104.55 + 248.36);
    }

    #[test]
    fn employer_rate_adds_to_cost_not_to_deductions() {
        let calc = calculate_payslip(&PayslipInput {
            base_salary: 3000.0,
            employer_inss_rate: 0.278,
            ..Default::default()
        })
        .unwrap();
        assert_close(calc.total_deductions, 253.41);
        assert_close(calc.employer_cost, 3000.0 + 834.0 + 240.0);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(calculate_payslip(&PayslipInput::default()).is_err());
        let too_many_absences = PayslipInput {
            base_salary: 3000.0,
            absence_days: 31,
            ..Default::default()
        };
        assert!(calculate_payslip(&too_many_absences).is_err());
    }
}

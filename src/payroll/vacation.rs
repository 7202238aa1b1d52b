use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::inss::employee_inss;
use super::irrf::monthly_irrf;
use super::{LineItem, PayrollError, require_non_negative, require_positive, round2, totals};

pub const MIN_VACATION_DAYS: u32 = 5;
pub const MAX_VACATION_DAYS: u32 = 30;
/// Up to a third of the 30-day entitlement may be sold (abono pecuniário).
pub const MAX_SELL_DAYS: u32 = 10;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VacationInput {
    #[schema(example = 3000.0)]
    pub salary: f64,
    /// Monthly average of overtime, commissions and other variable pay.
    #[serde(default)]
    #[schema(example = 0.0)]
    pub average_variable_pay: f64,
    #[schema(example = 30)]
    pub days: u32,
    #[serde(default)]
    #[schema(example = 0)]
    pub sell_days: u32,
    #[serde(default)]
    #[schema(example = 0)]
    pub dependents: u32,
    #[serde(default)]
    #[schema(example = false)]
    pub advance_thirteenth: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VacationResult {
    pub vacation_pay: f64,
    pub one_third: f64,
    pub abono: f64,
    pub abono_one_third: f64,
    pub thirteenth_advance: f64,
    pub inss: f64,
    pub irrf: f64,
    pub gross: f64,
    pub total_deductions: f64,
    pub net: f64,
    pub items: Vec<LineItem>,
}

pub fn validate_days(days: u32, sell_days: u32) -> Result<(), PayrollError> {
    if !(MIN_VACATION_DAYS..=MAX_VACATION_DAYS).contains(&days) {
        return Err(PayrollError::InvalidInput(format!(
            "vacation days must be between {MIN_VACATION_DAYS} and {MAX_VACATION_DAYS}"
        )));
    }
    if sell_days > MAX_SELL_DAYS {
        return Err(PayrollError::InvalidInput(format!(
            "at most {MAX_SELL_DAYS} vacation days can be sold"
        )));
    }
    if days + sell_days > MAX_VACATION_DAYS {
        return Err(PayrollError::InvalidInput(
            "vacation days plus sold days cannot exceed 30".to_string(),
        ));
    }
    Ok(())
}

pub fn simulate_vacation(input: &VacationInput) -> Result<VacationResult, PayrollError> {
    require_positive(input.salary, "salary")?;
    require_non_negative(input.average_variable_pay, "average_variable_pay")?;
    validate_days(input.days, input.sell_days)?;

    let remuneration = input.salary + input.average_variable_pay;
    let daily = remuneration / 30.0;

    let vacation_pay = round2(daily * f64::from(input.days));
    let one_third = round2(vacation_pay / 3.0);
    let abono = round2(daily * f64::from(input.sell_days));
    let abono_one_third = round2(abono / 3.0);
    let thirteenth_advance = if input.advance_thirteenth {
        round2(input.salary / 2.0)
    } else {
        0.0
    };

    // abono and the 13th advance are not taxed here
    let taxable = vacation_pay + one_third;
    let inss = employee_inss(taxable);
    let irrf = monthly_irrf(taxable, inss, input.dependents).tax;

    let mut items = vec![
        LineItem::earning("vacation", "Vacation pay", Some(format!("{} days", input.days)), vacation_pay),
        LineItem::earning("vacation_third", "One-third vacation bonus", None, one_third),
    ];
    if input.sell_days > 0 {
        items.push(LineItem::earning(
            "abono",
            "Sold vacation days",
            Some(format!("{} days", input.sell_days)),
            abono,
        ));
        items.push(LineItem::earning("abono_third", "One-third on sold days", None, abono_one_third));
    }
    if input.advance_thirteenth {
        items.push(LineItem::earning("thirteenth_advance", "13th salary advance", Some("50%".into()), thirteenth_advance));
    }
    items.push(LineItem::deduction("inss", "INSS", None, inss));
    if irrf > 0.0 {
        items.push(LineItem::deduction("irrf", "IRRF", None, irrf));
    }

    let (gross, total_deductions) = totals(&items);

    Ok(VacationResult {
        vacation_pay,
        one_third,
        abono,
        abono_one_third,
        thirteenth_advance,
        inss,
        irrf,
        gross,
        total_deductions,
        net: round2(gross - total_deductions),
        items,
    })
}

//! Termination statement (rescisão) for the common CLT separation reasons.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use super::avos::{
    acquisition_period_start, full_months_between, full_years_between, rolling_avos, thirteenth_avos, year_end,
};
use super::fgts::{FgtsSummary, monthly_deposit, termination_summary, DEPOSIT_RATE};
use super::inss::employee_inss;
use super::irrf::{monthly_irrf, thirteenth_irrf};
use super::{LineItem, PayrollError, require_non_negative, require_positive, round2, totals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminationReason {
    /// Dismissal without just cause.
    WithoutCause,
    /// Dismissal for just cause.
    WithCause,
    /// Employee resignation.
    Resignation,
    /// Termination by mutual agreement.
    MutualAgreement,
    /// Fixed-term contract reached its end date.
    ContractEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Worked,
    Indemnified,
    /// The employee left without serving the notice.
    NotServed,
}

pub const BASE_NOTICE_DAYS: u32 = 30;
pub const NOTICE_DAYS_PER_YEAR: u32 = 3;
pub const MAX_NOTICE_DAYS: u32 = 90;
pub const MAX_EXPIRED_VACATION_PERIODS: u32 = 2;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TerminationInput {
    #[schema(example = 3000.0)]
    pub salary: f64,
    #[schema(example = "2022-03-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = "2025-06-14", format = "date", value_type = String)]
    pub termination_date: NaiveDate,
    pub reason: TerminationReason,
    pub notice: NoticeKind,
    /// Complete vacation periods acquired and never taken.
    #[serde(default)]
    #[schema(example = 0)]
    pub expired_vacation_periods: u32,
    #[serde(default)]
    #[schema(example = 0)]
    pub dependents: u32,
    /// Current FGTS balance; estimated from salary and service time when absent.
    #[schema(example = 10000.0, nullable = true)]
    pub fgts_balance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TerminationResult {
    pub reason: TerminationReason,
    pub notice_days: u32,
    #[schema(value_type = String, format = "date")]
    pub projected_end_date: NaiveDate,
    pub months_of_service: u32,
    pub items: Vec<LineItem>,
    pub gross: f64,
    pub total_deductions: f64,
    pub net: f64,
    pub fgts: FgtsSummary,
    pub unemployment_insurance_eligible: bool,
}

/// 30 days plus 3 for each complete year of service, capped at 90.
pub fn notice_days(hire_date: NaiveDate, termination_date: NaiveDate) -> u32 {
    (BASE_NOTICE_DAYS + NOTICE_DAYS_PER_YEAR * full_years_between(hire_date, termination_date))
        .min(MAX_NOTICE_DAYS)
}

fn validate(input: &TerminationInput) -> Result<(), PayrollError> {
    require_positive(input.salary, "salary")?;
    if input.termination_date < input.hire_date {
        return Err(PayrollError::InvalidInput(
            "termination_date cannot be before hire_date".to_string(),
        ));
    }
    if input.expired_vacation_periods > MAX_EXPIRED_VACATION_PERIODS {
        return Err(PayrollError::InvalidInput(format!(
            "at most {MAX_EXPIRED_VACATION_PERIODS} expired vacation periods are allowed"
        )));
    }
    if let Some(balance) = input.fgts_balance {
        require_non_negative(balance, "fgts_balance")?;
    }
    Ok(())
}

pub fn simulate_termination(input: &TerminationInput) -> Result<TerminationResult, PayrollError> {
    validate(input)?;

    let salary = input.salary;
    let daily = salary / 30.0;
    let reason = input.reason;
    let notice_days = notice_days(input.hire_date, input.termination_date);
    let months_of_service = full_months_between(input.hire_date, input.termination_date);

    // days of indemnified notice that are paid and projected onto the contract
    let indemnified_days = match (reason, input.notice) {
        (TerminationReason::WithoutCause, NoticeKind::Indemnified) => notice_days,
        (TerminationReason::MutualAgreement, NoticeKind::Indemnified) => notice_days / 2,
        _ => 0,
    };
    let notice_pay = match (reason, input.notice) {
        (TerminationReason::WithoutCause, NoticeKind::Indemnified) => round2(daily * f64::from(notice_days)),
        (TerminationReason::MutualAgreement, NoticeKind::Indemnified) => {
            round2(daily * f64::from(notice_days) / 2.0)
        }
        _ => 0.0,
    };
    let projected_end_date = input.termination_date + Duration::days(i64::from(indemnified_days));

    let worked_days = input.termination_date.day().min(30);
    let salary_balance = round2(daily * f64::from(worked_days));

    let mut items = vec![LineItem::earning(
        "salary_balance",
        "Salary balance",
        Some(format!("{worked_days} days")),
        salary_balance,
    )];

    if notice_pay > 0.0 {
        items.push(LineItem::earning(
            "notice_indemnified",
            "Indemnified notice",
            Some(format!("{notice_days} days")),
            notice_pay,
        ));
    }

    let proportional_due = reason != TerminationReason::WithCause;

    let mut thirteenth = 0.0;
    if proportional_due {
        // a projection into January closes the termination year and opens the next one
        let termination_year_end = year_end(input.termination_date);
        let mut thirteenth_spans = vec![(
            "thirteenth_proportional",
            "Proportional 13th salary",
            projected_end_date.min(termination_year_end),
        )];
        if projected_end_date > termination_year_end {
            thirteenth_spans.push((
                "thirteenth_projected",
                "13th salary on projected notice",
                projected_end_date,
            ));
        }
        for (code, description, end) in thirteenth_spans {
            let avos = thirteenth_avos(input.hire_date, end);
            let amount = round2(salary * f64::from(avos) / 12.0);
            if amount > 0.0 {
                items.push(LineItem::earning(code, description, Some(format!("{avos}/12")), amount));
                thirteenth += amount;
            }
        }

        let period_start = acquisition_period_start(input.hire_date, projected_end_date);
        if period_start != acquisition_period_start(input.hire_date, input.termination_date) {
            // the projected notice completed the running acquisition period
            let completed = round2(salary);
            items.push(LineItem::earning(
                "vacation_completed",
                "Vacation completed during notice",
                Some("12/12".to_string()),
                completed,
            ));
            items.push(LineItem::earning(
                "vacation_completed_third",
                "One-third on completed vacation",
                None,
                completed / 3.0,
            ));
        }

        let avos = rolling_avos(period_start, projected_end_date);
        let vacation = round2(salary * f64::from(avos) / 12.0);
        if vacation > 0.0 {
            items.push(LineItem::earning(
                "vacation_proportional",
                "Proportional vacation",
                Some(format!("{avos}/12")),
                vacation,
            ));
            items.push(LineItem::earning(
                "vacation_proportional_third",
                "One-third on proportional vacation",
                None,
                vacation / 3.0,
            ));
        }
    }

    if input.expired_vacation_periods > 0 {
        let periods = f64::from(input.expired_vacation_periods);
        let expired = round2(salary * periods);
        items.push(LineItem::earning(
            "vacation_expired",
            "Expired vacation",
            Some(format!("{} period(s)", input.expired_vacation_periods)),
            expired,
        ));
        items.push(LineItem::earning(
            "vacation_expired_third",
            "One-third on expired vacation",
            None,
            expired / 3.0,
        ));
    }

    let inss_balance = employee_inss(salary_balance);
    let irrf_balance = monthly_irrf(salary_balance, inss_balance, input.dependents).tax;
    let inss_thirteenth = employee_inss(thirteenth);
    let irrf_thirteenth = thirteenth_irrf(thirteenth, inss_thirteenth, input.dependents).tax;

    items.push(LineItem::deduction("inss", "INSS on salary balance", None, inss_balance));
    if irrf_balance > 0.0 {
        items.push(LineItem::deduction("irrf", "IRRF on salary balance", None, irrf_balance));
    }
    if inss_thirteenth > 0.0 {
        items.push(LineItem::deduction("inss_thirteenth", "INSS on 13th salary", None, inss_thirteenth));
    }
    if irrf_thirteenth > 0.0 {
        items.push(LineItem::deduction("irrf_thirteenth", "IRRF on 13th salary", None, irrf_thirteenth));
    }

    if reason == TerminationReason::Resignation && input.notice == NoticeKind::NotServed {
        // the discount can only consume what is left to pay
        let (gross, deductions) = totals(&items);
        let discount = salary.min((gross - deductions).max(0.0));
        if discount > 0.0 {
            items.push(LineItem::deduction(
                "notice_not_served",
                "Unserved notice",
                Some(format!("{BASE_NOTICE_DAYS} days")),
                discount,
            ));
        }
    }

    let (gross, total_deductions) = totals(&items);

    let balance = input
        .fgts_balance
        .unwrap_or_else(|| salary * DEPOSIT_RATE * f64::from(months_of_service));
    let termination_deposit = monthly_deposit(salary_balance + notice_pay + thirteenth);
    let fgts = termination_summary(balance, termination_deposit, reason);

    Ok(TerminationResult {
        reason,
        notice_days,
        projected_end_date,
        months_of_service,
        items,
        gross,
        total_deductions,
        net: round2(gross - total_deductions),
        fgts,
        unemployment_insurance_eligible: reason == TerminationReason::WithoutCause
            && months_of_service >= 12,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::assert_close;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn input(reason: TerminationReason, notice: NoticeKind) -> TerminationInput {
        TerminationInput {
            salary: 3000.0,
            hire_date: d(2022, 3, 1),
            termination_date: d(2025, 6, 14),
            reason,
            notice,
            expired_vacation_periods: 0,
            dependents: 0,
            fgts_balance: Some(10_000.0),
        }
    }

    fn amount(result: &TerminationResult, code: &str) -> Option<f64> {
        result.items.iter().find(|i| i.code == code).map(|i| i.amount)
    }

    #[test]
    fn notice_grows_three_days_per_year_up_to_ninety() {
        assert_eq!(notice_days(d(2025, 1, 1), d(2025, 6, 1)), 30);
        assert_eq!(notice_days(d(2022, 3, 1), d(2025, 6, 14)), 39);
        assert_eq!(notice_days(d(1990, 1, 1), d(2025, 6, 1)), 90);
    }

    #[test]
    fn dismissal_without_cause_with_indemnified_notice() {
        let r = simulate_termination(&input(TerminationReason::WithoutCause, NoticeKind::Indemnified)).unwrap();

        assert_eq!(r.notice_days, 39);
        assert_eq!(r.projected_end_date, d(2025, 7, 23));
        assert_close(amount(&r, "salary_balance").unwrap(), 1400.0);
        assert_close(amount(&r, "notice_indemnified").unwrap(), 3900.0);
        assert_close(amount(&r, "thirteenth_proportional").unwrap(), 1750.0);
        assert_close(amount(&r, "vacation_proportional").unwrap(), 1250.0);
        assert_close(amount(&r, "vacation_proportional_third").unwrap(), 416.67);
        assert_close(amount(&r, "inss").unwrap(), 105.0);
        assert_close(amount(&r, "inss_thirteenth").unwrap(), 134.73);
        assert_eq!(amount(&r, "irrf"), None);

        assert_close(r.gross, 8716.67);
        assert_close(r.total_deductions, 239.73);
        assert_close(r.net, 8476.94);

        assert_close(r.fgts.termination_deposit, 564.0);
        assert_close(r.fgts.fine, 4225.60);
        assert_close(r.fgts.withdrawable, 14_789.60);
        assert!(r.unemployment_insurance_eligible);
    }

    #[test]
    fn dismissal_with_cause_pays_only_balance_and_expired_vacation() {
        let mut i = input(TerminationReason::WithCause, NoticeKind::Worked);
        i.expired_vacation_periods = 1;
        let r = simulate_termination(&i).unwrap();

        assert_eq!(r.projected_end_date, i.termination_date);
        assert_eq!(amount(&r, "thirteenth_proportional"), None);
        assert_eq!(amount(&r, "vacation_proportional"), None);
        assert_close(amount(&r, "vacation_expired").unwrap(), 3000.0);
        assert_close(amount(&r, "vacation_expired_third").unwrap(), 1000.0);
        assert_close(r.gross, 5400.0);
        assert_eq!(r.fgts.fine, 0.0);
        assert_eq!(r.fgts.withdrawable, 0.0);
        assert!(!r.unemployment_insurance_eligible);
    }

    #[test]
    fn resignation_without_notice_discounts_one_salary() {
        let r = simulate_termination(&input(TerminationReason::Resignation, NoticeKind::NotServed)).unwrap();
        // no projection: June counts (14 days is short of 15) only up to May
        assert_close(amount(&r, "thirteenth_proportional").unwrap(), 1250.0);
        assert_close(amount(&r, "notice_not_served").unwrap(), 3000.0);
        assert_eq!(amount(&r, "notice_indemnified"), None);
        assert_eq!(r.fgts.withdrawable, 0.0);
    }

    #[test]
    fn unserved_notice_discount_never_makes_net_negative() {
        let mut i = input(TerminationReason::Resignation, NoticeKind::NotServed);
        i.hire_date = d(2025, 6, 1);
        i.termination_date = d(2025, 6, 5);
        let r = simulate_termination(&i).unwrap();
        assert!(r.net >= 0.0);
        assert_close(r.net, 0.0);
    }

    #[test]
    fn mutual_agreement_halves_notice_and_fine() {
        let r = simulate_termination(&input(TerminationReason::MutualAgreement, NoticeKind::Indemnified)).unwrap();
        assert_close(amount(&r, "notice_indemnified").unwrap(), 1950.0);
        assert_eq!(r.projected_end_date, d(2025, 7, 3));
        let account = r.fgts.balance + r.fgts.termination_deposit;
        assert_close(r.fgts.fine, round2(account * 0.2));
        assert_close(r.fgts.withdrawable, round2(account * 0.8 + r.fgts.fine));
        assert!(!r.unemployment_insurance_eligible);
    }

    #[test]
    fn contract_end_releases_fgts_without_fine() {
        let r = simulate_termination(&input(TerminationReason::ContractEnd, NoticeKind::Worked)).unwrap();
        assert_eq!(r.fgts.fine, 0.0);
        assert_close(r.fgts.withdrawable, r.fgts.balance + r.fgts.termination_deposit);
    }

    #[test]
    fn missing_fgts_balance_is_estimated() {
        let mut i = input(TerminationReason::WithoutCause, NoticeKind::Worked);
        i.fgts_balance = None;
        let r = simulate_termination(&i).unwrap();
        assert_eq!(r.months_of_service, 39);
        assert_close(r.fgts.balance, 3000.0 * 0.08 * 39.0);
    }

    #[test]
    fn notice_projected_into_january_keeps_the_full_13th() {
        let mut i = input(TerminationReason::WithoutCause, NoticeKind::Indemnified);
        i.termination_date = d(2025, 12, 10);
        let r = simulate_termination(&i).unwrap();

        assert_eq!(r.projected_end_date, d(2026, 1, 18));
        assert_close(amount(&r, "thirteenth_proportional").unwrap(), 3000.0);
        assert_close(amount(&r, "thirteenth_projected").unwrap(), 250.0);

        i.notice = NoticeKind::Worked;
        let worked = simulate_termination(&i).unwrap();
        assert_close(amount(&worked, "thirteenth_proportional").unwrap(), 2750.0);
        assert_eq!(amount(&worked, "thirteenth_projected"), None);
    }

    #[test]
    fn notice_projected_past_the_anniversary_pays_the_completed_period() {
        let mut i = input(TerminationReason::WithoutCause, NoticeKind::Indemnified);
        i.termination_date = d(2025, 2, 20);
        let r = simulate_termination(&i).unwrap();

        assert_eq!(r.notice_days, 36);
        assert_eq!(r.projected_end_date, d(2025, 3, 28));
        assert_close(amount(&r, "vacation_completed").unwrap(), 3000.0);
        assert_close(amount(&r, "vacation_completed_third").unwrap(), 1000.0);
        assert_close(amount(&r, "vacation_proportional").unwrap(), 250.0);

        i.notice = NoticeKind::Worked;
        let worked = simulate_termination(&i).unwrap();
        assert_eq!(amount(&worked, "vacation_completed"), None);
        assert_close(amount(&worked, "vacation_proportional").unwrap(), 3000.0);
        assert!(r.gross > worked.gross);
    }

    #[test]
    fn rejects_inverted_dates() {
        let mut i = input(TerminationReason::WithoutCause, NoticeKind::Worked);
        i.termination_date = d(2021, 1, 1);
        assert!(simulate_termination(&i).is_err());
    }
}

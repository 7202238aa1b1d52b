use std::str::FromStr;

use crate::{
    api::{benefit::benefits_of, employee::fetch_employee, parse_enum},
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::{
        absence::AbsenceType,
        benefit::BenefitType,
        company::TaxRegime,
        employee::EmployeeStatus,
        payslip::Payslip,
        request_status::RequestStatus,
    },
    payroll::payslip::{BenefitCharge, PayslipInput, calculate_payslip},
    utils::db_utils::{Filters, Page, SqlValue, bind_as, bind_scalar},
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySqlPool, types::Json};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GeneratePayslip {
    #[schema(example = 1)]
    pub employee_id: u64,
    /// Any day of the month; stored as the first day.
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub reference_month: NaiveDate,
    #[serde(default)]
    #[schema(example = 10.0)]
    pub overtime_50_hours: f64,
    #[serde(default)]
    pub overtime_100_hours: f64,
    #[serde(default)]
    pub other_earnings: f64,
    #[serde(default)]
    pub other_deductions: f64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PayslipQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    #[param(example = 2025)]
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct PayslipListResponse {
    pub data: Vec<Payslip>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// First and last day of the month containing `day`.
pub fn month_bounds(day: NaiveDate) -> ApiResult<(NaiveDate, NaiveDate)> {
    let invalid = || ApiError::bad_request("Invalid reference_month");
    let first = day.with_day(1).ok_or_else(invalid)?;
    let next = first.checked_add_months(Months::new(1)).ok_or_else(invalid)?;
    Ok((first, next - Duration::days(1)))
}

/// Calendar days of `ranges` falling inside `[first, last]`, at most 30.
pub fn absence_days_in_month(ranges: &[(NaiveDate, NaiveDate)], first: NaiveDate, last: NaiveDate) -> u32 {
    let days: i64 = ranges
        .iter()
        .map(|(start, end)| {
            let from = (*start).max(first);
            let to = (*end).min(last);
            if to < from { 0 } else { (to - from).num_days() + 1 }
        })
        .sum();
    days.clamp(0, 30) as u32
}

/// Date ranges of the absences that are discounted from pay.
fn unpaid_ranges(rows: Vec<(String, NaiveDate, NaiveDate)>) -> Vec<(NaiveDate, NaiveDate)> {
    rows.into_iter()
        .filter_map(|(absence_type, start, end)| match AbsenceType::from_str(&absence_type) {
            Ok(kind) if !kind.is_paid() => Some((start, end)),
            Ok(_) => None,
            Err(_) => {
                warn!(%absence_type, "Skipping absence with unknown type");
                None
            }
        })
        .collect()
}

fn to_charges(benefits: Vec<crate::model::benefit::Benefit>) -> Vec<BenefitCharge> {
    benefits
        .into_iter()
        .filter(|b| b.is_active)
        .filter_map(|b| match BenefitType::from_str(&b.benefit_type) {
            Ok(benefit_type) => Some(BenefitCharge {
                name: b.name,
                benefit_type,
                monthly_value: b.monthly_value,
                employee_share_pct: b.employee_share_pct,
            }),
            Err(_) => {
                warn!(benefit_id = b.id, benefit_type = %b.benefit_type, "Skipping benefit with unknown type");
                None
            }
        })
        .collect()
}

async fn fetch_payslip(pool: &MySqlPool, payslip_id: u64) -> ApiResult<Payslip> {
    sqlx::query_as::<_, Payslip>("SELECT * FROM payslips WHERE id = ?")
        .bind(payslip_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Payslip not found"))
}

/// Generate Payslip
///
/// Builds the month's statement from the employee record, assigned benefits,
/// approved unjustified absences and the company's tax regime.
#[utoipa::path(
    post,
    path = "/api/payslips",
    request_body = GeneratePayslip,
    responses(
        (status = 201, description = "Payslip generated", body = Payslip),
        (status = 400, description = "Employee not under contract that month or invalid amounts"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payslip already generated for this month")
    ),
    tag = "Payslip",
    security(("bearer_auth" = []))
)]
#[instrument(name = "payslip_generate", skip_all, fields(employee_id = payload.employee_id))]
pub async fn generate_payslip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<GeneratePayslip>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (first, last) = month_bounds(payload.reference_month)?;

    let employee = fetch_employee(pool.get_ref(), payload.employee_id).await?;
    if employee.hire_date > last {
        return Err(ApiError::bad_request("Employee was hired after this month"));
    }
    let status: EmployeeStatus = parse_enum(&employee.status, "status")?;
    if status == EmployeeStatus::Terminated && employee.termination_date.is_some_and(|d| d < first) {
        return Err(ApiError::bad_request("Employee was terminated before this month"));
    }

    let regime = sqlx::query_scalar::<_, String>("SELECT tax_regime FROM companies WHERE id = ?")
        .bind(employee.company_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;
    let regime: TaxRegime = parse_enum(&regime, "tax_regime")?;

    let benefits = to_charges(benefits_of(pool.get_ref(), employee.id).await?);

    let absences = sqlx::query_as::<_, (String, NaiveDate, NaiveDate)>(
        r#"
        SELECT absence_type, start_date, end_date
        FROM absence_requests
        WHERE employee_id = ? AND status = ?
          AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(employee.id)
    .bind(RequestStatus::Approved.as_ref())
    .bind(last)
    .bind(first)
    .fetch_all(pool.get_ref())
    .await?;
    let absences = unpaid_ranges(absences);

    let calc = calculate_payslip(&PayslipInput {
        base_salary: employee.base_salary,
        overtime_50_hours: payload.overtime_50_hours,
        overtime_100_hours: payload.overtime_100_hours,
        other_earnings: payload.other_earnings,
        absence_days: absence_days_in_month(&absences, first, last),
        benefits,
        other_deductions: payload.other_deductions,
        dependents: employee.dependents,
        employer_inss_rate: regime.employer_inss_rate(),
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO payslips
        (employee_id, reference_month, gross_earnings, total_deductions, net_pay,
         inss, irrf, fgts, employer_cost, items)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(first)
    .bind(calc.gross_earnings)
    .bind(calc.total_deductions)
    .bind(calc.net_pay)
    .bind(calc.inss)
    .bind(calc.irrf)
    .bind(calc.fgts)
    .bind(calc.employer_cost)
    .bind(Json(&calc.items))
    .execute(pool.get_ref())
    .await;

    let payslip_id = match result {
        Ok(done) => done.last_insert_id(),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            return Err(ApiError::conflict("Payslip already generated for this month"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(payslip_id, reference_month = %first, net_pay = calc.net_pay, "Payslip generated");

    let payslip = fetch_payslip(pool.get_ref(), payslip_id).await?;
    Ok(HttpResponse::Created().json(payslip))
}

#[utoipa::path(
    get,
    path = "/api/payslips",
    params(PayslipQuery),
    responses((status = 200, description = "Payslip list", body = PayslipListResponse)),
    tag = "Payslip",
    security(("bearer_auth" = []))
)]
pub async fn list_payslips(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayslipQuery>,
) -> ApiResult<HttpResponse> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(employee_id) = auth.scope_employee_filter(query.employee_id)? {
        filters.push("employee_id = ?", SqlValue::U64(employee_id));
    }
    if let Some(year) = query.year {
        filters.push("YEAR(reference_month) = ?", SqlValue::I64(i64::from(year)));
    }
    let where_clause = filters.where_clause();

    let total = bind_scalar(
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM payslips{where_clause}")),
        filters.args(),
    )
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!(
        "SELECT * FROM payslips{where_clause} ORDER BY reference_month DESC, id DESC LIMIT ? OFFSET ?"
    );
    let payslips = bind_as(sqlx::query_as::<_, Payslip>(&data_sql), filters.args())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(PayslipListResponse {
        data: payslips,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payslips/{payslip_id}",
    params(("payslip_id", Path, description = "Payslip ID")),
    responses(
        (status = 200, description = "Payslip found", body = Payslip),
        (status = 404, description = "Payslip not found")
    ),
    tag = "Payslip",
    security(("bearer_auth" = []))
)]
pub async fn get_payslip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let payslip = fetch_payslip(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(payslip.employee_id)?;
    Ok(HttpResponse::Ok().json(payslip))
}

#[utoipa::path(
    delete,
    path = "/api/payslips/{payslip_id}",
    params(("payslip_id", Path, description = "Payslip ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Payslip not found")
    ),
    tag = "Payslip",
    security(("bearer_auth" = []))
)]
pub async fn delete_payslip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let payslip_id = path.into_inner();

    let res = sqlx::query("DELETE FROM payslips WHERE id = ?")
        .bind(payslip_id)
        .execute(pool.get_ref())
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Payslip not found"));
    }

    info!(payslip_id, "Payslip deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::benefit::Benefit;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_bounds_handle_short_months() {
        assert_eq!(month_bounds(d(2025, 2, 17)).unwrap(), (d(2025, 2, 1), d(2025, 2, 28)));
        assert_eq!(month_bounds(d(2024, 2, 1)).unwrap(), (d(2024, 2, 1), d(2024, 2, 29)));
        assert_eq!(month_bounds(d(2025, 12, 31)).unwrap(), (d(2025, 12, 1), d(2025, 12, 31)));
    }

    #[test]
    fn absences_are_clipped_to_the_month() {
        let (first, last) = month_bounds(d(2025, 6, 1)).unwrap();
        let ranges = [
            (d(2025, 5, 30), d(2025, 6, 2)),
            (d(2025, 6, 10), d(2025, 6, 10)),
            (d(2025, 6, 29), d(2025, 7, 3)),
        ];
        assert_eq!(absence_days_in_month(&ranges, first, last), 5);
    }

    #[test]
    fn only_unjustified_absences_are_discounted() {
        let rows = vec![
            ("medical_certificate".to_string(), d(2025, 6, 2), d(2025, 6, 4)),
            ("unjustified".to_string(), d(2025, 6, 10), d(2025, 6, 11)),
            ("jury_duty".to_string(), d(2025, 6, 16), d(2025, 6, 16)),
            ("sabbatical".to_string(), d(2025, 6, 20), d(2025, 6, 20)),
        ];
        assert_eq!(unpaid_ranges(rows), vec![(d(2025, 6, 10), d(2025, 6, 11))]);
    }

    #[test]
    fn absence_days_never_exceed_thirty() {
        let (first, last) = month_bounds(d(2025, 7, 1)).unwrap();
        assert_eq!(absence_days_in_month(&[(d(2025, 6, 1), d(2025, 8, 1))], first, last), 30);
        assert_eq!(absence_days_in_month(&[], first, last), 0);
    }

    #[test]
    fn inactive_and_unknown_benefits_are_not_charged() {
        let benefit = |id, benefit_type: &str, is_active| Benefit {
            id,
            company_id: 1,
            name: format!("b{id}"),
            benefit_type: benefit_type.into(),
            monthly_value: 100.0,
            employee_share_pct: 10.0,
            is_active,
        };
        let charges = to_charges(vec![
            benefit(1, "health_plan", true),
            benefit(2, "health_plan", false),
            benefit(3, "gym", true),
        ]);
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].benefit_type, BenefitType::HealthPlan);
    }
}

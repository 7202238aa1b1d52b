use crate::{
    api::{employee::fetch_employee, parse_enum, transition_request},
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::{
        employee::EmployeeStatus,
        request_status::RequestStatus,
        vacation::{VacationRequest, vacation_end},
    },
    payroll::{
        avos::full_years_between,
        vacation::{VacationInput, simulate_vacation, validate_days},
    },
    utils::db_utils::{Filters, Page, SqlValue, bind_as, bind_scalar},
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

const TABLE: &str = "vacation_requests";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVacation {
    /// Defaults to the caller's own employee profile.
    #[schema(example = 1, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = "2025-07-07", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = 20)]
    pub days: u32,
    #[serde(default)]
    #[schema(example = 10)]
    pub sell_days: u32,
    #[serde(default)]
    pub advance_thirteenth: bool,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct VacationFilter {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    pub status: Option<String>,
    #[param(example = 2025)]
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct VacationListResponse {
    pub data: Vec<VacationRequest>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Rules that depend only on the request and the hire date.
pub fn validate_request(hire_date: NaiveDate, start: NaiveDate, days: u32, sell_days: u32) -> ApiResult<()> {
    validate_days(days, sell_days)?;

    // may not start in the two days before the weekly rest
    if matches!(start.weekday(), Weekday::Fri | Weekday::Sat) {
        return Err(ApiError::bad_request("Vacation cannot start on a Friday or Saturday"));
    }
    if full_years_between(hire_date, start) < 1 {
        return Err(ApiError::bad_request("The 12-month acquisition period is not complete yet"));
    }
    Ok(())
}

/// Inclusive date ranges share at least one day.
pub fn overlaps(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

fn resolve_employee(auth: &AuthUser, requested: Option<u64>) -> ApiResult<u64> {
    match requested {
        Some(id) => {
            auth.require_self_or_hr(id)?;
            Ok(id)
        }
        None => auth.own_employee_id(),
    }
}

async fn fetch_vacation(pool: &MySqlPool, vacation_id: u64) -> ApiResult<VacationRequest> {
    sqlx::query_as::<_, VacationRequest>("SELECT * FROM vacation_requests WHERE id = ?")
        .bind(vacation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Vacation request not found"))
}

#[utoipa::path(
    post,
    path = "/api/vacations",
    request_body = CreateVacation,
    responses(
        (status = 201, description = "Vacation requested", body = VacationRequest),
        (status = 400, description = "Invalid days, start weekday or acquisition period"),
        (status = 409, description = "Overlaps another pending or approved vacation")
    ),
    tag = "Vacation",
    security(("bearer_auth" = []))
)]
#[instrument(name = "vacation_create", skip_all)]
pub async fn create_vacation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateVacation>,
) -> ApiResult<HttpResponse> {
    let employee_id = resolve_employee(&auth, payload.employee_id)?;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    let status: EmployeeStatus = parse_enum(&employee.status, "status")?;
    if status == EmployeeStatus::Terminated {
        return Err(ApiError::bad_request("Employee is terminated"));
    }
    validate_request(employee.hire_date, payload.start_date, payload.days, payload.sell_days)?;

    let requested = (payload.start_date, vacation_end(payload.start_date, payload.days));
    let existing = sqlx::query_as::<_, (NaiveDate, u32)>(
        "SELECT start_date, days FROM vacation_requests WHERE employee_id = ? AND status IN (?, ?)",
    )
    .bind(employee_id)
    .bind(RequestStatus::Pending.as_ref())
    .bind(RequestStatus::Approved.as_ref())
    .fetch_all(pool.get_ref())
    .await?;

    if existing
        .iter()
        .any(|(start, days)| overlaps(requested, (*start, vacation_end(*start, *days))))
    {
        return Err(ApiError::conflict("Overlaps another pending or approved vacation"));
    }

    let done = sqlx::query(
        r#"
        INSERT INTO vacation_requests (employee_id, start_date, days, sell_days, advance_thirteenth)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.start_date)
    .bind(payload.days)
    .bind(payload.sell_days)
    .bind(payload.advance_thirteenth)
    .execute(pool.get_ref())
    .await?;

    info!(vacation_id = done.last_insert_id(), employee_id, days = payload.days, "Vacation requested");

    let vacation = fetch_vacation(pool.get_ref(), done.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(vacation))
}

#[utoipa::path(
    get,
    path = "/api/vacations",
    params(VacationFilter),
    responses((status = 200, description = "Vacation requests", body = VacationListResponse)),
    tag = "Vacation",
    security(("bearer_auth" = []))
)]
pub async fn list_vacations(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<VacationFilter>,
) -> ApiResult<HttpResponse> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(employee_id) = auth.scope_employee_filter(query.employee_id)? {
        filters.push("employee_id = ?", SqlValue::U64(employee_id));
    }
    if let Some(status) = &query.status {
        let status: RequestStatus = parse_enum(status, "status")?;
        filters.push("status = ?", SqlValue::String(status.as_ref().to_string()));
    }
    if let Some(year) = query.year {
        filters.push("YEAR(start_date) = ?", SqlValue::I64(i64::from(year)));
    }
    let where_clause = filters.where_clause();

    let total = bind_scalar(
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM vacation_requests{where_clause}")),
        filters.args(),
    )
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql =
        format!("SELECT * FROM vacation_requests{where_clause} ORDER BY start_date DESC LIMIT ? OFFSET ?");
    let data = bind_as(sqlx::query_as::<_, VacationRequest>(&data_sql), filters.args())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(VacationListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/vacations/{vacation_id}",
    params(("vacation_id", Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Vacation request", body = VacationRequest),
        (status = 404, description = "Vacation request not found")
    ),
    tag = "Vacation",
    security(("bearer_auth" = []))
)]
pub async fn get_vacation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let vacation = fetch_vacation(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(vacation.employee_id)?;
    Ok(HttpResponse::Ok().json(vacation))
}

/// Vacation pay for a request
///
/// Runs the vacation calculation with the employee's current salary and dependents.
#[utoipa::path(
    get,
    path = "/api/vacations/{vacation_id}/simulation",
    params(("vacation_id", Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Amounts due for this vacation", body = VacationResult),
        (status = 404, description = "Vacation request not found")
    ),
    tag = "Vacation",
    security(("bearer_auth" = []))
)]
pub async fn vacation_simulation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let vacation = fetch_vacation(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(vacation.employee_id)?;
    let employee = fetch_employee(pool.get_ref(), vacation.employee_id).await?;

    let result = simulate_vacation(&VacationInput {
        salary: employee.base_salary,
        average_variable_pay: 0.0,
        days: vacation.days,
        sell_days: vacation.sell_days,
        dependents: employee.dependents,
        advance_thirteenth: vacation.advance_thirteenth,
    })?;
    Ok(HttpResponse::Ok().json(result))
}

async fn change_status(
    auth: &AuthUser,
    pool: &MySqlPool,
    vacation_id: u64,
    next: RequestStatus,
) -> ApiResult<HttpResponse> {
    transition_request(pool, TABLE, vacation_id, next).await?;
    info!(vacation_id, status = next.as_ref(), changed_by = auth.user_id, "Vacation status changed");

    let vacation = fetch_vacation(pool, vacation_id).await?;
    Ok(HttpResponse::Ok().json(vacation))
}

#[utoipa::path(
    put,
    path = "/api/vacations/{vacation_id}/approve",
    params(("vacation_id", Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Approved", body = VacationRequest),
        (status = 400, description = "Request is no longer pending")
    ),
    tag = "Vacation",
    security(("bearer_auth" = []))
)]
pub async fn approve_vacation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    change_status(&auth, pool.get_ref(), path.into_inner(), RequestStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/api/vacations/{vacation_id}/reject",
    params(("vacation_id", Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Rejected", body = VacationRequest),
        (status = 400, description = "Request is no longer pending")
    ),
    tag = "Vacation",
    security(("bearer_auth" = []))
)]
pub async fn reject_vacation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    change_status(&auth, pool.get_ref(), path.into_inner(), RequestStatus::Rejected).await
}

#[utoipa::path(
    put,
    path = "/api/vacations/{vacation_id}/cancel",
    params(("vacation_id", Path, description = "Vacation request ID")),
    responses(
        (status = 200, description = "Cancelled", body = VacationRequest),
        (status = 400, description = "Request was already rejected or cancelled"),
        (status = 403, description = "Only the owner or HR may cancel")
    ),
    tag = "Vacation",
    security(("bearer_auth" = []))
)]
pub async fn cancel_vacation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let vacation = fetch_vacation(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(vacation.employee_id)?;
    change_status(&auth, pool.get_ref(), vacation.id, RequestStatus::Cancelled).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn accepts_a_monday_start_after_one_year() {
        // 2025-07-07 is a Monday
        assert!(validate_request(d(2024, 3, 1), d(2025, 7, 7), 20, 10).is_ok());
    }

    #[test]
    fn rejects_friday_and_saturday_starts() {
        assert!(validate_request(d(2024, 3, 1), d(2025, 7, 4), 20, 0).is_err());
        assert!(validate_request(d(2024, 3, 1), d(2025, 7, 5), 20, 0).is_err());
        assert!(validate_request(d(2024, 3, 1), d(2025, 7, 6), 20, 0).is_ok());
    }

    #[test]
    fn requires_a_complete_acquisition_period() {
        assert!(validate_request(d(2024, 7, 8), d(2025, 7, 7), 20, 0).is_err());
        assert!(validate_request(d(2024, 7, 7), d(2025, 7, 7), 20, 0).is_ok());
    }

    #[test]
    fn day_bounds_come_from_payroll_rules() {
        let hire = d(2020, 1, 1);
        let monday = d(2025, 7, 7);
        assert!(validate_request(hire, monday, 4, 0).is_err());
        assert!(validate_request(hire, monday, 25, 10).is_err());
        assert!(validate_request(hire, monday, 20, 11).is_err());
        assert!(validate_request(hire, monday, 30, 0).is_ok());
    }

    #[test]
    fn overlapping_ranges() {
        let a = (d(2025, 7, 7), vacation_end(d(2025, 7, 7), 10));
        assert!(overlaps(a, (d(2025, 7, 16), d(2025, 7, 20))));
        assert!(!overlaps(a, (d(2025, 7, 17), d(2025, 7, 20))));
        assert!(overlaps(a, (d(2025, 7, 1), d(2025, 8, 1))));
    }
}

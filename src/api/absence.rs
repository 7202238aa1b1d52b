use crate::{
    api::{document::fetch_document, employee::fetch_employee, parse_enum, transition_request},
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::{absence::{AbsenceRequest, AbsenceType}, request_status::RequestStatus},
    utils::db_utils::{Filters, Page, SqlValue, bind_as, bind_scalar},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

const TABLE: &str = "absence_requests";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAbsence {
    /// Defaults to the caller's own employee profile.
    #[schema(example = 1, nullable = true)]
    pub employee_id: Option<u64>,
    pub absence_type: AbsenceType,
    #[schema(example = "2025-06-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-06-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(nullable = true)]
    pub reason: Option<String>,
    /// Supporting document (e.g. a medical certificate) already registered.
    #[schema(nullable = true)]
    pub document_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AbsenceFilter {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    pub status: Option<String>,
    pub absence_type: Option<String>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct AbsenceListResponse {
    pub data: Vec<AbsenceRequest>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Caller's target employee: HR may file for anyone, employees only for themselves.
fn resolve_employee(auth: &AuthUser, requested: Option<u64>) -> ApiResult<u64> {
    match requested {
        Some(id) => {
            auth.require_self_or_hr(id)?;
            Ok(id)
        }
        None => auth.own_employee_id(),
    }
}

fn validate_period(start: NaiveDate, end: NaiveDate) -> ApiResult<()> {
    if start > end {
        return Err(ApiError::bad_request("start_date must be on or before end_date"));
    }
    Ok(())
}

async fn fetch_absence(pool: &MySqlPool, absence_id: u64) -> ApiResult<AbsenceRequest> {
    sqlx::query_as::<_, AbsenceRequest>("SELECT * FROM absence_requests WHERE id = ?")
        .bind(absence_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Absence request not found"))
}

#[utoipa::path(
    post,
    path = "/api/absences",
    request_body = CreateAbsence,
    responses(
        (status = 201, description = "Absence request filed", body = Object, example = json!({
            "message": "Absence request created", "id": 1
        })),
        (status = 400, description = "Invalid period or document"),
        (status = 403, description = "Employees may only file for themselves")
    ),
    tag = "Absence",
    security(("bearer_auth" = []))
)]
#[instrument(name = "absence_create", skip_all)]
pub async fn create_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAbsence>,
) -> ApiResult<HttpResponse> {
    let employee_id = resolve_employee(&auth, payload.employee_id)?;
    validate_period(payload.start_date, payload.end_date)?;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    if payload.start_date < employee.hire_date {
        return Err(ApiError::bad_request("Absence starts before the hire date"));
    }
    if let Some(document_id) = payload.document_id {
        let document = fetch_document(pool.get_ref(), document_id).await?;
        if document.employee_id != employee_id {
            return Err(ApiError::bad_request("Document belongs to another employee"));
        }
    }

    let done = sqlx::query(
        r#"
        INSERT INTO absence_requests (employee_id, absence_type, start_date, end_date, reason, document_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.absence_type.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.reason)
    .bind(payload.document_id)
    .execute(pool.get_ref())
    .await?;

    info!(absence_id = done.last_insert_id(), employee_id, "Absence request created");
    Ok(HttpResponse::Created().json(json!({
        "message": "Absence request created",
        "id": done.last_insert_id()
    })))
}

#[utoipa::path(
    get,
    path = "/api/absences",
    params(AbsenceFilter),
    responses((status = 200, description = "Absence requests", body = AbsenceListResponse)),
    tag = "Absence",
    security(("bearer_auth" = []))
)]
pub async fn list_absences(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AbsenceFilter>,
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
    if let Some(kind) = &query.absence_type {
        let kind: AbsenceType = parse_enum(kind, "absence_type")?;
        filters.push("absence_type = ?", SqlValue::String(kind.as_ref().to_string()));
    }
    // overlap with [from, to]
    if let Some(from) = query.from {
        filters.push("end_date >= ?", SqlValue::Date(from));
    }
    if let Some(to) = query.to {
        filters.push("start_date <= ?", SqlValue::Date(to));
    }
    let where_clause = filters.where_clause();
    debug!(where_clause = %where_clause, "Listing absences");

    let total = bind_scalar(
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM absence_requests{where_clause}")),
        filters.args(),
    )
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql =
        format!("SELECT * FROM absence_requests{where_clause} ORDER BY start_date DESC LIMIT ? OFFSET ?");
    let data = bind_as(sqlx::query_as::<_, AbsenceRequest>(&data_sql), filters.args())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AbsenceListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/absences/{absence_id}",
    params(("absence_id", Path, description = "Absence request ID")),
    responses(
        (status = 200, description = "Absence request", body = AbsenceRequest),
        (status = 404, description = "Absence request not found")
    ),
    tag = "Absence",
    security(("bearer_auth" = []))
)]
pub async fn get_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let absence = fetch_absence(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(absence.employee_id)?;
    Ok(HttpResponse::Ok().json(absence))
}

async fn decide(auth: AuthUser, pool: &MySqlPool, absence_id: u64, next: RequestStatus) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    transition_request(pool, TABLE, absence_id, next).await?;

    info!(absence_id, status = next.as_ref(), decided_by = auth.user_id, "Absence request decided");
    let absence = fetch_absence(pool, absence_id).await?;
    Ok(HttpResponse::Ok().json(absence))
}

#[utoipa::path(
    put,
    path = "/api/absences/{absence_id}/approve",
    params(("absence_id", Path, description = "Absence request ID")),
    responses(
        (status = 200, description = "Approved", body = AbsenceRequest),
        (status = 400, description = "Request is no longer pending"),
        (status = 404, description = "Absence request not found")
    ),
    tag = "Absence",
    security(("bearer_auth" = []))
)]
pub async fn approve_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    decide(auth, pool.get_ref(), path.into_inner(), RequestStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/api/absences/{absence_id}/reject",
    params(("absence_id", Path, description = "Absence request ID")),
    responses(
        (status = 200, description = "Rejected", body = AbsenceRequest),
        (status = 400, description = "Request is no longer pending"),
        (status = 404, description = "Absence request not found")
    ),
    tag = "Absence",
    security(("bearer_auth" = []))
)]
pub async fn reject_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    decide(auth, pool.get_ref(), path.into_inner(), RequestStatus::Rejected).await
}

use crate::{
    api::{check_enum_field, employee::fetch_employee, parse_enum},
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::benefit::{Benefit, BenefitType},
    utils::db_utils::{Filters, Page, SqlValue, bind_as, bind_scalar, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: [&str; 5] = [
    "name",
    "benefit_type",
    "monthly_value",
    "employee_share_pct",
    "is_active",
];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBenefit {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = "Vale-refeição")]
    pub name: String,
    pub benefit_type: BenefitType,
    #[schema(example = 600.0)]
    pub monthly_value: f64,
    /// Part of the value paid by the employee, 0 to 100.
    #[serde(default)]
    #[schema(example = 20.0)]
    pub employee_share_pct: f64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BenefitQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<u64>,
    pub benefit_type: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct BenefitListResponse {
    pub data: Vec<Benefit>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignBenefit {
    #[schema(example = 1)]
    pub benefit_id: u64,
}

fn validate_amounts(monthly_value: Option<f64>, share_pct: Option<f64>) -> ApiResult<()> {
    if let Some(v) = monthly_value {
        if !(v.is_finite() && v >= 0.0) {
            return Err(ApiError::bad_request("monthly_value cannot be negative"));
        }
    }
    if let Some(p) = share_pct {
        if !(0.0..=100.0).contains(&p) {
            return Err(ApiError::bad_request("employee_share_pct must be between 0 and 100"));
        }
    }
    Ok(())
}

fn validate_update(body: &Value) -> ApiResult<()> {
    check_enum_field::<BenefitType>(body, "benefit_type")?;
    let number = |field: &str| -> ApiResult<Option<f64>> {
        match body.get(field) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("{field} must be a number"))),
        }
    };
    validate_amounts(number("monthly_value")?, number("employee_share_pct")?)
}

async fn fetch_benefit(pool: &MySqlPool, benefit_id: u64) -> ApiResult<Benefit> {
    sqlx::query_as::<_, Benefit>("SELECT * FROM benefits WHERE id = ?")
        .bind(benefit_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Benefit not found"))
}

#[utoipa::path(
    post,
    path = "/api/benefits",
    request_body = CreateBenefit,
    responses(
        (status = 201, description = "Benefit created", body = Object, example = json!({
            "message": "Benefit created successfully", "id": 1
        })),
        (status = 400, description = "Invalid amounts")
    ),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn create_benefit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateBenefit>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    validate_amounts(Some(payload.monthly_value), Some(payload.employee_share_pct))?;

    let done = sqlx::query(
        r#"
        INSERT INTO benefits (company_id, name, benefit_type, monthly_value, employee_share_pct)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.company_id)
    .bind(payload.name.trim())
    .bind(payload.benefit_type.as_ref())
    .bind(payload.monthly_value)
    .bind(payload.employee_share_pct)
    .execute(pool.get_ref())
    .await?;

    info!(benefit_id = done.last_insert_id(), company_id = payload.company_id, "Benefit created");
    Ok(HttpResponse::Created().json(json!({
        "message": "Benefit created successfully",
        "id": done.last_insert_id()
    })))
}

#[utoipa::path(
    get,
    path = "/api/benefits",
    params(BenefitQuery),
    responses((status = 200, description = "Benefit catalog", body = BenefitListResponse)),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn list_benefits(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BenefitQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(company_id) = query.company_id {
        filters.push("company_id = ?", SqlValue::U64(company_id));
    }
    if let Some(kind) = &query.benefit_type {
        let kind: BenefitType = parse_enum(kind, "benefit_type")?;
        filters.push("benefit_type = ?", SqlValue::String(kind.as_ref().to_string()));
    }
    if let Some(active) = query.is_active {
        filters.push("is_active = ?", SqlValue::Bool(active));
    }
    let where_clause = filters.where_clause();

    let total = bind_scalar(
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM benefits{where_clause}")),
        filters.args(),
    )
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!("SELECT * FROM benefits{where_clause} ORDER BY name LIMIT ? OFFSET ?");
    let benefits = bind_as(sqlx::query_as::<_, Benefit>(&data_sql), filters.args())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(BenefitListResponse {
        data: benefits,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/benefits/{benefit_id}",
    params(("benefit_id", Path, description = "Benefit ID")),
    responses(
        (status = 200, description = "Benefit found", body = Benefit),
        (status = 404, description = "Benefit not found")
    ),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn get_benefit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let benefit = fetch_benefit(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(benefit))
}

#[utoipa::path(
    put,
    path = "/api/benefits/{benefit_id}",
    params(("benefit_id", Path, description = "Benefit ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Benefit updated"),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Benefit not found")
    ),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn update_benefit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    validate_update(&body)?;

    let update = build_update_sql("benefits", &body, &UPDATABLE, "id", path.into_inner())?;
    if execute_update(pool.get_ref(), update).await? == 0 {
        return Err(ApiError::not_found("Benefit not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Benefit updated successfully" })))
}

#[utoipa::path(
    delete,
    path = "/api/benefits/{benefit_id}",
    params(("benefit_id", Path, description = "Benefit ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Benefit not found")
    ),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn delete_benefit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let benefit_id = path.into_inner();

    let res = sqlx::query("DELETE FROM benefits WHERE id = ?")
        .bind(benefit_id)
        .execute(pool.get_ref())
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Benefit not found"));
    }

    info!(benefit_id, "Benefit deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// Assign a benefit to an employee
#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/benefits",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = AssignBenefit,
    responses(
        (status = 201, description = "Benefit assigned"),
        (status = 400, description = "Benefit belongs to another company or is inactive"),
        (status = 404, description = "Employee or benefit not found"),
        (status = 409, description = "Benefit already assigned")
    ),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn assign_benefit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<AssignBenefit>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    let benefit = fetch_benefit(pool.get_ref(), payload.benefit_id).await?;
    if benefit.company_id != employee.company_id {
        return Err(ApiError::bad_request("Benefit belongs to another company"));
    }
    if !benefit.is_active {
        return Err(ApiError::bad_request("Benefit is inactive"));
    }

    let result = sqlx::query("INSERT INTO employee_benefits (employee_id, benefit_id) VALUES (?, ?)")
        .bind(employee_id)
        .bind(benefit.id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!(employee_id, benefit_id = benefit.id, "Benefit assigned");
            Ok(HttpResponse::Created().json(json!({ "message": "Benefit assigned" })))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Err(ApiError::conflict("Benefit already assigned to this employee"))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}/benefits/{benefit_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("benefit_id", Path, description = "Benefit ID")
    ),
    responses(
        (status = 200, description = "Benefit removed"),
        (status = 404, description = "Benefit not assigned to this employee")
    ),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn unassign_benefit(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, u64)>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let (employee_id, benefit_id) = path.into_inner();

    let res = sqlx::query("DELETE FROM employee_benefits WHERE employee_id = ? AND benefit_id = ?")
        .bind(employee_id)
        .bind(benefit_id)
        .execute(pool.get_ref())
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Benefit not assigned to this employee"));
    }

    info!(employee_id, benefit_id, "Benefit removed");
    Ok(HttpResponse::Ok().json(json!({ "message": "Benefit removed" })))
}

pub async fn benefits_of(pool: &MySqlPool, employee_id: u64) -> ApiResult<Vec<Benefit>> {
    let benefits = sqlx::query_as::<_, Benefit>(
        r#"
        SELECT b.*
        FROM benefits b
        JOIN employee_benefits eb ON eb.benefit_id = b.id
        WHERE eb.employee_id = ?
        ORDER BY b.name
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    Ok(benefits)
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/benefits",
    params(("employee_id", Path, description = "Employee ID")),
    responses((status = 200, description = "Benefits assigned to the employee", body = [Benefit])),
    tag = "Benefit",
    security(("bearer_auth" = []))
)]
pub async fn employee_benefits(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let benefits = benefits_of(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(benefits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_in_range() {
        assert!(validate_amounts(Some(0.0), Some(100.0)).is_ok());
        assert!(validate_amounts(Some(-1.0), None).is_err());
        assert!(validate_amounts(None, Some(120.0)).is_err());
    }

    #[test]
    fn update_checks_types_and_kind() {
        assert!(validate_update(&json!({ "monthly_value": 250, "benefit_type": "health_plan" })).is_ok());
        assert!(validate_update(&json!({ "monthly_value": "250" })).is_err());
        assert!(validate_update(&json!({ "employee_share_pct": -5 })).is_err());
        assert!(validate_update(&json!({ "benefit_type": "gym" })).is_err());
    }
}

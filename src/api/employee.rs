use crate::{
    api::{check_enum_field, parse_enum},
    auth::{auth::AuthUser, handlers::is_valid_email},
    error::{ApiError, ApiResult},
    model::employee::{Employee, EmployeeStatus},
    utils::{
        br_docs::Cpf,
        db_utils::{Filters, Page, SqlValue, bind_as, bind_scalar, build_update_sql, execute_update},
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: [&str; 9] = [
    "company_id",
    "full_name",
    "email",
    "phone",
    "position",
    "department",
    "base_salary",
    "dependents",
    "status",
];

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = "Maria da Silva")]
    pub full_name: String,
    #[schema(example = "529.982.247-25")]
    pub cpf: String,
    #[schema(example = "maria.silva@paoquente.com.br", format = "email")]
    pub email: String,
    #[schema(nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "Baker")]
    pub position: String,
    #[schema(example = "Production", nullable = true)]
    pub department: Option<String>,
    #[schema(example = "2022-03-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = 3000.0)]
    pub base_salary: f64,
    #[serde(default)]
    #[schema(example = 0)]
    pub dependents: u32,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<u64>,
    pub status: Option<String>,
    pub department: Option<String>,
    /// Search by name, email or CPF
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TerminateEmployee {
    #[schema(example = "2025-06-14", format = "date", value_type = String)]
    pub termination_date: NaiveDate,
}

fn validate_new_employee(payload: &CreateEmployee) -> ApiResult<Cpf> {
    let cpf = Cpf::parse(&payload.cpf).ok_or_else(|| ApiError::bad_request("Invalid CPF"))?;
    if payload.full_name.trim().is_empty() {
        return Err(ApiError::bad_request("full_name is required"));
    }
    if payload.position.trim().is_empty() {
        return Err(ApiError::bad_request("position is required"));
    }
    if !is_valid_email(payload.email.trim()) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if !(payload.base_salary.is_finite() && payload.base_salary > 0.0) {
        return Err(ApiError::bad_request("base_salary must be greater than zero"));
    }
    Ok(cpf)
}

fn validate_update(body: &Value) -> ApiResult<()> {
    check_enum_field::<EmployeeStatus>(body, "status")?;
    if body.get("status").and_then(Value::as_str) == Some(EmployeeStatus::Terminated.as_ref()) {
        return Err(ApiError::bad_request("Use the terminate endpoint to terminate an employee"));
    }
    if let Some(email) = body.get("email") {
        if !email.as_str().is_some_and(is_valid_email) {
            return Err(ApiError::bad_request("Invalid email"));
        }
    }
    if let Some(salary) = body.get("base_salary") {
        if !salary.as_f64().is_some_and(|s| s > 0.0) {
            return Err(ApiError::bad_request("base_salary must be greater than zero"));
        }
    }
    if let Some(dependents) = body.get("dependents") {
        if dependents.as_u64().is_none() {
            return Err(ApiError::bad_request("dependents must be a non-negative integer"));
        }
    }
    Ok(())
}

pub async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> ApiResult<Employee> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Object, example = json!({
            "message": "Employee created successfully", "id": 1
        })),
        (status = 400, description = "Invalid CPF, email or salary"),
        (status = 409, description = "CPF already registered or unknown company"),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "message": "Something went wrong, Contact with system admin"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_create", skip_all)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let cpf = validate_new_employee(&payload)?;

    let done = sqlx::query(
        r#"
        INSERT INTO employees
        (company_id, full_name, cpf, email, phone, position, department, hire_date, base_salary, dependents)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.company_id)
    .bind(payload.full_name.trim())
    .bind(cpf.digits())
    .bind(payload.email.trim().to_lowercase())
    .bind(&payload.phone)
    .bind(payload.position.trim())
    .bind(&payload.department)
    .bind(payload.hire_date)
    .bind(payload.base_salary)
    .bind(payload.dependents)
    .execute(pool.get_ref())
    .await?;

    info!(employee_id = done.last_insert_id(), company_id = payload.company_id, "Employee created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Employee created successfully",
        "id": done.last_insert_id()
    })))
}

// -------------------- Handler --------------------

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> ApiResult<HttpResponse> {
    let page = Page::new(query.page, query.per_page);

    // ---------- build WHERE clause dynamically ----------
    let mut filters = Filters::new();

    if !auth.is_hr_or_admin() {
        filters.push("id = ?", SqlValue::U64(auth.own_employee_id()?));
    }
    if let Some(company_id) = query.company_id {
        filters.push("company_id = ?", SqlValue::U64(company_id));
    }
    if let Some(status) = &query.status {
        let status: EmployeeStatus = parse_enum(status, "status")?;
        filters.push("status = ?", SqlValue::String(status.as_ref().to_string()));
    }
    if let Some(department) = &query.department {
        filters.push("department = ?", SqlValue::String(department.clone()));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filters.search(&["full_name", "email", "cpf"], search);
    }
    let where_clause = filters.where_clause();

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees{where_clause}");
    debug!(sql = %count_sql, bindings = ?filters.args(), "Counting employees");

    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.args())
        .fetch_one(pool.get_ref())
        .await?;

    // ---------- data query ----------
    let data_sql = format!("SELECT * FROM employees{where_clause} ORDER BY id DESC LIMIT ? OFFSET ?");
    debug!(sql = %data_sql, page = page.page, per_page = page.per_page, "Fetching employees");

    let employees = bind_as(sqlx::query_as::<_, Employee>(&data_sql), filters.args())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Employees may only read their own record"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    validate_update(&body)?;
    let update = build_update_sql("employees", &body, &UPDATABLE, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update).await?;
    if affected == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee updated successfully" })))
}

/// Terminate Employee
///
/// Marks the contract as ended. Use the termination simulator for the amounts due.
#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/terminate",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = TerminateEmployee,
    responses(
        (status = 200, description = "Employee terminated", body = Employee),
        (status = 400, description = "Already terminated or date before hire date"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "employee_terminate", skip(auth, pool, payload))]
pub async fn terminate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<TerminateEmployee>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    let status: EmployeeStatus = parse_enum(&employee.status, "status")?;
    if status == EmployeeStatus::Terminated {
        return Err(ApiError::bad_request("Employee is already terminated"));
    }
    if payload.termination_date < employee.hire_date {
        return Err(ApiError::bad_request("termination_date is before hire_date"));
    }

    sqlx::query("UPDATE employees SET status = ?, termination_date = ? WHERE id = ?")
        .bind(EmployeeStatus::Terminated.as_ref())
        .bind(payload.termination_date)
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    info!(employee_id, termination_date = %payload.termination_date, "Employee terminated");

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 409, description = "Employee still has payslips or requests")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let res = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    info!(employee_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateEmployee {
        CreateEmployee {
            company_id: 1,
            full_name: "Maria da Silva".into(),
            cpf: "529.982.247-25".into(),
            email: "maria@paoquente.com.br".into(),
            phone: None,
            position: "Baker".into(),
            department: None,
            hire_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            base_salary: 3000.0,
            dependents: 0,
        }
    }

    #[test]
    fn valid_employee_yields_bare_cpf() {
        assert_eq!(validate_new_employee(&payload()).unwrap().digits(), "52998224725");
    }

    #[test]
    fn rejects_invalid_employee_fields() {
        let mut p = payload();
        p.cpf = "111.111.111-11".into();
        assert!(validate_new_employee(&p).is_err());

        let mut p = payload();
        p.base_salary = 0.0;
        assert!(validate_new_employee(&p).is_err());

        let mut p = payload();
        p.email = "maria".into();
        assert!(validate_new_employee(&p).is_err());
    }

    #[test]
    fn updates_are_validated_before_sql() {
        assert!(validate_update(&json!({ "base_salary": 3200.0, "status": "on_leave" })).is_ok());
        assert!(validate_update(&json!({ "status": "terminated" })).is_err());
        assert!(validate_update(&json!({ "status": "fired" })).is_err());
        assert!(validate_update(&json!({ "base_salary": -1 })).is_err());
        assert!(validate_update(&json!({ "dependents": 1.5 })).is_err());
        assert!(validate_update(&json!({ "email": "x" })).is_err());
    }

    #[test]
    fn cpf_and_hire_date_are_not_updatable() {
        for field in ["cpf", "hire_date", "termination_date"] {
            let body = json!({ field: "x" });
            assert!(build_update_sql("employees", &body, &UPDATABLE, "id", 1).is_err());
        }
    }
}

use crate::{
    api::{check_enum_field, parse_enum},
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::company::{Company, TaxRegime},
    services::cnpj::CnpjClient,
    utils::{
        br_docs::Cnpj,
        db_utils::{Filters, Page, SqlValue, bind_as, bind_scalar, build_update_sql, execute_update},
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: [&str; 8] = [
    "legal_name",
    "trade_name",
    "tax_regime",
    "email",
    "phone",
    "city",
    "state",
    "is_active",
];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompany {
    #[schema(example = "11.222.333/0001-81")]
    pub cnpj: String,
    #[schema(example = "Padaria Pão Quente LTDA")]
    pub legal_name: String,
    #[schema(example = "Pão Quente", nullable = true)]
    pub trade_name: Option<String>,
    pub tax_regime: TaxRegime,
    #[schema(example = "rh@paoquente.com.br", nullable = true)]
    pub email: Option<String>,
    #[schema(nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "São Paulo", nullable = true)]
    pub city: Option<String>,
    #[schema(example = "SP", nullable = true)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CompanyQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Matches legal name, trade name or CNPJ digits.
    pub search: Option<String>,
    pub tax_regime: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CompanyListResponse {
    pub data: Vec<Company>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

fn validate_state(state: Option<&str>) -> ApiResult<()> {
    match state {
        Some(s) if s.len() != 2 || !s.chars().all(|c| c.is_ascii_uppercase()) => {
            Err(ApiError::bad_request("state must be a two-letter UF code"))
        }
        _ => Ok(()),
    }
}

fn validate_new_company(payload: &CreateCompany) -> ApiResult<Cnpj> {
    let cnpj = Cnpj::parse(&payload.cnpj).ok_or_else(|| ApiError::bad_request("Invalid CNPJ"))?;
    if payload.legal_name.trim().is_empty() {
        return Err(ApiError::bad_request("legal_name is required"));
    }
    validate_state(payload.state.as_deref())?;
    Ok(cnpj)
}

/// Create Company
#[utoipa::path(
    post,
    path = "/api/companies",
    request_body = CreateCompany,
    responses(
        (status = 201, description = "Company created", body = Object, example = json!({
            "message": "Company created successfully", "id": 1
        })),
        (status = 400, description = "Invalid CNPJ or payload"),
        (status = 409, description = "CNPJ already registered")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
#[instrument(name = "company_create", skip_all)]
pub async fn create_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCompany>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let cnpj = validate_new_company(&payload)?;

    let result = sqlx::query(
        r#"
        INSERT INTO companies
        (cnpj, legal_name, trade_name, tax_regime, email, phone, city, state)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(cnpj.digits())
    .bind(payload.legal_name.trim())
    .bind(&payload.trade_name)
    .bind(payload.tax_regime.as_ref())
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.city)
    .bind(&payload.state)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            info!(company_id = done.last_insert_id(), cnpj = %cnpj, "Company created");
            Ok(HttpResponse::Created().json(json!({
                "message": "Company created successfully",
                "id": done.last_insert_id()
            })))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Err(ApiError::conflict("A company with this CNPJ already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/companies",
    params(CompanyQuery),
    responses(
        (status = 200, description = "Paginated company list", body = CompanyListResponse)
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn list_companies(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CompanyQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let page = Page::new(query.page, query.per_page);

    // ---------- build WHERE clause dynamically ----------
    let mut filters = Filters::new();
    if let Some(regime) = &query.tax_regime {
        let regime: TaxRegime = parse_enum(regime, "tax_regime")?;
        filters.push("tax_regime = ?", SqlValue::String(regime.as_ref().to_string()));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filters.search(&["legal_name", "trade_name", "cnpj"], search);
    }
    let where_clause = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM companies{where_clause}");
    debug!(sql = %count_sql, "Counting companies");
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.args())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!("SELECT * FROM companies{where_clause} ORDER BY id DESC LIMIT ? OFFSET ?");
    let companies = bind_as(sqlx::query_as::<_, Company>(&data_sql), filters.args())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(CompanyListResponse {
        data: companies,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/companies/{company_id}",
    params(("company_id", Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company found", body = Company),
        (status = 404, description = "Company not found")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn get_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let company_id = path.into_inner();

    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
        .bind(company_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    Ok(HttpResponse::Ok().json(company))
}

/// Update Company
///
/// Partial update; CNPJ cannot be changed.
#[utoipa::path(
    put,
    path = "/api/companies/{company_id}",
    params(("company_id", Path, description = "Company ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Company updated", body = Object, example = json!({
            "message": "Company updated successfully"
        })),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Company not found")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn update_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let company_id = path.into_inner();

    check_enum_field::<TaxRegime>(&body, "tax_regime")?;
    validate_state(body.get("state").and_then(Value::as_str))?;

    let update = build_update_sql("companies", &body, &UPDATABLE, "id", company_id)?;
    let affected = execute_update(pool.get_ref(), update).await?;

    if affected == 0 {
        return Err(ApiError::not_found("Company not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Company updated successfully" })))
}

#[utoipa::path(
    delete,
    path = "/api/companies/{company_id}",
    params(("company_id", Path, description = "Company ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Company not found"),
        (status = 409, description = "Company still has employees or benefits")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn delete_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let company_id = path.into_inner();

    let res = sqlx::query("DELETE FROM companies WHERE id = ?")
        .bind(company_id)
        .execute(pool.get_ref())
        .await?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Company not found"));
    }

    info!(company_id, "Company deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// Public registry lookup
///
/// Fetches registration data for a CNPJ so the company form can be pre-filled.
#[utoipa::path(
    get,
    path = "/api/companies/cnpj/{cnpj}",
    params(("cnpj", Path, description = "CNPJ, with or without punctuation")),
    responses(
        (status = 200, description = "Registry data", body = CompanyLookup),
        (status = 400, description = "Invalid CNPJ"),
        (status = 404, description = "CNPJ not found in the registry"),
        (status = 502, description = "Registry unavailable")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn lookup_cnpj(
    auth: AuthUser,
    client: web::Data<CnpjClient>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let cnpj = Cnpj::parse(&path).ok_or_else(|| ApiError::bad_request("Invalid CNPJ"))?;

    let lookup = client.lookup(&cnpj).await?;
    Ok(HttpResponse::Ok().json(lookup))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(cnpj: &str) -> CreateCompany {
        CreateCompany {
            cnpj: cnpj.into(),
            legal_name: "Padaria Pão Quente LTDA".into(),
            trade_name: None,
            tax_regime: TaxRegime::SimplesNacional,
            email: None,
            phone: None,
            city: None,
            state: Some("SP".into()),
        }
    }

    #[test]
    fn new_company_cnpj_is_normalized() {
        let cnpj = validate_new_company(&payload("11.222.333/0001-81")).unwrap();
        assert_eq!(cnpj.digits(), "11222333000181");
    }

    #[test]
    fn new_company_rejects_bad_cnpj_and_state() {
        assert!(validate_new_company(&payload("11.222.333/0001-80")).is_err());

        let mut p = payload("11222333000181");
        p.state = Some("sao paulo".into());
        assert!(validate_new_company(&p).is_err());

        let mut p = payload("11222333000181");
        p.legal_name = "  ".into();
        assert!(validate_new_company(&p).is_err());
    }

    #[test]
    fn cnpj_is_not_updatable() {
        let err = build_update_sql(
            "companies",
            &json!({ "cnpj": "11222333000181" }),
            &UPDATABLE,
            "id",
            1,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}

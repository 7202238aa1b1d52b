use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::auth::auth_log::{self, AuthLogLevel};
use crate::error::ApiResult;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthLogQuery {
    /// Only entries at or above this level.
    pub level: Option<AuthLogLevel>,
}

#[utoipa::path(
    get,
    path = "/api/admin/auth-logs",
    params(AuthLogQuery),
    responses(
        (status = 200, description = "Buffered auth events, oldest first", body = [AuthLogEntry]),
        (status = 403, description = "Admin only")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn auth_logs(auth: AuthUser, query: web::Query<AuthLogQuery>) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(auth_log::global().entries(query.level)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/auth-logs",
    responses(
        (status = 204, description = "Buffer cleared"),
        (status = 403, description = "Admin only")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn clear_auth_logs(auth: AuthUser) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    auth_log::global().clear();
    tracing::info!(user_id = auth.user_id, "Auth log buffer cleared");
    Ok(HttpResponse::NoContent().finish())
}

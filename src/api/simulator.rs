//! Stateless payroll simulators. Nothing is persisted.

use actix_web::{HttpResponse, web};
use tracing::debug;

use crate::error::ApiResult;
use crate::payroll::termination::{TerminationInput, simulate_termination};
use crate::payroll::vacation::{VacationInput, simulate_vacation};

#[utoipa::path(
    post,
    path = "/api/simulators/termination",
    request_body = TerminationInput,
    responses(
        (status = 200, description = "Severance amounts", body = TerminationResult),
        (status = 400, description = "Invalid input", body = Object, example = json!({
            "message": "termination_date cannot be before hire_date"
        }))
    ),
    tag = "Simulator",
    security(("bearer_auth" = []))
)]
pub async fn termination(input: web::Json<TerminationInput>) -> ApiResult<HttpResponse> {
    let result = simulate_termination(&input)?;
    debug!(reason = ?result.reason, net = result.net, "Termination simulated");
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/simulators/vacation",
    request_body = VacationInput,
    responses(
        (status = 200, description = "Vacation pay", body = VacationResult),
        (status = 400, description = "Invalid input")
    ),
    tag = "Simulator",
    security(("bearer_auth" = []))
)]
pub async fn vacation(input: web::Json<VacationInput>) -> ApiResult<HttpResponse> {
    let result = simulate_vacation(&input)?;
    debug!(days = input.days, net = result.net, "Vacation simulated");
    Ok(HttpResponse::Ok().json(result))
}

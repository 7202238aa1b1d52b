pub mod absence;
pub mod admin;
pub mod benefit;
pub mod company;
pub mod document;
pub mod employee;
pub mod payslip;
pub mod simulator;
pub mod vacation;

use std::str::FromStr;

use serde_json::Value;
use sqlx::MySqlPool;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::model::request_status::RequestStatus;

/// Parses an enumerated column value coming from a request.
pub fn parse_enum<T: FromStr>(raw: &str, field: &str) -> ApiResult<T> {
    T::from_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {field}: '{raw}'")))
}

/// Validates an enumerated key of a partial-update payload, if present.
pub fn check_enum_field<T: FromStr>(payload: &Value, field: &str) -> ApiResult<()> {
    match payload.get(field) {
        None => Ok(()),
        Some(Value::String(s)) => parse_enum::<T>(s, field).map(|_| ()),
        Some(_) => Err(ApiError::bad_request(format!("{field} must be a string"))),
    }
}

/// Moves an absence or vacation request to `next`, refusing invalid transitions.
/// The update is conditional on the status read so concurrent decisions cannot both win.
pub async fn transition_request(
    pool: &MySqlPool,
    table: &'static str,
    id: u64,
    next: RequestStatus,
) -> ApiResult<RequestStatus> {
    let current = sqlx::query_scalar::<_, String>(&format!("SELECT status FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;

    let current_status: RequestStatus = parse_enum(&current, "status")?;
    if !current_status.can_move_to(next) {
        return Err(ApiError::bad_request(format!(
            "Cannot move a {} request to {}",
            current_status.as_ref(),
            next.as_ref()
        )));
    }

    let done = sqlx::query(&format!("UPDATE {table} SET status = ? WHERE id = ? AND status = ?"))
        .bind(next.as_ref())
        .bind(id)
        .bind(current_status.as_ref())
        .execute(pool)
        .await?;

    if done.rows_affected() == 0 {
        return Err(ApiError::conflict("Request was changed by someone else, reload and retry"));
    }

    debug!(table, id, from = current_status.as_ref(), to = next.as_ref(), "Request status changed");
    Ok(current_status)
}

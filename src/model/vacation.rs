use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct VacationRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "2025-07-07", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = 20)]
    pub days: u32,
    #[schema(example = 10)]
    pub sell_days: u32,
    pub advance_thirteenth: bool,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Last day of rest for a vacation starting on `start` (inclusive).
pub fn vacation_end(start: NaiveDate, days: u32) -> NaiveDate {
    start + Duration::days(i64::from(days.max(1)) - 1)
}

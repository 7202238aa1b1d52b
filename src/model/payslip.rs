use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::payroll::LineItem;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Payslip {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date", example = "2025-06-01")]
    pub reference_month: NaiveDate,
    pub gross_earnings: f64,
    pub total_deductions: f64,
    pub net_pay: f64,
    pub inss: f64,
    pub irrf: f64,
    pub fgts: f64,
    pub employer_cost: f64,
    #[schema(value_type = Vec<LineItem>)]
    pub items: Json<Vec<LineItem>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BenefitType {
    MealVoucher,
    FoodVoucher,
    TransportVoucher,
    HealthPlan,
    DentalPlan,
    LifeInsurance,
    Other,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Benefit {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = "Vale-transporte")]
    pub name: String,
    #[schema(example = "transport_voucher")]
    pub benefit_type: String,
    #[schema(example = 220.0)]
    pub monthly_value: f64,
    /// Percentage of the value paid by the employee (ignored for transport vouchers).
    #[schema(example = 0.0)]
    pub employee_share_pct: f64,
    pub is_active: bool,
}

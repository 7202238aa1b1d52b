use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AbsenceType {
    MedicalCertificate,
    Bereavement,
    Marriage,
    BloodDonation,
    JuryDuty,
    Unjustified,
    Other,
}

impl AbsenceType {
    /// Justified absences are paid; unjustified ones are discounted on the payslip.
    pub fn is_paid(&self) -> bool {
        !matches!(self, AbsenceType::Unjustified)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AbsenceRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "medical_certificate")]
    pub absence_type: String,
    #[schema(example = "2025-06-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-06-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(nullable = true)]
    pub reason: Option<String>,
    #[schema(nullable = true)]
    pub document_id: Option<u64>,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

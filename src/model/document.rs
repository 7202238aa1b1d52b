use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
    Rg,
    Cpf,
    Ctps,
    Contract,
    MedicalCertificate,
    Payslip,
    Other,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Document {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "medical_certificate")]
    pub doc_type: String,
    #[schema(example = "atestado-2025-06-02.pdf")]
    pub file_name: String,
    #[schema(example = "https://storage.example.com/docs/42.pdf")]
    pub storage_url: String,
    #[schema(example = "application/pdf", nullable = true)]
    pub content_type: Option<String>,
    #[schema(example = 48213, nullable = true)]
    pub size_bytes: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub uploaded_at: DateTime<Utc>,
}

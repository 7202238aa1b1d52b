use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    OnLeave,
    Terminated,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "company_id": 1,
        "full_name": "Maria da Silva",
        "cpf": "52998224725",
        "email": "maria.silva@paoquente.com.br",
        "phone": "11987654321",
        "position": "Baker",
        "department": "Production",
        "hire_date": "2022-03-01",
        "base_salary": 3000.0,
        "dependents": 1,
        "status": "active",
        "termination_date": null,
        "created_at": "2022-03-01T12:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Maria da Silva")]
    pub full_name: String,

    #[schema(example = "52998224725")]
    pub cpf: String,

    #[schema(example = "maria.silva@paoquente.com.br")]
    pub email: String,

    #[schema(example = "11987654321", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "Baker")]
    pub position: String,

    #[schema(example = "Production", nullable = true)]
    pub department: Option<String>,

    #[schema(
        example = "2022-03-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    #[schema(example = 3000.0)]
    pub base_salary: f64,

    #[schema(example = 1)]
    pub dependents: u32,

    #[schema(example = "active")]
    pub status: String,

    #[schema(value_type = Option<String>, format = "date", nullable = true)]
    pub termination_date: Option<NaiveDate>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

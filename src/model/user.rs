use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login account. `employee_id` links an Employee-role user to its record.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

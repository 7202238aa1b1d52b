use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaxRegime {
    SimplesNacional,
    LucroPresumido,
    LucroReal,
    Mei,
}

impl TaxRegime {
    /// Employer social security rate over payroll: 20% INSS + 2% RAT + 5.8% third parties
    /// outside Simples; MEI pays a reduced 3%; Simples collects it inside the DAS.
    pub fn employer_inss_rate(&self) -> f64 {
        match self {
            TaxRegime::SimplesNacional => 0.0,
            TaxRegime::Mei => 0.03,
            TaxRegime::LucroPresumido | TaxRegime::LucroReal => 0.278,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "cnpj": "11222333000181",
        "legal_name": "Padaria Pão Quente LTDA",
        "trade_name": "Pão Quente",
        "tax_regime": "simples_nacional",
        "email": "rh@paoquente.com.br",
        "phone": "1133334444",
        "city": "São Paulo",
        "state": "SP",
        "is_active": true,
        "created_at": "2025-01-01T00:00:00Z"
    })
)]
pub struct Company {
    pub id: u64,
    pub cnpj: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    #[schema(example = "simples_nacional")]
    pub tax_regime: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_regime_from_column_value() {
        assert_eq!(TaxRegime::from_str("lucro_real").unwrap(), TaxRegime::LucroReal);
        assert_eq!(TaxRegime::Mei.as_ref(), "mei");
        assert!(TaxRegime::from_str("lucro").is_err());
    }

    #[test]
    fn simples_has_no_separate_employer_inss() {
        assert_eq!(TaxRegime::SimplesNacional.employer_inss_rate(), 0.0);
        assert!(TaxRegime::LucroPresumido.employer_inss_rate() > 0.2);
    }
}

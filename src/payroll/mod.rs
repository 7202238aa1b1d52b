//! CLT payroll arithmetic: INSS and IRRF tables, FGTS, 13th salary,
//! vacation and termination amounts. Nothing here touches the database.

pub mod avos;
pub mod fgts;
pub mod inss;
pub mod irrf;
pub mod payslip;
pub mod termination;
pub mod vacation;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Debug, Error, PartialEq)]
pub enum PayrollError {
    #[error("{0}")]
    InvalidInput(String),
}

impl From<PayrollError> for ApiError {
    fn from(e: PayrollError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// Rounds to cents, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Earning,
    Deduction,
    /// Shown on the statement but not part of net pay (FGTS, employer charges).
    Informative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    #[schema(example = "salary")]
    pub code: String,
    #[schema(example = "Base salary")]
    pub description: String,
    pub kind: ItemKind,
    /// Quantity behind the amount, e.g. "30 days" or "7/12".
    #[schema(example = "30 days", nullable = true)]
    pub reference: Option<String>,
    #[schema(example = 3000.0)]
    pub amount: f64,
}

impl LineItem {
    fn new(kind: ItemKind, code: &str, description: &str, reference: Option<String>, amount: f64) -> Self {
        Self {
            code: code.to_string(),
            description: description.to_string(),
            kind,
            reference,
            amount: round2(amount),
        }
    }

    pub fn earning(code: &str, description: &str, reference: Option<String>, amount: f64) -> Self {
        Self::new(ItemKind::Earning, code, description, reference, amount)
    }

    pub fn deduction(code: &str, description: &str, reference: Option<String>, amount: f64) -> Self {
        Self::new(ItemKind::Deduction, code, description, reference, amount)
    }

    pub fn informative(code: &str, description: &str, reference: Option<String>, amount: f64) -> Self {
        Self::new(ItemKind::Informative, code, description, reference, amount)
    }
}

/// Gross earnings and total deductions of a statement. Zero-value lines count for nothing.
pub fn totals(items: &[LineItem]) -> (f64, f64) {
    let sum = |kind: ItemKind| {
        round2(
            items
                .iter()
                .filter(|i| i.kind == kind)
                .map(|i| i.amount)
                .sum::<f64>(),
        )
    };
    (sum(ItemKind::Earning), sum(ItemKind::Deduction))
}

pub(crate) fn require_positive(value: f64, field: &str) -> Result<(), PayrollError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PayrollError::InvalidInput(format!("{field} must be greater than zero")));
    }
    Ok(())
}

pub(crate) fn require_non_negative(value: f64, field: &str) -> Result<(), PayrollError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PayrollError::InvalidInput(format!("{field} cannot be negative")));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.005,
        "expected {expected}, got {actual}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round2(666.666), 666.67);
        assert_eq!(round2(253.4136), 253.41);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn totals_split_by_kind() {
        let items = vec![
            LineItem::earning("salary", "Base salary", None, 3000.0),
            LineItem::earning("overtime", "Overtime", None, 204.55),
            LineItem::deduction("inss", "INSS", None, 265.96),
            LineItem::informative("fgts", "FGTS", None, 248.36),
        ];
        let (gross, deductions) = totals(&items);
        assert_close(gross, 3204.55);
        assert_close(deductions, 265.96);
    }

    #[test]
    fn rejects_non_positive_values() {
        assert!(require_positive(0.0, "salary").is_err());
        assert!(require_positive(f64::NAN, "salary").is_err());
        assert!(require_non_negative(-1.0, "hours").is_err());
        assert!(require_non_negative(0.0, "hours").is_ok());
    }
}

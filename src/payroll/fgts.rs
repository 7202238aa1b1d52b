use super::round2;
use super::termination::TerminationReason;

pub const DEPOSIT_RATE: f64 = 0.08;

/// Monthly employer deposit over the remuneration.
pub fn monthly_deposit(base: f64) -> f64 {
    round2(base.max(0.0) * DEPOSIT_RATE)
}

pub fn fine_rate(reason: TerminationReason) -> f64 {
    match reason {
        TerminationReason::WithoutCause => 0.40,
        TerminationReason::MutualAgreement => 0.20,
        _ => 0.0,
    }
}

/// Share of the account balance the worker may withdraw after termination.
pub fn withdrawable_share(reason: TerminationReason) -> f64 {
    match reason {
        TerminationReason::WithoutCause | TerminationReason::ContractEnd => 1.0,
        TerminationReason::MutualAgreement => 0.80,
        TerminationReason::WithCause | TerminationReason::Resignation => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, utoipa::ToSchema)]
pub struct FgtsSummary {
    pub balance: f64,
    pub termination_deposit: f64,
    pub fine: f64,
    pub withdrawable: f64,
}

pub fn termination_summary(balance: f64, termination_deposit: f64, reason: TerminationReason) -> FgtsSummary {
    let account = balance + termination_deposit;
    let fine = round2(account * fine_rate(reason));
    let withdrawable = if withdrawable_share(reason) > 0.0 {
        round2(account * withdrawable_share(reason) + fine)
    } else {
        0.0
    };
    FgtsSummary {
        balance: round2(balance),
        termination_deposit: round2(termination_deposit),
        fine,
        withdrawable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::assert_close;

    #[test]
    fn deposit_is_eight_percent() {
        assert_eq!(monthly_deposit(3104.55), 248.36);
        assert_eq!(monthly_deposit(-5.0), 0.0);
    }

    #[test]
    fn dismissal_without_cause_pays_forty_percent() {
        let s = termination_summary(10_000.0, 564.0, TerminationReason::WithoutCause);
        assert_close(s.fine, 4225.60);
        assert_close(s.withdrawable, 14_789.60);
    }

    #[test]
    fn mutual_agreement_pays_twenty_and_releases_eighty_percent() {
        let s = termination_summary(10_000.0, 0.0, TerminationReason::MutualAgreement);
        assert_close(s.fine, 2000.0);
        assert_close(s.withdrawable, 10_000.0);
    }

    #[test]
    fn resignation_keeps_the_account_locked() {
        let s = termination_summary(10_000.0, 240.0, TerminationReason::Resignation);
        assert_eq!(s.fine, 0.0);
        assert_eq!(s.withdrawable, 0.0);
    }
}

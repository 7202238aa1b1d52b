//! Twelfths ("avos") of annual entitlements.

use chrono::{Datelike, Duration, Months, NaiveDate};

/// A trailing fraction of at least this many days counts as a whole month.
pub const MIN_DAYS_FOR_AVO: i64 = 15;

/// Complete years between two dates.
pub fn full_years_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    let mut years = end.year() - start.year();
    if (end.month(), end.day()) < (start.month(), start.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Complete months between two dates, counting `start` as day one.
pub fn full_months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    // always step from `start` so month-end clamping does not accumulate
    let limit = end + Duration::days(1);
    let mut months = 0;
    while let Some(next) = start.checked_add_months(Months::new(months + 1)) {
        if next > limit {
            break;
        }
        months += 1;
    }
    months
}

/// Last day of the calendar year of `on`.
pub fn year_end(on: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(on.year(), 12, 31).unwrap_or(on)
}

/// Start of the vacation acquisition period that contains `on`.
pub fn acquisition_period_start(hire_date: NaiveDate, on: NaiveDate) -> NaiveDate {
    let years = full_years_between(hire_date, on);
    hire_date
        .checked_add_months(Months::new(years * 12))
        .unwrap_or(hire_date)
}

/// Rolling avos from `start`: whole months plus one for a tail of 15+ days, at most 12.
pub fn rolling_avos(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    let months = full_months_between(start, end);
    let cursor = start
        .checked_add_months(Months::new(months))
        .unwrap_or(start);
    let tail = (end - cursor).num_days() + 1;
    let avos = if tail >= MIN_DAYS_FOR_AVO { months + 1 } else { months };
    avos.min(12)
}

/// 13th-salary avos for the calendar year of `end`: each calendar month with
/// 15+ days of service counts.
pub fn thirteenth_avos(hire_date: NaiveDate, end: NaiveDate) -> u32 {
    if end < hire_date {
        return 0;
    }
    let Some(jan_first) = NaiveDate::from_ymd_opt(end.year(), 1, 1) else {
        return 0;
    };
    let start = hire_date.max(jan_first);

    (start.month()..=end.month())
        .filter(|&month| {
            let Some(month_start) = NaiveDate::from_ymd_opt(end.year(), month, 1) else {
                return false;
            };
            let month_end = month_start
                .checked_add_months(Months::new(1))
                .map(|d| d - Duration::days(1))
                .unwrap_or(month_start);
            let from = month_start.max(start);
            let to = month_end.min(end);
            (to - from).num_days() + 1 >= MIN_DAYS_FOR_AVO
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn full_years_respect_the_anniversary() {
        assert_eq!(full_years_between(d(2022, 3, 1), d(2025, 2, 28)), 2);
        assert_eq!(full_years_between(d(2022, 3, 1), d(2025, 3, 1)), 3);
        assert_eq!(full_years_between(d(2025, 3, 1), d(2022, 3, 1)), 0);
    }

    #[test]
    fn full_months_count_the_start_day() {
        assert_eq!(full_months_between(d(2025, 3, 1), d(2025, 3, 31)), 1);
        assert_eq!(full_months_between(d(2025, 3, 1), d(2025, 3, 30)), 0);
        assert_eq!(full_months_between(d(2025, 3, 1), d(2025, 6, 30)), 4);
    }

    #[test]
    fn full_months_from_a_month_end_start() {
        // boundaries stay anchored on the 31st: Mar 28 and Apr 28 are not month ends
        assert_eq!(full_months_between(d(2025, 1, 31), d(2025, 3, 29)), 1);
        assert_eq!(full_months_between(d(2025, 1, 31), d(2025, 3, 30)), 2);
        assert_eq!(full_months_between(d(2025, 1, 31), d(2025, 4, 28)), 2);
        assert_eq!(full_months_between(d(2025, 1, 31), d(2025, 4, 29)), 3);
        assert_eq!(full_months_between(d(2025, 1, 31), d(2026, 1, 30)), 12);
    }

    #[test]
    fn rolling_avos_round_up_fifteen_day_tails() {
        assert_eq!(rolling_avos(d(2025, 3, 1), d(2025, 7, 23)), 5);
        assert_eq!(rolling_avos(d(2025, 3, 1), d(2025, 7, 14)), 4);
        assert_eq!(rolling_avos(d(2024, 3, 1), d(2025, 2, 28)), 12);
        assert_eq!(rolling_avos(d(2020, 1, 1), d(2025, 2, 28)), 12);
    }

    #[test]
    fn acquisition_period_restarts_each_anniversary() {
        assert_eq!(acquisition_period_start(d(2022, 3, 1), d(2025, 7, 23)), d(2025, 3, 1));
        assert_eq!(acquisition_period_start(d(2022, 3, 1), d(2022, 9, 1)), d(2022, 3, 1));
    }

    #[test]
    fn thirteenth_counts_calendar_months() {
        assert_eq!(thirteenth_avos(d(2022, 3, 1), d(2025, 7, 23)), 7);
        assert_eq!(thirteenth_avos(d(2022, 3, 1), d(2025, 7, 10)), 6);
        // hired on the 20th: only 11 days in March
        assert_eq!(thirteenth_avos(d(2025, 3, 20), d(2025, 12, 31)), 9);
        assert_eq!(thirteenth_avos(d(2025, 3, 10), d(2025, 12, 31)), 10);
    }
}

//! Trailing-twelve-month normalization of quarterly reports.

use analysis_core::numeric::or_zero;
use analysis_core::{ConfidenceTier, FinancialPeriod, TtmAggregate, TtmConfidence};
use chrono::{Datelike, NaiveDate, Utc};

/// Calendar quarter of a period-end date: months 1-3 → Q1, 4-6 → Q2, ...
pub fn fiscal_quarter(date: NaiveDate) -> (i32, u32) {
    (date.year(), (date.month() - 1) / 3 + 1)
}

fn quarter_label((year, quarter): (i32, u32)) -> String {
    format!("Q{} {}", quarter, year)
}

/// The four completed calendar quarters before the one containing `today`,
/// most recent first.
pub fn target_quarters(today: NaiveDate) -> [(i32, u32); 4] {
    let (mut year, mut quarter) = fiscal_quarter(today);
    let mut targets = [(0, 0); 4];
    for slot in targets.iter_mut() {
        if quarter == 1 {
            year -= 1;
            quarter = 4;
        } else {
            quarter -= 1;
        }
        *slot = (year, quarter);
    }
    targets
}

/// Pick up to four quarters: exact calendar targets first, then backfill with the
/// most recent unused periods. Returned most recent first.
fn select_quarters(periods: &[FinancialPeriod], today: NaiveDate) -> Vec<&FinancialPeriod> {
    let mut by_recency: Vec<&FinancialPeriod> = periods.iter().collect();
    by_recency.sort_by(|a, b| b.period_end.cmp(&a.period_end));

    let mut used = vec![false; by_recency.len()];
    let mut selected: Vec<usize> = Vec::with_capacity(4);

    for target in target_quarters(today) {
        // by_recency is sorted, so the first hit is the latest filing for that quarter
        if let Some(idx) = by_recency
            .iter()
            .position(|p| fiscal_quarter(p.period_end) == target)
        {
            used[idx] = true;
            selected.push(idx);
        }
    }

    if selected.len() < 4 {
        for (idx, taken) in used.iter_mut().enumerate() {
            if selected.len() >= 4 {
                break;
            }
            if !*taken {
                *taken = true;
                selected.push(idx);
            }
        }
    }

    selected.sort_unstable();
    selected.into_iter().map(|idx| by_recency[idx]).collect()
}

/// TTM aggregate relative to today's UTC date.
pub fn calculate_ttm(periods: &[FinancialPeriod]) -> TtmAggregate {
    calculate_ttm_at(periods, Utc::now().date_naive())
}

/// TTM aggregate with an explicit "now". Never fails: absent or non-finite figures
/// count as zero.
pub fn calculate_ttm_at(periods: &[FinancialPeriod], today: NaiveDate) -> TtmAggregate {
    if periods.is_empty() {
        return TtmAggregate::default();
    }

    let selected = select_quarters(periods, today);

    fn sum(quarters: &[&FinancialPeriod], accessor: fn(&FinancialPeriod) -> Option<f64>) -> f64 {
        quarters.iter().map(|p| or_zero(accessor(p))).sum()
    }

    let revenue = sum(&selected, |p| p.revenue);
    let net_income = sum(&selected, |p| p.net_income);
    let operating_income = sum(&selected, |p| p.operating_income);
    let operating_cash_flow = sum(&selected, |p| p.operating_cash_flow);
    let capital_expenditures = sum(&selected, |p| p.capital_expenditures);
    let gross_profit = sum(&selected, |p| p.gross_profit);

    TtmAggregate {
        revenue,
        net_income,
        operating_income,
        operating_cash_flow,
        capital_expenditures,
        gross_profit,
        free_cash_flow: operating_cash_flow - capital_expenditures,
        data_points: selected.len() as u8,
        start_date: selected.last().map(|p| p.period_end),
        end_date: selected.first().map(|p| p.period_end),
    }
}

/// How many of the four expected calendar quarters are actually present.
/// Advisory only; it never changes the TTM sums.
pub fn ttm_confidence(periods: &[FinancialPeriod], today: NaiveDate) -> TtmConfidence {
    let targets = target_quarters(today);
    let (found, missing): (Vec<&(i32, u32)>, Vec<&(i32, u32)>) =
        targets.iter().partition(|target| {
            periods
                .iter()
                .any(|p| fiscal_quarter(p.period_end) == **target)
        });

    let quarters_found: Vec<String> = found.into_iter().map(|t| quarter_label(*t)).collect();
    let quarters_missing: Vec<String> = missing.into_iter().map(|t| quarter_label(*t)).collect();

    let (tier, reason) = match quarters_found.len() {
        4 => (
            ConfidenceTier::High,
            format!(
                "All four expected quarters present ({})",
                quarters_found.join(", ")
            ),
        ),
        3 => (
            ConfidenceTier::Medium,
            format!(
                "Missing {}; backfilled from older quarters",
                quarters_missing.join(", ")
            ),
        ),
        0 => (
            ConfidenceTier::Low,
            "None of the expected quarters were reported; TTM built from stale periods".to_string(),
        ),
        _ => (
            ConfidenceTier::Low,
            format!(
                "Only {} of 4 expected quarters present (missing {})",
                quarters_found.len(),
                quarters_missing.join(", ")
            ),
        ),
    };

    TtmConfidence {
        tier,
        quarters_found,
        quarters_missing,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quarter(y: i32, m: u32, d: u32, revenue: f64) -> FinancialPeriod {
        FinancialPeriod {
            revenue: Some(revenue),
            operating_income: Some(revenue * 0.3),
            operating_cash_flow: Some(revenue * 0.25),
            capital_expenditures: Some(revenue * 0.05),
            ..FinancialPeriod::empty(date(y, m, d))
        }
    }

    #[test]
    fn test_target_quarters_wrap_year() {
        assert_eq!(
            target_quarters(date(2025, 11, 10)),
            [(2025, 3), (2025, 2), (2025, 1), (2024, 4)]
        );
        assert_eq!(
            target_quarters(date(2025, 2, 1)),
            [(2024, 4), (2024, 3), (2024, 2), (2024, 1)]
        );
    }

    #[test]
    fn test_exact_four_quarters() {
        let periods = vec![
            quarter(2025, 3, 31, 25_000_000_000.0),
            quarter(2025, 6, 30, 22_000_000_000.0),
            quarter(2025, 9, 30, 23_775_000_000.0),
            quarter(2024, 12, 31, 25_000_000_000.0),
            // older filing that must not be picked
            quarter(2024, 9, 30, 99_000_000_000.0),
        ];
        let ttm = calculate_ttm_at(&periods, date(2025, 11, 10));
        assert_eq!(ttm.revenue, 95_775_000_000.0);
        assert_eq!(ttm.data_points, 4);
        assert!(!ttm.is_partial());
        assert_eq!(ttm.start_date, Some(date(2024, 12, 31)));
        assert_eq!(ttm.end_date, Some(date(2025, 9, 30)));
    }

    #[test]
    fn test_backfill_with_recent_periods() {
        // Q3 2025 not reported yet: fall back to Q3 2024
        let periods = vec![
            quarter(2025, 6, 30, 10.0),
            quarter(2025, 3, 31, 10.0),
            quarter(2024, 12, 31, 10.0),
            quarter(2024, 9, 30, 7.0),
            quarter(2024, 6, 30, 1000.0),
        ];
        let ttm = calculate_ttm_at(&periods, date(2025, 11, 10));
        assert_eq!(ttm.data_points, 4);
        assert_eq!(ttm.revenue, 37.0);
        assert_eq!(ttm.start_date, Some(date(2024, 9, 30)));
    }

    #[test]
    fn test_partial_aggregate_and_fcf_invariant() {
        let periods = vec![quarter(2025, 9, 30, 100.0), quarter(2025, 6, 30, 100.0)];
        let ttm = calculate_ttm_at(&periods, date(2025, 11, 10));
        assert_eq!(ttm.data_points, 2);
        assert!(ttm.is_partial());
        assert_eq!(
            ttm.free_cash_flow,
            ttm.operating_cash_flow - ttm.capital_expenditures
        );
    }

    #[test]
    fn test_empty_and_malformed_inputs() {
        let ttm = calculate_ttm_at(&[], date(2025, 11, 10));
        assert_eq!(ttm, TtmAggregate::default());
        assert_eq!(ttm.data_points, 0);

        let mut bad = quarter(2025, 9, 30, 100.0);
        bad.revenue = Some(f64::NAN);
        bad.gross_profit = None;
        let ttm = calculate_ttm_at(&[bad], date(2025, 11, 10));
        assert_eq!(ttm.revenue, 0.0);
        assert_eq!(ttm.gross_profit, 0.0);
        assert_eq!(ttm.data_points, 1);
    }

    #[test]
    fn test_data_points_never_exceed_four() {
        let periods: Vec<FinancialPeriod> = (2018..2026)
            .flat_map(|y| [3, 6, 9, 12].map(|m| quarter(y, m, 28, 1.0)))
            .collect();
        let ttm = calculate_ttm_at(&periods, date(2025, 11, 10));
        assert_eq!(ttm.data_points, 4);
        assert_eq!(ttm.revenue, 4.0);
    }

    #[test]
    fn test_is_idempotent() {
        let periods = vec![quarter(2025, 9, 30, 3.0), quarter(2025, 6, 30, 4.0)];
        let today = date(2025, 11, 10);
        assert_eq!(
            calculate_ttm_at(&periods, today),
            calculate_ttm_at(&periods, today)
        );
    }

    #[test]
    fn test_confidence_tiers() {
        let today = date(2025, 11, 10);
        let all = vec![
            quarter(2025, 9, 30, 1.0),
            quarter(2025, 6, 30, 1.0),
            quarter(2025, 3, 31, 1.0),
            quarter(2024, 12, 31, 1.0),
        ];
        let conf = ttm_confidence(&all, today);
        assert_eq!(conf.tier, ConfidenceTier::High);
        assert_eq!(conf.quarters_found.len(), 4);

        let conf = ttm_confidence(&all[1..], today);
        assert_eq!(conf.tier, ConfidenceTier::Medium);
        assert_eq!(conf.quarters_missing, vec!["Q3 2025".to_string()]);

        let conf = ttm_confidence(&all[2..], today);
        assert_eq!(conf.tier, ConfidenceTier::Low);

        let conf = ttm_confidence(&[], today);
        assert_eq!(conf.tier, ConfidenceTier::Low);
    }
}

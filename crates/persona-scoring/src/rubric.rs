//! Static per-persona rubrics.
//!
//! Each criterion names the ratios it reads and an evaluator that returns `None`
//! when those ratios are missing. Percent metrics use the 0-100 scale of
//! `RatioSnapshot`; leverage and coverage are plain multiples.

use analysis_core::numeric::finite_opt;
use analysis_core::{CriterionStatus, Persona, RatioSnapshot};

pub struct Evaluation {
    pub status: CriterionStatus,
    pub explanation: String,
}

impl Evaluation {
    fn new(status: CriterionStatus, explanation: String) -> Self {
        Self {
            status,
            explanation,
        }
    }
}

pub struct Criterion {
    pub name: &'static str,
    pub weight: u8,
    pub metrics: &'static [&'static str],
    /// Missing data here makes the whole score Insufficient Data.
    pub required: bool,
    /// What a passing reading looks like; feeds `what_would_change_mind`.
    pub pass_condition: &'static str,
    pub evaluate: fn(&RatioSnapshot) -> Option<Evaluation>,
}

fn at_least(value: f64, pass: f64, partial: f64) -> CriterionStatus {
    if value >= pass {
        CriterionStatus::Pass
    } else if value >= partial {
        CriterionStatus::Partial
    } else {
        CriterionStatus::Fail
    }
}

fn at_most(value: f64, pass: f64, partial: f64) -> CriterionStatus {
    if value <= pass {
        CriterionStatus::Pass
    } else if value <= partial {
        CriterionStatus::Partial
    } else {
        CriterionStatus::Fail
    }
}

/// Lower-is-better multiple where a non-positive value means no earnings or no book.
fn positive_at_most(value: f64, pass: f64, partial: f64) -> CriterionStatus {
    if value <= 0.0 {
        CriterionStatus::Fail
    } else {
        at_most(value, pass, partial)
    }
}

// Shared evaluators ---------------------------------------------------------

fn leverage(r: &RatioSnapshot, pass: f64, partial: f64) -> Option<Evaluation> {
    let de = finite_opt(r.debt_to_equity)?;
    Some(Evaluation::new(
        at_most(de, pass, partial),
        format!(
            "Debt-to-equity of {:.2}x (pass ≤ {:.1}x, partial ≤ {:.1}x)",
            de, pass, partial
        ),
    ))
}

fn earnings_growth(r: &RatioSnapshot, pass: f64, partial: f64) -> Option<Evaluation> {
    let g = finite_opt(r.earnings_growth)?;
    Some(Evaluation::new(
        at_least(g, pass, partial),
        format!(
            "Earnings growth of {:.1}% (pass ≥ {:.0}%, partial ≥ {:.0}%)",
            g, pass, partial
        ),
    ))
}

fn pe_multiple(r: &RatioSnapshot, pass: f64, partial: f64) -> Option<Evaluation> {
    let pe = finite_opt(r.pe)?;
    let explanation = if pe <= 0.0 {
        format!("P/E of {:.1} reflects negative earnings", pe)
    } else {
        format!("P/E of {:.1} (pass ≤ {:.0}, partial ≤ {:.0})", pe, pass, partial)
    };
    Some(Evaluation::new(positive_at_most(pe, pass, partial), explanation))
}

// Buffett: quality compounder ----------------------------------------------

fn buffett_returns(r: &RatioSnapshot) -> Option<Evaluation> {
    let (label, value) = match (finite_opt(r.roe), finite_opt(r.roic)) {
        (Some(roe), _) => ("ROE", roe),
        (None, Some(roic)) => ("ROIC", roic),
        (None, None) => return None,
    };
    Some(Evaluation::new(
        at_least(value, 15.0, 10.0),
        format!("{} of {:.1}% (pass ≥ 15%, partial ≥ 10%)", label, value),
    ))
}

fn buffett_leverage(r: &RatioSnapshot) -> Option<Evaluation> {
    leverage(r, 0.5, 1.0)
}

fn buffett_net_margin(r: &RatioSnapshot) -> Option<Evaluation> {
    let m = finite_opt(r.net_margin)?;
    Some(Evaluation::new(
        at_least(m, 15.0, 8.0),
        format!("Net margin of {:.1}% (pass ≥ 15%, partial ≥ 8%)", m),
    ))
}

fn buffett_gross_margin(r: &RatioSnapshot) -> Option<Evaluation> {
    let m = finite_opt(r.gross_margin)?;
    Some(Evaluation::new(
        at_least(m, 40.0, 25.0),
        format!("Gross margin of {:.1}% (pass ≥ 40%, partial ≥ 25%)", m),
    ))
}

fn buffett_valuation(r: &RatioSnapshot) -> Option<Evaluation> {
    pe_multiple(r, 20.0, 30.0)
}

fn buffett_growth(r: &RatioSnapshot) -> Option<Evaluation> {
    earnings_growth(r, 10.0, 5.0)
}

static BUFFETT: [Criterion; 6] = [
    Criterion {
        name: "High return on capital",
        weight: 25,
        metrics: &["roe", "roic"],
        required: true,
        pass_condition: "ROE (or ROIC) sustained at or above 15%",
        evaluate: buffett_returns,
    },
    Criterion {
        name: "Conservative leverage",
        weight: 20,
        metrics: &["debt_to_equity"],
        required: false,
        pass_condition: "Debt-to-equity reduced to 0.5x or below",
        evaluate: buffett_leverage,
    },
    Criterion {
        name: "Strong net margin",
        weight: 15,
        metrics: &["net_margin"],
        required: false,
        pass_condition: "Net margin at or above 15%",
        evaluate: buffett_net_margin,
    },
    Criterion {
        name: "Durable gross margin",
        weight: 15,
        metrics: &["gross_margin"],
        required: false,
        pass_condition: "Gross margin at or above 40%, evidence of pricing power",
        evaluate: buffett_gross_margin,
    },
    Criterion {
        name: "Sensible price",
        weight: 15,
        metrics: &["pe"],
        required: true,
        pass_condition: "P/E at or below 20",
        evaluate: buffett_valuation,
    },
    Criterion {
        name: "Consistent earnings growth",
        weight: 10,
        metrics: &["earnings_growth"],
        required: false,
        pass_condition: "Earnings growth at or above 10%",
        evaluate: buffett_growth,
    },
];

// Graham: defensive value --------------------------------------------------

fn graham_pe(r: &RatioSnapshot) -> Option<Evaluation> {
    pe_multiple(r, 15.0, 20.0)
}

fn graham_pb(r: &RatioSnapshot) -> Option<Evaluation> {
    let pb = finite_opt(r.pb)?;
    Some(Evaluation::new(
        positive_at_most(pb, 1.5, 2.5),
        format!("P/B of {:.2} (pass ≤ 1.5, partial ≤ 2.5)", pb),
    ))
}

fn graham_number(r: &RatioSnapshot) -> Option<Evaluation> {
    let pe = finite_opt(r.pe)?;
    let pb = finite_opt(r.pb)?;
    let product = pe * pb;
    let status = if pe <= 0.0 || pb <= 0.0 {
        CriterionStatus::Fail
    } else {
        at_most(product, 22.5, 30.0)
    };
    Some(Evaluation::new(
        status,
        format!(
            "P/E × P/B of {:.1} (P/E {:.1}, P/B {:.2}; pass ≤ 22.5, partial ≤ 30)",
            product, pe, pb
        ),
    ))
}

fn graham_liquidity(r: &RatioSnapshot) -> Option<Evaluation> {
    let cr = finite_opt(r.current_ratio)?;
    Some(Evaluation::new(
        at_least(cr, 2.0, 1.5),
        format!("Current ratio of {:.2} (pass ≥ 2.0, partial ≥ 1.5)", cr),
    ))
}

fn graham_leverage(r: &RatioSnapshot) -> Option<Evaluation> {
    leverage(r, 0.5, 1.0)
}

fn graham_dividend(r: &RatioSnapshot) -> Option<Evaluation> {
    let y = finite_opt(r.dividend_yield)?;
    let status = if y >= 2.0 {
        CriterionStatus::Pass
    } else if y > 0.0 {
        CriterionStatus::Partial
    } else {
        CriterionStatus::Fail
    };
    Some(Evaluation::new(
        status,
        format!("Dividend yield of {:.2}% (pass ≥ 2%, partial > 0%)", y),
    ))
}

static GRAHAM: [Criterion; 6] = [
    Criterion {
        name: "Moderate earnings multiple",
        weight: 25,
        metrics: &["pe"],
        required: true,
        pass_condition: "P/E at or below 15",
        evaluate: graham_pe,
    },
    Criterion {
        name: "Moderate asset multiple",
        weight: 20,
        metrics: &["pb"],
        required: true,
        pass_condition: "P/B at or below 1.5",
        evaluate: graham_pb,
    },
    Criterion {
        name: "Graham number",
        weight: 15,
        metrics: &["pe", "pb"],
        required: false,
        pass_condition: "P/E × P/B at or below 22.5",
        evaluate: graham_number,
    },
    Criterion {
        name: "Strong liquidity",
        weight: 20,
        metrics: &["current_ratio"],
        required: false,
        pass_condition: "Current ratio of at least 2.0",
        evaluate: graham_liquidity,
    },
    Criterion {
        name: "Low leverage",
        weight: 10,
        metrics: &["debt_to_equity"],
        required: false,
        pass_condition: "Debt-to-equity at or below 0.5x",
        evaluate: graham_leverage,
    },
    Criterion {
        name: "Dividend record",
        weight: 10,
        metrics: &["dividend_yield"],
        required: false,
        pass_condition: "Dividend yield of at least 2%",
        evaluate: graham_dividend,
    },
];

// Lynch: growth at a reasonable price --------------------------------------

fn lynch_peg(r: &RatioSnapshot) -> Option<Evaluation> {
    let pe = finite_opt(r.pe)?;
    let g = finite_opt(r.earnings_growth)?;
    if pe <= 0.0 || g <= 0.0 {
        return Some(Evaluation::new(
            CriterionStatus::Fail,
            format!(
                "PEG undefined with P/E of {:.1} and earnings growth of {:.1}%",
                pe, g
            ),
        ));
    }
    let peg = pe / g;
    Some(Evaluation::new(
        at_most(peg, 1.0, 1.5),
        format!(
            "PEG of {:.2} (P/E {:.1} / growth {:.1}%; pass ≤ 1.0, partial ≤ 1.5)",
            peg, pe, g
        ),
    ))
}

fn lynch_growth(r: &RatioSnapshot) -> Option<Evaluation> {
    earnings_growth(r, 15.0, 8.0)
}

fn lynch_leverage(r: &RatioSnapshot) -> Option<Evaluation> {
    leverage(r, 0.8, 1.5)
}

fn lynch_pe(r: &RatioSnapshot) -> Option<Evaluation> {
    pe_multiple(r, 25.0, 40.0)
}

fn lynch_revenue(r: &RatioSnapshot) -> Option<Evaluation> {
    let g = finite_opt(r.revenue_growth)?;
    Some(Evaluation::new(
        at_least(g, 10.0, 5.0),
        format!("Revenue growth of {:.1}% (pass ≥ 10%, partial ≥ 5%)", g),
    ))
}

static LYNCH: [Criterion; 5] = [
    Criterion {
        name: "PEG ratio",
        weight: 30,
        metrics: &["pe", "earnings_growth"],
        required: true,
        pass_condition: "PEG at or below 1.0",
        evaluate: lynch_peg,
    },
    Criterion {
        name: "Earnings growth",
        weight: 25,
        metrics: &["earnings_growth"],
        required: true,
        pass_condition: "Earnings growth at or above 15%",
        evaluate: lynch_growth,
    },
    Criterion {
        name: "Manageable debt",
        weight: 20,
        metrics: &["debt_to_equity"],
        required: false,
        pass_condition: "Debt-to-equity at or below 0.8x",
        evaluate: lynch_leverage,
    },
    Criterion {
        name: "Reasonable P/E",
        weight: 15,
        metrics: &["pe"],
        required: false,
        pass_condition: "P/E at or below 25",
        evaluate: lynch_pe,
    },
    Criterion {
        name: "Revenue growth",
        weight: 10,
        metrics: &["revenue_growth"],
        required: false,
        pass_condition: "Revenue growth at or above 10%",
        evaluate: lynch_revenue,
    },
];

// Dividend income ----------------------------------------------------------

fn income_yield(r: &RatioSnapshot) -> Option<Evaluation> {
    let y = finite_opt(r.dividend_yield)?;
    Some(Evaluation::new(
        at_least(y, 3.0, 2.0),
        format!("Dividend yield of {:.2}% (pass ≥ 3%, partial ≥ 2%)", y),
    ))
}

fn income_payout(r: &RatioSnapshot) -> Option<Evaluation> {
    let p = finite_opt(r.payout_ratio)?;
    let status = if p <= 0.0 {
        CriterionStatus::Fail
    } else {
        at_most(p, 60.0, 80.0)
    };
    Some(Evaluation::new(
        status,
        format!("Payout ratio of {:.1}% (pass ≤ 60%, partial ≤ 80%)", p),
    ))
}

fn income_coverage(r: &RatioSnapshot) -> Option<Evaluation> {
    let c = finite_opt(r.interest_coverage)?;
    Some(Evaluation::new(
        at_least(c, 8.0, 4.0),
        format!("Interest coverage of {:.1}x (pass ≥ 8x, partial ≥ 4x)", c),
    ))
}

fn income_leverage(r: &RatioSnapshot) -> Option<Evaluation> {
    leverage(r, 1.0, 2.0)
}

fn income_growth(r: &RatioSnapshot) -> Option<Evaluation> {
    earnings_growth(r, 5.0, 0.0)
}

static DIVIDEND_INCOME: [Criterion; 5] = [
    Criterion {
        name: "Attractive yield",
        weight: 30,
        metrics: &["dividend_yield"],
        required: true,
        pass_condition: "Dividend yield of at least 3%",
        evaluate: income_yield,
    },
    Criterion {
        name: "Sustainable payout",
        weight: 25,
        metrics: &["payout_ratio"],
        required: true,
        pass_condition: "Payout ratio between 0% and 60%",
        evaluate: income_payout,
    },
    Criterion {
        name: "Interest coverage",
        weight: 15,
        metrics: &["interest_coverage"],
        required: false,
        pass_condition: "Interest coverage of at least 8x",
        evaluate: income_coverage,
    },
    Criterion {
        name: "Balance sheet strength",
        weight: 15,
        metrics: &["debt_to_equity"],
        required: false,
        pass_condition: "Debt-to-equity at or below 1.0x",
        evaluate: income_leverage,
    },
    Criterion {
        name: "Dividend growth capacity",
        weight: 15,
        metrics: &["earnings_growth"],
        required: false,
        pass_condition: "Earnings growth at or above 5%",
        evaluate: income_growth,
    },
];

pub fn rubric(persona: Persona) -> &'static [Criterion] {
    match persona {
        Persona::Buffett => &BUFFETT,
        Persona::Graham => &GRAHAM,
        Persona::Lynch => &LYNCH,
        Persona::DividendIncome => &DIVIDEND_INCOME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_100() {
        for persona in Persona::ALL {
            let total: u32 = rubric(persona).iter().map(|c| c.weight as u32).sum();
            assert_eq!(total, 100, "{} weights", persona);
        }
    }

    #[test]
    fn test_every_persona_has_a_required_criterion() {
        for persona in Persona::ALL {
            assert!(rubric(persona).iter().any(|c| c.required));
        }
    }

    #[test]
    fn test_band_helpers() {
        assert_eq!(at_least(15.0, 15.0, 10.0), CriterionStatus::Pass);
        assert_eq!(at_least(12.0, 15.0, 10.0), CriterionStatus::Partial);
        assert_eq!(at_least(9.9, 15.0, 10.0), CriterionStatus::Fail);
        assert_eq!(at_most(0.5, 0.5, 1.0), CriterionStatus::Pass);
        assert_eq!(at_most(1.2, 0.5, 1.0), CriterionStatus::Fail);
        assert_eq!(positive_at_most(-3.0, 15.0, 20.0), CriterionStatus::Fail);
    }

    #[test]
    fn test_peg_with_negative_growth_fails() {
        let r = RatioSnapshot {
            pe: Some(12.0),
            earnings_growth: Some(-4.0),
            ..Default::default()
        };
        let eval = lynch_peg(&r).unwrap();
        assert_eq!(eval.status, CriterionStatus::Fail);
        assert!(eval.explanation.contains("-4.0%"));
    }

    #[test]
    fn test_roic_used_when_roe_missing() {
        let r = RatioSnapshot {
            roic: Some(18.2),
            ..Default::default()
        };
        let eval = buffett_returns(&r).unwrap();
        assert_eq!(eval.status, CriterionStatus::Pass);
        assert!(eval.explanation.starts_with("ROIC of 18.2%"));
    }
}

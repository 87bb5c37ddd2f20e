//! Pools per-method intrinsic values into one range and overall verdict.

use analysis_core::numeric::{finite, mean};
use analysis_core::{
    Assessment, ConsensusValuation, MethodAgreement, ValuationMethodResult, ValueRange,
};

use crate::method::{ValuationInput, ValuationMethod};

fn is_valued(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Positive, finite values from every method and each of its scenarios. Whether
/// a price comparison was possible does not matter here.
fn pooled_values(methods: &[ValuationMethodResult]) -> Vec<f64> {
    let mut values = Vec::new();
    for method in methods {
        values.push(method.intrinsic_value);
        if let Some(scenarios) = &method.scenarios {
            values.extend(scenarios.iter().map(|s| s.intrinsic_value_per_share));
        }
    }
    values.retain(|v| is_valued(*v));
    values
}

pub fn build_consensus(
    methods: &[ValuationMethodResult],
    current_price: f64,
    data_quality_warnings: &[String],
) -> ConsensusValuation {
    let values = pooled_values(methods);
    let mut warnings = data_quality_warnings.to_vec();

    let contributing: Vec<&ValuationMethodResult> = methods
        .iter()
        .filter(|m| {
            is_valued(m.intrinsic_value)
                || m.scenarios
                    .iter()
                    .flatten()
                    .any(|s| is_valued(s.intrinsic_value_per_share))
        })
        .collect();
    let methods_used: Vec<String> = contributing.iter().map(|m| m.name.clone()).collect();

    if values.is_empty() {
        warnings.push("No valuation method produced a usable intrinsic value".to_string());
        return ConsensusValuation {
            range: ValueRange::default(),
            consensus_upside: None,
            margin_of_safety: None,
            method_agreement: MethodAgreement::Divergent,
            overall_assessment: Assessment::UnableToValue,
            confidence: 0.0,
            confidence_narrative: "No confidence: none of the valuation methods could value this company.".to_string(),
            warnings,
            methods_used,
        };
    }

    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let midpoint = (low + high) / 2.0;

    let has_price = current_price.is_finite() && current_price > 0.0;
    let consensus_upside = if has_price {
        finite((midpoint - current_price) / current_price * 100.0)
    } else {
        None
    };
    let margin_of_safety = if has_price {
        finite((low - current_price) / low * 100.0)
    } else {
        None
    };

    let method_agreement = MethodAgreement::from_spread((high - low) / midpoint);

    let overall_assessment = if !has_price {
        Assessment::UnableToValue
    } else if current_price < low * 0.9 {
        Assessment::Undervalued
    } else if current_price > high * 1.1 {
        Assessment::Overvalued
    } else {
        Assessment::FairlyValued
    };

    let confidences: Vec<f64> = contributing.iter().map(|m| m.confidence).collect();
    let confidence = mean(&confidences) * 100.0;

    ConsensusValuation {
        range: ValueRange {
            low,
            high,
            midpoint,
        },
        consensus_upside,
        margin_of_safety,
        method_agreement,
        overall_assessment,
        confidence,
        confidence_narrative: confidence_narrative(
            confidence,
            method_agreement,
            contributing.len(),
            data_quality_warnings,
        ),
        warnings,
        methods_used,
    }
}

/// Runs a fixed set of valuation methods over one input and pools the results.
pub struct ValuationConsensusAggregator {
    methods: Vec<Box<dyn ValuationMethod>>,
}

impl ValuationConsensusAggregator {
    pub fn new(methods: Vec<Box<dyn ValuationMethod>>) -> Self {
        Self { methods }
    }

    /// EPV and DCF-lite.
    pub fn with_default_methods() -> Self {
        Self::new(vec![
            Box::new(crate::epv::EpvEngine::new()),
            Box::new(crate::dcf::DcfLiteMethod::new()),
        ])
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    pub fn run(&self, input: &ValuationInput) -> Vec<ValuationMethodResult> {
        self.methods.iter().map(|m| m.value(input)).collect()
    }

    pub fn aggregate(
        &self,
        input: &ValuationInput,
        data_quality_warnings: &[String],
    ) -> (Vec<ValuationMethodResult>, ConsensusValuation) {
        let results = self.run(input);
        let consensus = build_consensus(
            &results,
            input.current_price.unwrap_or(0.0),
            data_quality_warnings,
        );
        (results, consensus)
    }
}

impl Default for ValuationConsensusAggregator {
    fn default() -> Self {
        Self::with_default_methods()
    }
}

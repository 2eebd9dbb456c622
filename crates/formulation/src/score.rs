//! Scalar quality score for a blend.
//!
//! Score = 100 − protein penalty − energy penalty − cost penalty, clamped to
//! [0, 100]. Each penalty is non-decreasing in its own deviation, so shrinking
//! any single deviation never lowers the score and the score can rank
//! candidate blends.

use serde::{Deserialize, Serialize};

use crate::error::FormulationError;
use crate::evaluate::{FormulationResult, Totals};
use crate::target::NutritionalTarget;

/// Floor for tolerances and the soft cost band used as divisors.
pub const MIN_SCALE: f64 = 1e-6;

const MAX_SCORE: f64 = 100.0;

/// Penalty weights of the efficiency score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    /// Points lost per protein tolerance of deviation.
    pub protein_weight: f64,
    /// Points lost per energy tolerance of deviation.
    pub energy_weight: f64,
    /// Points lost per soft band of cost above the soft threshold.
    pub cost_weight: f64,
    /// Soft cost threshold as a fraction of `max_cost`.
    pub soft_cost_ratio: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            protein_weight: 20.0,
            energy_weight: 20.0,
            cost_weight: 50.0,
            soft_cost_ratio: 0.8,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), FormulationError> {
        let weights = [
            ("proteinWeight", self.protein_weight),
            ("energyWeight", self.energy_weight),
            ("costWeight", self.cost_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(FormulationError::validation(format!(
                    "score {name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.soft_cost_ratio) {
            return Err(FormulationError::validation(format!(
                "softCostRatio must lie in [0, 1] (got {})",
                self.soft_cost_ratio
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EfficiencyScorer {
    weights: ScoreWeights,
}

impl EfficiencyScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, result: &FormulationResult, target: &NutritionalTarget) -> f64 {
        self.score_totals(&result.totals, target)
    }

    pub fn score_totals(&self, totals: &Totals, target: &NutritionalTarget) -> f64 {
        let w = &self.weights;

        let protein_ratio = (totals.protein - target.target_protein).abs()
            / target.protein_tolerance.max(MIN_SCALE);
        let energy_ratio =
            (totals.energy - target.target_energy).abs() / target.energy_tolerance.max(MIN_SCALE);

        let soft_threshold = w.soft_cost_ratio * target.max_cost;
        let soft_band = (target.max_cost - soft_threshold).max(MIN_SCALE);
        let cost_ratio = (totals.cost - soft_threshold).max(0.0) / soft_band;

        let raw = MAX_SCORE
            - w.protein_weight * protein_ratio
            - w.energy_weight * energy_ratio
            - w.cost_weight * cost_ratio;

        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, MAX_SCORE)
    }
}

/// Score `result` with the default weights.
pub fn score(result: &FormulationResult, target: &NutritionalTarget) -> f64 {
    EfficiencyScorer::default().score(result, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::broiler_target;

    fn result_with(totals: Totals) -> FormulationResult {
        FormulationResult {
            totals,
            feasible: true,
            efficiency_score: 0.0,
            violations: Vec::new(),
        }
    }

    #[test]
    fn exact_hit_below_soft_cost_scores_one_hundred() {
        let target = broiler_target();
        let totals = Totals {
            protein: 16.0,
            energy: 3200.0,
            cost: 0.90,
        };
        assert_eq!(score(&result_with(totals), &target), 100.0);
    }

    #[test]
    fn penalties_follow_the_default_weights() {
        let target = broiler_target();
        // Half a protein tolerance (10), a quarter energy tolerance (5), and cost
        // halfway through the soft band 0.96..1.20 (25).
        let totals = Totals {
            protein: 16.5,
            energy: 3175.0,
            cost: 1.08,
        };
        let s = score(&result_with(totals), &target);
        assert!((s - 60.0).abs() < 1e-9, "score was {s}");
    }

    #[test]
    fn score_is_clamped_at_zero() {
        let target = broiler_target();
        let totals = Totals {
            protein: 40.0,
            energy: 0.0,
            cost: 9.0,
        };
        assert_eq!(score(&result_with(totals), &target), 0.0);
    }

    #[test]
    fn zero_tolerance_penalizes_any_deviation_to_the_floor() {
        let target = NutritionalTarget {
            protein_tolerance: 0.0,
            ..broiler_target()
        };
        let totals = Totals {
            protein: 16.01,
            energy: 3200.0,
            cost: 0.5,
        };
        assert_eq!(score(&result_with(totals), &target), 0.0);

        let exact = Totals { protein: 16.0, ..totals };
        assert_eq!(score(&result_with(exact), &target), 100.0);
    }

    #[test]
    fn weights_are_validated() {
        let weights = ScoreWeights {
            soft_cost_ratio: 1.5,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());

        let weights = ScoreWeights {
            cost_weight: -1.0,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());
        assert!(ScoreWeights::default().validate().is_ok());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: closer protein never scores lower (energy and cost held fixed).
            #[test]
            fn protein_deviation_is_monotone(
                dev_a in 0.0f64..10.0,
                extra in 0.0f64..10.0,
                above in any::<bool>(),
                energy in 2500.0f64..3800.0,
                cost in 0.0f64..2.0,
            ) {
                let target = broiler_target();
                let sign = if above { 1.0 } else { -1.0 };
                let a = Totals { protein: target.target_protein + sign * dev_a, energy, cost };
                let b = Totals { protein: target.target_protein - sign * (dev_a + extra), energy, cost };
                let scorer = EfficiencyScorer::default();
                prop_assert!(scorer.score_totals(&a, &target) >= scorer.score_totals(&b, &target));
            }

            /// Property: closer energy never scores lower.
            #[test]
            fn energy_deviation_is_monotone(
                dev_a in 0.0f64..800.0,
                extra in 0.0f64..800.0,
                protein in 10.0f64..22.0,
                cost in 0.0f64..2.0,
            ) {
                let target = broiler_target();
                let a = Totals { protein, energy: target.target_energy - dev_a, cost };
                let b = Totals { protein, energy: target.target_energy + dev_a + extra, cost };
                let scorer = EfficiencyScorer::default();
                prop_assert!(scorer.score_totals(&a, &target) >= scorer.score_totals(&b, &target));
            }

            /// Property: cheaper never scores lower.
            #[test]
            fn cost_is_monotone(
                cost_a in 0.0f64..3.0,
                extra in 0.0f64..3.0,
                protein in 10.0f64..22.0,
                energy in 2500.0f64..3800.0,
            ) {
                let target = broiler_target();
                let a = Totals { protein, energy, cost: cost_a };
                let b = Totals { protein, energy, cost: cost_a + extra };
                let scorer = EfficiencyScorer::default();
                prop_assert!(scorer.score_totals(&a, &target) >= scorer.score_totals(&b, &target));
            }

            /// Property: score stays within [0, 100].
            #[test]
            fn score_is_bounded(
                protein in 0.0f64..100.0,
                energy in 0.0f64..10000.0,
                cost in 0.0f64..100.0,
            ) {
                let s = EfficiencyScorer::default()
                    .score_totals(&Totals { protein, energy, cost }, &broiler_target());
                prop_assert!((0.0..=100.0).contains(&s));
            }
        }
    }
}

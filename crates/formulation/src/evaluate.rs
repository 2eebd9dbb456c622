//! Aggregate totals and feasibility of a blend.

use serde::{Deserialize, Serialize};

use crate::error::FormulationError;
use crate::ingredient::{IngredientCatalog, IngredientId};
use crate::score::EfficiencyScorer;
use crate::state::FormulationState;
use crate::target::NutritionalTarget;

/// Allowed deviation of the inclusion total from 100% for a feasible blend.
pub const MASS_BALANCE_TOLERANCE: f64 = 0.1;

/// Absolute slack applied to every bound comparison; absorbs round-off from
/// renormalizing a blend, never a real violation.
pub const NUMERIC_SLACK: f64 = 1e-9;

/// Nutrient and cost content of one mass unit of the blend.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Protein, in percent.
    pub protein: f64,
    /// Energy, in kcal per mass unit.
    pub energy: f64,
    /// Cost, in currency per mass unit.
    pub cost: f64,
}

impl Totals {
    /// Inclusion-weighted totals, accumulated in catalog order.
    pub fn of(state: &FormulationState, catalog: &IngredientCatalog) -> Self {
        let mut totals = Totals::default();
        for ingredient in catalog {
            let share = state.get(&ingredient.id) / 100.0;
            totals.protein += share * ingredient.protein_per_unit;
            totals.energy += share * ingredient.energy_per_unit;
            totals.cost += share * ingredient.cost_per_unit;
        }
        totals
    }
}

/// A single named constraint failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Violation {
    ProteinOutOfTolerance {
        actual: f64,
        target: f64,
        tolerance: f64,
    },
    EnergyOutOfTolerance {
        actual: f64,
        target: f64,
        tolerance: f64,
    },
    CostExceeded {
        actual: f64,
        max: f64,
    },
    MassImbalance {
        total: f64,
    },
    BelowMinimum {
        ingredient_id: IngredientId,
        inclusion: f64,
        min: f64,
    },
    AboveMaximum {
        ingredient_id: IngredientId,
        inclusion: f64,
        max: f64,
    },
}

impl Violation {
    /// Stable constraint name (matches the serialized `kind`).
    pub fn constraint(&self) -> &'static str {
        match self {
            Violation::ProteinOutOfTolerance { .. } => "protein_out_of_tolerance",
            Violation::EnergyOutOfTolerance { .. } => "energy_out_of_tolerance",
            Violation::CostExceeded { .. } => "cost_exceeded",
            Violation::MassImbalance { .. } => "mass_imbalance",
            Violation::BelowMinimum { .. } => "below_minimum",
            Violation::AboveMaximum { .. } => "above_maximum",
        }
    }

    /// The offending ingredient, for bound violations.
    pub fn ingredient_id(&self) -> Option<&IngredientId> {
        match self {
            Violation::BelowMinimum { ingredient_id, .. }
            | Violation::AboveMaximum { ingredient_id, .. } => Some(ingredient_id),
            _ => None,
        }
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Violation::ProteinOutOfTolerance {
                actual,
                target,
                tolerance,
            } => write!(f, "protein {actual:.3}% outside {target}±{tolerance}"),
            Violation::EnergyOutOfTolerance {
                actual,
                target,
                tolerance,
            } => write!(f, "energy {actual:.1} outside {target}±{tolerance}"),
            Violation::CostExceeded { actual, max } => {
                write!(f, "cost {actual:.4} exceeds ceiling {max}")
            }
            Violation::MassImbalance { total } => {
                write!(f, "inclusions total {total:.4}% instead of 100%")
            }
            Violation::BelowMinimum {
                ingredient_id,
                inclusion,
                min,
            } => write!(f, "{ingredient_id} at {inclusion:.4}% is below its minimum of {min}%"),
            Violation::AboveMaximum {
                ingredient_id,
                inclusion,
                max,
            } => write!(f, "{ingredient_id} at {inclusion:.4}% is above its maximum of {max}%"),
        }
    }
}

/// Outcome of evaluating a blend against a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulationResult {
    pub totals: Totals,
    pub feasible: bool,
    /// Quality score in [0, 100].
    pub efficiency_score: f64,
    pub violations: Vec<Violation>,
}

impl FormulationResult {
    pub fn violates(&self, constraint: &str) -> bool {
        self.violations.iter().any(|v| v.constraint() == constraint)
    }

    pub fn violations_for(&self, id: &IngredientId) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.ingredient_id() == Some(id))
    }
}

/// Pure evaluator: totals, feasibility verdict, violations and score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConstraintEvaluator {
    scorer: EfficiencyScorer,
}

impl ConstraintEvaluator {
    pub fn new(scorer: EfficiencyScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &EfficiencyScorer {
        &self.scorer
    }

    pub fn evaluate(
        &self,
        state: &FormulationState,
        catalog: &IngredientCatalog,
        target: &NutritionalTarget,
    ) -> Result<FormulationResult, FormulationError> {
        target.validate()?;

        for (id, inclusion) in state.iter() {
            if !catalog.contains(id) {
                return Err(FormulationError::validation(format!(
                    "formulation references unknown ingredient: {id}"
                )));
            }
            if !inclusion.is_finite() {
                return Err(FormulationError::validation(format!(
                    "inclusion of {id} must be a finite number"
                )));
            }
        }

        let totals = Totals::of(state, catalog);
        let mut violations = Vec::new();

        if (totals.protein - target.target_protein).abs() > target.protein_tolerance + NUMERIC_SLACK
        {
            violations.push(Violation::ProteinOutOfTolerance {
                actual: totals.protein,
                target: target.target_protein,
                tolerance: target.protein_tolerance,
            });
        }

        if (totals.energy - target.target_energy).abs() > target.energy_tolerance + NUMERIC_SLACK {
            violations.push(Violation::EnergyOutOfTolerance {
                actual: totals.energy,
                target: target.target_energy,
                tolerance: target.energy_tolerance,
            });
        }

        if totals.cost > target.max_cost + NUMERIC_SLACK {
            violations.push(Violation::CostExceeded {
                actual: totals.cost,
                max: target.max_cost,
            });
        }

        let total_inclusion: f64 = catalog.iter().map(|i| state.get(&i.id)).sum();
        if (total_inclusion - 100.0).abs() > MASS_BALANCE_TOLERANCE + NUMERIC_SLACK {
            violations.push(Violation::MassImbalance {
                total: total_inclusion,
            });
        }

        for ingredient in catalog {
            let inclusion = state.get(&ingredient.id);
            if inclusion < ingredient.min_inclusion - NUMERIC_SLACK {
                violations.push(Violation::BelowMinimum {
                    ingredient_id: ingredient.id.clone(),
                    inclusion,
                    min: ingredient.min_inclusion,
                });
            } else if inclusion > ingredient.max_inclusion + NUMERIC_SLACK {
                violations.push(Violation::AboveMaximum {
                    ingredient_id: ingredient.id.clone(),
                    inclusion,
                    max: ingredient.max_inclusion,
                });
            }
        }

        let efficiency_score = self.scorer.score_totals(&totals, target);

        Ok(FormulationResult {
            totals,
            feasible: violations.is_empty(),
            efficiency_score,
            violations,
        })
    }
}

/// Evaluate `state` with the default scoring weights.
pub fn evaluate(
    state: &FormulationState,
    catalog: &IngredientCatalog,
    target: &NutritionalTarget,
) -> Result<FormulationResult, FormulationError> {
    ConstraintEvaluator::default().evaluate(state, catalog, target)
}

use serde::{Deserialize, Serialize};

use feedforge_core::ValueObject;

use crate::error::FormulationError;

/// Nutritional goals for a blend: protein and energy with symmetric
/// tolerance bands, plus a hard cost ceiling per mass unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionalTarget {
    pub target_protein: f64,
    pub protein_tolerance: f64,
    pub target_energy: f64,
    pub energy_tolerance: f64,
    pub max_cost: f64,
}

impl NutritionalTarget {
    pub fn validate(&self) -> Result<(), FormulationError> {
        let fields = [
            ("targetProtein", self.target_protein),
            ("proteinTolerance", self.protein_tolerance),
            ("targetEnergy", self.target_energy),
            ("energyTolerance", self.energy_tolerance),
            ("maxCost", self.max_cost),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(FormulationError::validation(format!(
                    "target {name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        Ok(())
    }
}

impl ValueObject for NutritionalTarget {}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ingredient::IngredientId;

/// Allowed deviation of the inclusion total from 100% for a finished formulation.
pub const COMPLETE_TOTAL_TOLERANCE: f64 = 0.01;

/// Inclusion percentage per ingredient.
///
/// A state being edited may sum to anything; only a *complete* formulation is
/// expected to total 100%. Ids are kept ordered so iteration and JSON output
/// are stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulationState {
    inclusions: BTreeMap<IngredientId, f64>,
}

impl FormulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<IngredientId>,
    {
        Self {
            inclusions: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Inclusion of `id`; ingredients never set read as 0.
    pub fn get(&self, id: &IngredientId) -> f64 {
        self.inclusions.get(id).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, id: impl Into<IngredientId>, inclusion: f64) {
        self.inclusions.insert(id.into(), inclusion);
    }

    pub fn remove(&mut self, id: &IngredientId) -> Option<f64> {
        self.inclusions.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IngredientId, f64)> {
        self.inclusions.iter().map(|(k, v)| (k, *v))
    }

    pub fn ids(&self) -> impl Iterator<Item = &IngredientId> {
        self.inclusions.keys()
    }

    pub fn len(&self) -> usize {
        self.inclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inclusions.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.inclusions.values().sum()
    }

    pub fn is_complete(&self) -> bool {
        (self.total() - 100.0).abs() <= COMPLETE_TOTAL_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_ingredients_read_as_zero() {
        let state = FormulationState::from_pairs([("corn", 80.0)]);
        assert_eq!(state.get(&"corn".into()), 80.0);
        assert_eq!(state.get(&"soybean".into()), 0.0);
    }

    #[test]
    fn completeness_uses_one_hundredth_tolerance() {
        let mut state = FormulationState::from_pairs([("corn", 80.0), ("soybean", 19.995)]);
        assert!(state.is_complete());

        state.set("soybean", 19.9);
        assert!(!state.is_complete());
    }

    #[test]
    fn serializes_as_ordered_object() {
        let state = FormulationState::from_pairs([("soybean", 20.0), ("corn", 80.0)]);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"corn":80.0,"soybean":20.0}"#);
    }
}

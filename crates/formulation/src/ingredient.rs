//! Ingredient records and the read-only catalog the optimizer searches over.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use feedforge_core::Entity;

use crate::error::FormulationError;

/// Ingredient identifier (unique within a catalog).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(String);

impl IngredientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IngredientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IngredientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for IngredientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A feed ingredient with its nutrient coefficients, price and inclusion band.
///
/// - `protein_per_unit`: protein concentration in percent (0-100).
/// - `energy_per_unit`: energy per mass unit (kcal/kg).
/// - `cost_per_unit`: currency per mass unit.
/// - `min_inclusion` / `max_inclusion`: allowed share of the final blend, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: IngredientId,
    pub protein_per_unit: f64,
    pub energy_per_unit: f64,
    pub cost_per_unit: f64,
    pub min_inclusion: f64,
    pub max_inclusion: f64,
}

impl Ingredient {
    /// Check the record on its own (catalog-level checks live on [`IngredientCatalog`]).
    pub fn validate(&self) -> Result<(), FormulationError> {
        let id = &self.id;
        if id.as_str().trim().is_empty() {
            return Err(FormulationError::validation("ingredient id cannot be empty"));
        }

        let fields = [
            ("proteinPerUnit", self.protein_per_unit),
            ("energyPerUnit", self.energy_per_unit),
            ("costPerUnit", self.cost_per_unit),
            ("minInclusion", self.min_inclusion),
            ("maxInclusion", self.max_inclusion),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(FormulationError::validation(format!(
                    "ingredient {id}: {name} must be a finite number"
                )));
            }
            if value < 0.0 {
                return Err(FormulationError::validation(format!(
                    "ingredient {id}: {name} cannot be negative (got {value})"
                )));
            }
        }

        if self.protein_per_unit > 100.0 {
            return Err(FormulationError::validation(format!(
                "ingredient {id}: proteinPerUnit is a percentage and cannot exceed 100 (got {})",
                self.protein_per_unit
            )));
        }

        if self.max_inclusion > 100.0 {
            return Err(FormulationError::validation(format!(
                "ingredient {id}: maxInclusion cannot exceed 100 (got {})",
                self.max_inclusion
            )));
        }

        if self.min_inclusion > self.max_inclusion {
            return Err(FormulationError::validation(format!(
                "ingredient {id}: minInclusion {} exceeds maxInclusion {}",
                self.min_inclusion, self.max_inclusion
            )));
        }

        Ok(())
    }

    /// Width of the inclusion band.
    pub fn headroom(&self) -> f64 {
        self.max_inclusion - self.min_inclusion
    }
}

impl Entity for Ingredient {
    type Id = IngredientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Read-only, validated collection of ingredients.
///
/// Insertion order is preserved and every aggregate computation walks the
/// catalog in that order, so sums are reproducible bit for bit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct IngredientCatalog {
    ingredients: Vec<Ingredient>,
}

impl IngredientCatalog {
    /// Validate every record and reject duplicate ids.
    pub fn new(ingredients: Vec<Ingredient>) -> Result<Self, FormulationError> {
        let mut seen: HashSet<&IngredientId> = HashSet::with_capacity(ingredients.len());
        for ingredient in &ingredients {
            ingredient.validate()?;
            if !seen.insert(&ingredient.id) {
                return Err(FormulationError::validation(format!(
                    "duplicate ingredient id: {}",
                    ingredient.id
                )));
            }
        }
        Ok(Self { ingredients })
    }

    pub fn get(&self, id: &IngredientId) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| &i.id == id)
    }

    pub fn position(&self, id: &IngredientId) -> Option<usize> {
        self.ingredients.iter().position(|i| &i.id == id)
    }

    pub fn contains(&self, id: &IngredientId) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.iter()
    }

    pub fn as_slice(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn min_inclusion_total(&self) -> f64 {
        self.ingredients.iter().map(|i| i.min_inclusion).sum()
    }

    pub fn max_inclusion_total(&self) -> f64 {
        self.ingredients.iter().map(|i| i.max_inclusion).sum()
    }

    /// Fail when no blend summing to 100% can satisfy every inclusion band.
    pub fn check_bounds(&self) -> Result<(), FormulationError> {
        let min_total = self.min_inclusion_total();
        let max_total = self.max_inclusion_total();
        if min_total > 100.0 + crate::evaluate::NUMERIC_SLACK
            || max_total < 100.0 - crate::evaluate::NUMERIC_SLACK
        {
            return Err(FormulationError::InfeasibleBounds {
                min_total,
                max_total,
            });
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for IngredientCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let ingredients = Vec::<Ingredient>::deserialize(deserializer)?;
        IngredientCatalog::new(ingredients).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a IngredientCatalog {
    type Item = &'a Ingredient;
    type IntoIter = core::slice::Iter<'a, Ingredient>;

    fn into_iter(self) -> Self::IntoIter {
        self.ingredients.iter()
    }
}

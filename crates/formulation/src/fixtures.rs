//! Shared test data: a three-ingredient poultry catalog and a broiler grower target.

use crate::ingredient::{Ingredient, IngredientCatalog};
use crate::target::NutritionalTarget;

pub(crate) fn ingredient(
    id: &str,
    protein: f64,
    energy: f64,
    cost: f64,
    min: f64,
    max: f64,
) -> Ingredient {
    Ingredient {
        id: id.into(),
        protein_per_unit: protein,
        energy_per_unit: energy,
        cost_per_unit: cost,
        min_inclusion: min,
        max_inclusion: max,
    }
}

pub(crate) fn poultry_catalog_with_corn_max(corn_max: f64) -> IngredientCatalog {
    IngredientCatalog::new(vec![
        ingredient("corn", 8.5, 3350.0, 0.65, 0.0, corn_max),
        ingredient("soybean", 46.0, 2230.0, 1.85, 0.0, 35.0),
        ingredient("limestone", 0.0, 0.0, 0.12, 0.5, 2.0),
    ])
    .expect("fixture catalog is valid")
}

/// Corn capped at 70%.
pub(crate) fn poultry_catalog() -> IngredientCatalog {
    poultry_catalog_with_corn_max(70.0)
}

pub(crate) fn broiler_target() -> NutritionalTarget {
    NutritionalTarget {
        target_protein: 16.0,
        protein_tolerance: 1.0,
        target_energy: 3200.0,
        energy_tolerance: 100.0,
        max_cost: 1.20,
    }
}

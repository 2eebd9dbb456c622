use serde::Deserialize;

use feedforge_formulation::{FormulationState, Ingredient, NutritionalTarget};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PutCatalogRequest {
    pub ingredients: Vec<Ingredient>,
}

/// `ingredients` overrides the tenant's stored catalog for this call only.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub state: FormulationState,
    pub target: NutritionalTarget,
    #[serde(default)]
    pub ingredients: Option<Vec<Ingredient>>,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub target: NutritionalTarget,
    #[serde(default)]
    pub ingredients: Option<Vec<Ingredient>>,
}

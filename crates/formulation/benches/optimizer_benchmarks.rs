use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use feedforge_formulation::{
    FormulationState, Ingredient, IngredientCatalog, NutritionalTarget, Optimizer, OptimizerConfig,
    evaluate,
};

fn ingredient(id: &str, protein: f64, energy: f64, cost: f64, min: f64, max: f64) -> Ingredient {
    Ingredient {
        id: id.into(),
        protein_per_unit: protein,
        energy_per_unit: energy,
        cost_per_unit: cost,
        min_inclusion: min,
        max_inclusion: max,
    }
}

/// Poultry staples plus `extra` filler grains with spread-out coefficients.
fn catalog(extra: usize) -> IngredientCatalog {
    let mut ingredients = vec![
        ingredient("corn", 8.5, 3350.0, 0.65, 0.0, 85.0),
        ingredient("soybean", 46.0, 2230.0, 1.85, 0.0, 35.0),
        ingredient("limestone", 0.0, 0.0, 0.12, 0.5, 2.0),
    ];
    for i in 0..extra {
        let step = i as f64;
        ingredients.push(ingredient(
            &format!("grain-{i}"),
            9.0 + (step * 3.7) % 30.0,
            2400.0 + (step * 137.0) % 1100.0,
            0.40 + (step * 0.13) % 1.5,
            0.0,
            20.0,
        ));
    }
    IngredientCatalog::new(ingredients).expect("bench catalog is valid")
}

fn broiler_target() -> NutritionalTarget {
    NutritionalTarget {
        target_protein: 16.0,
        protein_tolerance: 1.0,
        target_energy: 3200.0,
        energy_tolerance: 100.0,
        max_cost: 1.20,
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let catalog = catalog(0);
    let target = broiler_target();
    let state = FormulationState::from_pairs([("corn", 80.0), ("soybean", 19.5), ("limestone", 0.5)]);

    c.bench_function("evaluate_three_ingredients", |b| {
        b.iter(|| evaluate(black_box(&state), black_box(&catalog), black_box(&target)))
    });
}

fn bench_optimize_by_catalog_size(c: &mut Criterion) {
    let target = broiler_target();
    let optimizer = Optimizer::default();
    let mut group = c.benchmark_group("optimize_catalog_size");

    for extra in [0usize, 7, 27, 57] {
        let catalog = catalog(extra);
        group.throughput(Throughput::Elements(catalog.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(catalog.len()), &catalog, |b, catalog| {
            b.iter(|| optimizer.optimize(black_box(catalog), black_box(&target)))
        });
    }

    group.finish();
}

fn bench_optimize_unreachable_target(c: &mut Criterion) {
    // Cost ceiling below every blend: every round runs.
    let target = NutritionalTarget {
        max_cost: 0.50,
        ..broiler_target()
    };
    let catalog = catalog(12);
    let mut group = c.benchmark_group("optimize_unreachable_target");

    for rounds in [1usize, 5, 25] {
        let optimizer = Optimizer::new(OptimizerConfig::default().with_max_rounds(rounds));
        group.bench_with_input(BenchmarkId::from_parameter(rounds), &rounds, |b, _| {
            b.iter(|| optimizer.optimize(black_box(&catalog), black_box(&target)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_evaluate,
    bench_optimize_by_catalog_size,
    bench_optimize_unreachable_target
);
criterion_main!(benches);

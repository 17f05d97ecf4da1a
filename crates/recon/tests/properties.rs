// Property-based tests for the reconciliation engine.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;

use confronto_recon::engine::collection_ratio;
use confronto_recon::model::{MonthlyMargin, ObjectiveRecord, OfficeMonthlyBonus};
use confronto_recon::{run, PoolBasis, ReconConfig, ReconInput};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Margin cell: mostly a number of either sign, sometimes missing.
fn arb_margin() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (-1e6..1e6f64).prop_map(Some),
        1 => Just(Some(0.0)),
        1 => Just(None),
    ]
}

/// Production: usually positive, sometimes zero.
fn arb_production() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => 1.0..1e6f64,
        1 => Just(0.0),
    ]
}

#[derive(Debug, Clone)]
struct MonthCase {
    margin: Option<f64>,
    production: f64,
    collected: f64,
    legacy_core: Option<f64>,
}

fn arb_month() -> impl Strategy<Value = MonthCase> {
    (arb_margin(), arb_production(), -1e5..2e6f64, proptest::option::of(0.0..1e4f64)).prop_map(
        |(margin, production, collected, legacy_core)| MonthCase {
            margin,
            production,
            collected,
            legacy_core,
        },
    )
}

/// One office with 1..=12 consecutive months; month `i` is `cases[i - 1]`.
/// A second office keeps the bonus and objective sets overlapping.
fn build_input(cases: &[MonthCase]) -> ReconInput {
    let mut bonuses = vec![OfficeMonthlyBonus {
        office: "EDAC_000".into(),
        month: 1,
        addon: 0.0,
        legacy_core: 0.0,
    }];
    let mut objectives = vec![ObjectiveRecord {
        office: "EDAC_000".into(),
        year: 2024,
        month: 1,
        production: 1.0,
        billed: 1.0,
        collected: 1.0,
    }];
    let mut margins = MonthlyMargin::new();

    for (i, case) in cases.iter().enumerate() {
        let month = i as u32 + 1;
        margins.insert(month, case.margin);
        objectives.push(ObjectiveRecord {
            office: "EDAC_001".into(),
            year: 2024,
            month,
            production: case.production,
            billed: case.production,
            collected: case.collected,
        });
        if let Some(legacy_core) = case.legacy_core {
            bonuses.push(OfficeMonthlyBonus {
                office: "EDAC_001".into(),
                month,
                addon: 1.0,
                legacy_core,
            });
        }
    }
    ReconInput { bonuses, objectives, margins }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn delta_is_new_premium_minus_legacy(cases in proptest::collection::vec(arb_month(), 1..=12)) {
        let result = run(&ReconConfig::default(), &build_input(&cases)).unwrap();
        for row in &result.rows {
            prop_assert_eq!(row.delta, row.new_premium - row.legacy_core);
        }
    }

    #[test]
    fn allocated_bases_sum_to_pool(
        cases in proptest::collection::vec(arb_month(), 1..=12),
        positive_basis in any::<bool>(),
    ) {
        let pool_basis = if positive_basis { PoolBasis::PositiveMargin } else { PoolBasis::NetMargin };
        let config = ReconConfig { pool_basis, ..ReconConfig::default() };
        let result = run(&config, &build_input(&cases)).unwrap();

        let margins: Vec<f64> = cases.iter().filter_map(|c| c.margin).collect();
        let positive_sum: f64 = margins.iter().filter(|&&m| m > 0.0).sum();
        let basis = if positive_basis { positive_sum } else { margins.iter().sum::<f64>().max(0.0) };
        let target = config.pool_rate * basis;

        let office_rows: Vec<_> = result.rows.iter().filter(|r| r.office == "EDAC_001").collect();
        let allocated: f64 = office_rows.iter().map(|r| r.new_base).sum();
        for row in &office_rows {
            prop_assert!(row.new_base >= 0.0, "negative base {} in month {}", row.new_base, row.month);
        }

        if positive_sum > 0.0 {
            prop_assert!(close(allocated, target), "allocated {} != target {}", allocated, target);
        } else {
            prop_assert_eq!(allocated, 0.0);
        }
        for row in &office_rows {
            if !row.margin.is_some_and(|m| m > 0.0) {
                prop_assert_eq!(row.new_base, 0.0);
            }
        }
    }

    #[test]
    fn ratio_is_bounded_or_absent(collected in -1e7..1e7f64, production in arb_production()) {
        match collection_ratio(collected, production) {
            Some(ratio) => prop_assert!((0.0..=1.0).contains(&ratio)),
            None => prop_assert_eq!(production, 0.0),
        }
    }

    #[test]
    fn k_is_monotone_in_ratio(a in 0.0..=1.0f64, b in 0.0..=1.0f64) {
        let config = ReconConfig::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(config.tier_coefficient(low) <= config.tier_coefficient(high));
    }

    #[test]
    fn rows_are_sorted_and_offices_come_from_inputs(cases in proptest::collection::vec(arb_month(), 1..=12)) {
        let input = build_input(&cases);
        let result = run(&ReconConfig::default(), &input).unwrap();

        prop_assert_eq!(result.rows.len(), input.objectives.len());
        for pair in result.rows.windows(2) {
            let a = (pair[0].year, pair[0].month, pair[0].office.as_str());
            let b = (pair[1].year, pair[1].month, pair[1].office.as_str());
            prop_assert!(a <= b);
        }
        for row in &result.rows {
            prop_assert!(input.objectives.iter().any(|o| o.office == row.office));
        }
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info};

use crate::config::{PoolBasis, ReconConfig};
use crate::error::ReconError;
use crate::model::{ComparisonRow, OfficeLabel, OfficeMonthlyBonus, ReconInput, Reconciliation};

/// Reconcile extracted records: cross-check, join, then redistribute the
/// margin pool per office. Returns rows sorted by (year, month, office).
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<Reconciliation, ReconError> {
    check_common_offices(input)?;

    let bonus_index = index_bonuses(&input.bonuses);
    let mut rows: Vec<ComparisonRow> = input
        .objectives
        .iter()
        .map(|obj| {
            let bonus = bonus_index.get(&(obj.office.as_str(), obj.month));
            let collection_ratio = collection_ratio(obj.collected, obj.production);
            ComparisonRow {
                year: obj.year,
                month: obj.month,
                office: obj.office.clone(),
                production: obj.production,
                billed: obj.billed,
                collected: obj.collected,
                margin: input.margins.get(obj.month),
                collection_ratio,
                k: collection_ratio.map(|ratio| config.tier_coefficient(ratio)),
                addon: bonus.map(|b| b.addon).unwrap_or(0.0),
                legacy_core: bonus.map(|b| b.legacy_core).unwrap_or(0.0),
                new_base: 0.0,
                new_premium: 0.0,
                delta: 0.0,
            }
        })
        .collect();

    // Second pass: every office needs all of its rows at once
    let mut by_office: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        by_office.entry(row.office.clone()).or_default().push(i);
    }
    for (office, indices) in &by_office {
        redistribute(config, office, &mut rows, indices);
    }

    rows.sort_by(|a, b| {
        (a.year, a.month, a.office.as_str()).cmp(&(b.year, b.month, b.office.as_str()))
    });

    let bonus_offices: BTreeSet<&str> = input.bonuses.iter().map(|b| b.office.as_str()).collect();
    let offices_without_bonus: Vec<String> = by_office
        .keys()
        .filter(|office| !bonus_offices.contains(office.as_str()))
        .cloned()
        .collect();

    let label = match by_office.keys().next() {
        Some(office) if by_office.len() == 1 => OfficeLabel::Single(office.clone()),
        _ => OfficeLabel::Multi,
    };

    info!(
        "reconciled {} row(s) across {} office(s), {} without bonus data",
        rows.len(),
        by_office.len(),
        offices_without_bonus.len()
    );

    Ok(Reconciliation { rows, label, offices_without_bonus })
}

/// `collected / production`, clamped to [0, 1]. `None` when there is no
/// production to divide by; zero collection is a different thing.
pub fn collection_ratio(collected: f64, production: f64) -> Option<f64> {
    if production == 0.0 || !production.is_finite() {
        return None;
    }
    let ratio = collected / production;
    ratio.is_finite().then(|| ratio.clamp(0.0, 1.0))
}

/// Fail when bonus and objective data describe disjoint sets of offices.
fn check_common_offices(input: &ReconInput) -> Result<(), ReconError> {
    let bonus: BTreeSet<&str> = input.bonuses.iter().map(|b| b.office.as_str()).collect();
    let objective: BTreeSet<&str> = input.objectives.iter().map(|o| o.office.as_str()).collect();

    let common = bonus.intersection(&objective).count();
    debug!(
        "offices: {} in bonus data, {} in objective data, {common} in common",
        bonus.len(),
        objective.len()
    );

    if common == 0 {
        return Err(ReconError::IncoherentInputs {
            bonus_offices: bonus.into_iter().map(String::from).collect(),
            objective_offices: objective.into_iter().map(String::from).collect(),
        });
    }
    Ok(())
}

/// Index bonus records by (office, month). A repeated key keeps the last
/// record, matching a top-to-bottom read of the report.
fn index_bonuses(bonuses: &[OfficeMonthlyBonus]) -> HashMap<(&str, u32), &OfficeMonthlyBonus> {
    let mut index = HashMap::with_capacity(bonuses.len());
    for bonus in bonuses {
        if index.insert((bonus.office.as_str(), bonus.month), bonus).is_some() {
            debug!("duplicate bonus record for {} month {}, keeping the last", bonus.office, bonus.month);
        }
    }
    index
}

/// Share the office's pool across its months in proportion to positive
/// margins, then apply K and compute the delta.
fn redistribute(config: &ReconConfig, office: &str, rows: &mut [ComparisonRow], indices: &[usize]) {
    let finite_margin = |row: &ComparisonRow| row.margin.filter(|m| m.is_finite());

    let margin_total: f64 = indices.iter().filter_map(|&i| finite_margin(&rows[i])).sum();
    let positive_sum: f64 = indices
        .iter()
        .filter_map(|&i| finite_margin(&rows[i]))
        .filter(|&m| m > 0.0)
        .sum();
    // A net loss leaves nothing to share out
    let basis = match config.pool_basis {
        PoolBasis::PositiveMargin => positive_sum,
        PoolBasis::NetMargin => margin_total.max(0.0),
    };
    let target = config.pool_rate * basis;

    debug!("{office}: margin total {margin_total:.2}, pool {target:.2}, positive sum {positive_sum:.2}");

    for &i in indices {
        let margin = finite_margin(&rows[i]);
        let row = &mut rows[i];
        row.new_base = match margin {
            Some(m) if positive_sum > 0.0 && m > 0.0 => target * (m / positive_sum),
            _ => 0.0,
        };
        let k = row.k.filter(|k| k.is_finite()).unwrap_or(0.0);
        row.new_premium = row.new_base * k;
        row.delta = row.new_premium - row.legacy_core;
    }
}

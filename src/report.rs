//! Turns packings into the purchase, waste and cutting tables.
//!
//! Values are kept unrounded in [`OptimizationResult`]; rounding to two
//! decimals happens only when rows are built.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{CutPattern, DemandLine, Diameter, MASS_UNIT_DIVISOR, Packing, round2};

/// Packing of one classification plus its derived figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub diameter: Diameter,
    pub packing: Packing,
    pub bars_used: usize,
    /// Mass of the purchased bars in kg, waste included.
    pub total_weight: f64,
    /// Unused length in meters over every bar.
    pub total_waste: f64,
    pub cost: f64,
}

impl OptimizationResult {
    pub fn summarize(diameter: Diameter, packing: Packing, price_rate: f64) -> Self {
        let bars_used = packing.bar_count();
        let total_weight = bars_used as f64 * packing.capacity * diameter.mass_per_length();
        let total_waste = packing.total_waste();
        let cost = total_weight / MASS_UNIT_DIVISOR * price_rate;
        Self {
            diameter,
            packing,
            bars_used,
            total_weight,
            total_waste,
            cost,
        }
    }

    pub fn total_waste_weight(&self) -> f64 {
        self.total_waste * self.diameter.mass_per_length()
    }
}

/// Ordered pieces of one diameter and length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandRow {
    pub diameter: Diameter,
    pub length: f64,
    pub quantity: u32,
    pub weight: f64,
}

/// Bars of one diameter left with the same rounded offcut.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteRow {
    pub diameter: Diameter,
    pub waste_length: f64,
    pub bars: usize,
    pub waste_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRow {
    pub diameter: Diameter,
    pub bars: usize,
    pub weight: f64,
    pub cost: f64,
}

/// Bars of one diameter cut with the same pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternRow {
    pub diameter: Diameter,
    pub pattern: String,
    pub pieces: Vec<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub bars: usize,
    pub weight: f64,
    pub waste_length: f64,
    pub waste_weight: f64,
    pub cost: f64,
}

/// Everything a run produces, keyed by diameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub demand: Vec<DemandRow>,
    pub waste: Vec<WasteRow>,
    pub purchase: Vec<PurchaseRow>,
    pub cutting: Vec<PatternRow>,
    pub totals: Totals,
    pub results: Vec<OptimizationResult>,
}

impl Report {
    /// Builds every table. Results with no bars are dropped.
    pub fn build(
        demand: &BTreeMap<Diameter, Vec<DemandLine>>,
        mut results: Vec<OptimizationResult>,
    ) -> Self {
        results.retain(|r| r.bars_used > 0);
        results.sort_by_key(|r| r.diameter);

        Self {
            demand: demand_rows(demand),
            waste: results.iter().flat_map(waste_rows).collect(),
            purchase: results.iter().map(purchase_row).collect(),
            cutting: results.iter().flat_map(pattern_rows).collect(),
            totals: totals(&results),
            results,
        }
    }
}

pub fn demand_rows(demand: &BTreeMap<Diameter, Vec<DemandLine>>) -> Vec<DemandRow> {
    let mut rows = Vec::new();
    for (&diameter, lines) in demand {
        let mut by_length: BTreeMap<u64, (f64, u32)> = BTreeMap::new();
        for line in lines.iter().filter(|l| l.quantity > 0 && l.length > 0.0) {
            // Positive floats order the same way as their bit patterns.
            let entry = by_length.entry(line.length.to_bits()).or_insert((line.length, 0));
            entry.1 += line.quantity;
        }
        let mpl = diameter.mass_per_length();
        rows.extend(by_length.into_values().map(|(length, quantity)| DemandRow {
            diameter,
            length,
            quantity,
            weight: round2(length * quantity as f64 * mpl),
        }));
    }
    rows
}

/// Groups bars by offcut rounded to centimeters. Bars cut without offcut
/// are not listed.
pub fn waste_rows(result: &OptimizationResult) -> Vec<WasteRow> {
    let capacity = result.packing.capacity;
    let mpl = result.diameter.mass_per_length();
    let mut groups: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
    for bar in &result.packing.bars {
        let waste = bar.waste(capacity);
        let cm = (waste * 100.0).round() as i64;
        if cm <= 0 {
            continue;
        }
        let entry = groups.entry(cm).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += waste * mpl;
    }
    groups
        .into_iter()
        .map(|(cm, (bars, weight))| WasteRow {
            diameter: result.diameter,
            waste_length: cm as f64 / 100.0,
            bars,
            waste_weight: round2(weight),
        })
        .collect()
}

pub fn purchase_row(result: &OptimizationResult) -> PurchaseRow {
    PurchaseRow {
        diameter: result.diameter,
        bars: result.bars_used,
        weight: round2(result.total_weight),
        cost: round2(result.cost),
    }
}

/// Counts bars per cut pattern, in order of first appearance.
pub fn pattern_rows(result: &OptimizationResult) -> Vec<PatternRow> {
    let mut counted: IndexMap<CutPattern, usize> = IndexMap::new();
    for bar in &result.packing.bars {
        *counted.entry(bar.pattern()).or_insert(0) += 1;
    }
    counted
        .into_iter()
        .map(|(pattern, count)| PatternRow {
            diameter: result.diameter,
            pattern: pattern.to_string(),
            pieces: pattern.pieces().to_vec(),
            count,
        })
        .collect()
}

pub fn totals(results: &[OptimizationResult]) -> Totals {
    let sum = results.iter().fold(Totals::default(), |acc, r| Totals {
        bars: acc.bars + r.bars_used,
        weight: acc.weight + r.total_weight,
        waste_length: acc.waste_length + r.total_waste,
        waste_weight: acc.waste_weight + r.total_waste_weight(),
        cost: acc.cost + r.cost,
    });
    Totals {
        bars: sum.bars,
        weight: round2(sum.weight),
        waste_length: round2(sum.waste_length),
        waste_weight: round2(sum.waste_weight),
        cost: round2(sum.cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StockBar;

    fn packing(contents: &[&[f64]]) -> Packing {
        Packing {
            capacity: 12.0,
            bars: contents
                .iter()
                .map(|c| StockBar::from_pieces(c.to_vec()))
                .collect(),
        }
    }

    #[test]
    fn test_waste_and_pattern_groups() {
        let d = Diameter::new(12);
        let result = OptimizationResult::summarize(
            d,
            packing(&[&[5.0, 5.0], &[5.0, 5.0], &[8.0, 3.0]]),
            1000.0,
        );

        let waste = waste_rows(&result);
        assert_eq!(waste.len(), 2);
        assert_eq!((waste[0].waste_length, waste[0].bars), (1.0, 1));
        assert_eq!((waste[1].waste_length, waste[1].bars), (2.0, 2));
        let mpl = d.mass_per_length();
        assert_eq!(waste[1].waste_weight, round2(4.0 * mpl));
        assert_eq!(waste[0].waste_weight, round2(mpl));

        let patterns = pattern_rows(&result);
        assert_eq!(patterns.len(), 2);
        assert_eq!((patterns[0].pattern.as_str(), patterns[0].count), ("5.00+5.00", 2));
        assert_eq!((patterns[1].pattern.as_str(), patterns[1].count), ("8.00+3.00", 1));
        assert_eq!(patterns[1].pieces, vec![8.0, 3.0]);
    }

    #[test]
    fn test_patterns_ignore_placement_order() {
        let result =
            OptimizationResult::summarize(Diameter::new(10), packing(&[&[3.0, 8.0], &[8.0, 3.0]]), 0.0);
        let patterns = pattern_rows(&result);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].count, 2);
        assert_eq!(patterns[0].pattern, "8.00+3.00");
    }

    #[test]
    fn test_waste_rounds_to_centimeters() {
        let result = OptimizationResult::summarize(
            Diameter::new(8),
            packing(&[&[10.001], &[9.996], &[12.0], &[11.9999]]),
            0.0,
        );
        let waste = waste_rows(&result);
        // 1.999 and 2.004 share the 2.00 bucket; full and near-full bars are skipped.
        assert_eq!(waste.len(), 1);
        assert_eq!(waste[0].waste_length, 2.0);
        assert_eq!(waste[0].bars, 2);
    }

    #[test]
    fn test_cost_for_one_bar_of_16() {
        let d = Diameter::new(16);
        let result = OptimizationResult::summarize(d, packing(&[&[10.0]]), 1000.0);
        let expected = 1.0 * 12.0 * (256.0 / 162.0) / 1000.0 * 1000.0;
        assert!((result.cost - expected).abs() < 1e-9);
        assert!((result.total_weight - 12.0 * 256.0 / 162.0).abs() < 1e-9);

        let row = purchase_row(&result);
        assert_eq!(row.bars, 1);
        assert_eq!(row.weight, 18.96);
        assert_eq!(row.cost, round2(expected));
        assert_eq!(row.cost, 18.96);
    }

    #[test]
    fn test_empty_results_do_not_appear() {
        let mut demand = BTreeMap::new();
        demand.insert(Diameter::new(12), vec![DemandLine::new(4.0, 3)]);
        demand.insert(Diameter::new(20), vec![DemandLine::new(0.0, 0)]);

        let results = vec![
            OptimizationResult::summarize(Diameter::new(20), Packing::empty(12.0), 900.0),
            OptimizationResult::summarize(Diameter::new(12), packing(&[&[4.0, 4.0, 4.0]]), 900.0),
        ];
        let report = Report::build(&demand, results);

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.purchase.len(), 1);
        assert_eq!(report.purchase[0].diameter, Diameter::new(12));
        assert!(report.waste.is_empty());
        assert_eq!(report.cutting.len(), 1);
        assert_eq!(report.demand.len(), 1);
        assert_eq!(report.totals.bars, 1);
    }

    #[test]
    fn test_demand_rows_merge_equal_lengths() {
        let mut demand = BTreeMap::new();
        demand.insert(
            Diameter::new(18),
            vec![
                DemandLine::new(6.0, 2),
                DemandLine::new(2.5, 4),
                DemandLine::new(6.0, 1),
            ],
        );
        let rows = demand_rows(&demand);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].length, rows[0].quantity), (2.5, 4));
        assert_eq!((rows[1].length, rows[1].quantity), (6.0, 3));
        assert_eq!(rows[1].weight, round2(18.0 * 2.0));
    }

    #[test]
    fn test_totals_sum_over_diameters() {
        let a = OptimizationResult::summarize(Diameter::new(12), packing(&[&[10.0], &[11.0]]), 1000.0);
        let b = OptimizationResult::summarize(Diameter::new(16), packing(&[&[6.0, 6.0]]), 1000.0);
        let t = totals(&[a.clone(), b.clone()]);
        assert_eq!(t.bars, 3);
        assert_eq!(t.waste_length, 3.0);
        assert_eq!(t.weight, round2(a.total_weight + b.total_weight));
        assert_eq!(t.cost, round2(a.cost + b.cost));
        assert_eq!(t.waste_weight, round2(3.0 * Diameter::new(12).mass_per_length()));
    }
}

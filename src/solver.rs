use std::collections::BTreeMap;

use crate::config::OptimizerConfig;
use crate::error::{ClassificationError, OptimizeError, Result};
use crate::packer::Packer;
use crate::report::{OptimizationResult, Report};
use crate::types::{DemandLine, Diameter, MAX_PIECES, expand_demand};

/// Packs every diameter of an order and aggregates the results.
pub struct Solver {
    config: OptimizerConfig,
    price_per_ton: f64,
    demand: BTreeMap<Diameter, Vec<DemandLine>>,
}

impl Solver {
    pub fn new(
        config: OptimizerConfig,
        price_per_ton: f64,
        demand: BTreeMap<Diameter, Vec<DemandLine>>,
    ) -> Self {
        Self {
            config,
            price_per_ton,
            demand,
        }
    }

    pub fn solve(&self) -> Result<Report> {
        self.validate()?;
        let packer = Packer::from_config(&self.config)?;
        let pieces = self.expand_demands(packer.capacity())?;

        let seed = self.config.seed.unwrap_or_else(rand::random);
        tracing::info!(
            seed,
            diameters = pieces.len(),
            trials = packer.trials(),
            "optimizing"
        );

        let results = pieces
            .into_iter()
            .map(|(diameter, lengths)| -> Result<OptimizationResult> {
                let packing = packer.pack_seeded(&lengths, seed)?;
                let result = OptimizationResult::summarize(diameter, packing, self.price_per_ton);
                tracing::info!(
                    %diameter,
                    pieces = lengths.len(),
                    bars = result.bars_used,
                    waste = result.total_waste,
                    "packed diameter"
                );
                Ok(result)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Report::build(&self.demand, results))
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if !self.price_per_ton.is_finite() || self.price_per_ton < 0.0 {
            return Err(OptimizeError::Config(format!(
                "price per ton must be non-negative, got {}",
                self.price_per_ton
            )));
        }
        if let Some(d) = self.demand.keys().find(|d| d.mm() == 0) {
            return Err(OptimizeError::InvalidDiameter(d.mm()));
        }
        let pieces: u64 = self
            .demand
            .values()
            .flatten()
            .map(|l| l.quantity as u64)
            .sum();
        if pieces > MAX_PIECES {
            return Err(OptimizeError::Config(format!(
                "order holds {} pieces, at most {} are accepted",
                pieces, MAX_PIECES
            )));
        }
        Ok(())
    }

    /// Expands every diameter's rows into pieces, rejecting the whole order
    /// when any diameter holds a piece that cannot be cut from a bar.
    fn expand_demands(&self, capacity: f64) -> Result<Vec<(Diameter, Vec<f64>)>> {
        let mut pieces = Vec::new();
        let mut invalid = Vec::new();

        for (&diameter, lines) in &self.demand {
            let lengths = expand_demand(lines);
            if lengths.is_empty() {
                continue;
            }
            if !diameter.is_standard() {
                tracing::warn!(%diameter, "diameter is not a standard bar size");
            }
            if let Some(&length) = lengths
                .iter()
                .find(|&&l| !l.is_finite() || l <= 0.0 || l > capacity)
            {
                invalid.push(ClassificationError {
                    diameter,
                    length,
                    capacity,
                });
                continue;
            }
            pieces.push((diameter, lengths));
        }

        if !invalid.is_empty() {
            return Err(OptimizeError::InvalidDemand(invalid));
        }
        Ok(pieces)
    }
}

/// Collects `(diameter, row)` pairs into per-diameter order rows.
pub fn group_by_diameter(
    rows: impl IntoIterator<Item = (Diameter, DemandLine)>,
) -> BTreeMap<Diameter, Vec<DemandLine>> {
    let mut demand: BTreeMap<Diameter, Vec<DemandLine>> = BTreeMap::new();
    for (diameter, line) in rows {
        demand.entry(diameter).or_default().push(line);
    }
    demand
}

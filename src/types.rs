use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize};

/// Length of a purchasable stock bar, in meters.
pub const BAR_LENGTH: f64 = 12.0;

/// Randomized greedy trials per classification.
pub const DEFAULT_TRIALS: u32 = 3000;

/// Kilograms per ton; prices are quoted per ton.
pub const MASS_UNIT_DIVISOR: f64 = 1000.0;

/// Largest number of pieces accepted in one order. A single trial always
/// runs to completion, so this bounds the cost of a run.
pub const MAX_PIECES: u64 = 100_000;

/// Diameters offered by the order form, in millimeters.
pub const STANDARD_DIAMETERS: [u32; 11] = [6, 8, 10, 12, 14, 16, 18, 20, 22, 25, 32];

/// Rebar diameter in millimeters. Identifies a material class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diameter(u32);

impl Diameter {
    pub fn new(mm: u32) -> Self {
        Self(mm)
    }

    pub fn mm(&self) -> u32 {
        self.0
    }

    /// Whether the diameter is one of [`STANDARD_DIAMETERS`].
    pub fn is_standard(&self) -> bool {
        STANDARD_DIAMETERS.contains(&self.0)
    }

    /// Nominal mass in kg per meter of bar: d² / 162.
    pub fn mass_per_length(&self) -> f64 {
        let d = self.0 as f64;
        d * d / 162.0
    }
}

impl std::fmt::Display for Diameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the order: `quantity` pieces of `length` meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandLine {
    pub length: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub quantity: u32,
}

impl DemandLine {
    pub fn new(length: f64, quantity: u32) -> Self {
        Self { length, quantity }
    }
}

/// Flattens order rows into the multiset of piece lengths. Rows with a zero
/// quantity are blank form rows and contribute nothing.
pub fn expand_demand(lines: &[DemandLine]) -> Vec<f64> {
    lines
        .iter()
        .filter(|l| l.quantity > 0)
        .flat_map(|l| std::iter::repeat_n(l.length, l.quantity as usize))
        .collect()
}

/// Pieces assigned to one physical bar, in placement order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockBar {
    pub pieces: Vec<f64>,
    used: f64,
}

impl StockBar {
    pub fn new() -> Self {
        Self {
            pieces: Vec::new(),
            used: 0.0,
        }
    }

    pub fn from_pieces(pieces: Vec<f64>) -> Self {
        let used = pieces.iter().sum();
        Self { pieces, used }
    }

    pub fn used_length(&self) -> f64 {
        self.used
    }

    pub fn fits(&self, length: f64, capacity: f64) -> bool {
        self.used + length <= capacity
    }

    pub fn place(&mut self, length: f64) {
        self.pieces.push(length);
        self.used += length;
    }

    pub fn waste(&self, capacity: f64) -> f64 {
        capacity - self.used
    }

    pub fn pattern(&self) -> CutPattern {
        CutPattern::new(&self.pieces)
    }
}

impl Default for StockBar {
    fn default() -> Self {
        Self::new()
    }
}

/// Every bar cut for one classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packing {
    pub capacity: f64,
    pub bars: Vec<StockBar>,
}

impl Packing {
    pub fn empty(capacity: f64) -> Self {
        Self {
            capacity,
            bars: Vec::new(),
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn total_waste(&self) -> f64 {
        self.bars.iter().map(|b| b.waste(self.capacity)).sum()
    }

    pub fn pieces(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().flat_map(|b| b.pieces.iter().copied())
    }
}

/// The multiset of pieces on one bar, kept in descending order.
///
/// Two bars share a pattern when they hold exactly the same lengths,
/// regardless of the order they were placed in.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CutPattern {
    pieces: Vec<f64>,
}

impl CutPattern {
    pub fn new(pieces: &[f64]) -> Self {
        let mut pieces = pieces.to_vec();
        pieces.sort_by(|a, b| b.total_cmp(a));
        Self { pieces }
    }

    pub fn pieces(&self) -> &[f64] {
        &self.pieces
    }
}

impl PartialEq for CutPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pieces.len() == other.pieces.len()
            && self
                .pieces
                .iter()
                .zip(&other.pieces)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for CutPattern {}

impl Hash for CutPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for p in &self.pieces {
            p.to_bits().hash(state);
        }
    }
}

impl std::fmt::Display for CutPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, p) in self.pieces.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{:.2}", p)?;
        }
        Ok(())
    }
}

/// Rounds to the two decimal places used in every report table.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Accepts counts sent as JSON floats (`6.0`) as well as integers.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {}",
            value
        )));
    }
    Ok(value as u32)
}

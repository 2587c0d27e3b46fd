//! Error types for the rebar optimizer.

use thiserror::Error;

use crate::types::Diameter;

/// Errors raised before or during optimization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// A piece is not positive or is longer than the stock bar.
    #[error("piece length {length} m does not fit a {capacity} m bar")]
    InvalidPiece { length: f64, capacity: f64 },

    /// One or more classifications carry pieces that can never be placed.
    #[error("invalid demand: {}", join(.0))]
    InvalidDemand(Vec<ClassificationError>),

    #[error("invalid diameter {0}: must be positive")]
    InvalidDiameter(u32),

    #[error("configuration error: {0}")]
    Config(String),
}

/// First offending piece of a single classification.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("diameter {diameter}: piece length {length} m does not fit a {capacity} m bar")]
pub struct ClassificationError {
    pub diameter: Diameter,
    pub length: f64,
    pub capacity: f64,
}

fn join(errors: &[ClassificationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, OptimizeError>;

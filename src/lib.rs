pub mod config;
pub mod error;
pub mod packer;
pub mod render;
pub mod report;
pub mod solver;
pub mod types;

pub use error::{OptimizeError, Result};

//! Core data types and the sample-to-grid pipeline for wind speed heatmaps
//!
//! This crate turns irregular (timestamp, value) series into a dense
//! day × time-bucket grid and maps each cell to a display color. Everything
//! here is synchronous and side-effect free.

pub mod bucketing;
pub mod color;
pub mod colorize;
pub mod direction;
pub mod grid;
pub mod palette;
pub mod pipeline;
pub mod rollups;
pub mod types;

pub use bucketing::*;
pub use color::*;
pub use colorize::*;
pub use direction::*;
pub use grid::*;
pub use palette::*;
pub use pipeline::*;
pub use rollups::*;
pub use types::*;

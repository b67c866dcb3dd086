//! Core resampling modules

pub mod geometry;
pub mod sweep_index;
pub mod cuts;
pub mod vcp;
pub mod params;
pub mod tables;
pub mod sweep;
pub mod volume;
pub mod cappi;
pub mod rhi;
pub mod cross_section;
pub mod grid_volume;
pub mod raster;

// Re-export main types
pub use sweep_index::{RayEntry, SweepIndex};
pub use cuts::{select_cuts, CutMode};
pub use params::{ProductContext, ResampleParams};
pub use tables::{CutTable, VolumeTables};
pub use sweep::resample_sweep;
pub use volume::VolumeProcessor;
pub use cappi::CappiProcessor;
pub use rhi::RhiProcessor;
pub use cross_section::CrossSectionProcessor;
pub use grid_volume::GridVolumeProcessor;
pub use raster::raster_grid;

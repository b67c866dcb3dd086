//! radar_resample: polar radar sweeps onto regular grids
//!
//! Opens radial radar datasets and resamples their irregular rays into
//! sweep, volume, CAPPI, RHI, cross-section and gridded lat/lon/altitude
//! products, with an external grid cache in front of the resampler.

pub mod types;
pub mod io;
pub mod core;
pub mod adapter;

// Re-export main types and functions for easier access
pub use types::{
    CacheKey, DatasetKind, EarthLocation, GridDomain, KeyFloat, LatLon, ProductKey, RadarCoordinateSystem,
    RadarError, RadarResult, ResampledGrid, REFLECTIVITY, SPECTRUM_WIDTH, VELOCITY,
};

pub use io::{
    DatasetMetadata, DatasetOpener, GridCache, MemoryCache, MemoryDataset, MemoryOpener, MemorySweep,
    MemoryVariable, RadialDataset, StationResolver, StationTable, SweepInfo,
};

pub use core::{ResampleParams, SweepIndex};

pub use adapter::{
    open_adapters, AdapterOptions, BatchOpen, CrossSectionLine, DataRequest, FailurePolicy, RadarAdapter,
};

//! External collaborators: radial datasets, grid caches and station lookup

pub mod dataset;
pub mod memory;
pub mod cache;
pub mod station;

pub use dataset::{AttributeValue, DatasetMetadata, DatasetOpener, RadialDataset, RasterData, SweepInfo, VariableInfo};
pub use memory::{MemoryDataset, MemoryOpener, MemorySweep, MemoryVariable};
pub use cache::{GridCache, MemoryCache};
pub use station::{StationResolver, StationTable};

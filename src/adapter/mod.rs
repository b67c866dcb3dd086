//! Dataset adapter: opens a radial dataset once and serves resampled grids

pub mod request;
pub mod batch;

pub use batch::{open_adapters, BatchOpen, FailurePolicy};
pub use request::{CrossSectionLine, DataRequest};

use crate::core::cuts::CutMode;
use crate::core::geometry::angle_diff;
use crate::core::params::{ProductContext, ResampleParams};
use crate::core::tables::{data_or_none, VolumeTables};
use crate::core::vcp::{remap_angles, vcp_id_from_name};
use crate::core::{
    raster_grid, resample_sweep, CappiProcessor, CrossSectionProcessor, GridVolumeProcessor, RhiProcessor,
    VolumeProcessor,
};
use crate::io::{DatasetMetadata, DatasetOpener, GridCache, MemoryCache, RadialDataset, StationResolver, SweepInfo, VariableInfo};
use crate::types::{
    CacheKey, DatasetKind, EarthLocation, ProductKey, RadarError, RadarResult, ResampledGrid,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

const LATITUDE_ATTRIBUTES: &[&str] = &["RadarLatitude", "StationLatitude"];
const LONGITUDE_ATTRIBUTES: &[&str] = &["RadarLongitude", "StationLongitude"];
const ALTITUDE_ATTRIBUTES: &[&str] = &["RadarAltitude", "StationElevation"];

/// Tolerance of `sweep_number` (degrees)
const SWEEP_ANGLE_TOLERANCE: f64 = 0.05;

/// Collaborators and tunables shared by adapters
#[derive(Clone, Default)]
pub struct AdapterOptions {
    pub params: ResampleParams,
    /// Grid store; each adapter keeps a private in-memory cache when unset
    pub cache: Option<Arc<dyn GridCache>>,
    pub station_resolver: Option<Arc<dyn StationResolver>>,
}

impl AdapterOptions {
    pub fn with_params(mut self, params: ResampleParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn GridCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_station_resolver(mut self, resolver: Arc<dyn StationResolver>) -> Self {
        self.station_resolver = Some(resolver);
        self
    }
}

/// Per-variable sweep geometry read at open time
#[derive(Debug, Clone)]
struct VariableTable {
    info: VariableInfo,
    sweeps: Vec<SweepInfo>,
    /// Mean elevation (mean azimuth for RHI datasets) of every sweep
    angles: Vec<f64>,
}

/// Adapter over one opened radial dataset.
///
/// The dataset stays open until [`RadarAdapter::do_remove`] or drop. Cut
/// tables are built on first use and kept until
/// [`RadarAdapter::clear_cached_data`].
pub struct RadarAdapter {
    source: String,
    dataset: Option<Box<dyn RadialDataset>>,
    params: ResampleParams,
    cache: Arc<dyn GridCache>,
    kind: DatasetKind,
    metadata: DatasetMetadata,
    location: EarthLocation,
    vcp_name: Option<String>,
    vcp_id: u16,
    variables: Vec<VariableTable>,
    tables: HashMap<(String, CutMode), Arc<VolumeTables>>,
}

impl RadarAdapter {
    /// Open `source` through `opener`
    pub fn open(opener: &dyn DatasetOpener, source: &str, options: &AdapterOptions) -> RadarResult<Self> {
        log::info!("Opening radar source {}", source);
        let dataset = opener.open(source)?;
        Self::from_dataset(source, dataset, options)
    }

    /// Adapt an already opened dataset. The dataset is closed again when it
    /// cannot be adapted.
    pub fn from_dataset(
        source: &str,
        mut dataset: Box<dyn RadialDataset>,
        options: &AdapterOptions,
    ) -> RadarResult<Self> {
        let metadata = dataset.metadata().clone();
        let vcp_name = metadata
            .attribute("VolumeCoveragePatternName")
            .map(|v| v.as_text());

        let described = classify(&metadata, vcp_name.as_deref()).and_then(|kind| {
            let vcp_id = match kind {
                DatasetKind::Volume => vcp_name.as_deref().map(vcp_id_from_name).unwrap_or(0),
                _ => 0,
            };
            describe_variables(dataset.as_ref(), kind, vcp_id).map(|variables| (kind, vcp_id, variables))
        });
        let (kind, vcp_id, variables) = match described {
            Ok(d) => d,
            Err(e) => {
                if let Err(close_err) = dataset.close() {
                    log::warn!("Failed to close {}: {}", source, close_err);
                }
                return Err(e);
            }
        };

        let location = resolve_location(&metadata, options.station_resolver.as_deref());
        log::info!(
            "Opened {} as {:?}: {} variables, station {:?}, VCP {:?} ({})",
            source,
            kind,
            variables.len(),
            metadata.station_id,
            vcp_name,
            vcp_id
        );

        let cache = options
            .cache
            .clone()
            .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn GridCache>);

        Ok(Self {
            source: source.to_string(),
            dataset: Some(dataset),
            params: options.params.clone(),
            cache,
            kind,
            metadata,
            location,
            vcp_name,
            vcp_id,
            variables,
            tables: HashMap::new(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn location(&self) -> EarthLocation {
        self.location
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn station_id(&self) -> Option<&str> {
        self.metadata.station_id.as_deref()
    }

    pub fn station_name(&self) -> Option<&str> {
        self.metadata.station_name.as_deref()
    }

    pub fn data_format(&self) -> &str {
        &self.metadata.data_format
    }

    pub fn base_time(&self) -> DateTime<Utc> {
        self.metadata.base_time
    }

    pub fn vcp_name(&self) -> Option<&str> {
        self.vcp_name.as_deref()
    }

    /// Recognized VCP number, 0 when unknown
    pub fn vcp_id(&self) -> u16 {
        self.vcp_id
    }

    pub fn params(&self) -> &ResampleParams {
        &self.params
    }

    pub fn is_closed(&self) -> bool {
        self.dataset.is_none()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.info.name.as_str()).collect()
    }

    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.table(name).map(|v| &v.info)
    }

    /// Sweep angles of a variable
    pub fn angles(&self, variable: &str) -> Option<&[f64]> {
        self.table(variable).map(|v| v.angles.as_slice())
    }

    /// Position of `angle` in the angle table; 0 without an exact match
    pub fn angle_index(&self, variable: &str, angle: f64) -> usize {
        self.angles(variable)
            .and_then(|angles| angles.iter().position(|&a| a == angle))
            .unwrap_or(0)
    }

    /// First sweep within 0.05 degrees of `angle`
    pub fn sweep_number(&self, variable: &str, angle: f64) -> Option<usize> {
        self.angles(variable)?
            .iter()
            .position(|&a| (a - angle).abs() <= SWEEP_ANGLE_TOLERANCE)
    }

    /// Rays per sweep, the smallest over the sweeps; super-resolution
    /// sweeps of 720 rays count as 360
    pub fn ray_number(&self, variable: &str) -> Option<usize> {
        let rays = self.table(variable)?.sweeps.iter().map(|s| s.radial_count).min()?;
        Some(if rays == 720 { 360 } else { rays })
    }

    /// Gates per ray, the smallest over the sweeps
    pub fn gate_number(&self, variable: &str) -> Option<usize> {
        self.table(variable)?.sweeps.iter().map(|s| s.gate_count).min()
    }

    /// Resample the data described by `request`.
    ///
    /// Grids come from the cache when an identical request was served
    /// before. Missing data and resampling failures give `Ok(None)`;
    /// malformed requests and requests after removal are errors.
    pub fn get_data(&mut self, request: &DataRequest) -> RadarResult<Option<Arc<ResampledGrid>>> {
        if self.dataset.is_none() {
            return Err(RadarError::Closed(self.source.clone()));
        }
        let Some(product) = self.plan(request)? else {
            log::warn!("No sweep of {} matches the request in {}", request.variable, self.source);
            return Ok(None);
        };

        let key = CacheKey::new(
            &self.location,
            self.metadata.base_time,
            request.moment,
            &request.variable,
            product.clone(),
        );
        match self.cache.get(&key) {
            Ok(Some(grid)) => {
                log::debug!("Cache hit for {:?}", key.product);
                return Ok(Some(grid));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Cache lookup failed, recomputing: {}", e),
        }

        let grid = match self.produce(request, &product) {
            Ok(Some(grid)) => Arc::new(grid),
            Ok(None) => return Ok(None),
            Err(e @ (RadarError::InvalidRequest(_) | RadarError::Closed(_))) => return Err(e),
            Err(e) => {
                log::error!("Failed to resample {} of {}: {}", request.variable, self.source, e);
                return Ok(None);
            }
        };

        if let Err(e) = self.cache.put(key, Arc::clone(&grid)) {
            log::warn!("Failed to cache {:?}: {}", product, e);
        }
        Ok(Some(grid))
    }

    /// Drop the lazily built cut tables and the reader's buffers
    pub fn clear_cached_data(&mut self) {
        log::debug!("Clearing {} cut tables of {}", self.tables.len(), self.source);
        self.tables.clear();
        if let Some(dataset) = self.dataset.as_mut() {
            dataset.clear_memory();
        }
    }

    /// Close the dataset and drop derived data. Later calls do nothing.
    pub fn do_remove(&mut self) -> RadarResult<()> {
        let Some(mut dataset) = self.dataset.take() else {
            return Ok(());
        };
        log::info!("Closing radar source {}", self.source);
        self.tables.clear();
        dataset.clear_memory();
        dataset.close()
    }

    fn table(&self, variable: &str) -> Option<&VariableTable> {
        self.variables.iter().find(|v| v.info.name == variable)
    }

    fn dataset(&self) -> RadarResult<&dyn RadialDataset> {
        self.dataset
            .as_deref()
            .ok_or_else(|| RadarError::Closed(self.source.clone()))
    }

    /// Sweep for `angle` when no index was given: the tolerance match,
    /// else the nearest angle
    fn resolve_index(&self, variable: &str, angle: f64) -> Option<usize> {
        self.sweep_number(variable, angle).or_else(|| {
            self.angles(variable)?
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_finite())
                .min_by(|(_, a), (_, b)| angle_diff(**a, angle).total_cmp(&angle_diff(**b, angle)))
                .map(|(i, _)| i)
        })
    }

    /// Product answering `request`; `None` when no sweep matches
    fn plan(&self, request: &DataRequest) -> RadarResult<Option<ProductKey>> {
        if request.volume && request.values_3d {
            let product = if let Some(level) = request.cappi_level {
                ProductKey::Cappi { level: level.into() }
            } else if let Some(line) = &request.cross_section {
                line.key()
            } else if let Some(azimuth) = request.azimuth {
                ProductKey::Rhi { azimuth: azimuth.into() }
            } else if request.radar_volume {
                match self.kind {
                    DatasetKind::Rhi => ProductKey::RhiVolume,
                    _ => ProductKey::Volume,
                }
            } else {
                let p = &self.params;
                ProductKey::GridVolume {
                    dims: [p.grid_dims.0, p.grid_dims.1, p.grid_dims.2],
                    extent_km: [p.grid_extent_km.0.into(), p.grid_extent_km.1.into()],
                    first_level_m: p.grid_first_level_m.into(),
                    level_spacing_m: p.grid_level_spacing_m.into(),
                }
            };
            return Ok(Some(product));
        }

        let variable = request.variable.as_str();
        match self.kind {
            DatasetKind::Raster => Ok(Some(ProductKey::Raster)),
            DatasetKind::Rhi => {
                let azimuth = request
                    .angle
                    .ok_or_else(|| RadarError::InvalidRequest("RHI sweep needs an azimuth".to_string()))?;
                let index = request.sweep_index.or_else(|| self.resolve_index(variable, azimuth));
                Ok(index.map(|index| ProductKey::RhiSweep {
                    azimuth: azimuth.into(),
                    index,
                }))
            }
            DatasetKind::Volume => {
                let want_3d = !request.in_2d;
                let resolved = match (request.angle, request.sweep_index) {
                    (Some(angle), Some(index)) => Some((angle, index)),
                    (Some(angle), None) => self.resolve_index(variable, angle).map(|i| (angle, i)),
                    (None, Some(index)) => self
                        .angles(variable)
                        .and_then(|a| a.get(index))
                        .map(|&angle| (angle, index)),
                    (None, None) => {
                        return Err(RadarError::InvalidRequest(
                            "sweep request needs an angle or a sweep index".to_string(),
                        ))
                    }
                };
                Ok(resolved.map(|(elevation, index)| ProductKey::Sweep {
                    elevation: elevation.into(),
                    index,
                    want_3d,
                }))
            }
        }
    }

    fn produce(&mut self, request: &DataRequest, product: &ProductKey) -> RadarResult<Option<ResampledGrid>> {
        let variable = request.variable.as_str();
        let unit = self.variable(variable).map(|v| v.units.clone()).unwrap_or_default();
        let ctx = ProductContext::new(self.location, request.moment, &unit);

        match product {
            ProductKey::Sweep { elevation, index, want_3d } => {
                resample_sweep(self.dataset()?, variable, *index, elevation.0, *want_3d, &ctx, &self.params)
            }
            ProductKey::RhiSweep { azimuth, index } => {
                RhiProcessor::new(&self.params).rhi_sweep(self.dataset()?, variable, *index, azimuth.0, &ctx)
            }
            ProductKey::Raster => {
                let Some(raster) = data_or_none(self.dataset()?.raster(variable), "raster")?.flatten() else {
                    log::warn!("{} holds no raster for {}", self.source, variable);
                    return Ok(None);
                };
                raster_grid(&raster, &ctx).map(Some)
            }
            ProductKey::Volume => match self.tables(variable, CutMode::Elevation)? {
                Some(tables) => VolumeProcessor::new(&self.params).volume(&tables, &ctx),
                None => Ok(None),
            },
            ProductKey::RhiVolume => match self.tables(variable, CutMode::Azimuth)? {
                Some(tables) => VolumeProcessor::new(&self.params).rhi_volume(&tables, &ctx),
                None => Ok(None),
            },
            ProductKey::GridVolume { .. } => match self.tables(variable, CutMode::Elevation)? {
                Some(tables) => GridVolumeProcessor::new(&self.params).grid_volume(&tables, &ctx),
                None => Ok(None),
            },
            ProductKey::Cappi { level } => match self.tables(variable, CutMode::Elevation)? {
                Some(tables) => CappiProcessor::new(&self.params).cappi(&tables, &ctx, level.0),
                None => Ok(None),
            },
            ProductKey::Rhi { azimuth } => match self.tables(variable, CutMode::Elevation)? {
                Some(tables) => RhiProcessor::new(&self.params).rhi(&tables, &ctx, azimuth.0),
                None => Ok(None),
            },
            ProductKey::CrossSection { .. } => {
                let line = request.cross_section.unwrap_or_default();
                match self.tables(variable, CutMode::Elevation)? {
                    Some(tables) => {
                        CrossSectionProcessor::new(&self.params).cross_section(&tables, &ctx, line.start, line.end)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// Cut tables of `variable`, built on first use
    fn tables(&mut self, variable: &str, mode: CutMode) -> RadarResult<Option<Arc<VolumeTables>>> {
        let key = (variable.to_string(), mode);
        if let Some(tables) = self.tables.get(&key) {
            return Ok(Some(Arc::clone(tables)));
        }
        let Some(sweep_count) = self.variable(variable).map(|v| v.sweep_count) else {
            log::warn!("No variable named {} in {}", variable, self.source);
            return Ok(None);
        };

        let built = VolumeTables::build(self.dataset()?, variable, sweep_count, mode, &self.params);
        let Some(built) = data_or_none(built, "cut tables")? else {
            return Ok(None);
        };
        log::debug!("Built {} {:?} cuts for {}", built.cuts.len(), mode, variable);

        let built = Arc::new(built);
        self.tables.insert(key, Arc::clone(&built));
        Ok(Some(built))
    }
}

impl Drop for RadarAdapter {
    fn drop(&mut self) {
        if let Err(e) = self.do_remove() {
            log::warn!("Failed to close {}: {}", self.source, e);
        }
    }
}

fn classify(metadata: &DatasetMetadata, vcp_name: Option<&str>) -> RadarResult<DatasetKind> {
    match metadata.number(&["isRadial"]).map(|v| v.round() as i64) {
        Some(3) => return Ok(DatasetKind::Raster),
        Some(0) => return Err(RadarError::Unsupported("dataset is not radial".to_string())),
        _ => {}
    }

    let rhi_mode = metadata.number(&["SweepMode"]).map(|v| v.round() as i64) == Some(3);
    if rhi_mode || vcp_name.map(str::trim) == Some("RHI") {
        Ok(DatasetKind::Rhi)
    } else {
        Ok(DatasetKind::Volume)
    }
}

fn describe_variables(dataset: &dyn RadialDataset, kind: DatasetKind, vcp_id: u16) -> RadarResult<Vec<VariableTable>> {
    let mut variables = Vec::new();
    for info in dataset.variables() {
        if info.name.ends_with("RAW") {
            log::debug!("Skipping raw variable {}", info.name);
            continue;
        }

        let sweeps = (0..info.sweep_count)
            .map(|s| dataset.sweep(&info.name, s))
            .collect::<RadarResult<Vec<_>>>()?;
        let angles: Vec<f64> = sweeps
            .iter()
            .map(|s| match kind {
                DatasetKind::Rhi => s.mean_azimuth() as f64,
                _ => s.mean_elevation as f64,
            })
            .collect();
        let angles = if vcp_id != 0 { remap_angles(&angles, vcp_id) } else { angles };

        variables.push(VariableTable { info, sweeps, angles });
    }
    Ok(variables)
}

/// Station position from the dataset attributes, then the resolver, then
/// (0, 0, 0)
fn resolve_location(metadata: &DatasetMetadata, resolver: Option<&dyn StationResolver>) -> EarthLocation {
    if let (Some(lat), Some(lon)) = (metadata.number(LATITUDE_ATTRIBUTES), metadata.number(LONGITUDE_ATTRIBUTES)) {
        let location = EarthLocation::new(lat, lon, metadata.number(ALTITUDE_ATTRIBUTES).unwrap_or(0.0));
        if !location.is_unset() {
            return location;
        }
    }

    if let (Some(resolver), Some(id)) = (resolver, metadata.station_id.as_deref()) {
        if let Some(location) = resolver.resolve(id) {
            log::debug!("Station {} located by resolver", id);
            return location;
        }
    }

    log::warn!("No location for station {:?}, using (0, 0, 0)", metadata.station_id);
    EarthLocation::default()
}

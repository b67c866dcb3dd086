//! Per-variable cut tables shared by the volume products

use crate::core::cuts::{select_cuts, CutMode};
use crate::core::params::ResampleParams;
use crate::core::sweep_index::SweepIndex;
use crate::io::dataset::{RadialDataset, SweepInfo};
use crate::types::{RadarError, RadarResult};
use ndarray::{Array2, ArrayView1};

/// One selected cut with its lookup table and ray data
#[derive(Debug, Clone)]
pub struct CutTable {
    /// Sweep number in the dataset
    pub sweep: usize,
    pub info: SweepInfo,
    /// Azimuth index, or elevation index for RHI cuts
    pub index: SweepIndex,
    /// Ray for each whole-degree bin, `None` when no ray lies within the beam
    pub rays: Vec<Option<usize>>,
    /// (ray, gate) samples
    pub data: Array2<f32>,
}

impl CutTable {
    /// Mean angle the cut is keyed on
    pub fn fixed_angle(&self, mode: CutMode) -> f64 {
        match mode {
            CutMode::Elevation => self.info.mean_elevation as f64,
            CutMode::Azimuth => self.info.mean_azimuth() as f64,
        }
    }

    pub fn ray(&self, ray: usize) -> Option<ArrayView1<'_, f32>> {
        (ray < self.data.nrows()).then(|| self.data.row(ray))
    }

    /// Sample at (ray, gate); NaN outside the data or for invalid markers
    pub fn sample(&self, ray: usize, gate: usize) -> f32 {
        match self.data.get([ray, gate]) {
            Some(&v) => clean(v),
            None => f32::NAN,
        }
    }

    /// Sample through the whole-degree ray table
    pub fn binned_sample(&self, bin: usize, gate: usize) -> f32 {
        match self.rays.get(bin).copied().flatten() {
            Some(ray) => self.sample(ray, gate),
            None => f32::NAN,
        }
    }

    pub fn half_beam_width(&self) -> f64 {
        let bw = self.info.beam_width as f64;
        if bw > 0.0 {
            bw / 2.0
        } else {
            0.5
        }
    }
}

/// Selected cuts of one variable
#[derive(Debug, Clone)]
pub struct VolumeTables {
    pub mode: CutMode,
    pub cuts: Vec<CutTable>,
    /// Smallest gate count over the cuts
    pub gates: usize,
}

impl VolumeTables {
    pub fn build(
        dataset: &dyn RadialDataset,
        variable: &str,
        sweep_count: usize,
        mode: CutMode,
        params: &ResampleParams,
    ) -> RadarResult<Self> {
        log::debug!("Building {:?} cut tables for {} ({} sweeps)", mode, variable, sweep_count);

        let infos = (0..sweep_count)
            .map(|s| dataset.sweep(variable, s))
            .collect::<RadarResult<Vec<_>>>()?;

        let angles: Vec<f32> = infos
            .iter()
            .map(|info| match mode {
                CutMode::Elevation => info.mean_elevation,
                CutMode::Azimuth => info.mean_azimuth(),
            })
            .collect();
        let selected = select_cuts(&angles, mode, params.cut_threshold);

        let mut cuts = Vec::with_capacity(selected.len());
        for sweep in selected {
            let info = infos[sweep].clone();
            let data = dataset.read_sweep(variable, sweep)?;

            let (index, rays) = match mode {
                CutMode::Elevation => {
                    let index = SweepIndex::new(&info.azimuths, info.beam_width as f64);
                    let rays = index.ray_table(params.azimuth_bins, index.match_limit());
                    (index, rays)
                }
                CutMode::Azimuth => {
                    let index = SweepIndex::new(&info.elevations, params.rhi_beam_width);
                    let limit = index.match_limit();
                    let rays = (0..params.rhi_elevation_bins)
                        .map(|e| index.closest_ray(e as f64, limit))
                        .collect();
                    (index, rays)
                }
            };

            cuts.push(CutTable { sweep, info, index, rays, data });
        }

        if mode == CutMode::Azimuth {
            cuts.sort_by(|a, b| a.fixed_angle(mode).total_cmp(&b.fixed_angle(mode)));
        }

        let gates = cuts
            .iter()
            .map(|c| c.info.gate_count.min(c.data.ncols()))
            .min()
            .unwrap_or(0);

        Ok(Self { mode, cuts, gates })
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty() || self.gates == 0
    }

    /// Cut whose mean elevation is nearest `elevation`, if within `limit`.
    /// Later cuts win ties.
    pub fn closest_cut(&self, elevation: f64, limit: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, cut) in self.cuts.iter().enumerate() {
            let d = (cut.fixed_angle(self.mode) - elevation).abs();
            if best.map_or(true, |(_, bd)| d <= bd) {
                best = Some((i, d));
            }
        }
        best.filter(|&(_, d)| d <= limit).map(|(i, _)| i)
    }
}

/// Invalid-data marker of upstream readers becomes NaN
pub fn clean(v: f32) -> f32 {
    if v == f32::MAX {
        f32::NAN
    } else {
        v
    }
}

/// Turn a data read failure into an absent product
pub fn data_or_none<T>(result: RadarResult<T>, what: &str) -> RadarResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(RadarError::DataRead(msg)) => {
            log::warn!("No {} produced: {}", what, msg);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

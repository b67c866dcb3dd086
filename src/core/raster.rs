use crate::core::params::ProductContext;
use crate::io::dataset::RasterData;
use crate::types::{GridDomain, RadarError, RadarResult, ResampledGrid};

/// (x, y) grid of a raster product, row 0 to the north
pub fn raster_grid(raster: &RasterData, ctx: &ProductContext) -> RadarResult<ResampledGrid> {
    let (nx, ny) = (raster.nx, raster.ny);
    if raster.values.len() != nx * ny {
        return Err(RadarError::Processing(format!(
            "Raster has {} values for {}x{} cells",
            raster.values.len(),
            nx,
            ny
        )));
    }
    log::debug!("Raster {}x{} at {} m, ascending rows: {}", nx, ny, raster.resolution, raster.y_ascending);

    let mut values = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        let source = if raster.y_ascending { ny - 1 - row } else { row };
        values.extend(raster.values[source * nx..(source + 1) * nx].iter().copied().map(crate::core::tables::clean));
    }

    let res = raster.resolution as f32;
    let xs = (0..ny).flat_map(|_| (0..nx).map(move |x| x as f32 * res)).collect();
    let ys = (0..ny).flat_map(|y| std::iter::repeat(y as f32 * res).take(nx)).collect();

    Ok(ResampledGrid {
        domain: GridDomain::Raster,
        shape: vec![nx, ny],
        coordinate_names: vec!["x".to_string(), "y".to_string()],
        coordinates: vec![xs, ys],
        values,
        unit: if raster.units.is_empty() { ctx.unit.clone() } else { raster.units.clone() },
        coordinate_system: ctx.coordinate_system(raster.resolution, 0.0),
        fixed_angle: None,
        level: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EarthLocation;

    fn raster(y_ascending: bool) -> RasterData {
        RasterData {
            nx: 3,
            ny: 2,
            resolution: 1000.0,
            values: vec![1.0, 2.0, 3.0, 4.0, 5.0, f32::MAX],
            units: "mm".to_string(),
            y_ascending,
        }
    }

    #[test]
    fn test_ascending_rows_are_flipped() {
        let ctx = ProductContext::new(EarthLocation::default(), 0, "dBZ");
        let grid = raster_grid(&raster(true), &ctx).unwrap();
        assert_eq!(grid.shape, vec![3, 2]);
        assert_eq!(grid.get(&[0, 0]), Some(4.0));
        assert!(grid.get(&[2, 0]).unwrap().is_nan());
        assert_eq!(grid.get(&[0, 1]), Some(1.0));
        assert_eq!(grid.unit, "mm");
        assert_eq!(grid.coordinates[1][3], 1000.0);

        let grid = raster_grid(&raster(false), &ctx).unwrap();
        assert_eq!(grid.get(&[0, 0]), Some(1.0));
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let mut r = raster(false);
        r.values.pop();
        let ctx = ProductContext::new(EarthLocation::default(), 0, "dBZ");
        assert!(raster_grid(&r, &ctx).is_err());
    }
}

use chrono::Utc;
use radar_resample::io::{AttributeValue, RasterData};
use radar_resample::{
    AdapterOptions, CacheKey, DataRequest, DatasetKind, DatasetMetadata, EarthLocation, GridCache, MemoryCache,
    MemoryDataset, MemorySweep, MemoryVariable, RadarAdapter, RadarError, RadarResult, ResampleParams, ResampledGrid,
    StationTable, REFLECTIVITY, VELOCITY,
};
use std::sync::Arc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn volume() -> MemoryDataset {
    let mut md = DatasetMetadata::new("NEXRAD2", Utc::now());
    md.station_id = Some("KTLX".to_string());
    let sweeps = vec![
        MemorySweep::uniform(0.5, 360, 10, 20.0),
        MemorySweep::uniform(1.5, 360, 10, 20.0),
        MemorySweep::uniform(2.5, 360, 10, 20.0),
    ];
    MemoryDataset::new(md)
        .with_variable(MemoryVariable::new("Reflectivity", "dBZ", sweeps.clone()))
        .with_variable(MemoryVariable::new("RadialVelocity", "m/s", sweeps))
}

fn rhi_dataset() -> MemoryDataset {
    let mut md = DatasetMetadata::new("CFRadial", Utc::now());
    md.attributes.insert("SweepMode".to_string(), AttributeValue::Number(3.0));
    md.attributes.insert("RadarLatitude".to_string(), AttributeValue::Number(40.0));
    md.attributes.insert("RadarLongitude".to_string(), AttributeValue::Number(-105.0));
    let sweeps = vec![
        MemorySweep::rhi(90.0, 0.0, 0.5, 60, 6, 5.0),
        MemorySweep::rhi(30.0, 0.0, 0.5, 60, 6, 3.0),
    ];
    MemoryDataset::new(md).with_variable(MemoryVariable::new("Reflectivity", "dBZ", sweeps))
}

/// Cache whose every call fails
struct BrokenCache;

impl GridCache for BrokenCache {
    fn get(&self, _key: &CacheKey) -> RadarResult<Option<Arc<ResampledGrid>>> {
        Err(RadarError::Cache("store offline".to_string()))
    }

    fn put(&self, _key: CacheKey, _grid: Arc<ResampledGrid>) -> RadarResult<()> {
        Err(RadarError::Cache("store offline".to_string()))
    }
}

#[test]
fn test_repeated_request_is_served_from_cache() {
    init_logger();
    let ds = volume();
    let probe = ds.clone();
    let mut adapter = RadarAdapter::from_dataset("ktlx", Box::new(ds), &AdapterOptions::default())
        .expect("Failed to adapt dataset");

    let request = DataRequest::new(REFLECTIVITY, "Reflectivity").sweep(0.5, Some(0));
    let first = adapter.get_data(&request).expect("request failed").expect("no grid");
    assert_eq!(probe.read_count(), 1);

    let second = adapter.get_data(&request).expect("request failed").expect("no grid");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(probe.read_count(), 1);

    // a different moment on the same sweep is a different product
    let velocity = DataRequest::new(VELOCITY, "RadialVelocity").sweep(0.5, Some(0));
    let third = adapter.get_data(&velocity).expect("request failed").expect("no grid");
    assert_eq!(third.unit, "m/s");
    assert_eq!(probe.read_count(), 2);
}

#[test]
fn test_shared_cache_spans_adapters() {
    init_logger();
    let cache = Arc::new(MemoryCache::new());
    let options = AdapterOptions::default().with_cache(cache.clone());

    let ds = volume();
    let probe = ds.clone();
    let mut first = RadarAdapter::from_dataset("a", Box::new(ds.clone()), &options).expect("adapter");
    let mut second = RadarAdapter::from_dataset("b", Box::new(ds), &options).expect("adapter");

    let request = DataRequest::new(REFLECTIVITY, "Reflectivity").cappi(1500.0);
    let a = first.get_data(&request).expect("request failed").expect("no grid");
    let reads = probe.read_count();
    assert_eq!(reads, 3);

    let b = second.get_data(&request).expect("request failed").expect("no grid");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(probe.read_count(), reads);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_shared_cache_keeps_grid_layouts_apart() {
    init_logger();
    let cache = Arc::new(MemoryCache::new());
    let coarse = ResampleParams {
        grid_dims: (4, 4, 2),
        ..ResampleParams::default()
    };
    let fine = ResampleParams {
        grid_dims: (6, 5, 3),
        ..ResampleParams::default()
    };
    let ds = volume();
    let mut first = RadarAdapter::from_dataset(
        "a",
        Box::new(ds.clone()),
        &AdapterOptions::default().with_params(coarse).with_cache(cache.clone()),
    )
    .expect("adapter");
    let mut second = RadarAdapter::from_dataset(
        "b",
        Box::new(ds),
        &AdapterOptions::default().with_params(fine).with_cache(cache.clone()),
    )
    .expect("adapter");

    let request = DataRequest::new(REFLECTIVITY, "Reflectivity").volume();
    let a = first.get_data(&request).expect("request failed").expect("no grid");
    let b = second.get_data(&request).expect("request failed").expect("no grid");
    assert_eq!(a.shape, vec![4, 4, 2]);
    assert_eq!(b.shape, vec![6, 5, 3]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_cache_failures_fall_back_to_resampling() {
    init_logger();
    let ds = volume();
    let probe = ds.clone();
    let options = AdapterOptions::default().with_cache(Arc::new(BrokenCache));
    let mut adapter = RadarAdapter::from_dataset("ktlx", Box::new(ds), &options).expect("adapter");

    let request = DataRequest::new(REFLECTIVITY, "Reflectivity").sweep(1.5, None);
    assert!(adapter.get_data(&request).expect("request failed").is_some());
    assert!(adapter.get_data(&request).expect("request failed").is_some());
    assert_eq!(probe.read_count(), 2);
}

#[test]
fn test_cut_tables_are_reused_until_cleared() {
    init_logger();
    let ds = volume();
    let probe = ds.clone();
    let mut adapter = RadarAdapter::from_dataset("ktlx", Box::new(ds), &AdapterOptions::default()).expect("adapter");

    adapter
        .get_data(&DataRequest::new(REFLECTIVITY, "Reflectivity").radar_volume())
        .expect("request failed")
        .expect("no grid");
    assert_eq!(probe.read_count(), 3);

    adapter
        .get_data(&DataRequest::new(REFLECTIVITY, "Reflectivity").rhi(45.0))
        .expect("request failed")
        .expect("no grid");
    assert_eq!(probe.read_count(), 3);

    adapter.clear_cached_data();
    adapter
        .get_data(&DataRequest::new(REFLECTIVITY, "Reflectivity").rhi(46.0))
        .expect("request failed")
        .expect("no grid");
    assert_eq!(probe.read_count(), 6);
}

#[test]
fn test_remove_closes_once() {
    init_logger();
    let ds = volume();
    let probe = ds.clone();
    let mut adapter = RadarAdapter::from_dataset("ktlx", Box::new(ds), &AdapterOptions::default()).expect("adapter");

    adapter.do_remove().expect("close failed");
    adapter.do_remove().expect("second remove is a no-op");
    assert!(adapter.is_closed());
    assert_eq!(probe.close_count(), 1);

    let request = DataRequest::new(REFLECTIVITY, "Reflectivity").sweep(0.5, Some(0));
    assert!(matches!(adapter.get_data(&request), Err(RadarError::Closed(_))));

    drop(adapter);
    assert_eq!(probe.close_count(), 1);
}

#[test]
fn test_drop_closes_dataset() {
    let ds = volume();
    let probe = ds.clone();
    {
        let _adapter = RadarAdapter::from_dataset("ktlx", Box::new(ds), &AdapterOptions::default()).expect("adapter");
        assert_eq!(probe.close_count(), 0);
    }
    assert_eq!(probe.close_count(), 1);
}

#[test]
fn test_rhi_dataset_requests() {
    init_logger();
    let mut adapter =
        RadarAdapter::from_dataset("rhi", Box::new(rhi_dataset()), &AdapterOptions::default()).expect("adapter");
    assert_eq!(adapter.kind(), DatasetKind::Rhi);
    assert_eq!(adapter.location(), EarthLocation::new(40.0, -105.0, 0.0));
    assert_eq!(adapter.angles("Reflectivity").expect("angles"), &[90.0, 30.0]);

    let missing_angle = DataRequest::new(REFLECTIVITY, "Reflectivity");
    assert!(matches!(adapter.get_data(&missing_angle), Err(RadarError::InvalidRequest(_))));

    let sweep = adapter
        .get_data(&DataRequest::new(REFLECTIVITY, "Reflectivity").sweep(30.0, None))
        .expect("request failed")
        .expect("no grid");
    assert_eq!(sweep.shape, vec![6, 2, 60]);
    assert!(sweep.values.iter().all(|&v| v == 3.0));

    let volume = adapter
        .get_data(&DataRequest::new(REFLECTIVITY, "Reflectivity").radar_volume())
        .expect("request failed")
        .expect("no grid");
    assert_eq!(volume.shape, vec![6, 91, 2]);
    assert_eq!(volume.get(&[0, 10, 0]), Some(3.0));
    assert_eq!(volume.get(&[0, 10, 1]), Some(5.0));
}

#[test]
fn test_raster_dataset() {
    init_logger();
    let mut md = DatasetMetadata::new("GINI", Utc::now());
    md.attributes.insert("isRadial".to_string(), AttributeValue::Number(3.0));
    let raster = RasterData {
        nx: 4,
        ny: 3,
        resolution: 1000.0,
        values: (0..12).map(|v| v as f32).collect(),
        units: "mm/h".to_string(),
        y_ascending: true,
    };
    let ds = MemoryDataset::new(md).with_raster("Precipitation", raster);
    let mut adapter = RadarAdapter::from_dataset("gini", Box::new(ds), &AdapterOptions::default()).expect("adapter");
    assert_eq!(adapter.kind(), DatasetKind::Raster);

    let grid = adapter
        .get_data(&DataRequest::new(0, "Precipitation"))
        .expect("request failed")
        .expect("no grid");
    assert_eq!(grid.shape, vec![4, 3]);
    assert_eq!(grid.get(&[0, 0]), Some(8.0));
    assert_eq!(grid.get(&[3, 2]), Some(3.0));
    assert_eq!(grid.unit, "mm/h");

    assert!(adapter
        .get_data(&DataRequest::new(0, "Echo Tops"))
        .expect("request failed")
        .is_none());
}

#[test]
fn test_station_resolver_supplies_location() {
    let table: StationTable = [("KTLX".to_string(), EarthLocation::new(35.333, -97.278, 370.0))]
        .into_iter()
        .collect();
    let options = AdapterOptions::default().with_station_resolver(Arc::new(table));
    let adapter = RadarAdapter::from_dataset("ktlx", Box::new(volume()), &options).expect("adapter");

    assert_eq!(adapter.location().altitude, 370.0);
    assert_eq!(adapter.station_id(), Some("KTLX"));
    assert_eq!(adapter.data_format(), "NEXRAD2");
    assert_eq!(adapter.variable_names(), vec!["Reflectivity", "RadialVelocity"]);
}

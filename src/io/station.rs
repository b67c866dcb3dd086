use crate::types::EarthLocation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Looks up radar station positions by station id
pub trait StationResolver: Send + Sync {
    fn resolve(&self, station_id: &str) -> Option<EarthLocation>;
}

/// Station positions keyed by upper-case id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationTable {
    stations: HashMap<String, EarthLocation>,
}

impl StationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, station_id: &str, location: EarthLocation) {
        self.stations.insert(station_id.trim().to_uppercase(), location);
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl FromIterator<(String, EarthLocation)> for StationTable {
    fn from_iter<I: IntoIterator<Item = (String, EarthLocation)>>(iter: I) -> Self {
        let mut table = StationTable::new();
        for (id, location) in iter {
            table.insert(&id, location);
        }
        table
    }
}

impl StationResolver for StationTable {
    fn resolve(&self, station_id: &str) -> Option<EarthLocation> {
        self.stations.get(&station_id.trim().to_uppercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let table: StationTable = vec![("kftg".to_string(), EarthLocation::new(39.786, -104.546, 1675.0))]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("KFTG").map(|l| l.altitude), Some(1675.0));
        assert!(table.resolve("KAMA").is_none());
    }
}

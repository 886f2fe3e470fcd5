use crate::config::PvConfig;
use crate::db;
use crate::services::aggregation::{
    AggregationError, DateRange, Field, HierarchyResolver, MetricsStore, Sample,
};
use crate::state::AppState;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

pub fn test_config() -> PvConfig {
    PvConfig {
        database_url: "postgresql://postgres@localhost/postgres".to_string(),
        db_max_connections: 2,
        log_dir: PathBuf::from("logs"),
        log_file_enabled: false,
    }
}

pub fn test_state() -> AppState {
    let config = test_config();
    let pool = db::connect_lazy(&config.database_url, config.db_max_connections)
        .expect("connect_lazy");
    AppState { config, db: pool }
}

/// Metrics store over in-process maps. Inverters exist once listed under a plant.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    plants: BTreeMap<i32, Vec<i32>>,
    readings: HashMap<(i32, Field), Vec<Sample>>,
    failing: HashSet<i32>,
}

impl InMemoryStore {
    pub fn add_plant(&mut self, plant_id: i32, inverter_ids: &[i32]) {
        self.plants.insert(plant_id, inverter_ids.to_vec());
    }

    pub fn add_power(&mut self, inverter_id: i32, value: f64, at: DateTime<Utc>) {
        self.add(inverter_id, Field::Power, value, at);
    }

    pub fn add_temperature(&mut self, inverter_id: i32, value: f64, at: DateTime<Utc>) {
        self.add(inverter_id, Field::Temperature, value, at);
    }

    pub fn fail_fetches_for(&mut self, inverter_id: i32) {
        self.failing.insert(inverter_id);
    }

    fn add(&mut self, inverter_id: i32, field: Field, value: f64, at: DateTime<Utc>) {
        self.readings
            .entry((inverter_id, field))
            .or_default()
            .push(Sample::new(value, at));
    }
}

impl MetricsStore for InMemoryStore {
    async fn inverter_exists(&self, inverter_id: i32) -> Result<bool, AggregationError> {
        Ok(self
            .plants
            .values()
            .any(|inverters| inverters.contains(&inverter_id)))
    }

    async fn fetch_samples(
        &self,
        inverter_id: i32,
        field: Field,
        range: DateRange,
    ) -> Result<Vec<Sample>, AggregationError> {
        if self.failing.contains(&inverter_id) {
            return Err(AggregationError::Store(sqlx::Error::PoolTimedOut));
        }
        let mut samples: Vec<Sample> = self
            .readings
            .get(&(inverter_id, field))
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.timestamp >= range.start && s.timestamp <= range.end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }
}

impl HierarchyResolver for InMemoryStore {
    async fn inverter_ids_of(&self, plant_id: i32) -> Result<Vec<i32>, AggregationError> {
        self.plants
            .get(&plant_id)
            .cloned()
            .ok_or_else(|| AggregationError::plant_not_found(plant_id))
    }
}

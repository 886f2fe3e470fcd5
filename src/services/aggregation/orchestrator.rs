use std::collections::BTreeMap;
use std::future::Future;

use futures::future::try_join_all;

use super::daily::{avg_per_day, max_per_day};
use super::integrator::integrate;
use super::sample::{DateRange, EntityPowerSeries, Field, Sample};

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error("{0}")]
    BadRequest(String),
    #[error("metrics store failure: {0}")]
    Store(#[from] sqlx::Error),
}

impl AggregationError {
    pub fn inverter_not_found(id: i32) -> Self {
        Self::NotFound {
            entity: "Inverter",
            id,
        }
    }

    pub fn plant_not_found(id: i32) -> Self {
        Self::NotFound {
            entity: "Plant",
            id,
        }
    }
}

/// Source of per-inverter samples. Implementations return only rows where the requested
/// field is present, inclusive of both range bounds, ascending by timestamp by convention.
pub trait MetricsStore: Send + Sync {
    fn inverter_exists(
        &self,
        inverter_id: i32,
    ) -> impl Future<Output = Result<bool, AggregationError>> + Send;

    fn fetch_samples(
        &self,
        inverter_id: i32,
        field: Field,
        range: DateRange,
    ) -> impl Future<Output = Result<Vec<Sample>, AggregationError>> + Send;
}

/// Plant -> inverter lookup. Fails with `NotFound` when the plant does not exist.
pub trait HierarchyResolver: Send + Sync {
    fn inverter_ids_of(
        &self,
        plant_id: i32,
    ) -> impl Future<Output = Result<Vec<i32>, AggregationError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalGeneration {
    pub total_generation: f64,
}

pub struct AggregationService<S> {
    store: S,
}

impl<S> AggregationService<S>
where
    S: MetricsStore + HierarchyResolver,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn max_power_per_day(
        &self,
        inverter_id: i32,
        range: DateRange,
    ) -> Result<BTreeMap<String, f64>, AggregationError> {
        self.ensure_inverter(inverter_id).await?;
        let samples = self
            .store
            .fetch_samples(inverter_id, Field::Power, range)
            .await?;
        tracing::debug!(inverter_id, samples = samples.len(), "computing max power per day");
        Ok(max_per_day(&samples))
    }

    pub async fn avg_temperature_per_day(
        &self,
        inverter_id: i32,
        range: DateRange,
    ) -> Result<BTreeMap<String, f64>, AggregationError> {
        self.ensure_inverter(inverter_id).await?;
        let samples = self
            .store
            .fetch_samples(inverter_id, Field::Temperature, range)
            .await?;
        tracing::debug!(
            inverter_id,
            samples = samples.len(),
            "computing average temperature per day"
        );
        Ok(avg_per_day(&samples))
    }

    /// Energy generated by `inverter_ids` over `range`. All series are fetched before the
    /// integrator runs; inverters without samples are left out of the entity list.
    pub async fn total_generation(
        &self,
        inverter_ids: &[i32],
        range: DateRange,
    ) -> Result<TotalGeneration, AggregationError> {
        // try_join_all keeps input order, so the integrator always sees entities by id order.
        let fetched = try_join_all(
            inverter_ids
                .iter()
                .map(|id| self.store.fetch_samples(*id, Field::Power, range)),
        )
        .await?;

        let entities: Vec<EntityPowerSeries> = fetched
            .into_iter()
            .filter(|samples| !samples.is_empty())
            .map(EntityPowerSeries::new)
            .collect();

        let total_generation = integrate(&entities);
        tracing::debug!(
            inverters = inverter_ids.len(),
            entities = entities.len(),
            total_generation,
            "computed total generation"
        );
        Ok(TotalGeneration { total_generation })
    }

    pub async fn inverter_generation(
        &self,
        inverter_id: i32,
        range: DateRange,
    ) -> Result<TotalGeneration, AggregationError> {
        self.ensure_inverter(inverter_id).await?;
        self.total_generation(&[inverter_id], range).await
    }

    pub async fn total_generation_for_plant(
        &self,
        plant_id: i32,
        range: DateRange,
    ) -> Result<TotalGeneration, AggregationError> {
        let inverter_ids = self.store.inverter_ids_of(plant_id).await?;
        self.total_generation(&inverter_ids, range).await
    }

    async fn ensure_inverter(&self, inverter_id: i32) -> Result<(), AggregationError> {
        if self.store.inverter_exists(inverter_id).await? {
            Ok(())
        } else {
            tracing::warn!(inverter_id, "aggregate requested for unknown inverter");
            Err(AggregationError::inverter_not_found(inverter_id))
        }
    }
}

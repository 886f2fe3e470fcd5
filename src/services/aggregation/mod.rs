//! Time-series aggregation over inverter power and temperature samples.
//!
//! `sample`, `integrator` and `daily` are pure and perform no I/O; `orchestrator` binds
//! them to inverter and plant identifiers through the [`MetricsStore`] and
//! [`HierarchyResolver`] seams.

pub mod daily;
pub mod integrator;
pub mod orchestrator;
pub mod rounding;
pub mod sample;

pub use daily::{avg_per_day, max_per_day};
pub use integrator::integrate;
pub use orchestrator::{
    AggregationError, AggregationService, HierarchyResolver, MetricsStore, TotalGeneration,
};
pub use sample::{DateRange, EntityPowerSeries, Field, Sample};

pub mod aggregation;
pub mod data_import;
pub mod metrics_store;

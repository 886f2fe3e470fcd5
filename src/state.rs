use crate::config::PvConfig;
use crate::services::aggregation::AggregationService;
use crate::services::metrics_store::PgMetricsStore;
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub config: PvConfig,
    pub db: PgPool,
}

impl AppState {
    pub fn aggregation(&self) -> AggregationService<PgMetricsStore> {
        AggregationService::new(PgMetricsStore::new(self.db.clone()))
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.db.clone()
    }
}

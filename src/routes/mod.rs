pub mod data_import;
pub mod health;
pub mod inverters;
pub mod plants;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(plants::router())
                .merge(inverters::router())
                .merge(data_import::router())
                .merge(crate::openapi::router()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes::{data_import, health, inverters, plants};
use crate::services;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PV plant monitoring API",
        description = "Photovoltaic plant and inverter registry with energy, peak power and temperature aggregates",
        version = "1.0"
    ),
    paths(
        health::healthz_handler,
        plants::create_plant,
        plants::list_plants,
        plants::get_plant,
        plants::update_plant,
        plants::delete_plant,
        plants::plant_generation,
        inverters::create_inverter,
        inverters::list_inverters,
        inverters::get_inverter,
        inverters::update_inverter,
        inverters::delete_inverter,
        inverters::max_power,
        inverters::avg_temperature,
        inverters::inverter_generation,
        data_import::import_metrics,
        data_import::import_sample_metrics,
    ),
    components(schemas(
        health::HealthResponse,
        plants::CreatePlantRequest,
        plants::UpdatePlantRequest,
        plants::PlantResponse,
        inverters::CreateInverterRequest,
        inverters::UpdateInverterRequest,
        inverters::InverterResponse,
        services::aggregation::TotalGeneration,
        services::data_import::MetricImportItem,
        services::data_import::ImportSummary,
        services::data_import::SampleImportSummary,
    )),
    tags(
        (name = "plants", description = "Plants and plant-level generation"),
        (name = "inverters", description = "Inverters and per-inverter aggregates"),
        (name = "import", description = "Bulk metric import and demo data"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_default()
}

async fn openapi_handler() -> Json<serde_json::Value> {
    Json(openapi_json())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;

use crate::error::{map_aggregation_error, map_db_error, AppError};
use crate::services::aggregation::TotalGeneration;
use crate::state::AppState;
use crate::time::DateRangeQuery;

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateInverterRequest {
    pub name: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub plant_id: i32,
}

#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateInverterRequest {
    pub name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub plant_id: Option<i32>,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InverterResponse {
    pub id: i32,
    pub name: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub plant_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct InverterRow {
    pub id: i32,
    pub name: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub plant_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InverterRow> for InverterResponse {
    fn from(row: InverterRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            model: row.model,
            serial_number: row.serial_number,
            plant_id: row.plant_id,
            created_at: row.created_at.to_rfc3339(),
            updated_at: row.updated_at.to_rfc3339(),
        }
    }
}

const INVERTER_COLUMNS: &str =
    "id, name, model, serial_number, plant_id, created_at, updated_at";

fn required_name(name: &str) -> Result<String, (StatusCode, String)> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request("name must not be empty").into());
    }
    Ok(trimmed.to_string())
}

async fn ensure_plant(db: &PgPool, plant_id: i32) -> Result<(), (StatusCode, String)> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM plants WHERE id = $1)")
        .bind(plant_id)
        .fetch_one(db)
        .await
        .map_err(map_db_error)?;
    if exists {
        Ok(())
    } else {
        Err(AppError::not_found(format!("Plant with id {plant_id} not found")).into())
    }
}

fn inverter_not_found(id: i32) -> (StatusCode, String) {
    AppError::not_found(format!("Inverter with id {id} not found")).into()
}

#[utoipa::path(
    post,
    path = "/api/inverters",
    tag = "inverters",
    request_body = CreateInverterRequest,
    responses(
        (status = 201, description = "Inverter created", body = InverterResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Plant not found")
    )
)]
pub(crate) async fn create_inverter(
    State(state): State<AppState>,
    Json(payload): Json<CreateInverterRequest>,
) -> Result<(StatusCode, Json<InverterResponse>), (StatusCode, String)> {
    let name = required_name(&payload.name)?;
    ensure_plant(&state.db, payload.plant_id).await?;

    let row: InverterRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO inverters (name, model, serial_number, plant_id)
        VALUES ($1, $2, $3, $4)
        RETURNING {INVERTER_COLUMNS}
        "#
    ))
    .bind(name)
    .bind(&payload.model)
    .bind(&payload.serial_number)
    .bind(payload.plant_id)
    .fetch_one(&state.db)
    .await
    .map_err(map_db_error)?;

    tracing::info!(inverter_id = row.id, plant_id = row.plant_id, "created inverter");
    Ok((StatusCode::CREATED, Json(InverterResponse::from(row))))
}

#[utoipa::path(
    get,
    path = "/api/inverters",
    tag = "inverters",
    responses((status = 200, description = "List inverters", body = Vec<InverterResponse>))
)]
pub(crate) async fn list_inverters(
    State(state): State<AppState>,
) -> Result<Json<Vec<InverterResponse>>, (StatusCode, String)> {
    let rows: Vec<InverterRow> = sqlx::query_as(&format!(
        "SELECT {INVERTER_COLUMNS} FROM inverters ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(map_db_error)?;

    Ok(Json(rows.into_iter().map(InverterResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/inverters/{id}",
    tag = "inverters",
    params(("id" = i32, Path, description = "Inverter id")),
    responses(
        (status = 200, description = "Inverter", body = InverterResponse),
        (status = 404, description = "Not found")
    )
)]
pub(crate) async fn get_inverter(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<InverterResponse>, (StatusCode, String)> {
    let row: Option<InverterRow> = sqlx::query_as(&format!(
        "SELECT {INVERTER_COLUMNS} FROM inverters WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(map_db_error)?;

    let Some(row) = row else {
        return Err(inverter_not_found(id));
    };
    Ok(Json(InverterResponse::from(row)))
}

#[utoipa::path(
    patch,
    path = "/api/inverters/{id}",
    tag = "inverters",
    request_body = UpdateInverterRequest,
    params(("id" = i32, Path, description = "Inverter id")),
    responses(
        (status = 200, description = "Inverter updated", body = InverterResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Inverter or plant not found")
    )
)]
pub(crate) async fn update_inverter(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInverterRequest>,
) -> Result<Json<InverterResponse>, (StatusCode, String)> {
    let name = payload.name.as_deref().map(required_name).transpose()?;
    if let Some(plant_id) = payload.plant_id {
        ensure_plant(&state.db, plant_id).await?;
    }

    let row: Option<InverterRow> = sqlx::query_as(&format!(
        r#"
        UPDATE inverters
        SET name = COALESCE($2, name),
            model = COALESCE($3, model),
            serial_number = COALESCE($4, serial_number),
            plant_id = COALESCE($5, plant_id),
            updated_at = now()
        WHERE id = $1
        RETURNING {INVERTER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(&payload.model)
    .bind(&payload.serial_number)
    .bind(payload.plant_id)
    .fetch_optional(&state.db)
    .await
    .map_err(map_db_error)?;

    let Some(row) = row else {
        return Err(inverter_not_found(id));
    };
    Ok(Json(InverterResponse::from(row)))
}

#[utoipa::path(
    delete,
    path = "/api/inverters/{id}",
    tag = "inverters",
    params(("id" = i32, Path, description = "Inverter id")),
    responses(
        (status = 204, description = "Inverter and its metrics removed"),
        (status = 404, description = "Not found")
    )
)]
pub(crate) async fn delete_inverter(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, (StatusCode, String)> {
    let result = sqlx::query("DELETE FROM inverters WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(map_db_error)?;

    if result.rows_affected() == 0 {
        return Err(inverter_not_found(id));
    }
    tracing::info!(inverter_id = id, "deleted inverter");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/inverters/{id}/max-power",
    tag = "inverters",
    params(("id" = i32, Path, description = "Inverter id"), DateRangeQuery),
    responses(
        (status = 200, description = "Maximum power per UTC day, keyed YYYY-MM-DD", body = BTreeMap<String, f64>),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Inverter not found")
    )
)]
pub(crate) async fn max_power(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<BTreeMap<String, f64>>, (StatusCode, String)> {
    let range = query.into_range()?;
    let result = state
        .aggregation()
        .max_power_per_day(id, range)
        .await
        .map_err(map_aggregation_error)?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/inverters/{id}/avg-temperature",
    tag = "inverters",
    params(("id" = i32, Path, description = "Inverter id"), DateRangeQuery),
    responses(
        (status = 200, description = "Average temperature per UTC day, keyed YYYY-MM-DD", body = BTreeMap<String, f64>),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Inverter not found")
    )
)]
pub(crate) async fn avg_temperature(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<BTreeMap<String, f64>>, (StatusCode, String)> {
    let range = query.into_range()?;
    let result = state
        .aggregation()
        .avg_temperature_per_day(id, range)
        .await
        .map_err(map_aggregation_error)?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/inverters/{id}/generation",
    tag = "inverters",
    params(("id" = i32, Path, description = "Inverter id"), DateRangeQuery),
    responses(
        (status = 200, description = "Energy generated in the range (Wh)", body = TotalGeneration),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Inverter not found")
    )
)]
pub(crate) async fn inverter_generation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<TotalGeneration>, (StatusCode, String)> {
    let range = query.into_range()?;
    let result = state
        .aggregation()
        .inverter_generation(id, range)
        .await
        .map_err(map_aggregation_error)?;
    Ok(Json(result))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/inverters", get(list_inverters).post(create_inverter))
        .route(
            "/inverters/{id}",
            get(get_inverter)
                .patch(update_inverter)
                .delete(delete_inverter),
        )
        .route("/inverters/{id}/max-power", get(max_power))
        .route("/inverters/{id}/avg-temperature", get(avg_temperature))
        .route("/inverters/{id}/generation", get(inverter_generation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router().with_state(crate::test_support::test_state())
    }

    async fn status_of(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn aggregates_reject_missing_dates_before_touching_the_store() {
        assert_eq!(
            status_of("/inverters/1/max-power").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of("/inverters/1/avg-temperature?startDate=2023-01-01").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn aggregates_reject_out_of_range_clock_values() {
        assert_eq!(
            status_of("/inverters/1/generation?startDate=2023-01-01T24:30Z&endDate=2023-01-02").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn aggregates_reject_unparsable_dates() {
        assert_eq!(
            status_of("/inverters/1/max-power?start=tomorrow&end=2023-01-01").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn non_numeric_ids_are_rejected() {
        assert_eq!(
            status_of("/inverters/abc/generation?startDate=2023-01-01&endDate=2023-01-02").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        let (status, _) = required_name("   ").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(required_name(" Inverter 1 ").unwrap(), "Inverter 1");
    }
}

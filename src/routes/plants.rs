use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::{map_aggregation_error, map_db_error, AppError};
use crate::routes::inverters::{InverterResponse, InverterRow};
use crate::services::aggregation::TotalGeneration;
use crate::state::AppState;
use crate::time::DateRangeQuery;

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub(crate) struct CreatePlantRequest {
    pub name: String,
    pub location: Option<String>,
    /// Installed capacity in kW.
    pub capacity: Option<f64>,
}

#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::ToSchema)]
pub(crate) struct UpdatePlantRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<f64>,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlantResponse {
    pub id: i32,
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    pub inverters: Vec<InverterResponse>,
}

#[derive(sqlx::FromRow)]
struct PlantRow {
    id: i32,
    name: String,
    location: Option<String>,
    capacity: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlantResponse {
    fn from_row(row: PlantRow, inverters: Vec<InverterResponse>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            location: row.location,
            capacity: row.capacity,
            created_at: row.created_at.to_rfc3339(),
            updated_at: row.updated_at.to_rfc3339(),
            inverters,
        }
    }
}

const PLANT_COLUMNS: &str = "id, name, location, capacity, created_at, updated_at";

fn validate_fields(
    name: Option<&str>,
    capacity: Option<f64>,
) -> Result<Option<String>, (StatusCode, String)> {
    if let Some(capacity) = capacity {
        if !capacity.is_finite() || capacity < 0.0 {
            return Err(AppError::bad_request("capacity must be a non-negative number").into());
        }
    }
    match name.map(str::trim) {
        Some("") => Err(AppError::bad_request("name must not be empty").into()),
        Some(trimmed) => Ok(Some(trimmed.to_string())),
        None => Ok(None),
    }
}

fn plant_not_found(id: i32) -> (StatusCode, String) {
    AppError::not_found(format!("Plant with id {id} not found")).into()
}

async fn inverters_by_plant(
    db: &sqlx::PgPool,
    plant_ids: &[i32],
) -> Result<HashMap<i32, Vec<InverterResponse>>, (StatusCode, String)> {
    let rows: Vec<InverterRow> = sqlx::query_as(
        r#"
        SELECT id, name, model, serial_number, plant_id, created_at, updated_at
        FROM inverters
        WHERE plant_id = ANY($1)
        ORDER BY id ASC
        "#,
    )
    .bind(plant_ids)
    .fetch_all(db)
    .await
    .map_err(map_db_error)?;

    let mut grouped: HashMap<i32, Vec<InverterResponse>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.plant_id)
            .or_default()
            .push(InverterResponse::from(row));
    }
    Ok(grouped)
}

#[utoipa::path(
    post,
    path = "/api/plants",
    tag = "plants",
    request_body = CreatePlantRequest,
    responses(
        (status = 201, description = "Plant created", body = PlantResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub(crate) async fn create_plant(
    State(state): State<AppState>,
    Json(payload): Json<CreatePlantRequest>,
) -> Result<(StatusCode, Json<PlantResponse>), (StatusCode, String)> {
    let name = validate_fields(Some(payload.name.as_str()), payload.capacity)?;

    let row: PlantRow = sqlx::query_as(&format!(
        "INSERT INTO plants (name, location, capacity) VALUES ($1, $2, $3) RETURNING {PLANT_COLUMNS}"
    ))
    .bind(name)
    .bind(&payload.location)
    .bind(payload.capacity)
    .fetch_one(&state.db)
    .await
    .map_err(map_db_error)?;

    tracing::info!(plant_id = row.id, "created plant");
    Ok((
        StatusCode::CREATED,
        Json(PlantResponse::from_row(row, Vec::new())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/plants",
    tag = "plants",
    responses((status = 200, description = "List plants with their inverters", body = Vec<PlantResponse>))
)]
pub(crate) async fn list_plants(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlantResponse>>, (StatusCode, String)> {
    let rows: Vec<PlantRow> = sqlx::query_as(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants ORDER BY id ASC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(map_db_error)?;

    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let mut inverters = inverters_by_plant(&state.db, &ids).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| {
                let owned = inverters.remove(&row.id).unwrap_or_default();
                PlantResponse::from_row(row, owned)
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/plants/{id}",
    tag = "plants",
    params(("id" = i32, Path, description = "Plant id")),
    responses(
        (status = 200, description = "Plant with its inverters", body = PlantResponse),
        (status = 404, description = "Not found")
    )
)]
pub(crate) async fn get_plant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PlantResponse>, (StatusCode, String)> {
    let row: Option<PlantRow> = sqlx::query_as(&format!(
        "SELECT {PLANT_COLUMNS} FROM plants WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(map_db_error)?;

    let Some(row) = row else {
        return Err(plant_not_found(id));
    };
    let mut inverters = inverters_by_plant(&state.db, &[id]).await?;
    let owned = inverters.remove(&id).unwrap_or_default();
    Ok(Json(PlantResponse::from_row(row, owned)))
}

#[utoipa::path(
    patch,
    path = "/api/plants/{id}",
    tag = "plants",
    request_body = UpdatePlantRequest,
    params(("id" = i32, Path, description = "Plant id")),
    responses(
        (status = 200, description = "Plant updated", body = PlantResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Not found")
    )
)]
pub(crate) async fn update_plant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePlantRequest>,
) -> Result<Json<PlantResponse>, (StatusCode, String)> {
    let name = validate_fields(payload.name.as_deref(), payload.capacity)?;

    let row: Option<PlantRow> = sqlx::query_as(&format!(
        r#"
        UPDATE plants
        SET name = COALESCE($2, name),
            location = COALESCE($3, location),
            capacity = COALESCE($4, capacity),
            updated_at = now()
        WHERE id = $1
        RETURNING {PLANT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(&payload.location)
    .bind(payload.capacity)
    .fetch_optional(&state.db)
    .await
    .map_err(map_db_error)?;

    let Some(row) = row else {
        return Err(plant_not_found(id));
    };
    let mut inverters = inverters_by_plant(&state.db, &[id]).await?;
    let owned = inverters.remove(&id).unwrap_or_default();
    Ok(Json(PlantResponse::from_row(row, owned)))
}

#[utoipa::path(
    delete,
    path = "/api/plants/{id}",
    tag = "plants",
    params(("id" = i32, Path, description = "Plant id")),
    responses(
        (status = 204, description = "Plant, its inverters and their metrics removed"),
        (status = 404, description = "Not found")
    )
)]
pub(crate) async fn delete_plant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, (StatusCode, String)> {
    let result = sqlx::query("DELETE FROM plants WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(map_db_error)?;

    if result.rows_affected() == 0 {
        return Err(plant_not_found(id));
    }
    tracing::info!(plant_id = id, "deleted plant");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/plants/{id}/generation",
    tag = "plants",
    params(("id" = i32, Path, description = "Plant id"), DateRangeQuery),
    responses(
        (status = 200, description = "Energy generated by all plant inverters in the range (Wh)", body = TotalGeneration),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Plant not found")
    )
)]
pub(crate) async fn plant_generation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<TotalGeneration>, (StatusCode, String)> {
    let range = query.into_range()?;
    let result = state
        .aggregation()
        .total_generation_for_plant(id, range)
        .await
        .map_err(map_aggregation_error)?;
    Ok(Json(result))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plants", get(list_plants).post(create_plant))
        .route(
            "/plants/{id}",
            get(get_plant).patch(update_plant).delete(delete_plant),
        )
        .route("/plants/{id}/generation", get(plant_generation))
}

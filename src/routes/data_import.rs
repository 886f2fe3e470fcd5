use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};

use crate::error::{map_aggregation_error, AppError};
use crate::services::data_import::{
    import_metrics as import_metric_records, import_sample_data, parse_import_document,
    ImportSummary, SampleImportSummary,
};
use crate::state::AppState;

#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct SampleQuery {
    /// UTC day to generate readings for (`YYYY-MM-DD`); defaults to today.
    pub date: Option<String>,
}

impl SampleQuery {
    fn day(&self) -> Result<NaiveDate, AppError> {
        match self.date.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(Utc::now().date_naive()),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::bad_request(format!("Invalid date: {raw}"))),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/import/metrics",
    tag = "import",
    request_body(
        content = Vec<crate::services::data_import::MetricImportItem>,
        description = "JSON array of metric readings",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Metrics imported", body = ImportSummary),
        (status = 400, description = "Invalid document"),
        (status = 404, description = "Referenced inverter not found")
    )
)]
pub(crate) async fn import_metrics(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<ImportSummary>), (StatusCode, String)> {
    let records = parse_import_document(&body).map_err(map_aggregation_error)?;
    let summary = import_metric_records(&state.db, &records)
        .await
        .map_err(map_aggregation_error)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[utoipa::path(
    post,
    path = "/api/import/metrics/sample",
    tag = "import",
    params(SampleQuery),
    responses(
        (status = 201, description = "Sample plants, inverters and readings created", body = SampleImportSummary),
        (status = 400, description = "Invalid date")
    )
)]
pub(crate) async fn import_sample_metrics(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Result<(StatusCode, Json<SampleImportSummary>), (StatusCode, String)> {
    let day = query.day()?;
    let summary = import_sample_data(&state.db, day)
        .await
        .map_err(map_aggregation_error)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/import/metrics", post(import_metrics))
        .route("/import/metrics/sample", post(import_sample_metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn post_import(body: &'static str) -> (StatusCode, String) {
        let app = router().with_state(crate::test_support::test_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/import/metrics")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn malformed_documents_are_bad_requests() {
        let (status, message) = post_import("not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Invalid JSON");

        let (status, message) = post_import(r#"{"inverterId":1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "JSON content must be an array of metrics");
    }

    #[test]
    fn sample_day_defaults_to_today_and_validates_input() {
        let before = Utc::now().date_naive();
        let default = SampleQuery::default().day().unwrap();
        assert!(before <= default && default <= Utc::now().date_naive());

        let query = SampleQuery {
            date: Some("2023-06-21".to_string()),
        };
        assert_eq!(
            query.day().unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 21).unwrap()
        );

        let query = SampleQuery {
            date: Some("21/06/2023".to_string()),
        };
        assert_eq!(query.day().unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}

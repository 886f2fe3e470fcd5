use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;

use crate::services::aggregation::AggregationError;

const SAMPLE_HOURS: u32 = 24;
const SAMPLE_INVERTERS_PER_PLANT: u32 = 4;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricImportItem {
    pub timestamp: String,
    pub inverter_id: i32,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Import item with its timestamp already parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord {
    pub ts: DateTime<Utc>,
    pub inverter_id: i32,
    pub power: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct ImportSummary {
    pub imported: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct SampleImportSummary {
    pub imported: usize,
    pub plants: usize,
    pub inverters: usize,
}

/// Parses a bulk import document: a JSON array of metric items.
pub fn parse_import_document(raw: &str) -> Result<Vec<MetricRecord>, AggregationError> {
    let document: JsonValue = serde_json::from_str(raw)
        .map_err(|_| AggregationError::BadRequest("Invalid JSON".to_string()))?;
    let JsonValue::Array(values) = document else {
        return Err(AggregationError::BadRequest(
            "JSON content must be an array of metrics".to_string(),
        ));
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let item: MetricImportItem = serde_json::from_value(value).map_err(|err| {
                AggregationError::BadRequest(format!("Invalid metric at index {index}: {err}"))
            })?;
            let ts = DateTime::parse_from_rfc3339(item.timestamp.trim())
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| {
                    AggregationError::BadRequest(format!(
                        "Invalid timestamp at index {index}: {}",
                        item.timestamp
                    ))
                })?;
            Ok(MetricRecord {
                ts,
                inverter_id: item.inverter_id,
                power: item.power,
                temperature: item.temperature,
            })
        })
        .collect()
}

/// Writes all records in one transaction. Nothing is written when any referenced inverter
/// is missing.
pub async fn import_metrics(
    pool: &PgPool,
    records: &[MetricRecord],
) -> Result<ImportSummary, AggregationError> {
    let mut tx = pool.begin().await?;

    let mut wanted: Vec<i32> = records.iter().map(|record| record.inverter_id).collect();
    wanted.sort_unstable();
    wanted.dedup();
    let known: Vec<i32> = sqlx::query_scalar("SELECT id FROM inverters WHERE id = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut *tx)
        .await?;
    if let Some(missing) = first_missing_inverter(records, &known) {
        tracing::warn!(inverter_id = missing, "import references unknown inverter");
        return Err(AggregationError::inverter_not_found(missing));
    }

    for record in records {
        insert_metric(&mut tx, record).await?;
    }
    tx.commit().await?;

    tracing::info!(imported = records.len(), "imported metrics");
    Ok(ImportSummary {
        imported: records.len(),
    })
}

fn first_missing_inverter(records: &[MetricRecord], known: &[i32]) -> Option<i32> {
    let known: HashSet<i32> = known.iter().copied().collect();
    records
        .iter()
        .map(|record| record.inverter_id)
        .find(|id| !known.contains(id))
}

async fn insert_metric(
    tx: &mut Transaction<'_, Postgres>,
    record: &MetricRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO metrics (ts, power, temperature, inverter_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(record.ts)
    .bind(record.power)
    .bind(record.temperature)
    .bind(record.inverter_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

struct SamplePlant {
    name: &'static str,
    location: &'static str,
    capacity: f64,
    peak_power: f64,
    model_prefix: char,
}

const SAMPLE_PLANTS: [SamplePlant; 2] = [
    SamplePlant {
        name: "Solar Plant 1",
        location: "São Paulo",
        capacity: 1000.0,
        peak_power: 250.0,
        model_prefix: 'A',
    },
    SamplePlant {
        name: "Solar Plant 2",
        location: "Rio de Janeiro",
        capacity: 800.0,
        peak_power: 200.0,
        model_prefix: 'B',
    },
];

/// Seeds two demo plants with four inverters each and one day of hourly readings.
pub async fn import_sample_data(
    pool: &PgPool,
    day: NaiveDate,
) -> Result<SampleImportSummary, AggregationError> {
    let midnight = day.and_time(chrono::NaiveTime::MIN).and_utc();
    let mut tx = pool.begin().await?;
    let mut imported = 0;
    let mut inverters = 0;
    let mut inverter_number = 1;

    for plant in &SAMPLE_PLANTS {
        let plant_id: i32 = sqlx::query_scalar(
            "INSERT INTO plants (name, location, capacity) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(plant.name)
        .bind(plant.location)
        .bind(plant.capacity)
        .fetch_one(&mut *tx)
        .await?;

        for _ in 0..SAMPLE_INVERTERS_PER_PLANT {
            let inverter_id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO inverters (name, model, serial_number, plant_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(format!("Inverter {inverter_number}"))
            .bind(format!("Model {}{inverter_number}", plant.model_prefix))
            .bind(format!("SN{inverter_number:03}"))
            .bind(plant_id)
            .fetch_one(&mut *tx)
            .await?;
            inverters += 1;
            inverter_number += 1;

            for hour in 0..SAMPLE_HOURS {
                let record = MetricRecord {
                    ts: midnight + Duration::hours(i64::from(hour)),
                    inverter_id,
                    power: Some(sample_power(hour, plant.peak_power)),
                    temperature: Some(sample_temperature(hour)),
                };
                insert_metric(&mut tx, &record).await?;
                imported += 1;
            }
        }
    }
    tx.commit().await?;

    tracing::info!(%day, imported, inverters, "seeded sample data");
    Ok(SampleImportSummary {
        imported,
        plants: SAMPLE_PLANTS.len(),
        inverters,
    })
}

fn is_daylight(hour: u32) -> bool {
    (6..=18).contains(&hour)
}

/// Parabolic output curve peaking at noon, zero outside daylight hours.
fn sample_power(hour: u32, peak: f64) -> f64 {
    if !is_daylight(hour) {
        return 0.0;
    }
    let offset = (f64::from(hour) - 12.0) / 6.0;
    peak * (1.0 - offset * offset)
}

fn sample_temperature(hour: u32) -> f64 {
    if !is_daylight(hour) {
        return 25.0;
    }
    let offset = (f64::from(hour) - 14.0) / 8.0;
    25.0 + 15.0 * (1.0 - offset * offset)
}

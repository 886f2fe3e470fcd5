use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::services::aggregation::{
    AggregationError, DateRange, Field, HierarchyResolver, MetricsStore, Sample,
};

const POWER_SAMPLES_SQL: &str = r#"
    SELECT power AS value, ts
    FROM metrics
    WHERE inverter_id = $1
      AND ts BETWEEN $2 AND $3
      AND power IS NOT NULL
    ORDER BY ts ASC
"#;

const TEMPERATURE_SAMPLES_SQL: &str = r#"
    SELECT temperature AS value, ts
    FROM metrics
    WHERE inverter_id = $1
      AND ts BETWEEN $2 AND $3
      AND temperature IS NOT NULL
    ORDER BY ts ASC
"#;

#[derive(sqlx::FromRow)]
struct SampleRow {
    value: f64,
    ts: DateTime<Utc>,
}

/// Postgres-backed metrics store and plant hierarchy.
#[derive(Clone)]
pub struct PgMetricsStore {
    db: PgPool,
}

impl PgMetricsStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn samples_sql(field: Field) -> &'static str {
    match field {
        Field::Power => POWER_SAMPLES_SQL,
        Field::Temperature => TEMPERATURE_SAMPLES_SQL,
    }
}

impl MetricsStore for PgMetricsStore {
    async fn inverter_exists(&self, inverter_id: i32) -> Result<bool, AggregationError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM inverters WHERE id = $1)")
                .bind(inverter_id)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    async fn fetch_samples(
        &self,
        inverter_id: i32,
        field: Field,
        range: DateRange,
    ) -> Result<Vec<Sample>, AggregationError> {
        let rows: Vec<SampleRow> = sqlx::query_as(samples_sql(field))
            .bind(inverter_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.db)
            .await?;

        tracing::debug!(
            inverter_id,
            field = field.column(),
            rows = rows.len(),
            "fetched samples"
        );

        Ok(rows
            .into_iter()
            .map(|row| Sample::new(row.value, row.ts))
            .collect())
    }
}

impl HierarchyResolver for PgMetricsStore {
    async fn inverter_ids_of(&self, plant_id: i32) -> Result<Vec<i32>, AggregationError> {
        let plant: Option<i32> = sqlx::query_scalar("SELECT id FROM plants WHERE id = $1")
            .bind(plant_id)
            .fetch_optional(&self.db)
            .await?;
        if plant.is_none() {
            return Err(AggregationError::plant_not_found(plant_id));
        }

        let ids: Vec<i32> =
            sqlx::query_scalar("SELECT id FROM inverters WHERE plant_id = $1 ORDER BY id ASC")
                .bind(plant_id)
                .fetch_all(&self.db)
                .await?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregation::AggregationService;
    use chrono::{Duration, TimeZone};
    use sqlx::postgres::PgPoolOptions;
    use std::env;

    #[test]
    fn field_queries_filter_on_their_own_column() {
        assert!(samples_sql(Field::Power).contains("power IS NOT NULL"));
        assert!(samples_sql(Field::Temperature).contains("temperature IS NOT NULL"));
    }

    #[tokio::test]
    async fn postgres_round_trip_matches_in_memory_results() -> anyhow::Result<()> {
        if env::var("PV_INTEGRATION_TEST").ok().as_deref() != Some("1") {
            return Ok(());
        }
        let database_url = match env::var("PV_TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => return Ok(()),
        };

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await?;
        crate::migrations::apply_migrations(&pool, std::path::Path::new("migrations")).await?;

        let plant_id: i32 =
            sqlx::query_scalar("INSERT INTO plants (name) VALUES ('Round Trip') RETURNING id")
                .fetch_one(&pool)
                .await?;
        let inverter_id: i32 = sqlx::query_scalar(
            "INSERT INTO inverters (name, plant_id) VALUES ('RT-1', $1) RETURNING id",
        )
        .bind(plant_id)
        .fetch_one(&pool)
        .await?;

        let t0 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        for (offset, power, temperature) in [(0, Some(100.0), Some(20.0)), (1, Some(200.0), None)] {
            sqlx::query(
                "INSERT INTO metrics (ts, power, temperature, inverter_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(t0 + Duration::hours(offset))
            .bind(power)
            .bind(temperature)
            .bind(inverter_id)
            .execute(&pool)
            .await?;
        }

        let service = AggregationService::new(PgMetricsStore::new(pool.clone()));
        let range = DateRange::new(t0, t0 + Duration::hours(2));
        let total = service.total_generation_for_plant(plant_id, range).await?;
        assert_eq!(total.total_generation, 150.0);

        let avg = service.avg_temperature_per_day(inverter_id, range).await?;
        assert_eq!(avg.get("2023-01-01"), Some(&20.0));

        sqlx::query("DELETE FROM plants WHERE id = $1")
            .bind(plant_id)
            .execute(&pool)
            .await?;
        Ok(())
    }
}

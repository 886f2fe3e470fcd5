use anyhow::{bail, Context, Result};
use sqlx::PgPool;
use std::fs;
use std::path::{Path, PathBuf};

/// Applies every `*.sql` file under `migrations_root` in file-name order, one transaction
/// per file. Migrations are written to be re-runnable.
pub async fn apply_migrations(pool: &PgPool, migrations_root: &Path) -> Result<()> {
    let migrations = list_migrations(migrations_root)?;
    if migrations.is_empty() {
        return Ok(());
    }

    for migration in migrations {
        let sql = fs::read_to_string(&migration)
            .with_context(|| format!("Failed to read migration {}", migration.display()))?;
        if sql.trim().is_empty() {
            continue;
        }

        let mut transaction = pool
            .begin()
            .await
            .with_context(|| format!("Failed to start transaction for {}", migration.display()))?;
        sqlx::raw_sql(&sql)
            .execute(&mut *transaction)
            .await
            .with_context(|| format!("Migration failed: {}", migration.display()))?;
        transaction.commit().await.with_context(|| {
            format!(
                "Failed to commit migration transaction for {}",
                migration.display()
            )
        })?;
        tracing::info!(migration = %migration.display(), "applied migration");
    }

    Ok(())
}

fn list_migrations(migrations_root: &Path) -> Result<Vec<PathBuf>> {
    if !migrations_root.exists() {
        bail!(
            "Migrations directory missing at {}",
            migrations_root.display()
        );
    }

    let mut migrations: Vec<PathBuf> = fs::read_dir(migrations_root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|v| v.to_str()) == Some("sql"))
        .collect();
    migrations.sort();
    Ok(migrations)
}

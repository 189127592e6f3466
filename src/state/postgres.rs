//! Postgres-backed plan store
//!
//! One row per user, upserted on save. The table is created lazily on first use.

use crate::error::PlannerError;
use crate::state::{PlanStore, StoredPlan};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

pub struct PostgresPlanStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresPlanStore {
    /// Lazy pool: no connection is made until the first query
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| PlannerError::DatabaseError(format!("Invalid DATABASE_URL: {}", e)))?;

        info!("Postgres plan store configured");

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS financial_plans (
                      user_id UUID PRIMARY KEY,
                      data TEXT NOT NULL,
                      input_text TEXT NOT NULL,
                      last_update_prompt TEXT,
                      content_hash TEXT NOT NULL,
                      saved_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                PlannerError::DatabaseError(format!(
                    "Failed to initialize plan schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl PlanStore for PostgresPlanStore {
    async fn save(&self, plan: &StoredPlan) -> Result<()> {
        self.ensure_schema().await?;

        let data = serde_json::to_string(&plan.data)?;

        sqlx::query(
            r#"
            INSERT INTO financial_plans
              (user_id, data, input_text, last_update_prompt, content_hash, saved_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
              data = EXCLUDED.data,
              input_text = EXCLUDED.input_text,
              last_update_prompt = EXCLUDED.last_update_prompt,
              content_hash = EXCLUDED.content_hash,
              saved_at = EXCLUDED.saved_at
            "#,
        )
        .bind(plan.user_id)
        .bind(data)
        .bind(&plan.input_text)
        .bind(&plan.last_update_prompt)
        .bind(&plan.content_hash)
        .bind(plan.saved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PlannerError::DatabaseError(format!("Failed to save plan: {}", e)))?;

        Ok(())
    }

    async fn load(&self, user_id: Uuid) -> Result<Option<StoredPlan>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT data, input_text, last_update_prompt, content_hash, saved_at
            FROM financial_plans
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PlannerError::DatabaseError(format!("Failed to load plan: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let data: String = row
            .try_get("data")
            .map_err(|e| PlannerError::DatabaseError(e.to_string()))?;
        let saved_at: DateTime<Utc> = row.try_get("saved_at").unwrap_or_else(|_| Utc::now());

        Ok(Some(StoredPlan {
            user_id,
            data: serde_json::from_str(&data)?,
            input_text: row.try_get("input_text").unwrap_or_default(),
            last_update_prompt: row.try_get("last_update_prompt").ok().flatten(),
            content_hash: row.try_get("content_hash").unwrap_or_default(),
            saved_at,
        }))
    }
}

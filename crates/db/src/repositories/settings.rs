use std::str::FromStr;

use chrono::Utc;
use sqlx::Row;

use storeops_core::domain::approval::{ApprovalModule, ApprovalRequestType, ApprovalSetting};

use super::{parse_timestamp, RepositoryError, SettingsRepository};
use crate::DbPool;

pub struct SqlSettingsRepository {
    pool: DbPool,
}

impl SqlSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_setting(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalSetting, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let module_str: String =
        row.try_get("module").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_type_str: String =
        row.try_get("action_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_enabled: bool =
        row.try_get("is_enabled").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_by: i64 =
        row.try_get("updated_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalSetting {
        id,
        module: ApprovalModule::from_str(&module_str)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        action_type: ApprovalRequestType::from_str(&action_type_str)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        is_enabled,
        updated_by,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl SettingsRepository for SqlSettingsRepository {
    async fn get(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
    ) -> Result<Option<ApprovalSetting>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, module, action_type, is_enabled, updated_by, updated_at
             FROM approval_settings WHERE module = ? AND action_type = ?",
        )
        .bind(module.as_str())
        .bind(action_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_setting(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
        is_enabled: bool,
        updated_by: i64,
    ) -> Result<ApprovalSetting, RepositoryError> {
        let updated_at = Utc::now();
        sqlx::query(
            "INSERT INTO approval_settings (module, action_type, is_enabled, updated_by, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (module, action_type)
             DO UPDATE SET is_enabled = excluded.is_enabled,
                           updated_by = excluded.updated_by,
                           updated_at = excluded.updated_at",
        )
        .bind(module.as_str())
        .bind(action_type.as_str())
        .bind(is_enabled)
        .bind(updated_by)
        .bind(updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        match self.get(module, action_type).await? {
            Some(setting) => Ok(setting),
            None => Err(RepositoryError::Decode(format!(
                "setting {}/{} missing after upsert",
                module.as_str(),
                action_type.as_str()
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<ApprovalSetting>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, module, action_type, is_enabled, updated_by, updated_at
             FROM approval_settings ORDER BY module, action_type",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_setting).collect()
    }
}

#[cfg(test)]
mod tests {
    use storeops_core::domain::approval::{ApprovalModule, ApprovalRequestType};

    use super::SqlSettingsRepository;
    use crate::repositories::SettingsRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlSettingsRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlSettingsRepository::new(pool)
    }

    #[tokio::test]
    async fn missing_setting_reads_as_none() {
        let repo = setup().await;
        let setting = repo
            .get(ApprovalModule::Hr, ApprovalRequestType::Shift)
            .await
            .expect("get");
        assert!(setting.is_none());
    }

    #[tokio::test]
    async fn upsert_creates_then_flips_in_place() {
        let repo = setup().await;

        let created = repo
            .upsert(ApprovalModule::Hr, ApprovalRequestType::Salary, true, 9)
            .await
            .expect("create");
        assert!(created.is_enabled);
        assert_eq!(created.updated_by, 9);

        let flipped = repo
            .upsert(ApprovalModule::Hr, ApprovalRequestType::Salary, false, 12)
            .await
            .expect("update");
        assert_eq!(flipped.id, created.id);
        assert!(!flipped.is_enabled);
        assert_eq!(flipped.updated_by, 12);

        let listed = repo.list().await.expect("list");
        assert_eq!(listed.len(), 1);
    }
}

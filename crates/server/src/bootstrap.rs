use std::sync::Arc;

use storeops_core::config::{AppConfig, ConfigError, LoadOptions};
use storeops_db::repositories::{
    SqlEmployeeRepository, SqlMemberRepository, SqlOffdayRepository, SqlRequestRepository,
    SqlSalaryRepository, SqlSettingsRepository, SqlShiftRepository,
};
use storeops_db::{connect_with_settings, migrations, DbPool};
use storeops_notify::{NoopNotifier, Notifier, NotifyError, WhatsAppGateway};
use thiserror::Error;
use tracing::info;

use crate::executor::standard_registry;
use crate::hr::HrState;
use crate::workflow::ApprovalWorkflow;
use crate::workforce::{OffdayService, SalaryService, ShiftService};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<ApprovalWorkflow>,
    pub hr_state: HrState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notifier gateway could not be constructed: {0}")]
    Notifier(#[source] NotifyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let employees = Arc::new(SqlEmployeeRepository::new(db_pool.clone()));
    let shifts = Arc::new(SqlShiftRepository::new(db_pool.clone()));
    let salaries = Arc::new(SqlSalaryRepository::new(db_pool.clone()));
    let offdays = Arc::new(SqlOffdayRepository::new(db_pool.clone()));
    let settings = Arc::new(SqlSettingsRepository::new(db_pool.clone()));
    let members = Arc::new(SqlMemberRepository::new(db_pool.clone()));
    let requests = Arc::new(SqlRequestRepository::new(db_pool.clone()));

    let shift_service = Arc::new(ShiftService::new(employees.clone(), shifts.clone()));
    let salary_service =
        Arc::new(SalaryService::new(employees.clone(), shifts, salaries));
    let offday_service = Arc::new(OffdayService::new(employees.clone(), offdays));

    let notifier: Arc<dyn Notifier> = if config.notifier.enabled {
        Arc::new(WhatsAppGateway::from_config(&config.notifier).map_err(BootstrapError::Notifier)?)
    } else {
        Arc::new(NoopNotifier)
    };
    info!(
        event_name = "system.bootstrap.notifier_initialized",
        correlation_id = "bootstrap",
        notifier_mode = if config.notifier.enabled { "whatsapp" } else { "noop" },
        "reviewer notifier initialized"
    );

    let executor = Arc::new(standard_registry(
        shift_service.clone(),
        salary_service.clone(),
        offday_service.clone(),
    ));
    let workflow = Arc::new(ApprovalWorkflow::new(
        settings,
        members,
        requests,
        employees,
        notifier,
        executor,
    ));

    let hr_state = HrState {
        workflow: workflow.clone(),
        shifts: shift_service,
        salaries: salary_service,
        offdays: offday_service,
    };

    Ok(Application { config, db_pool, workflow, hr_state })
}

#[cfg(test)]
mod tests {
    use storeops_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_notifier_configuration() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                notifier_enabled: Some(true),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("notifier.sender_mobile"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_the_workflow() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN \
             ('employees', 'user_shifts', 'salaries', 'offdays', \
              'approval_settings', 'approval_members', 'approval_requests', 'approval_responses')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected workflow tables to be available after bootstrap");
        assert_eq!(table_count, 8, "bootstrap should expose the approval and workforce tables");

        assert!(!app.config.notifier.enabled, "notifier should default to disabled");

        app.db_pool.close().await;
    }
}

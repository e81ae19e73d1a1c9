use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Deterministic demo seeds and their verification contract.
const SEED_SCENARIOS: &[SeedScenario] = &[
    SeedScenario {
        name: "workforce",
        description: "Four employees, two shift types, one active assignment, a June off plan",
    },
    SeedScenario {
        name: "approval-panel",
        description: "HR approvals on for SHIFT and SALARY with a two-member panel",
    },
    SeedScenario {
        name: "pending-request",
        description: "One SHIFT request awaiting both panel verdicts",
    },
];

const SEED_EMPLOYEE_IDS: &[i64] = &[9001, 9002, 9003, 9004];
const SEED_SHIFT_TYPE_IDS: &[i64] = &[9101, 9102];
const SEED_SETTING_IDS: &[i64] = &[9201, 9202, 9203];
const SEED_MEMBER_IDS: &[i64] = &[9251, 9252];
const SEED_USER_SHIFT_IDS: &[i64] = &[9301];
const SEED_OFFDAY_IDS: &[i64] = &[9351, 9352];
const SEED_REQUEST_IDS: &[i64] = &[9401];

const SEED_SETTINGS: &[SeedSettingContract] = &[
    SeedSettingContract { module: "HR", action_type: "SHIFT", is_enabled: true },
    SeedSettingContract { module: "HR", action_type: "SALARY", is_enabled: true },
    SeedSettingContract { module: "HR", action_type: "DAYOFF", is_enabled: false },
];

const SEED_MEMBERS: &[SeedMemberContract] = &[
    SeedMemberContract { member_id: 9251, employee_id: 9002, action_types: &["SALARY", "SHIFT"] },
    SeedMemberContract { member_id: 9252, employee_id: 9003, action_types: &["SHIFT"] },
];

const SEED_PENDING_REQUEST_ID: i64 = 9401;

/// Demo dataset for local development, the `seed` command and runtime smoke
/// checks.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Load the demo dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let scenarios_seeded = SEED_SCENARIOS
            .iter()
            .map(|scenario| ScenarioSeedInfo {
                name: scenario.name,
                description: scenario.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { scenarios_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_employees = sql_array_from_ids(SEED_EMPLOYEE_IDS);
        let employee_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM employees WHERE id IN {quoted_employees} AND is_active = 1"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("employees", employee_count == SEED_EMPLOYEE_IDS.len() as i64));

        let quoted_shift_types = sql_array_from_ids(SEED_SHIFT_TYPE_IDS);
        let shift_type_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM shift_types WHERE id IN {quoted_shift_types}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("shift-types", shift_type_count == SEED_SHIFT_TYPE_IDS.len() as i64));

        let active_assignment: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_shifts WHERE id = ?1 AND is_active = 1)",
        )
        .bind(SEED_USER_SHIFT_IDS[0])
        .fetch_one(pool)
        .await?;
        checks.push(("active-assignment", active_assignment == 1));

        let quoted_offdays = sql_array_from_ids(SEED_OFFDAY_IDS);
        let offday_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM offdays WHERE id IN {quoted_offdays}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("offdays", offday_count == SEED_OFFDAY_IDS.len() as i64));

        for setting in SEED_SETTINGS {
            let setting_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approval_settings
                 WHERE module = ?1 AND action_type = ?2 AND is_enabled = ?3)",
            )
            .bind(setting.module)
            .bind(setting.action_type)
            .bind(setting.is_enabled)
            .fetch_one(pool)
            .await?;
            checks.push((setting.label(), setting_ok == 1));
        }

        for member in SEED_MEMBERS {
            let member_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approval_members
                 WHERE id = ?1 AND employee_id = ?2 AND module = 'HR' AND is_active = 1)",
            )
            .bind(member.member_id)
            .bind(member.employee_id)
            .fetch_one(pool)
            .await?;
            checks.push((member.label(), member_ok == 1));

            checks.push((member.actions_label(), Self::verify_member_actions(pool, member).await?));
        }

        let request_pending: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM approval_requests
             WHERE id = ?1 AND status = 'PENDING'
               AND reference_id IS NULL AND reference_count IS NULL)",
        )
        .bind(SEED_PENDING_REQUEST_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("pending-request", request_pending == 1));

        let open_responses: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM approval_responses
             WHERE request_id = ?1 AND status = 'PENDING'",
        )
        .bind(SEED_PENDING_REQUEST_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("pending-responses", open_responses == SEED_MEMBER_IDS.len() as i64));

        let snapshot_ok: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM approval_responses p
             JOIN approval_members m ON m.id = p.member_id
             WHERE p.request_id = ?1 AND p.member_employee_id = m.employee_id",
        )
        .bind(SEED_PENDING_REQUEST_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("response-snapshot", snapshot_ok == SEED_MEMBER_IDS.len() as i64));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    async fn verify_member_actions(
        pool: &DbPool,
        member: &SeedMemberContract,
    ) -> Result<bool, RepositoryError> {
        let actions: Vec<String> = sqlx::query_scalar(
            "SELECT action_type FROM approval_member_actions
             WHERE member_id = ? ORDER BY action_type",
        )
        .bind(member.member_id)
        .fetch_all(pool)
        .await?;

        Ok(actions.len() == member.action_types.len()
            && actions.iter().zip(member.action_types).all(|(a, b)| a == b))
    }

    /// Clean up seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_requests = sql_array_from_ids(SEED_REQUEST_IDS);
        let quoted_members = sql_array_from_ids(SEED_MEMBER_IDS);
        let quoted_settings = sql_array_from_ids(SEED_SETTING_IDS);
        let quoted_offdays = sql_array_from_ids(SEED_OFFDAY_IDS);
        let quoted_user_shifts = sql_array_from_ids(SEED_USER_SHIFT_IDS);
        let quoted_shift_types = sql_array_from_ids(SEED_SHIFT_TYPE_IDS);
        let quoted_employees = sql_array_from_ids(SEED_EMPLOYEE_IDS);

        sqlx::query(&format!(
            "DELETE FROM approval_responses WHERE request_id IN {quoted_requests}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM approval_requests WHERE id IN {quoted_requests}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM approval_member_actions WHERE member_id IN {quoted_members}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM approval_members WHERE id IN {quoted_members}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM approval_settings WHERE id IN {quoted_settings}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM offdays WHERE id IN {quoted_offdays}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM user_shifts WHERE id IN {quoted_user_shifts}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM shift_types WHERE id IN {quoted_shift_types}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM employees WHERE id IN {quoted_employees}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedScenario {
    name: &'static str,
    description: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedSettingContract {
    module: &'static str,
    action_type: &'static str,
    is_enabled: bool,
}

impl SeedSettingContract {
    fn label(&self) -> &'static str {
        match self.action_type {
            "SHIFT" => "setting-hr-shift",
            "SALARY" => "setting-hr-salary",
            _ => "setting-hr-dayoff",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedMemberContract {
    member_id: i64,
    employee_id: i64,
    action_types: &'static [&'static str],
}

impl SeedMemberContract {
    fn label(&self) -> &'static str {
        match self.member_id {
            9251 => "member-9251",
            _ => "member-9252",
        }
    }

    fn actions_label(&self) -> &'static str {
        match self.member_id {
            9251 => "member-9251-actions",
            _ => "member-9252-actions",
        }
    }
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub scenarios_seeded: Vec<ScenarioSeedInfo>,
}

#[derive(Debug)]
pub struct ScenarioSeedInfo {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

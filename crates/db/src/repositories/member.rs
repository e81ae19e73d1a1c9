use std::str::FromStr;

use chrono::Utc;
use sqlx::{QueryBuilder, Row};

use storeops_core::domain::approval::{
    ApprovalMember, ApprovalModule, ApprovalRequestType, MemberId,
};
use storeops_core::domain::employee::EmployeeId;

use super::{parse_timestamp, MemberFilter, MemberRepository, NewApprovalMember,
    PageRequest, Paginated, RepositoryError};
use crate::DbPool;

pub struct SqlMemberRepository {
    pool: DbPool,
}

impl SqlMemberRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_action_types(
        &self,
        member_id: i64,
    ) -> Result<Vec<ApprovalRequestType>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT action_type FROM approval_member_actions
             WHERE member_id = ? ORDER BY action_type",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let action: String = row
                    .try_get("action_type")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                ApprovalRequestType::from_str(&action)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn hydrate(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<ApprovalMember, RepositoryError> {
        let mut member = row_to_member(row)?;
        member.action_types = self.load_action_types(member.id.0).await?;
        Ok(member)
    }
}

fn row_to_member(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalMember, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: i64 =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let module_str: String =
        row.try_get("module").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let added_by: i64 =
        row.try_get("added_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalMember {
        id: MemberId(id),
        employee_id: EmployeeId(employee_id),
        module: ApprovalModule::from_str(&module_str)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        action_types: Vec::new(),
        is_active,
        added_by,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

const MEMBER_COLUMNS: &str = "id, employee_id, module, is_active, added_by, created_at";

#[async_trait::async_trait]
impl MemberRepository for SqlMemberRepository {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<ApprovalMember>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {MEMBER_COLUMNS} FROM approval_members WHERE id = ?"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(self.hydrate(r).await?)),
            None => Ok(None),
        }
    }

    async fn find_active(
        &self,
        employee_id: EmployeeId,
        module: ApprovalModule,
    ) -> Result<Option<ApprovalMember>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM approval_members
             WHERE employee_id = ? AND module = ? AND is_active = 1"
        ))
        .bind(employee_id.0)
        .bind(module.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(self.hydrate(r).await?)),
            None => Ok(None),
        }
    }

    async fn list_eligible(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
    ) -> Result<Vec<ApprovalMember>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM approval_members m
             WHERE m.module = ? AND m.is_active = 1
               AND EXISTS (SELECT 1 FROM approval_member_actions a
                           WHERE a.member_id = m.id AND a.action_type = ?)
             ORDER BY m.created_at, m.id"
        ))
        .bind(module.as_str())
        .bind(action_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            members.push(self.hydrate(row).await?);
        }
        Ok(members)
    }

    async fn insert(&self, member: NewApprovalMember) -> Result<ApprovalMember, RepositoryError> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO approval_members (employee_id, module, is_active, added_by, created_at)
             VALUES (?, ?, 1, ?, ?)",
        )
        .bind(member.employee_id.0)
        .bind(member.module.as_str())
        .bind(member.added_by)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let member_id = result.last_insert_rowid();
        for action_type in &member.action_types {
            sqlx::query(
                "INSERT OR IGNORE INTO approval_member_actions (member_id, action_type)
                 VALUES (?, ?)",
            )
            .bind(member_id)
            .bind(action_type.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        match self.find_by_id(MemberId(member_id)).await? {
            Some(stored) => Ok(stored),
            None => Err(RepositoryError::Decode(format!(
                "member {member_id} missing after insert"
            ))),
        }
    }

    async fn add_action_types(
        &self,
        id: MemberId,
        action_types: &[ApprovalRequestType],
    ) -> Result<ApprovalMember, RepositoryError> {
        // All or nothing; a partial union must not become visible.
        let mut tx = self.pool.begin().await?;
        for action_type in action_types {
            sqlx::query(
                "INSERT OR IGNORE INTO approval_member_actions (member_id, action_type)
                 VALUES (?, ?)",
            )
            .bind(id.0)
            .bind(action_type.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        match self.find_by_id(id).await? {
            Some(stored) => Ok(stored),
            None => Err(RepositoryError::Decode(format!("member {} not found", id.0))),
        }
    }

    async fn delete(&self, id: MemberId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM approval_members WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        page: PageRequest,
        filter: MemberFilter,
    ) -> Result<Paginated<ApprovalMember>, RepositoryError> {
        let mut count_builder =
            QueryBuilder::new("SELECT COUNT(*) FROM approval_members m");
        count_builder.push(" WHERE 1=1");
        push_member_filters(&mut count_builder, &filter);
        let count: i64 = count_builder.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query_builder = QueryBuilder::new(format!(
            "SELECT {MEMBER_COLUMNS} FROM approval_members m"
        ));
        query_builder.push(" WHERE 1=1");
        push_member_filters(&mut query_builder, &filter);
        query_builder.push(" ORDER BY m.created_at, m.id");
        query_builder.push(" LIMIT ");
        query_builder.push_bind(page.limit());
        query_builder.push(" OFFSET ");
        query_builder.push_bind(page.offset());

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            members.push(self.hydrate(row).await?);
        }

        Ok(Paginated::new(page, count, members))
    }

    async fn list_all_active(&self) -> Result<Vec<ApprovalMember>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM approval_members
             WHERE is_active = 1 ORDER BY module, created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            members.push(self.hydrate(row).await?);
        }
        Ok(members)
    }
}

fn push_member_filters(
    builder: &mut QueryBuilder<'_, sqlx::Sqlite>,
    filter: &MemberFilter,
) {
    if let Some(module) = filter.module {
        builder.push(" AND m.module = ");
        builder.push_bind(module.as_str());
    }
    if let Some(is_active) = filter.is_active {
        builder.push(" AND m.is_active = ");
        builder.push_bind(is_active);
    }
    if let Some(action_type) = filter.action_type {
        builder.push(
            " AND EXISTS (SELECT 1 FROM approval_member_actions a
                          WHERE a.member_id = m.id AND a.action_type = ",
        );
        builder.push_bind(action_type.as_str());
        builder.push(")");
    }
}

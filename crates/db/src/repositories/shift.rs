use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use storeops_core::domain::employee::EmployeeId;
use storeops_core::domain::shift::{ShiftType, ShiftTypeId, UserShift, UserShiftId};

use super::{parse_timestamp, NewShiftType, NewUserShift, RepositoryError, ShiftRepository};
use crate::DbPool;

pub struct SqlShiftRepository {
    pool: DbPool,
}

impl SqlShiftRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("invalid date `{value}` for {field}: {e}")))
}

fn parse_minute(field: &str, value: i64) -> Result<u16, RepositoryError> {
    u16::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("minute `{value}` for {field} exceeds u16")))
}

fn row_to_shift_type(row: &sqlx::sqlite::SqliteRow) -> Result<ShiftType, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let start_minute: i64 =
        row.try_get("start_minute").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let end_minute: i64 =
        row.try_get("end_minute").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ShiftType {
        id: ShiftTypeId(id),
        name,
        start_minute: parse_minute("start_minute", start_minute)?,
        end_minute: parse_minute("end_minute", end_minute)?,
        is_active,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_user_shift(row: &sqlx::sqlite::SqliteRow) -> Result<UserShift, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: i64 =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let shift_type_id: i64 =
        row.try_get("shift_type_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_date_str: String =
        row.try_get("effective_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let end_date_str: Option<String> =
        row.try_get("end_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let deduction_text: Option<String> =
        row.try_get("deduction_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let end_date = match end_date_str {
        Some(value) => Some(parse_date("end_date", &value)?),
        None => None,
    };
    let deduction_amount = match deduction_text {
        Some(value) => Some(Decimal::from_str(&value).map_err(|e| {
            RepositoryError::Decode(format!("invalid decimal `{value}` for deduction_amount: {e}"))
        })?),
        None => None,
    };

    Ok(UserShift {
        id: UserShiftId(id),
        employee_id: EmployeeId(employee_id),
        shift_type_id: ShiftTypeId(shift_type_id),
        effective_date: parse_date("effective_date", &effective_date_str)?,
        end_date,
        deduction_amount,
        is_active,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

const USER_SHIFT_COLUMNS: &str = "id, employee_id, shift_type_id, effective_date, end_date,
        CAST(deduction_amount AS TEXT) AS deduction_text, is_active, created_at";

#[async_trait::async_trait]
impl ShiftRepository for SqlShiftRepository {
    async fn find_shift_type(
        &self,
        id: ShiftTypeId,
    ) -> Result<Option<ShiftType>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, start_minute, end_minute, is_active, created_at
             FROM shift_types WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_shift_type(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_shift_type(
        &self,
        shift_type: NewShiftType,
    ) -> Result<ShiftType, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO shift_types (name, start_minute, end_minute, is_active, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(&shift_type.name)
        .bind(i64::from(shift_type.start_minute))
        .bind(i64::from(shift_type.end_minute))
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ShiftType {
            id: ShiftTypeId(result.last_insert_rowid()),
            name: shift_type.name,
            start_minute: shift_type.start_minute,
            end_minute: shift_type.end_minute,
            is_active: true,
            created_at,
        })
    }

    async fn find_user_shift(
        &self,
        id: UserShiftId,
    ) -> Result<Option<UserShift>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {USER_SHIFT_COLUMNS} FROM user_shifts WHERE id = ?"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user_shift(r)?)),
            None => Ok(None),
        }
    }

    async fn find_active_assignment(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Option<UserShift>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_SHIFT_COLUMNS} FROM user_shifts
             WHERE employee_id = ? AND is_active = 1
             ORDER BY effective_date DESC, id DESC
             LIMIT 1"
        ))
        .bind(employee_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user_shift(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_user_shift(
        &self,
        assignment: NewUserShift,
    ) -> Result<UserShift, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO user_shifts (employee_id, shift_type_id, effective_date, end_date,
                                      deduction_amount, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(assignment.employee_id.0)
        .bind(assignment.shift_type_id.0)
        .bind(assignment.effective_date.format("%Y-%m-%d").to_string())
        .bind(assignment.end_date.map(|date| date.format("%Y-%m-%d").to_string()))
        .bind(assignment.deduction_amount.map(|amount| amount.to_string()))
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(UserShift {
            id: UserShiftId(result.last_insert_rowid()),
            employee_id: assignment.employee_id,
            shift_type_id: assignment.shift_type_id,
            effective_date: assignment.effective_date,
            end_date: assignment.end_date,
            deduction_amount: assignment.deduction_amount,
            is_active: true,
            created_at,
        })
    }

    async fn update_user_shift(&self, assignment: UserShift) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE user_shifts
             SET shift_type_id = ?, effective_date = ?, end_date = ?,
                 deduction_amount = ?, is_active = ?
             WHERE id = ?",
        )
        .bind(assignment.shift_type_id.0)
        .bind(assignment.effective_date.format("%Y-%m-%d").to_string())
        .bind(assignment.end_date.map(|date| date.format("%Y-%m-%d").to_string()))
        .bind(assignment.deduction_amount.map(|amount| amount.to_string()))
        .bind(assignment.is_active)
        .bind(assignment.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

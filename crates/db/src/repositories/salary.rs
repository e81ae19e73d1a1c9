use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use storeops_core::domain::employee::EmployeeId;
use storeops_core::domain::salary::{Salary, SalaryId};

use super::{parse_timestamp, NewSalary, RepositoryError, SalaryRepository};
use crate::DbPool;

pub struct SqlSalaryRepository {
    pool: DbPool,
}

impl SqlSalaryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("invalid date `{value}` for {field}: {e}")))
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|e| RepositoryError::Decode(format!("invalid decimal `{value}` for {field}: {e}")))
}

fn row_to_salary(row: &sqlx::sqlite::SqliteRow) -> Result<Salary, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: i64 =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let salary_month_str: String =
        row.try_get("salary_month").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let gross_text: String =
        row.try_get("gross_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let deductions_text: String =
        row.try_get("deductions_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let net_text: String =
        row.try_get("net_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let generated_by: i64 =
        row.try_get("generated_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let generated_at_str: String =
        row.try_get("generated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Salary {
        id: SalaryId(id),
        employee_id: EmployeeId(employee_id),
        salary_month: parse_date("salary_month", &salary_month_str)?,
        gross_amount: parse_decimal("gross_amount", &gross_text)?,
        total_deductions: parse_decimal("total_deductions", &deductions_text)?,
        net_amount: parse_decimal("net_amount", &net_text)?,
        generated_by,
        generated_at: parse_timestamp(&generated_at_str)?,
    })
}

#[async_trait::async_trait]
impl SalaryRepository for SqlSalaryRepository {
    async fn find_by_employee_month(
        &self,
        employee_id: EmployeeId,
        salary_month: NaiveDate,
    ) -> Result<Option<Salary>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, employee_id, salary_month,
                    CAST(gross_amount AS TEXT) AS gross_text,
                    CAST(total_deductions AS TEXT) AS deductions_text,
                    CAST(net_amount AS TEXT) AS net_text,
                    generated_by, generated_at
             FROM salaries WHERE employee_id = ? AND salary_month = ?",
        )
        .bind(employee_id.0)
        .bind(salary_month.format("%Y-%m-%d").to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_salary(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, salary: NewSalary) -> Result<Salary, RepositoryError> {
        let generated_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO salaries (employee_id, salary_month, gross_amount, total_deductions,
                                   net_amount, generated_by, generated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(salary.employee_id.0)
        .bind(salary.salary_month.format("%Y-%m-%d").to_string())
        .bind(salary.gross_amount.to_string())
        .bind(salary.total_deductions.to_string())
        .bind(salary.net_amount.to_string())
        .bind(salary.generated_by)
        .bind(generated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Salary {
            id: SalaryId(result.last_insert_rowid()),
            employee_id: salary.employee_id,
            salary_month: salary.salary_month,
            gross_amount: salary.gross_amount,
            total_deductions: salary.total_deductions,
            net_amount: salary.net_amount,
            generated_by: salary.generated_by,
            generated_at,
        })
    }
}

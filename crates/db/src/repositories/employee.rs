use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use storeops_core::domain::employee::{Employee, EmployeeId};

use super::{parse_timestamp, EmployeeRepository, NewEmployee, RepositoryError};
use crate::DbPool;

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("invalid date `{value}` for {field}: {e}")))
}

fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> Result<Employee, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let first_name: String =
        row.try_get("first_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_name: String =
        row.try_get("last_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone: String = row.try_get("phone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let monthly_salary_text: String =
        row.try_get("monthly_salary_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let joining_date_str: String =
        row.try_get("joining_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let monthly_salary = Decimal::from_str(&monthly_salary_text).map_err(|e| {
        RepositoryError::Decode(format!("invalid decimal `{monthly_salary_text}`: {e}"))
    })?;

    Ok(Employee {
        id: EmployeeId(id),
        first_name,
        last_name,
        phone,
        monthly_salary,
        joining_date: parse_date("joining_date", &joining_date_str)?,
        is_active,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, phone,
        CAST(monthly_salary AS TEXT) AS monthly_salary_text,
        joining_date, is_active, created_at";

#[async_trait::async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_employee(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO employees (first_name, last_name, phone, monthly_salary,
                                    joining_date, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.phone)
        .bind(employee.monthly_salary.to_string())
        .bind(employee.joining_date.format("%Y-%m-%d").to_string())
        .bind(employee.is_active)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Employee {
            id: EmployeeId(result.last_insert_rowid()),
            first_name: employee.first_name,
            last_name: employee.last_name,
            phone: employee.phone,
            monthly_salary: employee.monthly_salary,
            joining_date: employee.joining_date,
            is_active: employee.is_active,
            created_at,
        })
    }

    async fn list_active(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE is_active = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_employee).collect()
    }
}

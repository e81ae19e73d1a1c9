use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use sqlx::Row;

use storeops_core::domain::employee::EmployeeId;
use storeops_core::domain::offday::{Offday, OffdayId, OffdayType};

use super::{parse_timestamp, NewOffday, OffdayRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOffdayRepository {
    pool: DbPool,
}

impl SqlOffdayRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("invalid date `{value}` for {field}: {e}")))
}

fn row_to_offday(row: &sqlx::sqlite::SqliteRow) -> Result<Offday, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: i64 =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i64 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let month: i64 = row.try_get("month").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let offday_date_str: String =
        row.try_get("offday_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let offday_type_str: String =
        row.try_get("offday_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let month = u32::try_from(month)
        .map_err(|_| RepositoryError::Decode(format!("month `{month}` out of range")))?;

    Ok(Offday {
        id: OffdayId(id),
        employee_id: EmployeeId(employee_id),
        year: year as i32,
        month,
        offday_date: parse_date("offday_date", &offday_date_str)?,
        offday_type: OffdayType::from_str(&offday_type_str)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        description,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

async fn insert_row<'e, E>(
    executor: E,
    offday: NewOffday,
) -> Result<Offday, RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO offdays (employee_id, year, month, offday_date, offday_type,
                              description, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(offday.employee_id.0)
    .bind(i64::from(offday.year))
    .bind(i64::from(offday.month))
    .bind(offday.offday_date.format("%Y-%m-%d").to_string())
    .bind(offday.offday_type.as_str())
    .bind(&offday.description)
    .bind(created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(Offday {
        id: OffdayId(result.last_insert_rowid()),
        employee_id: offday.employee_id,
        year: offday.year,
        month: offday.month,
        offday_date: offday.offday_date,
        offday_type: offday.offday_type,
        description: offday.description,
        created_at,
    })
}

#[async_trait::async_trait]
impl OffdayRepository for SqlOffdayRepository {
    async fn find_by_id(&self, id: OffdayId) -> Result<Option<Offday>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, employee_id, year, month, offday_date, offday_type,
                    description, created_at
             FROM offdays WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_offday(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_employee_date(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<Offday>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, employee_id, year, month, offday_date, offday_type,
                    description, created_at
             FROM offdays WHERE employee_id = ? AND offday_date = ?",
        )
        .bind(employee_id.0)
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_offday(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_month(
        &self,
        employee_id: EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<Vec<Offday>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, year, month, offday_date, offday_type,
                    description, created_at
             FROM offdays
             WHERE employee_id = ? AND year = ? AND month = ?
             ORDER BY offday_date",
        )
        .bind(employee_id.0)
        .bind(i64::from(year))
        .bind(i64::from(month))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_offday).collect()
    }

    async fn insert(&self, offday: NewOffday) -> Result<Offday, RepositoryError> {
        insert_row(&self.pool, offday).await
    }

    async fn update(&self, offday: Offday) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE offdays
             SET year = ?, month = ?, offday_date = ?, offday_type = ?, description = ?
             WHERE id = ?",
        )
        .bind(i64::from(offday.year))
        .bind(i64::from(offday.month))
        .bind(offday.offday_date.format("%Y-%m-%d").to_string())
        .bind(offday.offday_type.as_str())
        .bind(&offday.description)
        .bind(offday.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_month(
        &self,
        employee_id: EmployeeId,
        year: i32,
        month: u32,
        offdays: Vec<NewOffday>,
    ) -> Result<Vec<Offday>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM offdays WHERE employee_id = ? AND year = ? AND month = ?")
            .bind(employee_id.0)
            .bind(i64::from(year))
            .bind(i64::from(month))
            .execute(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(offdays.len());
        for offday in offdays {
            stored.push(insert_row(&mut *tx, offday).await?);
        }

        tx.commit().await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use storeops_core::domain::offday::OffdayType;

    use super::SqlOffdayRepository;
    use crate::repositories::{
        EmployeeRepository, NewEmployee, NewOffday, OffdayRepository, SqlEmployeeRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> (sqlx::SqlitePool, storeops_core::EmployeeId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let employees = SqlEmployeeRepository::new(pool.clone());
        let employee = employees
            .insert(NewEmployee {
                first_name: "Noor".to_string(),
                last_name: "Saleh".to_string(),
                phone: "15550101".to_string(),
                monthly_salary: Decimal::new(2_800_00, 2),
                joining_date: NaiveDate::from_ymd_opt(2023, 11, 1).expect("date"),
                is_active: true,
            })
            .await
            .expect("insert employee");

        (pool, employee.id)
    }

    fn weekend(employee_id: storeops_core::EmployeeId, date: &str) -> NewOffday {
        let offday_date: NaiveDate = date.parse().expect("test date");
        NewOffday {
            employee_id,
            year: 2025,
            month: 6,
            offday_date,
            offday_type: OffdayType::Weekend,
            description: None,
        }
    }

    #[tokio::test]
    async fn insert_and_lookup_by_date() {
        let (pool, employee_id) = setup().await;
        let repo = SqlOffdayRepository::new(pool);

        let stored = repo.insert(weekend(employee_id, "2025-06-06")).await.expect("insert");
        assert_eq!(stored.offday_type, OffdayType::Weekend);

        let found = repo
            .find_by_employee_date(employee_id, "2025-06-06".parse().expect("date"))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(found.id, stored.id);
        assert_eq!(found.month, 6);
    }

    #[tokio::test]
    async fn replace_month_swaps_the_whole_plan() {
        let (pool, employee_id) = setup().await;
        let repo = SqlOffdayRepository::new(pool);

        repo.insert(weekend(employee_id, "2025-06-06")).await.expect("seed first");
        repo.insert(weekend(employee_id, "2025-06-13")).await.expect("seed second");

        let replacement = vec![
            weekend(employee_id, "2025-06-07"),
            weekend(employee_id, "2025-06-14"),
            weekend(employee_id, "2025-06-21"),
        ];
        let stored =
            repo.replace_month(employee_id, 2025, 6, replacement).await.expect("replace");
        assert_eq!(stored.len(), 3);

        let listed = repo.list_for_month(employee_id, 2025, 6).await.expect("list");
        let dates: Vec<String> =
            listed.iter().map(|o| o.offday_date.format("%Y-%m-%d").to_string()).collect();
        assert_eq!(dates, vec!["2025-06-07", "2025-06-14", "2025-06-21"]);
    }

    #[tokio::test]
    async fn duplicate_date_for_same_employee_is_rejected() {
        let (pool, employee_id) = setup().await;
        let repo = SqlOffdayRepository::new(pool);

        repo.insert(weekend(employee_id, "2025-06-06")).await.expect("insert");
        let duplicate = repo.insert(weekend(employee_id, "2025-06-06")).await;
        assert!(duplicate.is_err());
    }
}

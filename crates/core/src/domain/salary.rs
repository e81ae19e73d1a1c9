use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalaryId(pub i64);

/// Generated pay record for one (employee, month). `salary_month` is always
/// the first day of the month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Salary {
    pub id: SalaryId,
    pub employee_id: EmployeeId,
    pub salary_month: NaiveDate,
    pub gross_amount: Decimal,
    pub total_deductions: Decimal,
    pub net_amount: Decimal,
    pub generated_by: i64,
    pub generated_at: DateTime<Utc>,
}

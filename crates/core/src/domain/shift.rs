use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftTypeId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserShiftId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShiftType {
    pub id: ShiftTypeId,
    pub name: String,
    pub start_minute: u16,
    pub end_minute: u16,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A shift assignment. An employee has at most one active assignment at a
/// time; assigning a new shift closes the previous one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserShift {
    pub id: UserShiftId,
    pub employee_id: EmployeeId,
    pub shift_type_id: ShiftTypeId,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub deduction_amount: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

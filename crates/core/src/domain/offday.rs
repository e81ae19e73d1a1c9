use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approval::UnknownEnumValue;
use crate::domain::employee::EmployeeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffdayId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OffdayType {
    Weekend,
    Holiday,
    Leave,
}

impl OffdayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekend => "WEEKEND",
            Self::Holiday => "HOLIDAY",
            Self::Leave => "LEAVE",
        }
    }
}

impl Default for OffdayType {
    fn default() -> Self {
        Self::Weekend
    }
}

impl std::str::FromStr for OffdayType {
    type Err = UnknownEnumValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WEEKEND" => Ok(Self::Weekend),
            "HOLIDAY" => Ok(Self::Holiday),
            "LEAVE" => Ok(Self::Leave),
            other => Err(UnknownEnumValue { kind: "offday type", value: other.to_string() }),
        }
    }
}

/// One non-working day for an employee. `year`/`month` are denormalized from
/// `offday_date` so a month's plan can be listed and replaced as a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offday {
    pub id: OffdayId,
    pub employee_id: EmployeeId,
    pub year: i32,
    pub month: u32,
    pub offday_date: NaiveDate,
    pub offday_type: OffdayType,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

//! Typed request payloads and their stored-JSON boundary.
//!
//! Every approval request carries the data needed to perform its operation
//! once approved. In memory that data is a [`RequestPayload`]; in the database
//! it is a JSON blob whose field names are stable, so blobs written before a
//! deploy keep deserializing after it. The request row's `request_type` column
//! is the discriminator; the blob itself carries no tag. Payload variants that
//! differ in shape (assign vs amend) are told apart by marker fields, the same
//! way the executor historically sniffed the blob.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::datefmt::normalize_dates;
use crate::domain::approval::ApprovalRequestType;
use crate::domain::offday::OffdayType;

/// In-memory form of a request's `request_data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RequestPayload {
    Shift(ShiftPayload),
    Salary(SalaryPayload),
    Dayoff(OffdayPayload),
}

/// Shift work: amend an existing assignment or create a new one. The
/// `user_shift_id` marker picks amend; try it first so the marker wins even
/// when the blob also carries assignment fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShiftPayload {
    Amend(ShiftAmend),
    Assign(ShiftAssign),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShiftAssign {
    pub employee_id: i64,
    pub shift_type_id: i64,
    pub effective_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduction_amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShiftAmend {
    pub user_shift_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_type_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduction_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Salary generation for one employee and one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalaryPayload {
    pub employee_id: i64,
    pub salary_month: NaiveDate,
}

/// Day-off work: a whole month's plan at once, an amendment to one row, or a
/// single new row. Markers in precedence order: `offday_dates` picks bulk,
/// `offday_id` picks amend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffdayPayload {
    Bulk(OffdayBulk),
    Amend(OffdayAmend),
    Create(OffdayCreate),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffdayBulk {
    pub employee_id: i64,
    pub year: i32,
    pub month: u32,
    pub offday_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub offday_type: OffdayType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffdayAmend {
    pub offday_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offday_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offday_type: Option<OffdayType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffdayCreate {
    pub employee_id: i64,
    pub year: i32,
    pub month: u32,
    pub offday_date: NaiveDate,
    #[serde(default)]
    pub offday_type: OffdayType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("request data does not match the {request_type} shape: {source}")]
    Shape {
        request_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{request_type} requests do not carry an executable payload")]
    UnsupportedRequestType { request_type: &'static str },
}

impl RequestPayload {
    pub fn request_type(&self) -> ApprovalRequestType {
        match self {
            Self::Shift(_) => ApprovalRequestType::Shift,
            Self::Salary(_) => ApprovalRequestType::Salary,
            Self::Dayoff(_) => ApprovalRequestType::Dayoff,
        }
    }

    /// Serialize for the `request_data` column. Date leaves come out as
    /// canonical ISO-8601 strings.
    pub fn to_stored(&self) -> Result<Value, PayloadError> {
        let value = match self {
            Self::Shift(inner) => serde_json::to_value(inner),
            Self::Salary(inner) => serde_json::to_value(inner),
            Self::Dayoff(inner) => serde_json::to_value(inner),
        }
        .map_err(|source| PayloadError::Shape { request_type: self.request_type().as_str(), source })?;
        Ok(normalize_dates(value))
    }

    /// Rebuild the typed payload from a stored blob, using `request_type` as
    /// the discriminator. Fails for request types that have no payload shape.
    pub fn from_stored(request_type: ApprovalRequestType, data: Value) -> Result<Self, PayloadError> {
        let data = normalize_dates(data);
        let shape = |source| PayloadError::Shape { request_type: request_type.as_str(), source };
        match request_type {
            ApprovalRequestType::Shift => Ok(Self::Shift(serde_json::from_value(data).map_err(shape)?)),
            ApprovalRequestType::Salary => Ok(Self::Salary(serde_json::from_value(data).map_err(shape)?)),
            ApprovalRequestType::Dayoff => Ok(Self::Dayoff(serde_json::from_value(data).map_err(shape)?)),
            other => Err(PayloadError::UnsupportedRequestType { request_type: other.as_str() }),
        }
    }
}

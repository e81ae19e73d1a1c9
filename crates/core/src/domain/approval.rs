use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approvals::payload::RequestPayload;
use crate::domain::employee::EmployeeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub i64);

/// Business bucket that approval configuration and membership are scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalModule {
    Hr,
    Inventory,
    StockOperation,
    Purchase,
    Logistics,
}

impl ApprovalModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hr => "HR",
            Self::Inventory => "INVENTORY",
            Self::StockOperation => "STOCK_OPERATION",
            Self::Purchase => "PURCHASE",
            Self::Logistics => "LOGISTICS",
        }
    }
}

impl std::str::FromStr for ApprovalModule {
    type Err = UnknownEnumValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HR" => Ok(Self::Hr),
            "INVENTORY" => Ok(Self::Inventory),
            "STOCK_OPERATION" => Ok(Self::StockOperation),
            "PURCHASE" => Ok(Self::Purchase),
            "LOGISTICS" => Ok(Self::Logistics),
            other => Err(UnknownEnumValue { kind: "module", value: other.to_string() }),
        }
    }
}

/// Kind of operation that can be placed behind approval. SHIFT, SALARY and
/// DAYOFF carry executable payloads; the remaining kinds are accepted in
/// settings and member configuration ahead of their executors shipping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalRequestType {
    Shift,
    Salary,
    Dayoff,
    Employee,
    Attendance,
    EmployeeDeduction,
}

impl ApprovalRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shift => "SHIFT",
            Self::Salary => "SALARY",
            Self::Dayoff => "DAYOFF",
            Self::Employee => "EMPLOYEE",
            Self::Attendance => "ATTENDANCE",
            Self::EmployeeDeduction => "EMPLOYEE_DEDUCTION",
        }
    }
}

impl std::str::FromStr for ApprovalRequestType {
    type Err = UnknownEnumValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SHIFT" => Ok(Self::Shift),
            "SALARY" => Ok(Self::Salary),
            "DAYOFF" => Ok(Self::Dayoff),
            "EMPLOYEE" => Ok(Self::Employee),
            "ATTENDANCE" => Ok(Self::Attendance),
            "EMPLOYEE_DEDUCTION" => Ok(Self::EmployeeDeduction),
            other => Err(UnknownEnumValue { kind: "request type", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = UnknownEnumValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(UnknownEnumValue { kind: "status", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Pending,
    Approved,
    Rejected,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for ResponseStatus {
    type Err = UnknownEnumValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(UnknownEnumValue { kind: "response status", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value `{value}`")]
pub struct UnknownEnumValue {
    pub kind: &'static str,
    pub value: String,
}

/// Per (module, action type) toggle. Absence of a row means approval is not
/// required for that operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalSetting {
    pub id: i64,
    pub module: ApprovalModule,
    pub action_type: ApprovalRequestType,
    pub is_enabled: bool,
    pub updated_by: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalMember {
    pub id: MemberId,
    pub employee_id: EmployeeId,
    pub module: ApprovalModule,
    pub action_types: Vec<ApprovalRequestType>,
    pub is_active: bool,
    pub added_by: i64,
    pub created_at: DateTime<Utc>,
}

impl ApprovalMember {
    pub fn can_approve(&self, action_type: ApprovalRequestType) -> bool {
        self.is_active && self.action_types.contains(&action_type)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub request_type: ApprovalRequestType,
    pub employee_id: EmployeeId,
    pub requested_by: i64,
    pub status: ApprovalStatus,
    pub payload: RequestPayload,
    pub remarks: Option<String>,
    pub reference_id: Option<i64>,
    pub reference_count: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub responses: Vec<ApprovalResponse>,
}

impl ApprovalRequest {
    /// True once the auto-executor has stamped a back-reference.
    pub fn is_executed(&self) -> bool {
        self.reference_id.is_some() || self.reference_count.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub id: i64,
    pub request_id: RequestId,
    pub member_id: MemberId,
    pub member_employee_id: EmployeeId,
    pub status: ResponseStatus,
    pub comments: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

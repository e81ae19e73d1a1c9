pub mod approvals;
pub mod config;
pub mod datefmt;
pub mod domain;

pub use approvals::payload::{
    OffdayAmend, OffdayBulk, OffdayCreate, OffdayPayload, PayloadError, RequestPayload,
    SalaryPayload, ShiftAmend, ShiftAssign, ShiftPayload,
};
pub use approvals::{authorize_vote, decide, Decision, ResponseState, VoteAction, VoteError};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use datefmt::normalize_dates;
pub use domain::approval::{
    ApprovalMember, ApprovalModule, ApprovalRequest, ApprovalRequestType, ApprovalResponse,
    ApprovalSetting, ApprovalStatus, MemberId, RequestId, ResponseStatus, UnknownEnumValue,
};
pub use domain::employee::{Employee, EmployeeId};
pub use domain::offday::{Offday, OffdayId, OffdayType};
pub use domain::salary::{Salary, SalaryId};
pub use domain::shift::{ShiftType, ShiftTypeId, UserShift, UserShiftId};

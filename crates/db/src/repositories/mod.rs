use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use storeops_core::approvals::payload::RequestPayload;
use storeops_core::domain::approval::{
    ApprovalMember, ApprovalModule, ApprovalRequest, ApprovalRequestType, ApprovalSetting,
    ApprovalStatus, MemberId, RequestId, ResponseStatus,
};
use storeops_core::domain::employee::{Employee, EmployeeId};
use storeops_core::domain::offday::{Offday, OffdayId, OffdayType};
use storeops_core::domain::salary::Salary;
use storeops_core::domain::shift::{ShiftType, ShiftTypeId, UserShift, UserShiftId};

pub mod employee;
pub mod member;
pub mod memory;
pub mod offday;
pub mod request;
pub mod salary;
pub mod settings;
pub mod shift;

pub use employee::SqlEmployeeRepository;
pub use member::SqlMemberRepository;
pub use memory::{
    InMemoryEmployeeRepository, InMemoryMemberRepository, InMemoryOffdayRepository,
    InMemoryRequestRepository, InMemorySalaryRepository, InMemorySettingsRepository,
    InMemoryShiftRepository,
};
pub use offday::SqlOffdayRepository;
pub use request::SqlRequestRepository;
pub use salary::SqlSalaryRepository;
pub use settings::SqlSettingsRepository;
pub use shift::SqlShiftRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Timestamps are stored as RFC 3339 text; anything else is corrupt data
/// and surfaces as a decode error rather than a substituted value.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("timestamp {value:?} is not RFC 3339: {e}")))
}

pub(crate) fn parse_optional_timestamp(
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.as_deref().map(parse_timestamp).transpose()
}

/// 1-based page cursor. Sizes outside 1..=100 are clamped.
#[derive(Clone, Copy, Debug)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page: page.max(1), page_size: page_size.clamp(1, 100) }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, page_size: 20 }
    }
}

/// One page of results plus the unpaged total.
#[derive(Clone, Debug, Serialize)]
pub struct Paginated<T> {
    pub page_index: u32,
    pub page_size: u32,
    pub count: i64,
    pub data: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(page: PageRequest, count: i64, data: Vec<T>) -> Self {
        Self { page_index: page.page(), page_size: page.page_size(), count, data }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            page_index: self.page_index,
            page_size: self.page_size,
            count: self.count,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RequestFilter {
    pub status: Option<ApprovalStatus>,
    pub request_type: Option<ApprovalRequestType>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MemberFilter {
    pub module: Option<ApprovalModule>,
    pub is_active: Option<bool>,
    pub action_type: Option<ApprovalRequestType>,
}

#[derive(Clone, Debug)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub monthly_salary: Decimal,
    pub joining_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Clone, Debug)]
pub struct NewShiftType {
    pub name: String,
    pub start_minute: u16,
    pub end_minute: u16,
}

#[derive(Clone, Debug)]
pub struct NewUserShift {
    pub employee_id: EmployeeId,
    pub shift_type_id: ShiftTypeId,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub deduction_amount: Option<Decimal>,
}

#[derive(Clone, Debug)]
pub struct NewOffday {
    pub employee_id: EmployeeId,
    pub year: i32,
    pub month: u32,
    pub offday_date: NaiveDate,
    pub offday_type: OffdayType,
    pub description: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewSalary {
    pub employee_id: EmployeeId,
    pub salary_month: NaiveDate,
    pub gross_amount: Decimal,
    pub total_deductions: Decimal,
    pub net_amount: Decimal,
    pub generated_by: i64,
}

#[derive(Clone, Debug)]
pub struct NewApprovalMember {
    pub employee_id: EmployeeId,
    pub module: ApprovalModule,
    pub action_types: Vec<ApprovalRequestType>,
    pub added_by: i64,
}

/// The stored `request_type` column is derived from the payload variant.
#[derive(Clone, Debug)]
pub struct NewApprovalRequest {
    pub employee_id: EmployeeId,
    pub requested_by: i64,
    pub payload: RequestPayload,
    pub remarks: Option<String>,
}

/// Panel seat a new request snapshots into its response rows.
#[derive(Clone, Copy, Debug)]
pub struct PanelSeat {
    pub member_id: MemberId,
    pub employee_id: EmployeeId,
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn insert(&self, employee: NewEmployee) -> Result<Employee, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<Employee>, RepositoryError>;
}

#[async_trait]
pub trait ShiftRepository: Send + Sync {
    async fn find_shift_type(&self, id: ShiftTypeId)
        -> Result<Option<ShiftType>, RepositoryError>;
    async fn insert_shift_type(&self, shift_type: NewShiftType)
        -> Result<ShiftType, RepositoryError>;
    async fn find_user_shift(&self, id: UserShiftId)
        -> Result<Option<UserShift>, RepositoryError>;
    /// The employee's current assignment, if any. At most one is active.
    async fn find_active_assignment(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Option<UserShift>, RepositoryError>;
    async fn insert_user_shift(&self, assignment: NewUserShift)
        -> Result<UserShift, RepositoryError>;
    async fn update_user_shift(&self, assignment: UserShift) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OffdayRepository: Send + Sync {
    async fn find_by_id(&self, id: OffdayId) -> Result<Option<Offday>, RepositoryError>;
    async fn find_by_employee_date(
        &self,
        employee_id: EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<Offday>, RepositoryError>;
    async fn list_for_month(
        &self,
        employee_id: EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<Vec<Offday>, RepositoryError>;
    async fn insert(&self, offday: NewOffday) -> Result<Offday, RepositoryError>;
    async fn update(&self, offday: Offday) -> Result<(), RepositoryError>;
    /// Atomically drop and re-create the month's plan for one employee.
    async fn replace_month(
        &self,
        employee_id: EmployeeId,
        year: i32,
        month: u32,
        offdays: Vec<NewOffday>,
    ) -> Result<Vec<Offday>, RepositoryError>;
}

#[async_trait]
pub trait SalaryRepository: Send + Sync {
    async fn find_by_employee_month(
        &self,
        employee_id: EmployeeId,
        salary_month: NaiveDate,
    ) -> Result<Option<Salary>, RepositoryError>;
    async fn insert(&self, salary: NewSalary) -> Result<Salary, RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
    ) -> Result<Option<ApprovalSetting>, RepositoryError>;
    async fn upsert(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
        is_enabled: bool,
        updated_by: i64,
    ) -> Result<ApprovalSetting, RepositoryError>;
    async fn list(&self) -> Result<Vec<ApprovalSetting>, RepositoryError>;
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<ApprovalMember>, RepositoryError>;
    async fn find_active(
        &self,
        employee_id: EmployeeId,
        module: ApprovalModule,
    ) -> Result<Option<ApprovalMember>, RepositoryError>;
    /// Active members of `module` whose action set contains `action_type`,
    /// oldest membership first.
    async fn list_eligible(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
    ) -> Result<Vec<ApprovalMember>, RepositoryError>;
    async fn insert(&self, member: NewApprovalMember) -> Result<ApprovalMember, RepositoryError>;
    /// Add action types to an existing member, ignoring ones already present.
    async fn add_action_types(
        &self,
        id: MemberId,
        action_types: &[ApprovalRequestType],
    ) -> Result<ApprovalMember, RepositoryError>;
    async fn delete(&self, id: MemberId) -> Result<(), RepositoryError>;
    async fn list(
        &self,
        page: PageRequest,
        filter: MemberFilter,
    ) -> Result<Paginated<ApprovalMember>, RepositoryError>;
    async fn list_all_active(&self) -> Result<Vec<ApprovalMember>, RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Insert the request plus one PENDING response per panel seat in a single
    /// transaction and return the stored request.
    async fn create(
        &self,
        request: NewApprovalRequest,
        panel: &[PanelSeat],
    ) -> Result<ApprovalRequest, RepositoryError>;
    async fn find_by_id(&self, id: RequestId) -> Result<Option<ApprovalRequest>, RepositoryError>;
    async fn list(
        &self,
        page: PageRequest,
        filter: RequestFilter,
    ) -> Result<Paginated<ApprovalRequest>, RepositoryError>;
    /// PENDING requests still holding a PENDING response for this employee,
    /// newest first.
    async fn list_pending_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError>;
    /// Record a verdict on the member's PENDING response. Returns false when
    /// the response was already resolved.
    async fn record_response(
        &self,
        request_id: RequestId,
        member_id: MemberId,
        status: ResponseStatus,
        comments: Option<&str>,
        responded_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
    /// Compare-and-swap the request out of PENDING. Returns true only for the
    /// caller that performed the transition.
    async fn resolve(
        &self,
        id: RequestId,
        status: ApprovalStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
    /// Stamp the execution back-reference exactly once. Returns false when a
    /// reference is already present.
    async fn stamp_reference(
        &self,
        id: RequestId,
        reference_id: i64,
        reference_count: Option<i64>,
    ) -> Result<bool, RepositoryError>;
    async fn delete_pending_responses_for_member(
        &self,
        member_id: MemberId,
    ) -> Result<u64, RepositoryError>;
}

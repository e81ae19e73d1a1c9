//! Approval workflow JSON API.
//!
//! Endpoints:
//! - `POST   /approvals/requests` - create a request
//! - `POST   /approvals/requests/{id}/respond` - record one member's verdict
//! - `POST   /approvals/requests/{id}/execute` - re-run a failed execution
//! - `GET    /approvals/requests` - paginated listing with filters
//! - `GET    /approvals/requests/{id}` - single request with responses
//! - `GET    /approvals/requests/pending/my-approvals` - a member's open queue
//! - `GET    /approvals/settings` - settings grouped by module
//! - `PUT    /approvals/settings` - bulk upsert, returns the grouped view
//! - `POST   /approvals/members` - add a panel member
//! - `GET    /approvals/members` - paginated member listing
//! - `GET    /approvals/members/by-module` - active members grouped by module
//! - `DELETE /approvals/members/{id}` - remove a member (module in query)

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use storeops_core::domain::approval::{
    ApprovalMember, ApprovalModule, ApprovalRequest, ApprovalRequestType, ApprovalSetting,
    ApprovalStatus, MemberId, RequestId,
};
use storeops_core::domain::employee::EmployeeId;
use storeops_core::{PayloadError, RequestPayload, VoteAction, VoteError};
use storeops_db::repositories::{MemberFilter, PageRequest, Paginated, RequestFilter};

use crate::executor::ExecutionError;
use crate::workflow::{
    ApprovalWorkflow, ModuleMembers, ModuleSettings, NewMemberInput, NewRequestInput,
    SettingUpdate, WorkflowError,
};

#[derive(Clone)]
pub struct ApprovalsState {
    pub workflow: Arc<ApprovalWorkflow>,
}

pub fn router(workflow: Arc<ApprovalWorkflow>) -> Router {
    Router::new()
        .route("/approvals/requests", post(create_request).get(list_requests))
        .route("/approvals/requests/{id}", get(get_request))
        .route("/approvals/requests/{id}/respond", post(respond))
        .route("/approvals/requests/{id}/execute", post(execute_request))
        .route("/approvals/requests/pending/my-approvals", get(my_pending_approvals))
        .route("/approvals/settings", put(update_settings).get(get_settings))
        .route("/approvals/members", post(add_member).get(list_members))
        .route("/approvals/members/by-module", get(members_by_module))
        .route("/approvals/members/{id}", axum::routing::delete(remove_member))
        .with_state(ApprovalsState { workflow })
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error_code: &'static str,
    pub detail: String,
}

pub(crate) type Rejection = (StatusCode, Json<ApiError>);

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub request_type: String,
    #[serde(default = "default_module")]
    pub module: String,
    pub employee_id: i64,
    pub requested_by: i64,
    pub request_data: Value,
    pub remarks: Option<String>,
}

fn default_module() -> String {
    "HR".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RespondBody {
    pub employee_id: i64,
    pub action: String,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RequestListQuery {
    pub status: Option<String>,
    pub request_type: Option<String>,
    pub page_index: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct MyApprovalsQuery {
    pub employee_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsBody {
    pub updated_by: i64,
    pub settings: Vec<SettingEntryBody>,
}

#[derive(Debug, Deserialize)]
pub struct SettingEntryBody {
    pub module: String,
    pub action_type: String,
    pub is_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberBody {
    pub employee_id: i64,
    pub module: String,
    pub action_types: Vec<String>,
    pub added_by: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct MemberListQuery {
    pub module: Option<String>,
    pub is_active: Option<bool>,
    pub action_type: Option<String>,
    pub page_index: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberQuery {
    pub module: String,
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponseView {
    pub id: i64,
    pub request_id: i64,
    pub member_id: i64,
    pub member_employee_id: i64,
    pub status: &'static str,
    pub comments: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ApprovalRequestView {
    pub id: i64,
    pub request_type: &'static str,
    pub employee_id: i64,
    pub requested_by: i64,
    pub status: &'static str,
    pub request_data: Value,
    pub remarks: Option<String>,
    pub reference_id: Option<i64>,
    pub reference_count: Option<i64>,
    pub approved_at: Option<String>,
    pub rejected_at: Option<String>,
    pub created_at: String,
    pub responses: Vec<ApprovalResponseView>,
}

impl ApprovalRequestView {
    fn from_domain(request: ApprovalRequest) -> Result<Self, Rejection> {
        let request_data = request.payload.to_stored().map_err(|error| {
            internal_error(&format!("stored payload failed to serialize: {error}"))
        })?;
        Ok(Self {
            id: request.id.0,
            request_type: request.request_type.as_str(),
            employee_id: request.employee_id.0,
            requested_by: request.requested_by,
            status: request.status.as_str(),
            request_data,
            remarks: request.remarks,
            reference_id: request.reference_id,
            reference_count: request.reference_count,
            approved_at: request.approved_at.map(|t| t.to_rfc3339()),
            rejected_at: request.rejected_at.map(|t| t.to_rfc3339()),
            created_at: request.created_at.to_rfc3339(),
            responses: request
                .responses
                .into_iter()
                .map(|response| ApprovalResponseView {
                    id: response.id,
                    request_id: response.request_id.0,
                    member_id: response.member_id.0,
                    member_employee_id: response.member_employee_id.0,
                    status: response.status.as_str(),
                    comments: response.comments,
                    responded_at: response.responded_at.map(|t| t.to_rfc3339()),
                    created_at: response.created_at.to_rfc3339(),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: i64,
    pub employee_id: i64,
    pub module: &'static str,
    pub action_types: Vec<&'static str>,
    pub is_active: bool,
    pub added_by: i64,
    pub created_at: String,
}

impl MemberView {
    fn from_domain(member: ApprovalMember) -> Self {
        Self {
            id: member.id.0,
            employee_id: member.employee_id.0,
            module: member.module.as_str(),
            action_types: member.action_types.iter().map(|a| a.as_str()).collect(),
            is_active: member.is_active,
            added_by: member.added_by,
            created_at: member.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingView {
    pub id: i64,
    pub action_type: &'static str,
    pub is_enabled: bool,
    pub updated_by: i64,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct ModuleSettingsView {
    pub module: &'static str,
    pub settings: Vec<SettingView>,
}

impl ModuleSettingsView {
    fn from_domain(group: ModuleSettings) -> Self {
        Self {
            module: group.module.as_str(),
            settings: group
                .settings
                .into_iter()
                .map(|setting: ApprovalSetting| SettingView {
                    id: setting.id,
                    action_type: setting.action_type.as_str(),
                    is_enabled: setting.is_enabled,
                    updated_by: setting.updated_by,
                    updated_at: setting.updated_at.to_rfc3339(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleMembersView {
    pub module: &'static str,
    pub members: Vec<MemberView>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_request(
    State(state): State<ApprovalsState>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<ApprovalRequestView>), Rejection> {
    let request_type: ApprovalRequestType = parse_enum(&body.request_type)?;
    let module: ApprovalModule = parse_enum(&body.module)?;
    let payload = RequestPayload::from_stored(request_type, body.request_data)
        .map_err(payload_rejection)?;

    let request = state
        .workflow
        .create_request(NewRequestInput {
            request_type,
            module,
            employee_id: EmployeeId(body.employee_id),
            requested_by: body.requested_by,
            payload,
            remarks: body.remarks,
        })
        .await
        .map_err(workflow_rejection)?;

    Ok((StatusCode::CREATED, Json(ApprovalRequestView::from_domain(request)?)))
}

async fn respond(
    State(state): State<ApprovalsState>,
    Path(id): Path<i64>,
    Json(body): Json<RespondBody>,
) -> Result<Json<ApprovalRequestView>, Rejection> {
    let action: VoteAction = parse_enum(&body.action)?;
    let request = state
        .workflow
        .respond(RequestId(id), EmployeeId(body.employee_id), action, body.comments)
        .await
        .map_err(workflow_rejection)?;
    Ok(Json(ApprovalRequestView::from_domain(request)?))
}

async fn execute_request(
    State(state): State<ApprovalsState>,
    Path(id): Path<i64>,
) -> Result<Json<ApprovalRequestView>, Rejection> {
    let request = state
        .workflow
        .execute_approved(RequestId(id))
        .await
        .map_err(workflow_rejection)?;
    Ok(Json(ApprovalRequestView::from_domain(request)?))
}

async fn list_requests(
    State(state): State<ApprovalsState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<Paginated<ApprovalRequestView>>, Rejection> {
    let status: Option<ApprovalStatus> = parse_optional_enum(query.status.as_deref())?;
    let request_type: Option<ApprovalRequestType> =
        parse_optional_enum(query.request_type.as_deref())?;
    let page = PageRequest::new(query.page_index.unwrap_or(1), query.page_size.unwrap_or(20));

    let listed = state
        .workflow
        .list_requests(page, RequestFilter { status, request_type })
        .await
        .map_err(workflow_rejection)?;

    let mut views = Vec::with_capacity(listed.data.len());
    for request in &listed.data {
        views.push(ApprovalRequestView::from_domain(request.clone())?);
    }
    Ok(Json(Paginated {
        page_index: listed.page_index,
        page_size: listed.page_size,
        count: listed.count,
        data: views,
    }))
}

async fn get_request(
    State(state): State<ApprovalsState>,
    Path(id): Path<i64>,
) -> Result<Json<ApprovalRequestView>, Rejection> {
    let request = state.workflow.get_request(RequestId(id)).await.map_err(workflow_rejection)?;
    Ok(Json(ApprovalRequestView::from_domain(request)?))
}

async fn my_pending_approvals(
    State(state): State<ApprovalsState>,
    Query(query): Query<MyApprovalsQuery>,
) -> Result<Json<Vec<ApprovalRequestView>>, Rejection> {
    let pending = state
        .workflow
        .pending_for_member(EmployeeId(query.employee_id))
        .await
        .map_err(workflow_rejection)?;
    let mut views = Vec::with_capacity(pending.len());
    for request in pending {
        views.push(ApprovalRequestView::from_domain(request)?);
    }
    Ok(Json(views))
}

async fn get_settings(
    State(state): State<ApprovalsState>,
) -> Result<Json<Vec<ModuleSettingsView>>, Rejection> {
    let grouped = state.workflow.settings_grouped().await.map_err(workflow_rejection)?;
    Ok(Json(grouped.into_iter().map(ModuleSettingsView::from_domain).collect()))
}

async fn update_settings(
    State(state): State<ApprovalsState>,
    Json(body): Json<UpdateSettingsBody>,
) -> Result<Json<Vec<ModuleSettingsView>>, Rejection> {
    let mut entries = Vec::with_capacity(body.settings.len());
    for entry in body.settings {
        entries.push(SettingUpdate {
            module: parse_enum(&entry.module)?,
            action_type: parse_enum(&entry.action_type)?,
            is_enabled: entry.is_enabled,
        });
    }
    let grouped = state
        .workflow
        .update_settings(entries, body.updated_by)
        .await
        .map_err(workflow_rejection)?;
    Ok(Json(grouped.into_iter().map(ModuleSettingsView::from_domain).collect()))
}

async fn add_member(
    State(state): State<ApprovalsState>,
    Json(body): Json<AddMemberBody>,
) -> Result<(StatusCode, Json<MemberView>), Rejection> {
    let module: ApprovalModule = parse_enum(&body.module)?;
    let mut action_types = Vec::with_capacity(body.action_types.len());
    for action in &body.action_types {
        action_types.push(parse_enum::<ApprovalRequestType>(action)?);
    }

    let member = state
        .workflow
        .add_member(NewMemberInput {
            employee_id: EmployeeId(body.employee_id),
            module,
            action_types,
            added_by: body.added_by,
        })
        .await
        .map_err(workflow_rejection)?;
    Ok((StatusCode::CREATED, Json(MemberView::from_domain(member))))
}

async fn list_members(
    State(state): State<ApprovalsState>,
    Query(query): Query<MemberListQuery>,
) -> Result<Json<Paginated<MemberView>>, Rejection> {
    let module: Option<ApprovalModule> = parse_optional_enum(query.module.as_deref())?;
    let action_type: Option<ApprovalRequestType> =
        parse_optional_enum(query.action_type.as_deref())?;
    let page = PageRequest::new(query.page_index.unwrap_or(1), query.page_size.unwrap_or(20));

    let listed = state
        .workflow
        .list_members(page, MemberFilter { module, is_active: query.is_active, action_type })
        .await
        .map_err(workflow_rejection)?;
    Ok(Json(listed.map(MemberView::from_domain)))
}

async fn members_by_module(
    State(state): State<ApprovalsState>,
) -> Result<Json<Vec<ModuleMembersView>>, Rejection> {
    let grouped = state.workflow.members_by_module().await.map_err(workflow_rejection)?;
    Ok(Json(
        grouped
            .into_iter()
            .map(|group: ModuleMembers| ModuleMembersView {
                module: group.module.as_str(),
                members: group.members.into_iter().map(MemberView::from_domain).collect(),
            })
            .collect(),
    ))
}

async fn remove_member(
    State(state): State<ApprovalsState>,
    Path(id): Path<i64>,
    Query(query): Query<RemoveMemberQuery>,
) -> Result<StatusCode, Rejection> {
    let module: ApprovalModule = parse_enum(&query.module)?;
    state
        .workflow
        .remove_member(MemberId(id), module)
        .await
        .map_err(workflow_rejection)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn parse_enum<T>(value: &str) -> Result<T, Rejection>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|error: T::Err| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError { error_code: "invalid_parameter", detail: error.to_string() }),
        )
    })
}

fn parse_optional_enum<T>(value: Option<&str>) -> Result<Option<T>, Rejection>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.map(parse_enum).transpose()
}

fn payload_rejection(error: PayloadError) -> Rejection {
    let error_code = match &error {
        PayloadError::Shape { .. } => "invalid_request_data",
        PayloadError::UnsupportedRequestType { .. } => "unsupported_request_type",
    };
    (StatusCode::BAD_REQUEST, Json(ApiError { error_code, detail: error.to_string() }))
}

fn internal_error(detail: &str) -> Rejection {
    tracing::error!(event_name = "approvals.internal_error", detail, "approvals API failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError { error_code: "internal", detail: "an internal error occurred".to_string() }),
    )
}

pub(crate) fn workflow_rejection(error: WorkflowError) -> Rejection {
    let (status, error_code) = match &error {
        WorkflowError::RequestNotFound
        | WorkflowError::MemberNotFound
        | WorkflowError::EmployeeNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        WorkflowError::Vote(VoteError::AlreadyResolved { .. }) => {
            (StatusCode::BAD_REQUEST, "already_resolved")
        }
        WorkflowError::RequestNotExecutable { .. } => {
            (StatusCode::BAD_REQUEST, "not_executable")
        }
        WorkflowError::Vote(VoteError::AlreadyResponded) => {
            (StatusCode::BAD_REQUEST, "already_responded")
        }
        WorkflowError::Vote(VoteError::NotAuthorized) => (StatusCode::FORBIDDEN, "not_authorized"),
        WorkflowError::ApprovalNotEnabled { .. } => {
            (StatusCode::BAD_REQUEST, "approval_not_enabled")
        }
        WorkflowError::NoEligibleApprovers { .. } => {
            (StatusCode::BAD_REQUEST, "no_eligible_approvers")
        }
        WorkflowError::PayloadMismatch { .. }
        | WorkflowError::EmployeeInactive(_)
        | WorkflowError::EmptyActionTypes => (StatusCode::BAD_REQUEST, "validation"),
        WorkflowError::Execution(ExecutionError::UnsupportedRequestType { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_request_type")
        }
        WorkflowError::Execution(_) => (StatusCode::INTERNAL_SERVER_ERROR, "execution_failed"),
        WorkflowError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(
            event_name = "approvals.request_failed",
            error = %error,
            "approvals API failure"
        );
    }
    (status, Json(ApiError { error_code, detail: error.to_string() }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::Json;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use storeops_core::domain::employee::EmployeeId;
    use storeops_db::repositories::{
        EmployeeRepository, InMemoryEmployeeRepository, InMemoryMemberRepository,
        InMemoryOffdayRepository, InMemoryRequestRepository, InMemorySalaryRepository,
        InMemoryShiftRepository, InMemorySettingsRepository, NewEmployee, NewShiftType,
        ShiftRepository,
    };
    use storeops_notify::RecordingNotifier;

    use crate::executor::standard_registry;
    use crate::workflow::ApprovalWorkflow;
    use crate::workforce::{OffdayService, SalaryService, ShiftService};

    use super::*;

    struct Harness {
        employees: Arc<InMemoryEmployeeRepository>,
        shifts: Arc<InMemoryShiftRepository>,
        state: ApprovalsState,
    }

    impl Harness {
        fn new() -> Self {
            let employees = Arc::new(InMemoryEmployeeRepository::default());
            let shifts = Arc::new(InMemoryShiftRepository::default());
            let offdays = Arc::new(InMemoryOffdayRepository::default());
            let salaries = Arc::new(InMemorySalaryRepository::default());
            let registry = standard_registry(
                Arc::new(ShiftService::new(employees.clone(), shifts.clone())),
                Arc::new(SalaryService::new(
                    employees.clone(),
                    shifts.clone(),
                    salaries.clone(),
                )),
                Arc::new(OffdayService::new(employees.clone(), offdays.clone())),
            );
            let workflow = Arc::new(ApprovalWorkflow::new(
                Arc::new(InMemorySettingsRepository::default()),
                Arc::new(InMemoryMemberRepository::default()),
                Arc::new(InMemoryRequestRepository::default()),
                employees.clone(),
                Arc::new(RecordingNotifier::default()),
                Arc::new(registry),
            ));
            Self { employees, shifts, state: ApprovalsState { workflow } }
        }

        fn state(&self) -> State<ApprovalsState> {
            State(self.state.clone())
        }

        async fn employee(&self, first_name: &str, phone: &str) -> EmployeeId {
            self.employees
                .insert(NewEmployee {
                    first_name: first_name.to_string(),
                    last_name: "Nasser".to_string(),
                    phone: phone.to_string(),
                    monthly_salary: Decimal::new(3_000_00, 2),
                    joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
                    is_active: true,
                })
                .await
                .expect("insert employee")
                .id
        }

        async fn enable_and_panel(&self, reviewer: EmployeeId, action_type: &str) {
            update_settings(
                self.state(),
                Json(UpdateSettingsBody {
                    updated_by: 1,
                    settings: vec![SettingEntryBody {
                        module: "HR".to_string(),
                        action_type: action_type.to_string(),
                        is_enabled: true,
                    }],
                }),
            )
            .await
            .expect("enable setting");
            add_member(
                self.state(),
                Json(AddMemberBody {
                    employee_id: reviewer.0,
                    module: "HR".to_string(),
                    action_types: vec![action_type.to_string()],
                    added_by: 1,
                }),
            )
            .await
            .expect("add member");
        }
    }

    #[tokio::test]
    async fn create_and_approve_a_shift_request_over_the_api() {
        let harness = Harness::new();
        let subject = harness.employee("Hala", "15550300").await;
        let reviewer = harness.employee("Omar", "15550301").await;
        harness.enable_and_panel(reviewer, "SHIFT").await;
        let shift_type = harness
            .shifts
            .insert_shift_type(NewShiftType {
                name: "Morning".to_string(),
                start_minute: 8 * 60,
                end_minute: 16 * 60,
            })
            .await
            .expect("shift type");

        let (status, created) = create_request(
            harness.state(),
            Json(CreateRequestBody {
                request_type: "shift".to_string(),
                module: "HR".to_string(),
                employee_id: subject.0,
                requested_by: 1,
                request_data: json!({
                    "employee_id": subject.0,
                    "shift_type_id": shift_type.id.0,
                    "effective_date": "2025-04-01"
                }),
                remarks: None,
            }),
        )
        .await
        .expect("create request");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.0.status, "PENDING");
        assert_eq!(created.0.responses.len(), 1);
        assert_eq!(created.0.request_data["effective_date"], "2025-04-01");

        let resolved = respond(
            harness.state(),
            Path(created.0.id),
            Json(RespondBody {
                employee_id: reviewer.0,
                action: "approve".to_string(),
                comments: None,
            }),
        )
        .await
        .expect("respond");
        assert_eq!(resolved.0.status, "APPROVED");
        assert!(resolved.0.reference_id.is_some());
    }

    #[tokio::test]
    async fn disabled_settings_reject_creation_with_a_stable_code() {
        let harness = Harness::new();
        let subject = harness.employee("Hala", "15550300").await;

        let (status, body) = create_request(
            harness.state(),
            Json(CreateRequestBody {
                request_type: "SALARY".to_string(),
                module: "HR".to_string(),
                employee_id: subject.0,
                requested_by: 1,
                request_data: json!({"employee_id": subject.0, "salary_month": "2025-03-01"}),
                remarks: None,
            }),
        )
        .await
        .expect_err("approval not enabled");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.error_code, "approval_not_enabled");
    }

    #[tokio::test]
    async fn vote_failures_map_to_the_documented_status_codes() {
        let harness = Harness::new();
        let subject = harness.employee("Hala", "15550300").await;
        let reviewer = harness.employee("Omar", "15550301").await;
        let outsider = harness.employee("Ziad", "15550303").await;
        harness.enable_and_panel(reviewer, "SALARY").await;

        let (_, created) = create_request(
            harness.state(),
            Json(CreateRequestBody {
                request_type: "SALARY".to_string(),
                module: "HR".to_string(),
                employee_id: subject.0,
                requested_by: 1,
                request_data: json!({"employee_id": subject.0, "salary_month": "2025-03-01"}),
                remarks: None,
            }),
        )
        .await
        .expect("create request");

        let (status, body) = respond(
            harness.state(),
            Path(999),
            Json(RespondBody {
                employee_id: reviewer.0,
                action: "approve".to_string(),
                comments: None,
            }),
        )
        .await
        .expect_err("unknown request");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0.detail, "Approval request not found");

        let (status, body) = respond(
            harness.state(),
            Path(created.0.id),
            Json(RespondBody {
                employee_id: outsider.0,
                action: "approve".to_string(),
                comments: None,
            }),
        )
        .await
        .expect_err("outsider");
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.0.detail, "You are not authorized to approve this request");

        respond(
            harness.state(),
            Path(created.0.id),
            Json(RespondBody {
                employee_id: reviewer.0,
                action: "reject".to_string(),
                comments: Some("hold".to_string()),
            }),
        )
        .await
        .expect("rejection resolves");

        let (status, body) = respond(
            harness.state(),
            Path(created.0.id),
            Json(RespondBody {
                employee_id: reviewer.0,
                action: "approve".to_string(),
                comments: None,
            }),
        )
        .await
        .expect_err("already resolved");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.detail, "Request is already REJECTED");
    }

    #[tokio::test]
    async fn execution_retry_refuses_unresolved_requests_and_keeps_stamps_stable() {
        let harness = Harness::new();
        let subject = harness.employee("Hala", "15550300").await;
        let reviewer = harness.employee("Omar", "15550301").await;
        harness.enable_and_panel(reviewer, "SALARY").await;

        let (_, created) = create_request(
            harness.state(),
            Json(CreateRequestBody {
                request_type: "SALARY".to_string(),
                module: "HR".to_string(),
                employee_id: subject.0,
                requested_by: 1,
                request_data: json!({"employee_id": subject.0, "salary_month": "2025-03-01"}),
                remarks: None,
            }),
        )
        .await
        .expect("create request");

        let (status, body) = execute_request(harness.state(), Path(created.0.id))
            .await
            .expect_err("still pending");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.error_code, "not_executable");

        let resolved = respond(
            harness.state(),
            Path(created.0.id),
            Json(RespondBody {
                employee_id: reviewer.0,
                action: "approve".to_string(),
                comments: None,
            }),
        )
        .await
        .expect("approval executes");
        assert!(resolved.0.reference_id.is_some());

        let replayed = execute_request(harness.state(), Path(created.0.id))
            .await
            .expect("replay on an executed request");
        assert_eq!(replayed.0.reference_id, resolved.0.reference_id);
    }

    #[tokio::test]
    async fn listing_filters_parse_and_reject_unknown_values() {
        let harness = Harness::new();

        let listed = list_requests(
            harness.state(),
            Query(RequestListQuery {
                status: Some("pending".to_string()),
                request_type: None,
                page_index: Some(1),
                page_size: Some(10),
            }),
        )
        .await
        .expect("empty listing");
        assert_eq!(listed.0.count, 0);

        let (status, body) = list_requests(
            harness.state(),
            Query(RequestListQuery { status: Some("SIDEWAYS".to_string()), ..Default::default() }),
        )
        .await
        .expect_err("unknown status");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.error_code, "invalid_parameter");
    }

    #[tokio::test]
    async fn member_admin_round_trips_through_the_api() {
        let harness = Harness::new();
        let reviewer = harness.employee("Omar", "15550301").await;

        let (status, member) = add_member(
            harness.state(),
            Json(AddMemberBody {
                employee_id: reviewer.0,
                module: "HR".to_string(),
                action_types: vec!["SHIFT".to_string(), "shift".to_string()],
                added_by: 1,
            }),
        )
        .await
        .expect("add member");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(member.0.action_types, vec!["SHIFT"]);

        let grouped = members_by_module(harness.state()).await.expect("grouped");
        assert_eq!(grouped.0.len(), 1);
        assert_eq!(grouped.0[0].module, "HR");

        let removed = remove_member(
            harness.state(),
            Path(member.0.id),
            Query(RemoveMemberQuery { module: "HR".to_string() }),
        )
        .await
        .expect("remove member");
        assert_eq!(removed, StatusCode::NO_CONTENT);

        let listed = list_members(harness.state(), Query(MemberListQuery::default()))
            .await
            .expect("list after removal");
        assert_eq!(listed.0.count, 0);
    }

    #[tokio::test]
    async fn the_router_serves_pending_approvals() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::util::ServiceExt;

        let harness = Harness::new();
        let router = super::router(harness.state.workflow.clone());

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/approvals/requests/pending/my-approvals?employee_id=1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}

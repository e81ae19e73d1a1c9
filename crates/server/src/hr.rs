//! HR operations that route through approval when it is enabled.
//!
//! Endpoints:
//! - `POST /hr/shifts/assign` - assign a shift
//! - `POST /hr/salary/generate/{employee_id}` - generate one month's pay
//! - `POST /hr/offdays` - create a single day off
//! - `POST /hr/offdays/bulk` - replace a month's day-off plan
//!
//! Each handler checks the (HR, action) approval toggle. Enabled means the
//! operation is parked behind an approval request and the caller gets 202
//! with the request id; disabled means the operation runs immediately and
//! the caller gets 201 with the created resource.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storeops_core::domain::approval::{ApprovalModule, ApprovalRequestType};
use storeops_core::domain::employee::EmployeeId;
use storeops_core::domain::offday::{Offday, OffdayType};
use storeops_core::domain::salary::Salary;
use storeops_core::domain::shift::UserShift;
use storeops_core::{
    OffdayBulk, OffdayCreate, OffdayPayload, RequestPayload, SalaryPayload, ShiftAssign,
    ShiftPayload,
};

use crate::approvals::{workflow_rejection, ApiError, Rejection};
use crate::workflow::{ApprovalWorkflow, NewRequestInput};
use crate::workforce::{OffdayService, SalaryService, ShiftService, WorkforceError};

#[derive(Clone)]
pub struct HrState {
    pub workflow: Arc<ApprovalWorkflow>,
    pub shifts: Arc<ShiftService>,
    pub salaries: Arc<SalaryService>,
    pub offdays: Arc<OffdayService>,
}

pub fn router(state: HrState) -> Router {
    Router::new()
        .route("/hr/shifts/assign", post(assign_shift))
        .route("/hr/salary/generate/{employee_id}", post(generate_salary))
        .route("/hr/offdays", post(create_offday))
        .route("/hr/offdays/bulk", post(create_bulk_offdays))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AssignShiftBody {
    pub employee_id: i64,
    pub shift_type_id: i64,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub deduction_amount: Option<Decimal>,
    pub requested_by: i64,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateSalaryQuery {
    pub salary_month: NaiveDate,
    pub requested_by: i64,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOffdayBody {
    pub employee_id: i64,
    pub year: i32,
    pub month: u32,
    pub offday_date: NaiveDate,
    #[serde(default)]
    pub offday_type: OffdayType,
    pub description: Option<String>,
    pub requested_by: i64,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkOffdaysBody {
    pub employee_id: i64,
    pub year: i32,
    pub month: u32,
    pub offday_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub offday_type: OffdayType,
    pub description: Option<String>,
    pub requested_by: i64,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkOffdaysCreated {
    pub first_id: i64,
    pub total: i64,
}

/// Either the operation was parked behind approval, or it ran directly.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GateOutcome<T> {
    Submitted { approval_required: bool, request_id: i64, status: &'static str },
    Executed(T),
}

impl<T> GateOutcome<T> {
    fn submitted(request_id: i64) -> Self {
        Self::Submitted { approval_required: true, request_id, status: "PENDING" }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn assign_shift(
    State(state): State<HrState>,
    Json(body): Json<AssignShiftBody>,
) -> Result<(StatusCode, Json<GateOutcome<UserShift>>), Rejection> {
    let assign = ShiftAssign {
        employee_id: body.employee_id,
        shift_type_id: body.shift_type_id,
        effective_date: body.effective_date,
        end_date: body.end_date,
        deduction_amount: body.deduction_amount,
    };

    if approval_enabled(&state, ApprovalRequestType::Shift).await? {
        let request = state
            .workflow
            .create_request(NewRequestInput {
                request_type: ApprovalRequestType::Shift,
                module: ApprovalModule::Hr,
                employee_id: EmployeeId(body.employee_id),
                requested_by: body.requested_by,
                payload: RequestPayload::Shift(ShiftPayload::Assign(assign)),
                remarks: body.remarks,
            })
            .await
            .map_err(workflow_rejection)?;
        return Ok((StatusCode::ACCEPTED, Json(GateOutcome::submitted(request.id.0))));
    }

    let shift = state.shifts.assign(&assign).await.map_err(workforce_rejection)?;
    Ok((StatusCode::CREATED, Json(GateOutcome::Executed(shift))))
}

async fn generate_salary(
    State(state): State<HrState>,
    Path(employee_id): Path<i64>,
    Query(query): Query<GenerateSalaryQuery>,
) -> Result<(StatusCode, Json<GateOutcome<Salary>>), Rejection> {
    if approval_enabled(&state, ApprovalRequestType::Salary).await? {
        let request = state
            .workflow
            .create_request(NewRequestInput {
                request_type: ApprovalRequestType::Salary,
                module: ApprovalModule::Hr,
                employee_id: EmployeeId(employee_id),
                requested_by: query.requested_by,
                payload: RequestPayload::Salary(SalaryPayload {
                    employee_id,
                    salary_month: query.salary_month,
                }),
                remarks: query.remarks,
            })
            .await
            .map_err(workflow_rejection)?;
        return Ok((StatusCode::ACCEPTED, Json(GateOutcome::submitted(request.id.0))));
    }

    let salary = state
        .salaries
        .generate_monthly(EmployeeId(employee_id), query.salary_month, query.requested_by)
        .await
        .map_err(workforce_rejection)?;
    Ok((StatusCode::CREATED, Json(GateOutcome::Executed(salary))))
}

async fn create_offday(
    State(state): State<HrState>,
    Json(body): Json<CreateOffdayBody>,
) -> Result<(StatusCode, Json<GateOutcome<Offday>>), Rejection> {
    let create = OffdayCreate {
        employee_id: body.employee_id,
        year: body.year,
        month: body.month,
        offday_date: body.offday_date,
        offday_type: body.offday_type,
        description: body.description,
    };

    if approval_enabled(&state, ApprovalRequestType::Dayoff).await? {
        let request = state
            .workflow
            .create_request(NewRequestInput {
                request_type: ApprovalRequestType::Dayoff,
                module: ApprovalModule::Hr,
                employee_id: EmployeeId(body.employee_id),
                requested_by: body.requested_by,
                payload: RequestPayload::Dayoff(OffdayPayload::Create(create)),
                remarks: body.remarks,
            })
            .await
            .map_err(workflow_rejection)?;
        return Ok((StatusCode::ACCEPTED, Json(GateOutcome::submitted(request.id.0))));
    }

    let offday = state.offdays.create(&create).await.map_err(workforce_rejection)?;
    Ok((StatusCode::CREATED, Json(GateOutcome::Executed(offday))))
}

async fn create_bulk_offdays(
    State(state): State<HrState>,
    Json(body): Json<BulkOffdaysBody>,
) -> Result<(StatusCode, Json<GateOutcome<BulkOffdaysCreated>>), Rejection> {
    let bulk = OffdayBulk {
        employee_id: body.employee_id,
        year: body.year,
        month: body.month,
        offday_dates: body.offday_dates,
        offday_type: body.offday_type,
        description: body.description,
    };

    if approval_enabled(&state, ApprovalRequestType::Dayoff).await? {
        let request = state
            .workflow
            .create_request(NewRequestInput {
                request_type: ApprovalRequestType::Dayoff,
                module: ApprovalModule::Hr,
                employee_id: EmployeeId(body.employee_id),
                requested_by: body.requested_by,
                payload: RequestPayload::Dayoff(OffdayPayload::Bulk(bulk)),
                remarks: body.remarks,
            })
            .await
            .map_err(workflow_rejection)?;
        return Ok((StatusCode::ACCEPTED, Json(GateOutcome::submitted(request.id.0))));
    }

    let outcome = state.offdays.create_bulk(&bulk).await.map_err(workforce_rejection)?;
    Ok((
        StatusCode::CREATED,
        Json(GateOutcome::Executed(BulkOffdaysCreated {
            first_id: outcome.first_id.0,
            total: outcome.total,
        })),
    ))
}

async fn approval_enabled(
    state: &HrState,
    action_type: ApprovalRequestType,
) -> Result<bool, Rejection> {
    state
        .workflow
        .is_approval_enabled(ApprovalModule::Hr, action_type)
        .await
        .map_err(workflow_rejection)
}

fn workforce_rejection(error: WorkforceError) -> Rejection {
    let (status, error_code) = match &error {
        WorkforceError::EmployeeNotFound(_)
        | WorkforceError::ShiftTypeNotFound(_)
        | WorkforceError::ShiftNotFound(_)
        | WorkforceError::OffdayNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        WorkforceError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        _ => (StatusCode::BAD_REQUEST, "validation"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(event_name = "hr.request_failed", error = %error, "HR API failure");
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

    use storeops_core::domain::approval::{
        ApprovalModule, ApprovalRequestType, ApprovalStatus, RequestId,
    };
    use storeops_core::domain::employee::EmployeeId;
    use storeops_core::domain::offday::OffdayType;
    use storeops_db::repositories::{
        EmployeeRepository, InMemoryEmployeeRepository, InMemoryMemberRepository,
        InMemoryOffdayRepository, InMemoryRequestRepository, InMemorySalaryRepository,
        InMemoryShiftRepository, InMemorySettingsRepository, NewEmployee, NewShiftType,
        SettingsRepository, ShiftRepository,
    };
    use storeops_notify::RecordingNotifier;

    use crate::executor::standard_registry;
    use crate::workflow::{ApprovalWorkflow, NewMemberInput};
    use crate::workforce::{OffdayService, SalaryService, ShiftService};

    use super::*;

    fn date(text: &str) -> NaiveDate {
        text.parse().expect("test date")
    }

    struct Harness {
        employees: Arc<InMemoryEmployeeRepository>,
        shifts: Arc<InMemoryShiftRepository>,
        settings: Arc<InMemorySettingsRepository>,
        state: HrState,
    }

    impl Harness {
        fn new() -> Self {
            let employees = Arc::new(InMemoryEmployeeRepository::default());
            let shifts = Arc::new(InMemoryShiftRepository::default());
            let offdays = Arc::new(InMemoryOffdayRepository::default());
            let salaries = Arc::new(InMemorySalaryRepository::default());
            let settings = Arc::new(InMemorySettingsRepository::default());

            let shift_service = Arc::new(ShiftService::new(employees.clone(), shifts.clone()));
            let salary_service = Arc::new(SalaryService::new(
                employees.clone(),
                shifts.clone(),
                salaries.clone(),
            ));
            let offday_service = Arc::new(OffdayService::new(employees.clone(), offdays.clone()));
            let registry = standard_registry(
                shift_service.clone(),
                salary_service.clone(),
                offday_service.clone(),
            );
            let workflow = Arc::new(ApprovalWorkflow::new(
                settings.clone(),
                Arc::new(InMemoryMemberRepository::default()),
                Arc::new(InMemoryRequestRepository::default()),
                employees.clone(),
                Arc::new(RecordingNotifier::default()),
                Arc::new(registry),
            ));

            Self {
                employees,
                shifts,
                settings,
                state: HrState {
                    workflow,
                    shifts: shift_service,
                    salaries: salary_service,
                    offdays: offday_service,
                },
            }
        }

        fn state(&self) -> State<HrState> {
            State(self.state.clone())
        }

        async fn employee(&self, first_name: &str, phone: &str) -> EmployeeId {
            self.employees
                .insert(NewEmployee {
                    first_name: first_name.to_string(),
                    last_name: "Nasser".to_string(),
                    phone: phone.to_string(),
                    monthly_salary: Decimal::new(3_000_00, 2),
                    joining_date: date("2024-01-01"),
                    is_active: true,
                })
                .await
                .expect("insert employee")
                .id
        }

        async fn shift_type(&self) -> i64 {
            self.shifts
                .insert_shift_type(NewShiftType {
                    name: "Morning".to_string(),
                    start_minute: 8 * 60,
                    end_minute: 16 * 60,
                })
                .await
                .expect("shift type")
                .id
                .0
        }

        async fn gate(&self, action_type: ApprovalRequestType, reviewer: EmployeeId) {
            self.settings
                .upsert(ApprovalModule::Hr, action_type, true, 1)
                .await
                .expect("enable setting");
            self.state
                .workflow
                .add_member(NewMemberInput {
                    employee_id: reviewer,
                    module: ApprovalModule::Hr,
                    action_types: vec![action_type],
                    added_by: 1,
                })
                .await
                .expect("panel member");
        }
    }

    #[tokio::test]
    async fn shift_assignment_runs_directly_when_approval_is_disabled() {
        let harness = Harness::new();
        let employee = harness.employee("Hala", "15550300").await;
        let shift_type = harness.shift_type().await;

        let (status, outcome) = assign_shift(
            harness.state(),
            Json(AssignShiftBody {
                employee_id: employee.0,
                shift_type_id: shift_type,
                effective_date: date("2025-04-01"),
                end_date: None,
                deduction_amount: None,
                requested_by: 1,
                remarks: None,
            }),
        )
        .await
        .expect("direct assignment");

        assert_eq!(status, StatusCode::CREATED);
        match outcome.0 {
            GateOutcome::Executed(shift) => {
                assert_eq!(shift.employee_id, employee);
                assert!(shift.is_active);
            }
            other => panic!("expected a direct assignment, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shift_assignment_is_parked_behind_approval_when_enabled() {
        let harness = Harness::new();
        let employee = harness.employee("Hala", "15550300").await;
        let reviewer = harness.employee("Omar", "15550301").await;
        let shift_type = harness.shift_type().await;
        harness.gate(ApprovalRequestType::Shift, reviewer).await;

        let (status, outcome) = assign_shift(
            harness.state(),
            Json(AssignShiftBody {
                employee_id: employee.0,
                shift_type_id: shift_type,
                effective_date: date("2025-04-01"),
                end_date: None,
                deduction_amount: None,
                requested_by: 1,
                remarks: Some("rotation".to_string()),
            }),
        )
        .await
        .expect("parked behind approval");

        assert_eq!(status, StatusCode::ACCEPTED);
        let request_id = match outcome.0 {
            GateOutcome::Submitted { approval_required, request_id, status } => {
                assert!(approval_required);
                assert_eq!(status, "PENDING");
                request_id
            }
            other => panic!("expected a parked request, got {other:?}"),
        };

        // No shift was assigned yet; the request carries the payload.
        assert!(harness
            .shifts
            .find_active_assignment(employee)
            .await
            .expect("lookup")
            .is_none());
        let request = harness
            .state
            .workflow
            .get_request(RequestId(request_id))
            .await
            .expect("stored request");
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.request_type, ApprovalRequestType::Shift);
    }

    #[tokio::test]
    async fn direct_salary_generation_applies_the_duplicate_guard() {
        let harness = Harness::new();
        let employee = harness.employee("Hala", "15550300").await;

        let (status, _) = generate_salary(
            harness.state(),
            Path(employee.0),
            Query(GenerateSalaryQuery {
                salary_month: date("2025-03-01"),
                requested_by: 1,
                remarks: None,
            }),
        )
        .await
        .expect("first generation");
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = generate_salary(
            harness.state(),
            Path(employee.0),
            Query(GenerateSalaryQuery {
                salary_month: date("2025-03-01"),
                requested_by: 1,
                remarks: None,
            }),
        )
        .await
        .expect_err("duplicate month");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.error_code, "validation");
    }

    #[tokio::test]
    async fn unknown_employees_map_to_not_found() {
        let harness = Harness::new();

        let (status, body) = generate_salary(
            harness.state(),
            Path(99),
            Query(GenerateSalaryQuery {
                salary_month: date("2025-03-01"),
                requested_by: 1,
                remarks: None,
            }),
        )
        .await
        .expect_err("unknown employee");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0.error_code, "not_found");
    }

    #[tokio::test]
    async fn bulk_offdays_run_directly_when_approval_is_disabled() {
        let harness = Harness::new();
        let employee = harness.employee("Hala", "15550300").await;

        let (status, outcome) = create_bulk_offdays(
            harness.state(),
            Json(BulkOffdaysBody {
                employee_id: employee.0,
                year: 2025,
                month: 4,
                offday_dates: vec![date("2025-04-04"), date("2025-04-11")],
                offday_type: OffdayType::Weekend,
                description: None,
                requested_by: 1,
                remarks: None,
            }),
        )
        .await
        .expect("direct bulk create");

        assert_eq!(status, StatusCode::CREATED);
        match outcome.0 {
            GateOutcome::Executed(created) => assert_eq!(created.total, 2),
            other => panic!("expected a direct outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_offday_is_parked_behind_the_dayoff_gate() {
        let harness = Harness::new();
        let employee = harness.employee("Hala", "15550300").await;
        let reviewer = harness.employee("Omar", "15550301").await;
        harness.gate(ApprovalRequestType::Dayoff, reviewer).await;

        let (status, outcome) = create_offday(
            harness.state(),
            Json(CreateOffdayBody {
                employee_id: employee.0,
                year: 2025,
                month: 4,
                offday_date: date("2025-04-04"),
                offday_type: OffdayType::Leave,
                description: Some("family day".to_string()),
                requested_by: 1,
                remarks: None,
            }),
        )
        .await
        .expect("parked request");
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(matches!(outcome.0, GateOutcome::Submitted { .. }));
    }
}

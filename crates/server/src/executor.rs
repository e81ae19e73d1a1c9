//! Runs the underlying HR operation once a request is fully approved.
//!
//! One handler per request type, looked up in a registry. Request types that
//! are valid in settings but have no handler (EMPLOYEE, ATTENDANCE,
//! EMPLOYEE_DEDUCTION) surface an error instead of silently doing nothing.
//! The reference stamp on the request row makes execution observable and
//! keeps a re-fired approval from performing the operation twice.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use storeops_core::domain::approval::{ApprovalRequest, ApprovalRequestType, ApprovalStatus};
use storeops_core::domain::employee::EmployeeId;
use storeops_core::{OffdayPayload, RequestPayload, ShiftPayload};
use storeops_db::repositories::{RepositoryError, RequestRepository};

use crate::workforce::{OffdayService, SalaryService, ShiftService, WorkforceError};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No executor registered for {request_type} requests")]
    UnsupportedRequestType { request_type: &'static str },
    #[error("request {request_id} carries a {request_type} payload of the wrong shape")]
    PayloadMismatch { request_id: i64, request_type: &'static str },
    #[error(transparent)]
    Workforce(#[from] WorkforceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What a handler performed, recorded on the request row afterwards.
/// `reference_count` is only set by batch operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub reference_id: i64,
    pub reference_count: Option<i64>,
}

impl ExecutionOutcome {
    fn single(reference_id: i64) -> Self {
        Self { reference_id, reference_count: None }
    }
}

#[async_trait]
pub trait ExecutionHandler: Send + Sync {
    async fn execute(&self, request: &ApprovalRequest) -> Result<ExecutionOutcome, ExecutionError>;
}

fn mismatch(request: &ApprovalRequest) -> ExecutionError {
    ExecutionError::PayloadMismatch {
        request_id: request.id.0,
        request_type: request.request_type.as_str(),
    }
}

pub struct ShiftExecutionHandler {
    shifts: Arc<ShiftService>,
}

impl ShiftExecutionHandler {
    pub fn new(shifts: Arc<ShiftService>) -> Self {
        Self { shifts }
    }
}

#[async_trait]
impl ExecutionHandler for ShiftExecutionHandler {
    async fn execute(&self, request: &ApprovalRequest) -> Result<ExecutionOutcome, ExecutionError> {
        let RequestPayload::Shift(payload) = &request.payload else {
            return Err(mismatch(request));
        };
        let stored = match payload {
            ShiftPayload::Assign(assign) => self.shifts.assign(assign).await?,
            ShiftPayload::Amend(amend) => self.shifts.amend(amend).await?,
        };
        Ok(ExecutionOutcome::single(stored.id.0))
    }
}

pub struct SalaryExecutionHandler {
    salaries: Arc<SalaryService>,
}

impl SalaryExecutionHandler {
    pub fn new(salaries: Arc<SalaryService>) -> Self {
        Self { salaries }
    }
}

#[async_trait]
impl ExecutionHandler for SalaryExecutionHandler {
    async fn execute(&self, request: &ApprovalRequest) -> Result<ExecutionOutcome, ExecutionError> {
        let RequestPayload::Salary(payload) = &request.payload else {
            return Err(mismatch(request));
        };
        let salary = self
            .salaries
            .generate_monthly(
                EmployeeId(payload.employee_id),
                payload.salary_month,
                request.requested_by,
            )
            .await?;
        Ok(ExecutionOutcome::single(salary.id.0))
    }
}

pub struct OffdayExecutionHandler {
    offdays: Arc<OffdayService>,
}

impl OffdayExecutionHandler {
    pub fn new(offdays: Arc<OffdayService>) -> Self {
        Self { offdays }
    }
}

#[async_trait]
impl ExecutionHandler for OffdayExecutionHandler {
    async fn execute(&self, request: &ApprovalRequest) -> Result<ExecutionOutcome, ExecutionError> {
        let RequestPayload::Dayoff(payload) = &request.payload else {
            return Err(mismatch(request));
        };
        match payload {
            OffdayPayload::Create(create) => {
                let offday = self.offdays.create(create).await?;
                Ok(ExecutionOutcome::single(offday.id.0))
            }
            OffdayPayload::Amend(amend) => {
                let offday = self.offdays.amend(amend).await?;
                Ok(ExecutionOutcome::single(offday.id.0))
            }
            OffdayPayload::Bulk(bulk) => {
                let outcome = self.offdays.create_bulk(bulk).await?;
                Ok(ExecutionOutcome {
                    reference_id: outcome.first_id.0,
                    reference_count: Some(outcome.total),
                })
            }
        }
    }
}

/// Dispatch table from request type to handler.
#[derive(Default)]
pub struct ExecutorRegistry {
    handlers: HashMap<ApprovalRequestType, Arc<dyn ExecutionHandler>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(
        mut self,
        request_type: ApprovalRequestType,
        handler: Arc<dyn ExecutionHandler>,
    ) -> Self {
        self.handlers.insert(request_type, handler);
        self
    }

    pub fn supports(&self, request_type: ApprovalRequestType) -> bool {
        self.handlers.contains_key(&request_type)
    }

    /// Execute an approved request's operation and stamp the reference on the
    /// row. Returns whether the request is in an executed state afterwards:
    /// false for a request that is not APPROVED, true without re-running for
    /// one already stamped.
    pub async fn execute_if_fully_approved(
        &self,
        requests: &dyn RequestRepository,
        request: &ApprovalRequest,
    ) -> Result<bool, ExecutionError> {
        if request.status != ApprovalStatus::Approved {
            return Ok(false);
        }
        if request.is_executed() {
            return Ok(true);
        }

        let handler = self.handlers.get(&request.request_type).ok_or(
            ExecutionError::UnsupportedRequestType {
                request_type: request.request_type.as_str(),
            },
        )?;
        let outcome = handler.execute(request).await?;

        let stamped = requests
            .stamp_reference(request.id, outcome.reference_id, outcome.reference_count)
            .await?;
        if stamped {
            info!(
                event_name = "executor.request_executed",
                request_id = request.id.0,
                request_type = request.request_type.as_str(),
                reference_id = outcome.reference_id,
                reference_count = outcome.reference_count,
                "approved request executed"
            );
        } else {
            warn!(
                event_name = "executor.reference_already_stamped",
                request_id = request.id.0,
                "request was stamped by another executor run"
            );
        }
        Ok(true)
    }
}

/// Registry with the three executable request types wired to their services.
pub fn standard_registry(
    shifts: Arc<ShiftService>,
    salaries: Arc<SalaryService>,
    offdays: Arc<OffdayService>,
) -> ExecutorRegistry {
    ExecutorRegistry::new()
        .with_handler(
            ApprovalRequestType::Shift,
            Arc::new(ShiftExecutionHandler::new(shifts)),
        )
        .with_handler(
            ApprovalRequestType::Salary,
            Arc::new(SalaryExecutionHandler::new(salaries)),
        )
        .with_handler(
            ApprovalRequestType::Dayoff,
            Arc::new(OffdayExecutionHandler::new(offdays)),
        )
}

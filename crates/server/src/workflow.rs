//! The approval orchestrator: request creation, vote processing, panel and
//! settings administration.
//!
//! All collaborators are injected at construction. Votes are processed
//! synchronously; the only suspension points are repository and notifier I/O.
//! The PENDING to terminal flip is a compare-and-swap in the request store,
//! and only the caller that observed the flip invokes the executor, so an
//! approved request's operation runs at most once even under concurrent
//! votes.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use storeops_core::domain::approval::{
    ApprovalMember, ApprovalModule, ApprovalRequest, ApprovalRequestType, ApprovalSetting,
    ApprovalStatus, MemberId, RequestId, ResponseStatus,
};
use storeops_core::domain::employee::EmployeeId;
use storeops_core::{authorize_vote, decide, Decision, RequestPayload, ResponseState, VoteAction, VoteError};
use storeops_db::repositories::{
    EmployeeRepository, MemberFilter, MemberRepository, NewApprovalMember, NewApprovalRequest,
    PageRequest, Paginated, PanelSeat, RepositoryError, RequestFilter, RequestRepository,
    SettingsRepository,
};
use storeops_notify::{messages, Notifier};

use crate::executor::{ExecutionError, ExecutorRegistry};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Approval is not enabled for {module} {action_type}")]
    ApprovalNotEnabled { module: &'static str, action_type: &'static str },
    #[error("No eligible approval members for {module} {action_type}")]
    NoEligibleApprovers { module: &'static str, action_type: &'static str },
    #[error("Request type {expected} does not match the {actual} payload")]
    PayloadMismatch { expected: &'static str, actual: &'static str },
    #[error("Approval request not found")]
    RequestNotFound,
    #[error("Request is {status}, only APPROVED requests can be executed")]
    RequestNotExecutable { status: &'static str },
    #[error("Approval member not found")]
    MemberNotFound,
    #[error("Employee {0} not found")]
    EmployeeNotFound(i64),
    #[error("Employee {0} is not active")]
    EmployeeInactive(i64),
    #[error("At least one action type is required")]
    EmptyActionTypes,
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Input for [`ApprovalWorkflow::create_request`].
#[derive(Clone, Debug)]
pub struct NewRequestInput {
    pub request_type: ApprovalRequestType,
    pub module: ApprovalModule,
    pub employee_id: EmployeeId,
    pub requested_by: i64,
    pub payload: RequestPayload,
    pub remarks: Option<String>,
}

/// Input for [`ApprovalWorkflow::add_member`].
#[derive(Clone, Debug)]
pub struct NewMemberInput {
    pub employee_id: EmployeeId,
    pub module: ApprovalModule,
    pub action_types: Vec<ApprovalRequestType>,
    pub added_by: i64,
}

#[derive(Clone, Debug)]
pub struct SettingUpdate {
    pub module: ApprovalModule,
    pub action_type: ApprovalRequestType,
    pub is_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct ModuleSettings {
    pub module: ApprovalModule,
    pub settings: Vec<ApprovalSetting>,
}

#[derive(Clone, Debug)]
pub struct ModuleMembers {
    pub module: ApprovalModule,
    pub members: Vec<ApprovalMember>,
}

pub struct ApprovalWorkflow {
    settings: Arc<dyn SettingsRepository>,
    members: Arc<dyn MemberRepository>,
    requests: Arc<dyn RequestRepository>,
    employees: Arc<dyn EmployeeRepository>,
    notifier: Arc<dyn Notifier>,
    executor: Arc<ExecutorRegistry>,
}

impl ApprovalWorkflow {
    pub fn new(
        settings: Arc<dyn SettingsRepository>,
        members: Arc<dyn MemberRepository>,
        requests: Arc<dyn RequestRepository>,
        employees: Arc<dyn EmployeeRepository>,
        notifier: Arc<dyn Notifier>,
        executor: Arc<ExecutorRegistry>,
    ) -> Self {
        Self { settings, members, requests, employees, notifier, executor }
    }

    /// An absent settings row means the operation runs directly, without
    /// approval.
    pub async fn is_approval_enabled(
        &self,
        module: ApprovalModule,
        action_type: ApprovalRequestType,
    ) -> Result<bool, WorkflowError> {
        let setting = self.settings.get(module, action_type).await?;
        Ok(setting.is_some_and(|s| s.is_enabled))
    }

    /// Create a request with one PENDING response slot per eligible member,
    /// then broadcast to the panel. The panel is snapshotted here; later
    /// membership changes do not alter who may vote.
    pub async fn create_request(
        &self,
        input: NewRequestInput,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let correlation_id = Uuid::new_v4();
        let actual = input.payload.request_type();
        if actual != input.request_type {
            return Err(WorkflowError::PayloadMismatch {
                expected: input.request_type.as_str(),
                actual: actual.as_str(),
            });
        }

        if !self.is_approval_enabled(input.module, input.request_type).await? {
            return Err(WorkflowError::ApprovalNotEnabled {
                module: input.module.as_str(),
                action_type: input.request_type.as_str(),
            });
        }

        let panel = self.members.list_eligible(input.module, input.request_type).await?;
        if panel.is_empty() {
            return Err(WorkflowError::NoEligibleApprovers {
                module: input.module.as_str(),
                action_type: input.request_type.as_str(),
            });
        }

        let seats: Vec<PanelSeat> = panel
            .iter()
            .map(|member| PanelSeat { member_id: member.id, employee_id: member.employee_id })
            .collect();
        let request = self
            .requests
            .create(
                NewApprovalRequest {
                    employee_id: input.employee_id,
                    requested_by: input.requested_by,
                    payload: input.payload,
                    remarks: input.remarks,
                },
                &seats,
            )
            .await?;

        info!(
            event_name = "workflow.request_created",
            correlation_id = %correlation_id,
            request_id = request.id.0,
            request_type = request.request_type.as_str(),
            panel_size = panel.len(),
            "approval request created"
        );

        for member in &panel {
            self.notify(
                member.employee_id,
                |first_name| messages::review_broadcast(first_name, request.request_type, request.id),
                request.id,
            )
            .await;
        }

        Ok(request)
    }

    /// Record one member's verdict and advance the request. Returns the
    /// reloaded request with its responses.
    pub async fn respond(
        &self,
        request_id: RequestId,
        voter: EmployeeId,
        action: VoteAction,
        comments: Option<String>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let correlation_id = Uuid::new_v4();
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(WorkflowError::RequestNotFound)?;

        let mut states: Vec<ResponseState> = request
            .responses
            .iter()
            .map(|response| ResponseState {
                member_id: response.member_id,
                employee_id: response.member_employee_id,
                status: response.status,
            })
            .collect();
        let member_id = authorize_vote(request.status, &states, voter)?;

        let now = Utc::now();
        let recorded = self
            .requests
            .record_response(request_id, member_id, action.as_response_status(), comments.as_deref(), now)
            .await?;
        if !recorded {
            // Another vote from this member landed between the load and the
            // write.
            return Err(WorkflowError::Vote(VoteError::AlreadyResponded));
        }
        if let Some(state) = states.iter_mut().find(|s| s.member_id == member_id) {
            state.status = action.as_response_status();
        }
        info!(
            event_name = "workflow.vote_recorded",
            correlation_id = %correlation_id,
            request_id = request_id.0,
            member_id = member_id.0,
            action = ?action,
            "vote recorded"
        );

        match decide(&states) {
            Decision::Rejected => {
                if self.requests.resolve(request_id, ApprovalStatus::Rejected, now).await? {
                    info!(
                        event_name = "workflow.request_rejected",
                        correlation_id = %correlation_id,
                        request_id = request_id.0,
                        "request rejected"
                    );
                }
            }
            Decision::Approved => {
                // The CAS winner is the only caller that executes.
                if self.requests.resolve(request_id, ApprovalStatus::Approved, now).await? {
                    info!(
                        event_name = "workflow.request_approved",
                        correlation_id = %correlation_id,
                        request_id = request_id.0,
                        "request approved by all members"
                    );
                    let approved = self
                        .requests
                        .find_by_id(request_id)
                        .await?
                        .ok_or(WorkflowError::RequestNotFound)?;
                    self.executor
                        .execute_if_fully_approved(self.requests.as_ref(), &approved)
                        .await?;
                }
            }
            Decision::AwaitingOthers { next_reviewer } => {
                self.notify(
                    next_reviewer,
                    |first_name| messages::turn_nudge(first_name, request.request_type, request.id),
                    request.id,
                )
                .await;
            }
        }

        self.requests.find_by_id(request_id).await?.ok_or(WorkflowError::RequestNotFound)
    }

    /// Re-run the operation of an APPROVED request whose execution failed
    /// after the terminal flip. The reference stamp makes this safe to call
    /// any number of times; an already-executed request is returned as is.
    pub async fn execute_approved(
        &self,
        request_id: RequestId,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(WorkflowError::RequestNotFound)?;
        if request.status != ApprovalStatus::Approved {
            return Err(WorkflowError::RequestNotExecutable { status: request.status.as_str() });
        }
        if !request.is_executed() {
            self.executor
                .execute_if_fully_approved(self.requests.as_ref(), &request)
                .await?;
            info!(
                event_name = "workflow.execution_retried",
                request_id = request_id.0,
                request_type = request.request_type.as_str(),
                "approved request re-executed"
            );
        }
        self.requests.find_by_id(request_id).await?.ok_or(WorkflowError::RequestNotFound)
    }

    pub async fn pending_for_member(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<ApprovalRequest>, WorkflowError> {
        Ok(self.requests.list_pending_for_employee(employee_id).await?)
    }

    pub async fn get_request(&self, id: RequestId) -> Result<ApprovalRequest, WorkflowError> {
        self.requests.find_by_id(id).await?.ok_or(WorkflowError::RequestNotFound)
    }

    pub async fn list_requests(
        &self,
        page: PageRequest,
        filter: RequestFilter,
    ) -> Result<Paginated<ApprovalRequest>, WorkflowError> {
        Ok(self.requests.list(page, filter).await?)
    }

    /// Add a panel member. Re-adding an active (employee, module) pair unions
    /// the new action types into the existing row.
    pub async fn add_member(
        &self,
        input: NewMemberInput,
    ) -> Result<ApprovalMember, WorkflowError> {
        let mut action_types = input.action_types;
        action_types.sort_by_key(|a| a.as_str());
        action_types.dedup();
        if action_types.is_empty() {
            return Err(WorkflowError::EmptyActionTypes);
        }

        let employee = self
            .employees
            .find_by_id(input.employee_id)
            .await?
            .ok_or(WorkflowError::EmployeeNotFound(input.employee_id.0))?;
        if !employee.is_active {
            return Err(WorkflowError::EmployeeInactive(input.employee_id.0));
        }

        let member = match self.members.find_active(input.employee_id, input.module).await? {
            Some(existing) => self.members.add_action_types(existing.id, &action_types).await?,
            None => {
                self.members
                    .insert(NewApprovalMember {
                        employee_id: input.employee_id,
                        module: input.module,
                        action_types,
                        added_by: input.added_by,
                    })
                    .await?
            }
        };
        info!(
            event_name = "workflow.member_added",
            member_id = member.id.0,
            employee_id = member.employee_id.0,
            module = member.module.as_str(),
            "approval member added"
        );
        Ok(member)
    }

    /// Remove a member and their still-PENDING response slots. Terminal
    /// requests keep their history, and open requests are not re-evaluated;
    /// they resolve through the remaining members' votes.
    pub async fn remove_member(
        &self,
        member_id: MemberId,
        module: ApprovalModule,
    ) -> Result<(), WorkflowError> {
        let member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or(WorkflowError::MemberNotFound)?;
        if member.module != module {
            return Err(WorkflowError::MemberNotFound);
        }

        let cleared = self.requests.delete_pending_responses_for_member(member_id).await?;
        self.members.delete(member_id).await?;
        info!(
            event_name = "workflow.member_removed",
            member_id = member_id.0,
            module = module.as_str(),
            pending_responses_cleared = cleared,
            "approval member removed"
        );
        Ok(())
    }

    pub async fn list_members(
        &self,
        page: PageRequest,
        filter: MemberFilter,
    ) -> Result<Paginated<ApprovalMember>, WorkflowError> {
        Ok(self.members.list(page, filter).await?)
    }

    pub async fn members_by_module(&self) -> Result<Vec<ModuleMembers>, WorkflowError> {
        let members = self.members.list_all_active().await?;
        Ok(group_by_module(members, |m| m.module, |module, members| ModuleMembers {
            module,
            members,
        }))
    }

    pub async fn settings_grouped(&self) -> Result<Vec<ModuleSettings>, WorkflowError> {
        let settings = self.settings.list().await?;
        Ok(group_by_module(settings, |s| s.module, |module, settings| ModuleSettings {
            module,
            settings,
        }))
    }

    pub async fn update_settings(
        &self,
        entries: Vec<SettingUpdate>,
        updated_by: i64,
    ) -> Result<Vec<ModuleSettings>, WorkflowError> {
        for entry in &entries {
            self.settings
                .upsert(entry.module, entry.action_type, entry.is_enabled, updated_by)
                .await?;
            info!(
                event_name = "workflow.setting_updated",
                module = entry.module.as_str(),
                action_type = entry.action_type.as_str(),
                is_enabled = entry.is_enabled,
                "approval setting updated"
            );
        }
        self.settings_grouped().await
    }

    /// Deliver one reviewer message, swallowing every failure. A lost message
    /// must never lose a request.
    async fn notify<F>(&self, employee_id: EmployeeId, body: F, request_id: RequestId)
    where
        F: FnOnce(&str) -> String,
    {
        let employee = match self.employees.find_by_id(employee_id).await {
            Ok(Some(employee)) => employee,
            Ok(None) => {
                warn!(
                    event_name = "workflow.notification_skipped",
                    request_id = request_id.0,
                    employee_id = employee_id.0,
                    "reviewer employee row is missing"
                );
                return;
            }
            Err(error) => {
                warn!(
                    event_name = "workflow.notification_skipped",
                    request_id = request_id.0,
                    employee_id = employee_id.0,
                    error = %error,
                    "reviewer lookup failed"
                );
                return;
            }
        };

        if let Err(error) = self.notifier.send(&employee.phone, &body(&employee.first_name)).await {
            warn!(
                event_name = "workflow.notification_failed",
                request_id = request_id.0,
                employee_id = employee_id.0,
                error = %error,
                "reviewer notification failed"
            );
        }
    }
}

fn group_by_module<T, G>(
    rows: Vec<T>,
    module_of: impl Fn(&T) -> ApprovalModule,
    build: impl Fn(ApprovalModule, Vec<T>) -> G,
) -> Vec<G> {
    let mut groups: Vec<(ApprovalModule, Vec<T>)> = Vec::new();
    for row in rows {
        let module = module_of(&row);
        match groups.iter_mut().find(|(m, _)| *m == module) {
            Some((_, rows)) => rows.push(row),
            None => groups.push((module, vec![row])),
        }
    }
    groups.into_iter().map(|(module, rows)| build(module, rows)).collect()
}

//! Approval decision rules, kept free of storage and transport concerns.
//!
//! A request is born PENDING with one snapshotted response slot per eligible
//! member. Members then vote exactly once. The rules are deliberately blunt:
//! one rejection resolves the request REJECTED on the spot, and approval
//! requires every member, not a quorum. These functions operate on plain
//! response snapshots so the same logic backs the SQL and in-memory stores.

pub mod payload;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::approval::{ApprovalStatus, MemberId, ResponseStatus, UnknownEnumValue};
use crate::domain::employee::EmployeeId;

/// The slice of a stored response the decision rules need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseState {
    pub member_id: MemberId,
    pub employee_id: EmployeeId,
    pub status: ResponseStatus,
}

/// A member's verdict as submitted over the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Approve,
    Reject,
}

impl VoteAction {
    pub fn as_response_status(&self) -> ResponseStatus {
        match self {
            Self::Approve => ResponseStatus::Approved,
            Self::Reject => ResponseStatus::Rejected,
        }
    }
}

impl std::str::FromStr for VoteAction {
    type Err = UnknownEnumValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(UnknownEnumValue { kind: "action", value: other.to_string() }),
        }
    }
}

/// Why a vote cannot be recorded. Messages are the API detail strings.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("Request is already {}", status.as_str())]
    AlreadyResolved { status: ApprovalStatus },
    #[error("You are not authorized to approve this request")]
    NotAuthorized,
    #[error("You have already responded to this request")]
    AlreadyResponded,
}

/// Check that `voter` may vote on a request in `request_status` with the given
/// response snapshots, returning the member row the verdict lands on.
///
/// The checks run in a fixed order so callers surface the same failure the
/// API has always reported: resolved first, then membership, then double
/// voting.
pub fn authorize_vote(
    request_status: ApprovalStatus,
    responses: &[ResponseState],
    voter: EmployeeId,
) -> Result<MemberId, VoteError> {
    if request_status.is_terminal() {
        return Err(VoteError::AlreadyResolved { status: request_status });
    }

    let own = responses
        .iter()
        .find(|response| response.employee_id == voter)
        .ok_or(VoteError::NotAuthorized)?;

    if own.status != ResponseStatus::Pending {
        return Err(VoteError::AlreadyResponded);
    }

    Ok(own.member_id)
}

/// Aggregate outcome of a request's response snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Every member approved.
    Approved,
    /// At least one member rejected; remaining votes are moot.
    Rejected,
    /// Still open. `next_reviewer` is the earliest member yet to vote, in
    /// response creation order, and is the one to nudge.
    AwaitingOthers { next_reviewer: EmployeeId },
}

/// Fold response snapshots into the request-level outcome. Call after
/// recording a verdict; a rejection wins over everything else.
pub fn decide(responses: &[ResponseState]) -> Decision {
    if responses.iter().any(|response| response.status == ResponseStatus::Rejected) {
        return Decision::Rejected;
    }

    match responses.iter().find(|response| response.status == ResponseStatus::Pending) {
        Some(next) => Decision::AwaitingOthers { next_reviewer: next.employee_id },
        None => Decision::Approved,
    }
}

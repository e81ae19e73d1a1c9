//! Reviewer-facing message templates.
//!
//! Two messages exist: the broadcast every panel member gets when a request is
//! created, and the singular nudge the next still-pending member gets after a
//! partial approval.

use storeops_core::domain::approval::{ApprovalRequestType, RequestId};

pub fn review_broadcast(
    first_name: &str,
    request_type: ApprovalRequestType,
    request_id: RequestId,
) -> String {
    format!(
        "Dear {first_name},\n\n\
         You have a new approval request to review.\n\n\
         Type: {request_type}\n\
         Request ID: {request_id}\n\n\
         Please login to the system to approve or reject this request.",
        request_type = request_type.as_str(),
        request_id = request_id.0,
    )
}

pub fn turn_nudge(
    first_name: &str,
    request_type: ApprovalRequestType,
    request_id: RequestId,
) -> String {
    format!(
        "Dear {first_name},\n\n\
         It is your turn to review approval request {request_id}.\n\n\
         Type: {request_type}\n\n\
         Please login to the system to approve or reject this request.",
        request_type = request_type.as_str(),
        request_id = request_id.0,
    )
}

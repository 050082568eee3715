use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{GroupId, UserId};

/// An inbox entry for one user.
///
/// The payload is a tagged variant per notification kind rather than one
/// bag of optional fields; the tag serializes as the `type` field so stored
/// records keep the original wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(flatten)]
    pub payload: NotificationPayload,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// To the creator: someone wants in. Consumed when resolved.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        group_id: GroupId,
        group_name: String,
        requester_id: UserId,
        requester_name: String,
        status: RequestStatus,
    },
    /// To the requester: your request went out.
    #[serde(rename_all = "camelCase")]
    JoinRequestSent {
        group_id: GroupId,
        group_name: String,
        status: RequestStatus,
    },
    /// To the requester: the creator decided.
    #[serde(rename_all = "camelCase")]
    JoinRequestResponse {
        group_id: GroupId,
        group_name: String,
        status: RequestStatus,
    },
    /// To the creator: a record of the decision they made.
    #[serde(rename_all = "camelCase")]
    JoinRequestAction {
        group_id: GroupId,
        group_name: String,
        requester_name: String,
        status: RequestStatus,
    },
    /// To a removed member.
    #[serde(rename_all = "camelCase")]
    GroupRemoval {
        group_id: GroupId,
        group_name: String,
    },
    Generic { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

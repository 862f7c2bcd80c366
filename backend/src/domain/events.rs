//! Domain events: immutable descriptions of "what happened".
//!
//! A [`DomainEvent`] is constructed at the point of mutation, handed to the
//! event bus, consumed by zero or more handlers and then discarded. It is
//! never persisted directly; the audit log and notification feed store their
//! own projections of it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{BoardId, CardId, ListId, TeamId, UserId};

/// Closed taxonomy of event producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    CardCreated,
    CardUpdated,
    CardMoved,
    CardDeleted,
    CardAssigned,
    CardCommented,
    CommentReplied,
    MemberMentioned,
    ChecklistChanged,
    AttachmentAdded,
    DeadlineNear,
    BoardCreated,
    BoardUpdated,
    BoardDeleted,
    ListCreated,
    ListUpdated,
    ListDeleted,
    TeamCreated,
    TeamUpdated,
    TeamDeleted,
    InvitationSent,
    InvitationAccepted,
    InvitationRejected,
    MemberRemoved,
    NoticeCreated,
    NoticeUpdated,
    NoticeDeleted,
}

impl EventKind {
    /// Dotted lowercase label used in notification records, audit entries
    /// and realtime payloads.
    pub const fn label(self) -> &'static str {
        match self {
            Self::CardCreated => "card.created",
            Self::CardUpdated => "card.updated",
            Self::CardMoved => "card.moved",
            Self::CardDeleted => "card.deleted",
            Self::CardAssigned => "card.assigned",
            Self::CardCommented => "card.commented",
            Self::CommentReplied => "comment.replied",
            Self::MemberMentioned => "member.mentioned",
            Self::ChecklistChanged => "checklist.changed",
            Self::AttachmentAdded => "attachment.added",
            Self::DeadlineNear => "deadline.near",
            Self::BoardCreated => "board.created",
            Self::BoardUpdated => "board.updated",
            Self::BoardDeleted => "board.deleted",
            Self::ListCreated => "list.created",
            Self::ListUpdated => "list.updated",
            Self::ListDeleted => "list.deleted",
            Self::TeamCreated => "team.created",
            Self::TeamUpdated => "team.updated",
            Self::TeamDeleted => "team.deleted",
            Self::InvitationSent => "invitation.sent",
            Self::InvitationAccepted => "invitation.accepted",
            Self::InvitationRejected => "invitation.rejected",
            Self::MemberRemoved => "member.removed",
            Self::NoticeCreated => "notice.created",
            Self::NoticeUpdated => "notice.updated",
            Self::NoticeDeleted => "notice.deleted",
        }
    }

    /// Recurring alerts need idempotent notification appends; everything
    /// else is a one-shot event.
    pub const fn is_recurring_alert(self) -> bool {
        matches!(self, Self::DeadlineNear)
    }

    /// Whether this kind concerns a team-scoped subject (team or notice
    /// lifecycle) and therefore broadcasts on the team topic.
    pub const fn is_team_scoped(self) -> bool {
        matches!(
            self,
            Self::TeamCreated
                | Self::TeamUpdated
                | Self::TeamDeleted
                | Self::NoticeCreated
                | Self::NoticeUpdated
                | Self::NoticeDeleted
        )
    }
}

/// Identifiers of the entities an event touches.
///
/// `user_id` names the user the event is *about* (assignee, invitee,
/// mentioned user) as opposed to `actor_id`, the user who caused it. The
/// notification writer treats `user_id` as the recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubjects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<BoardId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<ListId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<CardId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// A single changed field with before/after snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Immutable value describing a completed mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub actor_id: UserId,
    #[serde(flatten)]
    pub subjects: EventSubjects,
    pub changes: Vec<FieldChange>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Build an event with no field changes.
    pub fn new(
        kind: EventKind,
        actor_id: UserId,
        subjects: EventSubjects,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            actor_id,
            subjects,
            changes: Vec::new(),
            occurred_at,
        }
    }

    /// Append a before/after snapshot for one field.
    pub fn with_change(
        mut self,
        field: impl Into<String>,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Self {
        self.changes.push(FieldChange {
            field: field.into(),
            before,
            after,
        });
        self
    }

    /// Look up the change recorded for a field, if any.
    pub fn change(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|change| change.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_follow_dotted_convention() {
        assert_eq!(EventKind::CardMoved.label(), "card.moved");
        assert_eq!(EventKind::DeadlineNear.label(), "deadline.near");
    }

    #[test]
    fn only_deadline_is_recurring() {
        assert!(EventKind::DeadlineNear.is_recurring_alert());
        assert!(!EventKind::CardMoved.is_recurring_alert());
    }

    #[test]
    fn change_lookup_finds_recorded_field() {
        let event = DomainEvent::new(
            EventKind::CardMoved,
            UserId::random(),
            EventSubjects::default(),
            Utc::now(),
        )
        .with_change("listId", Some(json!("a")), Some(json!("b")));

        let change = event.change("listId").expect("recorded change");
        assert_eq!(change.before, Some(json!("a")));
        assert!(event.change("orderIndex").is_none());
    }

    #[test]
    fn subjects_flatten_into_payload() {
        let board = BoardId::random();
        let event = DomainEvent::new(
            EventKind::BoardUpdated,
            UserId::random(),
            EventSubjects {
                board_id: Some(board),
                ..EventSubjects::default()
            },
            Utc::now(),
        );
        let value = serde_json::to_value(&event).expect("serialise event");
        assert_eq!(value["type"], json!("BOARD_UPDATED"));
        assert_eq!(value["boardId"], json!(board.to_string()));
        assert!(value.get("teamId").is_none());
    }
}

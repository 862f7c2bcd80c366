//! Per-user notification feed policy and the event-bus writer.
//!
//! The service layer owns the rules the feed adapter cannot enforce on its
//! own: a receiver is never notified of their own action, and recurring
//! alerts (deadline reminders) append at most once per dedup window. The
//! adapter owns the cap, the TTL and in-place read state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use crate::domain::event_bus::EventHandler;
use crate::domain::ports::{
    DedupMarkerError, DedupMarkerStore, NotificationCommand, NotificationFeed,
    NotificationFeedError, NotificationQuery,
};
use crate::domain::{
    CardId, DomainEvent, Error, EventKind, NotificationId, UserId,
};

/// Maximum entries retained per receiver; older entries are evicted.
pub const FEED_CAP: usize = 50;

/// Feed retention window; the pruning job removes older entries even when
/// the feed is under the cap.
pub const FEED_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One entry in a receiver's feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub sender_id: UserId,
    /// Dotted event label, e.g. `card.moved`.
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub target_url: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Feed policy layer over the capped store and the dedup marker.
#[derive(Clone)]
pub struct NotificationService<F, M> {
    feed: Arc<F>,
    markers: Arc<M>,
    clock: Arc<dyn Clock>,
}

impl<F, M> NotificationService<F, M> {
    /// Create a service over the given adapters.
    pub fn new(feed: Arc<F>, markers: Arc<M>, clock: Arc<dyn Clock>) -> Self {
        Self {
            feed,
            markers,
            clock,
        }
    }
}

fn map_feed_error(error: NotificationFeedError) -> Error {
    match error {
        NotificationFeedError::Connection { message } => {
            Error::service_unavailable(format!("notification feed unavailable: {message}"))
        }
        NotificationFeedError::Command { message } => {
            Error::internal(format!("notification feed error: {message}"))
        }
        NotificationFeedError::Serialization { message } => {
            Error::internal(format!("notification feed serialization failed: {message}"))
        }
    }
}

fn map_marker_error(error: DedupMarkerError) -> Error {
    match error {
        DedupMarkerError::Connection { message } => {
            Error::service_unavailable(format!("dedup marker store unavailable: {message}"))
        }
        DedupMarkerError::Command { message } => {
            Error::internal(format!("dedup marker error: {message}"))
        }
    }
}

impl<F, M> NotificationService<F, M>
where
    F: NotificationFeed,
    M: DedupMarkerStore,
{
    /// Append a record to the receiver's feed. Returns `false` without
    /// appending when the receiver caused the event themselves.
    pub async fn notify(
        &self,
        receiver: UserId,
        record: NotificationRecord,
    ) -> Result<bool, Error> {
        if receiver == record.sender_id {
            return Ok(false);
        }
        self.feed
            .append(receiver, record)
            .await
            .map_err(map_feed_error)?;
        Ok(true)
    }

    /// Append a recurring alert at most once per `(card, window)`. The
    /// marker is written here, on append, so a duplicate event delivered
    /// within the window cannot produce a second record.
    pub async fn notify_once(
        &self,
        receiver: UserId,
        card_id: CardId,
        window: Duration,
        record: NotificationRecord,
    ) -> Result<bool, Error> {
        if receiver == record.sender_id {
            return Ok(false);
        }
        let newly_set = self
            .markers
            .acquire(card_id, window)
            .await
            .map_err(map_marker_error)?;
        if !newly_set {
            return Ok(false);
        }
        self.feed
            .append(receiver, record)
            .await
            .map_err(map_feed_error)?;
        Ok(true)
    }

    /// Remove entries older than the retention window from the receiver's
    /// feed. Returns the number removed.
    pub async fn prune(&self, receiver: UserId) -> Result<u64, Error> {
        let cutoff = self.clock.utc()
            - chrono::Duration::from_std(FEED_TTL)
                .map_err(|e| Error::internal(format!("retention window out of range: {e}")))?;
        self.feed
            .prune(receiver, cutoff)
            .await
            .map_err(map_feed_error)
    }
}

#[async_trait]
impl<F, M> NotificationQuery for NotificationService<F, M>
where
    F: NotificationFeed,
    M: DedupMarkerStore,
{
    async fn list(&self, receiver: UserId) -> Result<Vec<NotificationRecord>, Error> {
        self.feed.list(receiver).await.map_err(map_feed_error)
    }
}

#[async_trait]
impl<F, M> NotificationCommand for NotificationService<F, M>
where
    F: NotificationFeed,
    M: DedupMarkerStore,
{
    async fn mark_read(&self, receiver: UserId, id: NotificationId) -> Result<bool, Error> {
        self.feed
            .mark_read(receiver, id)
            .await
            .map_err(map_feed_error)
    }

    async fn mark_all_read(&self, receiver: UserId) -> Result<u64, Error> {
        self.feed
            .mark_all_read(receiver)
            .await
            .map_err(map_feed_error)
    }
}

/// Event-bus subscriber turning events into feed records.
///
/// Recipient resolution is the event's target user (`subjects.user_id`);
/// events about nobody in particular produce no record. Failures propagate
/// to the bus, which logs and drops them — a lost notification never rolls
/// back the mutation that caused it.
pub struct NotificationWriter<F, M> {
    notifications: Arc<NotificationService<F, M>>,
    clock: Arc<dyn Clock>,
}

impl<F, M> NotificationWriter<F, M> {
    /// Create a writer over the given service.
    pub fn new(notifications: Arc<NotificationService<F, M>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            notifications,
            clock,
        }
    }
}

fn message_for(event: &DomainEvent) -> String {
    match event.kind {
        EventKind::CardMoved => "A card you follow was moved".into(),
        EventKind::CardAssigned => "You were assigned to a card".into(),
        EventKind::CardCommented => "New comment on your card".into(),
        EventKind::CommentReplied => "Someone replied to your comment".into(),
        EventKind::MemberMentioned => "You were mentioned".into(),
        EventKind::DeadlineNear => "A card assigned to you is due within 24 hours".into(),
        EventKind::InvitationSent => "You were invited to a board".into(),
        EventKind::MemberRemoved => "You were removed from a board".into(),
        kind => kind.label().replace('.', " "),
    }
}

fn target_url_for(event: &DomainEvent) -> String {
    match (event.subjects.board_id, event.subjects.card_id) {
        (Some(board), Some(card)) => format!("/boards/{board}/cards/{card}"),
        (Some(board), None) => format!("/boards/{board}"),
        (None, _) => event
            .subjects
            .team_id
            .map(|team| format!("/teams/{team}"))
            .unwrap_or_else(|| "/".into()),
    }
}

/// Remaining time until the due instant recorded on a deadline event; the
/// marker must not outlive the deadline itself.
fn deadline_window(event: &DomainEvent, now: DateTime<Utc>) -> Option<Duration> {
    let change = event.change("dueAt")?;
    let due_at = change
        .after
        .as_ref()
        .and_then(|value| value.as_str())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())?
        .with_timezone(&Utc);
    (due_at - now).to_std().ok()
}

#[async_trait]
impl<F, M> EventHandler for NotificationWriter<F, M>
where
    F: NotificationFeed + 'static,
    M: DedupMarkerStore + 'static,
{
    fn name(&self) -> &'static str {
        "notification-writer"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), Error> {
        let Some(receiver) = event.subjects.user_id else {
            return Ok(());
        };

        let record = NotificationRecord {
            id: NotificationId::random(),
            sender_id: event.actor_id,
            kind: event.kind.label().into(),
            message: message_for(event),
            target_url: target_url_for(event),
            is_read: false,
            created_at: event.occurred_at,
        };

        if event.kind.is_recurring_alert() {
            let Some(card_id) = event.subjects.card_id else {
                return Ok(());
            };
            let Some(window) = deadline_window(event, self.clock.utc()) else {
                // Deadline already passed while the event sat in the queue.
                return Ok(());
            };
            self.notifications
                .notify_once(receiver, card_id, window, record)
                .await?;
        } else {
            self.notifications.notify(receiver, record).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FixtureDedupMarkerStore, FixtureNotificationFeed};
    use crate::domain::{BoardId, EventSubjects};
    use mockable::DefaultClock;
    use serde_json::json;

    type FixtureService = NotificationService<FixtureNotificationFeed, FixtureDedupMarkerStore>;

    fn service() -> Arc<FixtureService> {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        Arc::new(NotificationService::new(
            Arc::new(FixtureNotificationFeed::new()),
            Arc::new(FixtureDedupMarkerStore::new(Arc::clone(&clock))),
            clock,
        ))
    }

    fn record(sender: UserId) -> NotificationRecord {
        NotificationRecord {
            id: NotificationId::random(),
            sender_id: sender,
            kind: "card.moved".into(),
            message: "A card you follow was moved".into(),
            target_url: "/boards/b/cards/c".into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn feed_keeps_only_the_fifty_most_recent() {
        let service = service();
        let receiver = UserId::random();
        let sender = UserId::random();

        let mut ids = Vec::new();
        for _ in 0..60 {
            let entry = record(sender);
            ids.push(entry.id);
            assert!(service
                .notify(receiver, entry)
                .await
                .expect("notify succeeds"));
        }

        let feed = service.list(receiver).await.expect("list feed");
        assert_eq!(feed.len(), FEED_CAP);
        // Newest first; the ten oldest appends were evicted.
        assert_eq!(feed[0].id, ids[59]);
        assert_eq!(feed[FEED_CAP - 1].id, ids[10]);
    }

    #[tokio::test]
    async fn actors_never_notify_themselves() {
        let service = service();
        let user = UserId::random();

        let appended = service
            .notify(user, record(user))
            .await
            .expect("notify succeeds");
        assert!(!appended);
        assert!(service.list(user).await.expect("list feed").is_empty());
    }

    #[tokio::test]
    async fn recurring_alerts_append_once_per_window() {
        let service = service();
        let receiver = UserId::random();
        let sender = UserId::system();
        let card_id = CardId::random();
        let window = Duration::from_secs(3600);

        let first = service
            .notify_once(receiver, card_id, window, record(sender))
            .await
            .expect("first notify");
        let second = service
            .notify_once(receiver, card_id, window, record(sender))
            .await
            .expect("second notify");

        assert!(first);
        assert!(!second);
        assert_eq!(service.list(receiver).await.expect("list feed").len(), 1);
    }

    #[tokio::test]
    async fn mark_read_mutates_in_place() {
        let service = service();
        let receiver = UserId::random();
        let entry = record(UserId::random());
        let id = entry.id;
        service.notify(receiver, entry).await.expect("notify");

        assert!(service.mark_read(receiver, id).await.expect("mark read"));
        let feed = service.list(receiver).await.expect("list feed");
        assert_eq!(feed.len(), 1);
        assert!(feed[0].is_read);

        assert!(!service
            .mark_read(receiver, NotificationId::random())
            .await
            .expect("unknown id"));
    }

    #[tokio::test]
    async fn mark_all_read_counts_updates() {
        let service = service();
        let receiver = UserId::random();
        for _ in 0..3 {
            service
                .notify(receiver, record(UserId::random()))
                .await
                .expect("notify");
        }

        assert_eq!(service.mark_all_read(receiver).await.expect("mark all"), 3);
        assert_eq!(service.mark_all_read(receiver).await.expect("again"), 0);
    }

    #[tokio::test]
    async fn prune_drops_expired_and_keeps_read_state() {
        let service = service();
        let receiver = UserId::random();

        let mut stale = record(UserId::random());
        stale.created_at = Utc::now() - chrono::Duration::days(8);
        let mut fresh = record(UserId::random());
        fresh.is_read = true;
        let fresh_id = fresh.id;

        service.notify(receiver, stale).await.expect("notify stale");
        service.notify(receiver, fresh).await.expect("notify fresh");

        assert_eq!(service.prune(receiver).await.expect("prune"), 1);
        let feed = service.list(receiver).await.expect("list feed");
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, fresh_id);
        assert!(feed[0].is_read, "pruning must not reset read state");
    }

    #[tokio::test]
    async fn writer_skips_events_without_a_target_user() {
        let service = service();
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let writer = NotificationWriter::new(Arc::clone(&service), clock);

        let event = DomainEvent::new(
            EventKind::BoardUpdated,
            UserId::random(),
            EventSubjects {
                board_id: Some(BoardId::random()),
                ..EventSubjects::default()
            },
            Utc::now(),
        );
        writer.handle(&event).await.expect("handle");
    }

    #[tokio::test]
    async fn writer_appends_for_targeted_events() {
        let service = service();
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let writer = NotificationWriter::new(Arc::clone(&service), clock);
        let assignee = UserId::random();

        let event = DomainEvent::new(
            EventKind::CardAssigned,
            UserId::random(),
            EventSubjects {
                board_id: Some(BoardId::random()),
                card_id: Some(CardId::random()),
                user_id: Some(assignee),
                ..EventSubjects::default()
            },
            Utc::now(),
        );
        writer.handle(&event).await.expect("handle");

        let feed = service.list(assignee).await.expect("list feed");
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, "card.assigned");
        assert!(feed[0].target_url.starts_with("/boards/"));
    }

    #[tokio::test]
    async fn writer_dedups_duplicate_deadline_events() {
        let service = service();
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let writer = NotificationWriter::new(Arc::clone(&service), clock);
        let assignee = UserId::random();
        let card_id = CardId::random();
        let due_at = Utc::now() + chrono::Duration::hours(12);

        let event = DomainEvent::new(
            EventKind::DeadlineNear,
            UserId::system(),
            EventSubjects {
                card_id: Some(card_id),
                user_id: Some(assignee),
                ..EventSubjects::default()
            },
            Utc::now(),
        )
        .with_change("dueAt", None, Some(json!(due_at.to_rfc3339())));

        writer.handle(&event).await.expect("first delivery");
        writer.handle(&event).await.expect("duplicate delivery");

        assert_eq!(service.list(assignee).await.expect("list feed").len(), 1);
    }
}

//! Domain ports and supporting types for the hexagonal boundary.

mod audit_log;
mod board_directory;
mod card_command;
mod card_repository;
mod card_schedule_query;
mod dedup_marker_store;
mod notification_command;
mod notification_feed;
mod notification_query;
mod presence_command;
mod presence_registry;
mod realtime_publisher;

#[cfg(test)]
pub use audit_log::MockAuditLog;
pub use audit_log::{AuditEntry, AuditLog, AuditLogError, FixtureAuditLog};
#[cfg(test)]
pub use board_directory::MockBoardDirectory;
pub use board_directory::{BoardDirectory, BoardDirectoryError, FixtureBoardDirectory};
#[cfg(test)]
pub use card_command::MockCardCommand;
pub use card_command::CardCommand;
#[cfg(test)]
pub use card_repository::MockCardRepository;
pub use card_repository::{CardRepository, CardRepositoryError, FixtureCardRepository};
#[cfg(test)]
pub use card_schedule_query::MockCardScheduleQuery;
pub use card_schedule_query::{
    CardScheduleQuery, CardScheduleQueryError, FixtureCardScheduleQuery,
};
#[cfg(test)]
pub use dedup_marker_store::MockDedupMarkerStore;
pub use dedup_marker_store::{DedupMarkerError, DedupMarkerStore, FixtureDedupMarkerStore};
#[cfg(test)]
pub use notification_command::MockNotificationCommand;
pub use notification_command::NotificationCommand;
#[cfg(test)]
pub use notification_feed::MockNotificationFeed;
pub use notification_feed::{FixtureNotificationFeed, NotificationFeed, NotificationFeedError};
#[cfg(test)]
pub use notification_query::MockNotificationQuery;
pub use notification_query::NotificationQuery;
#[cfg(test)]
pub use presence_command::MockPresenceCommand;
pub use presence_command::PresenceCommand;
#[cfg(test)]
pub use presence_registry::MockPresenceRegistry;
pub use presence_registry::{FixturePresenceRegistry, PresenceRegistry, PresenceRegistryError};
#[cfg(test)]
pub use realtime_publisher::MockRealtimePublisher;
pub use realtime_publisher::{
    FixtureRealtimePublisher, RealtimePublisher, RealtimePublisherError, board_presence_topic,
    board_topic, team_topic, user_queue,
};

//! Domain layer: entities, services and ports.
//!
//! Purpose: hold every rule of the collaboration pipeline — access
//! resolution, sparse ordering, event fan-out, notifications, presence and
//! deadline scanning — behind ports so the HTTP, WebSocket and Redis
//! adapters stay thin. Adapters depend on this module, never the reverse.

pub mod access;
pub mod audit;
pub mod board;
pub mod cards;
pub mod deadlines;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod ids;
pub mod notifications;
pub mod ordering;
pub mod ports;
pub mod presence;

pub use self::access::AccessResolver;
pub use self::audit::AuditTrailWriter;
pub use self::board::{Board, BoardList, BoardVisibility, Card, Role};
pub use self::cards::CardCommandService;
pub use self::deadlines::{DeadlineScanner, LOOKAHEAD, SCAN_INTERVAL};
pub use self::error::{DomainResult, Error, ErrorCode};
pub use self::event_bus::{EventBus, EventHandler, RecordingEventHandler};
pub use self::events::{DomainEvent, EventKind, EventSubjects, FieldChange};
pub use self::ids::{BoardId, CardId, ListId, NotificationId, TeamId, UserId};
pub use self::notifications::{
    FEED_CAP, FEED_TTL, NotificationRecord, NotificationService, NotificationWriter,
};
pub use self::ordering::{CardMove, NEW_ITEM_ORDER_INDEX, OrderManager};
pub use self::presence::PresenceService;

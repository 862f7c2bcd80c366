//! Strongly typed identifiers for domain entities.
//!
//! Every aggregate gets its own UUID newtype so a `CardId` can never be
//! passed where a `BoardId` is expected. All identifiers serialise
//! transparently as their UUID string form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Borrow the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id! {
    /// Identifier of a registered user.
    UserId
}

define_id! {
    /// Identifier of a team owning boards.
    TeamId
}

define_id! {
    /// Identifier of a board.
    BoardId
}

define_id! {
    /// Identifier of a list (column) within a board.
    ListId
}

define_id! {
    /// Identifier of a card within a list.
    CardId
}

define_id! {
    /// Identifier of a notification feed record.
    NotificationId
}

impl UserId {
    /// Actor used for events not triggered by a person, e.g. the deadline
    /// scanner. Distinct from every real user so self-exclusion in the
    /// notification path never suppresses system alerts.
    pub const fn system() -> Self {
        Self(Uuid::nil())
    }
}

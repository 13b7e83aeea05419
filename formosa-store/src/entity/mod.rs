use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;

use crate::error::StoreError;

pub mod agent;
pub mod holding;
pub mod model_config;
pub mod performance;
pub mod session;
pub mod strategy_change;
pub mod transaction;

/// Declared column contract of one entity, checked against the live table by the schema
/// contract tests.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub not_null: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, not_null: bool) -> Self {
        Self { name, not_null }
    }
}

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
        )]
        pub struct $name(pub SmolStr);

        impl $name {
            pub fn new<S: AsRef<str>>(id: S) -> Self {
                Self(SmolStr::new(id.as_ref()))
            }

            /// Allocate a fresh random identifier.
            pub fn random() -> Self {
                Self(SmolStr::new(uuid::Uuid::new_v4().to_string()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

define_id!(
    /// Unique identifier of an [`agent::Agent`].
    AgentId
);
define_id!(
    /// Unique identifier of a [`session::Session`].
    SessionId
);
define_id!(
    /// Unique identifier of a [`transaction::Transaction`].
    TransactionId
);
define_id!(
    /// Unique identifier of a [`strategy_change::StrategyChange`].
    StrategyChangeId
);

macro_rules! define_str_enum {
    (
        $(#[$doc:meta])* $name:ident { $($variant:ident => $repr:literal,)+ }
    ) => {
        $(#[$doc])*
        #[derive(
            Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
        )]
        pub enum $name {
            $(#[serde(rename = $repr)] $variant,)+
        }

        impl $name {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $repr,)+
                }
            }

            /// Case-insensitive parse. Persisted values are upper-case, but aggregate
            /// queries must also tolerate values that arrived as loose strings.
            pub fn from_loose(value: &str) -> Option<Self> {
                $(
                    if value.eq_ignore_ascii_case($repr) {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl FromStr for $name {
            type Err = StoreError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::from_loose(value).ok_or(StoreError::UnknownVariant {
                    column: stringify!($name),
                    value: value.to_string(),
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_str_enum!(
    /// Execution mode an agent runs a session in.
    AgentMode {
        Trading => "TRADING",
        Rebalancing => "REBALANCING",
    }
);

define_str_enum!(
    /// Persistent lifecycle status of an agent.
    AgentStatus {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
        Error => "ERROR",
        Suspended => "SUSPENDED",
    }
);

define_str_enum!(
    /// Lifecycle status of one bounded execution session.
    SessionStatus {
        Pending => "PENDING",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
        Timeout => "TIMEOUT",
    }
);

define_str_enum!(
    /// Direction of a trade.
    TradeAction {
        Buy => "BUY",
        Sell => "SELL",
    }
);

define_str_enum!(
    /// Settlement status of a transaction row.
    TransactionStatus {
        Pending => "PENDING",
        Executed => "EXECUTED",
        Failed => "FAILED",
    }
);

define_str_enum!(
    /// Origin of a recorded strategy change.
    StrategyChangeKind {
        Auto => "AUTO",
        Manual => "MANUAL",
        PerformanceDriven => "PERFORMANCE_DRIVEN",
    }
);

impl SessionStatus {
    /// Terminal statuses never transition again.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_and_loose_parse() {
        assert_eq!(AgentMode::Trading.as_str(), "TRADING");
        assert_eq!(AgentMode::from_loose("rebalancing"), Some(AgentMode::Rebalancing));
        assert_eq!(TradeAction::from_loose("buy"), Some(TradeAction::Buy));
        assert_eq!(TransactionStatus::from_loose("Executed"), Some(TransactionStatus::Executed));
        assert!(AgentMode::from_loose("SCALPING").is_none());
    }

    #[test]
    fn test_session_status_terminality() {
        assert!(!SessionStatus::Pending.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(SessionStatus::Timeout.is_terminal());
    }

    #[test]
    fn test_serde_uses_persisted_representation() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Cancelled).unwrap(),
            r#""CANCELLED""#
        );
        assert_eq!(
            serde_json::from_str::<TradeAction>(r#""SELL""#).unwrap(),
            TradeAction::Sell
        );
    }
}

//! Inbound events: canonical record types, the payload normalizer and the JSONL feed
//!
//! ```text
//! JSONL feed → InboundEvent { name, payload }
//!     ↓
//! normalizer::normalize (+ ShipCatalog for test kills)
//!     ↓
//! Normalized::{Kill, MissionAccepted, MissionClosed, Probe, Ignored}
//! ```

pub mod normalizer;
pub mod reader;
pub mod types;

pub use normalizer::{normalize, MissionOutcome, Normalized};
pub use reader::{forward_events, EventSource, JsonlFeed};
pub use types::{EventName, EventType, InboundEvent, KillEvent, MissionEvent, RewardShare};

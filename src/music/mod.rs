//! Song creation flow: command parsing, submission, polling and delivery.

/// Transport-agnostic replies
pub mod channel;
/// Ordered artifact delivery
pub mod delivery;
/// Inbound command entry point
pub mod handler;
/// Prefix matching and the custom-mode grammar
pub mod intent;
/// Generic artifact polling
pub mod polling;
/// User-facing texts
pub mod views;
/// Background workers
pub mod worker;

pub use channel::{Reply, ReplyChannel, Requester};
pub use delivery::{DeliveryOptions, DeliveryPipeline, DeliverySession};
pub use handler::{CommandHandler, Handled};
pub use intent::{CommandPrefixes, CreationIntent, IntentMode};
pub use polling::{poll_until, ArtifactKind, PollSchedule, PollSpec};
pub use worker::JobDispatcher;

use chrono::{DateTime, Utc};

/// A domain event: an immutable fact published after a successful commit.
///
/// Events carry a stable type name and a schema version so consumers can
/// dispatch and evolve independently of the producing engine.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "inventory.stock.changed").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

use chrono::{DateTime, Utc};

/// A domain event emitted by an aggregate.
///
/// Events describe what a posting did to a record. They are not persisted on
/// their own; the poster applies them to a snapshot and logs them.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "products.product.stock_received").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

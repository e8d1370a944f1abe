//! Collaborator seams to the durable store.
//!
//! The store is owned by the CRUD layer; this core reads specs at boot
//! (reconciler) and appends delivery receipts (recorder). Everything else
//! goes through these traits so tests can substitute in-memory fakes.

use dongari_core::error::Result;

use crate::notice::{MemberFilter, Notice};

/// Read side: notification specs and member expansion.
pub trait NoticeStore: Send + Sync {
    /// Every currently stored notice. One-off notices whose time has
    /// passed are included — the trigger evaluator's overdue catch-up
    /// handles them.
    fn list_active(&self) -> Result<Vec<Notice>>;

    /// Expand a member filter to member ids, against current membership.
    fn list_member_ids(&self, filter: &MemberFilter) -> Result<Vec<String>>;

    /// Registered device tokens for the given members. Members without a
    /// registered device are skipped.
    fn list_device_tokens(&self, member_ids: &[String]) -> Result<Vec<String>>;
}

/// Write side: per-recipient delivery acknowledgement.
pub trait ReceiptStore: Send + Sync {
    /// Durably mark the given recipients of `notice_id` as delivered.
    /// Addresses may be member ids (topic sends) or device tokens (token
    /// sends). Marking an already-delivered receipt again is a no-op.
    fn mark_delivered(&self, notice_id: &str, addresses: &[String]) -> Result<()>;
}

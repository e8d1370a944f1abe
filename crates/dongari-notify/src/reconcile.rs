//! Boot-time reconciliation — rebuild the in-memory job table from the
//! durable store, so an in-memory-only scheduler survives restarts.
//!
//! Runs exactly once, before the HTTP-facing layer starts mutating
//! notices. Recipient sets are resolved here, at load time, not at spec
//! creation time: membership changes between recurring fires.

use std::sync::Arc;

use dongari_core::error::Result;

use crate::notice::{Notice, NoticePayload, RecipientSet};
use crate::registry::JobRegistry;
use crate::store::NoticeStore;

/// Re-arms every stored notice at process start.
pub struct Reconciler {
    store: Arc<dyn NoticeStore>,
    registry: JobRegistry,
}

impl Reconciler {
    pub fn new(store: Arc<dyn NoticeStore>, registry: JobRegistry) -> Self {
        Self { store, registry }
    }

    /// Load every stored notice and arm it. Returns the number of jobs
    /// armed.
    ///
    /// A store read failure is fatal: the caller must refuse to accept
    /// traffic rather than run with a silently empty schedule. A single
    /// unresolvable notice is logged and skipped — one bad row must not
    /// keep the rest of the schedule down.
    pub fn load_and_arm_all(&self) -> Result<usize> {
        let notices = self.store.list_active()?;
        let total = notices.len();
        let mut armed = 0;

        for notice in notices {
            let id = notice.id.to_string();
            let recipients = match self.resolve_recipients(&notice) {
                Ok(recipients) => recipients,
                Err(e) => {
                    tracing::warn!("⚠️ Notice {}: recipient resolution failed, skipped: {e}", id);
                    continue;
                }
            };

            let payload = NoticePayload::new(notice.category.title(), &notice.message, recipients);
            match self.registry.schedule(&id, notice.trigger, payload) {
                Ok(()) => armed += 1,
                Err(e) => {
                    tracing::warn!("⚠️ Notice {}: not armed: {e}", id);
                }
            }
        }

        tracing::info!("⏰ Reconciled {armed}/{total} notice(s) from store");
        Ok(armed)
    }

    /// Resolve a stored notice to its delivery target against current
    /// membership. Meeting categories broadcast to their topic (members
    /// are carried for receipt bookkeeping); everything else goes to the
    /// targeted members' device tokens.
    pub fn resolve_recipients(&self, notice: &Notice) -> Result<RecipientSet> {
        let filter = notice.category.member_filter(&notice.members);
        let members = self.store.list_member_ids(&filter)?;

        if let Some(topic) = notice.category.topic() {
            Ok(RecipientSet::Topic {
                name: topic.to_string(),
                members,
            })
        } else {
            let tokens = self.store.list_device_tokens(&members)?;
            Ok(RecipientSet::Tokens(tokens))
        }
    }
}

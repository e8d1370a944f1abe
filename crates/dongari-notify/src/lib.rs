//! # Dongari Notify
//!
//! Notification scheduling and push-delivery engine for the dongari club
//! backend. Turns a stored notice into a future (or weekly recurring)
//! FCM push, survives restarts without losing or duplicating schedules,
//! and records per-recipient delivery receipts back into the store.
//!
//! ## Architecture
//! ```text
//! Reconciler (once at boot)
//!   └── SqliteStore → resolve recipients → JobRegistry (bulk arm)
//!
//! CRUD layer (create/edit/delete notice)
//!   └── JobRegistry::schedule / cancel   — idempotent replace per id
//!
//! At fire time (tokio timer task)
//!   └── generation check → Dispatcher → FCM
//!         ├── Topic broadcast (meeting notices)
//!         ├── Single-token send
//!         └── Multicast (per-token outcomes)
//!       → ReceiptStore::mark_delivered (best effort)
//!       → re-arm (weekly) or remove (once)
//! ```

pub mod dispatch;
pub mod fcm;
pub mod notice;
pub mod persistence;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod timer;
pub mod trigger;

pub use dispatch::{DeliveryReport, Dispatcher};
pub use fcm::{FcmClient, PushGateway, SendOutcome};
pub use notice::{MemberFilter, Notice, NoticeCategory, NoticePayload, Part, RecipientSet};
pub use persistence::SqliteStore;
pub use reconcile::Reconciler;
pub use registry::{JobRegistry, JobSnapshot};
pub use store::{NoticeStore, ReceiptStore};
pub use trigger::Trigger;

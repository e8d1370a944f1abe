//! Job registry — the single owner of every live notification timer.
//!
//! At most one live handle per notice id, always. `schedule` on an id
//! that already has a job is the expected replace path (editing a notice
//! and boot-time reconciliation converge here): the old handle is
//! disarmed and the new one installed under one table lock. A generation
//! counter checked at fire time suppresses late fires of replaced or
//! cancelled jobs; the lock is never held across network I/O.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use dongari_core::error::Result;

use crate::dispatch::Dispatcher;
use crate::notice::NoticePayload;
use crate::store::ReceiptStore;
use crate::timer::{self, TimerHandle};
use crate::trigger::Trigger;

/// One armed job.
struct JobEntry {
    generation: u64,
    trigger: Trigger,
    payload: NoticePayload,
    next_fire: DateTime<Local>,
    handle: TimerHandle,
}

/// Read-only view of an armed job.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub trigger: Trigger,
    pub payload: NoticePayload,
    pub next_fire: DateTime<Local>,
}

struct Inner {
    jobs: Mutex<HashMap<String, JobEntry>>,
    generations: AtomicU64,
    dispatcher: Dispatcher,
    receipts: Arc<dyn ReceiptStore>,
}

/// The registry. Cheap to clone; all clones share one job table.
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<Inner>,
}

impl JobRegistry {
    pub fn new(dispatcher: Dispatcher, receipts: Arc<dyn ReceiptStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
                dispatcher,
                receipts,
            }),
        }
    }

    /// Arm (or re-arm) the job for `id`. Replacing an existing job is not
    /// an error; the old timer is disarmed before the new one is
    /// installed, atomically with respect to other schedule/cancel calls.
    ///
    /// Rejects malformed payloads (`InvalidSpec`) before touching the
    /// table — nothing is ever partially armed.
    pub fn schedule(&self, id: &str, trigger: Trigger, payload: NoticePayload) -> Result<()> {
        payload.validate()?;

        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Local::now();
        let next_fire = trigger.next_occurrence(now);
        let delay = trigger.delay_from(now);

        // Arm while holding the lock: an overdue (zero-delay) timer may
        // fire on another worker before the entry lands in the table, and
        // its generation check must block until the install is visible.
        let mut jobs = self.inner.jobs.lock().unwrap();
        let handle = timer::arm(delay, fire(self.inner.clone(), id.to_string(), generation));
        let entry = JobEntry {
            generation,
            trigger,
            payload,
            next_fire,
            handle,
        };

        if let Some(old) = jobs.insert(id.to_string(), entry) {
            old.handle.disarm();
            tracing::info!("🔁 Notice {} rescheduled for {}", id, next_fire);
        } else {
            tracing::info!("📅 Notice {} scheduled for {}", id, next_fire);
        }
        Ok(())
    }

    /// Disarm and remove the job for `id`. No-op if absent; never errors.
    pub fn cancel(&self, id: &str) {
        let mut jobs = self.inner.jobs.lock().unwrap();
        if let Some(entry) = jobs.remove(id) {
            entry.handle.disarm();
            tracing::info!("🗑️ Notice {} cancelled", id);
        }
    }

    /// Snapshot of the armed job, if any.
    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        let jobs = self.inner.jobs.lock().unwrap();
        jobs.get(id).map(|entry| JobSnapshot {
            trigger: entry.trigger.clone(),
            payload: entry.payload.clone(),
            next_fire: entry.next_fire,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.jobs.lock().unwrap().contains_key(id)
    }

    /// Number of armed jobs.
    pub fn len(&self) -> usize {
        self.inner.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The fire path. Boxed because weekly re-arm recurses.
fn fire(
    inner: Arc<Inner>,
    id: String,
    generation: u64,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        // Generation check under the lock: a replaced or cancelled job
        // must not dispatch, even if its timer already elapsed.
        let payload = {
            let jobs = inner.jobs.lock().unwrap();
            match jobs.get(&id) {
                Some(entry) if entry.generation == generation => entry.payload.clone(),
                _ => return,
            }
        };

        tracing::info!("🔔 Notice {} fired", id);

        // Network I/O happens with the table lock released.
        let report = inner
            .dispatcher
            .send(&payload.title, &payload.body, &payload.recipients)
            .await;

        if report.delivered.is_empty() {
            tracing::warn!("⚠️ Notice {}: nothing delivered", id);
        } else if let Err(e) = inner.receipts.mark_delivered(&id, &report.delivered) {
            // Best effort: the push already went out, only the is_sent
            // bookkeeping is at risk.
            tracing::warn!("⚠️ Receipt write for notice {} failed: {e}", id);
        }

        // Remove one-offs, re-arm recurring jobs, generation permitting:
        // a schedule/cancel that raced the dispatch wins.
        let mut jobs = inner.jobs.lock().unwrap();
        let finished = match jobs.get_mut(&id) {
            Some(entry) if entry.generation == generation => {
                if entry.trigger.is_recurring() {
                    let now = Local::now();
                    entry.next_fire = entry.trigger.next_occurrence(now);
                    entry.handle = timer::arm(
                        entry.trigger.delay_from(now),
                        fire(inner.clone(), id.clone(), generation),
                    );
                    tracing::debug!("🔂 Notice {} re-armed for {}", id, entry.next_fire);
                    false
                } else {
                    true
                }
            }
            _ => false,
        };
        if finished {
            jobs.remove(&id);
        }
    })
}

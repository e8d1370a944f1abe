//! SQLite-backed store — the durable side the engine shares with the
//! CRUD layer. Triggers and categories are stored as text; the closed
//! enums exist only in memory.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveTime, Weekday};
use dongari_core::error::{DongariError, Result};

use crate::notice::{MemberFilter, Notice, NoticeCategory, Part};
use crate::store::{NoticeStore, ReceiptStore};
use crate::trigger::Trigger;

/// SQLite store for notices, members, and delivery receipts.
pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Open or create the database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| DongariError::Store(format!("DB open: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| DongariError::Store(format!("DB open: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute_batch(
                "
            -- Club members (subset of the CRUD layer's schema that the
            -- engine needs: activity, part, device token)
            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                part TEXT NOT NULL,              -- 'design', 'art', 'programming'
                active INTEGER NOT NULL DEFAULT 1,
                device_token TEXT
            );

            -- Notification specs
            CREATE TABLE IF NOT EXISTS notices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL,          -- NoticeCategory::as_str
                trigger_kind TEXT NOT NULL,      -- 'once' | 'weekly'
                fire_at TEXT,                    -- RFC3339, once triggers
                day_of_week INTEGER,             -- 0=Mon..6=Sun, weekly triggers
                time_of_day TEXT,                -- HH:MM:SS, weekly triggers
                message TEXT NOT NULL,
                memo TEXT NOT NULL DEFAULT ''
            );

            -- Per-recipient delivery receipts
            CREATE TABLE IF NOT EXISTS notice_members (
                notice_id INTEGER NOT NULL,
                member_id TEXT NOT NULL,
                is_sent INTEGER NOT NULL DEFAULT 0,
                is_read INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (notice_id, member_id)
            );
         ",
            )
            .map_err(|e| DongariError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    /// Save a notice and its target member list. Returns the notice id.
    /// Used by the CRUD layer; tests use it to build fixtures.
    pub fn save_notice(&self, notice: &Notice) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let (kind, fire_at, day, time) = encode_trigger(&notice.trigger);
        conn.execute(
            "INSERT INTO notices (category, trigger_kind, fire_at, day_of_week, time_of_day, message, memo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                notice.category.as_str(),
                kind,
                fire_at,
                day,
                time,
                notice.message,
                notice.memo,
            ],
        )
        .map_err(|e| DongariError::Store(format!("Save notice: {e}")))?;
        let id = conn.last_insert_rowid();

        for member in &notice.members {
            conn.execute(
                "INSERT OR IGNORE INTO notice_members (notice_id, member_id) VALUES (?1, ?2)",
                rusqlite::params![id, member],
            )
            .map_err(|e| DongariError::Store(format!("Save notice member: {e}")))?;
        }
        Ok(id)
    }

    /// Delete a notice and its receipts.
    pub fn delete_notice(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM notice_members WHERE notice_id = ?1", [id])
            .map_err(|e| DongariError::Store(format!("Delete notice members: {e}")))?;
        conn.execute("DELETE FROM notices WHERE id = ?1", [id])
            .map_err(|e| DongariError::Store(format!("Delete notice: {e}")))?;
        Ok(())
    }

    /// Insert or replace a member row.
    pub fn upsert_member(
        &self,
        id: &str,
        part: Part,
        active: bool,
        device_token: Option<&str>,
    ) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT OR REPLACE INTO members (id, part, active, device_token)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, part.as_str(), active as i32, device_token],
            )
            .map_err(|e| DongariError::Store(format!("Upsert member: {e}")))?;
        Ok(())
    }

    /// Delivery state for one receipt row, for the CRUD layer's
    /// "has the user seen this" reads.
    pub fn is_sent(&self, notice_id: i64, member_id: &str) -> Result<bool> {
        self.conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT is_sent FROM notice_members WHERE notice_id = ?1 AND member_id = ?2",
                rusqlite::params![notice_id, member_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|v| v != 0)
            .map_err(|e| DongariError::Store(format!("Read receipt: {e}")))
    }
}

fn encode_trigger(trigger: &Trigger) -> (&'static str, Option<String>, Option<i64>, Option<String>) {
    match trigger {
        Trigger::Once { at } => ("once", Some(at.to_rfc3339()), None, None),
        Trigger::Weekly { day, at } => (
            "weekly",
            None,
            Some(i64::from(day.num_days_from_monday())),
            Some(at.format("%H:%M:%S").to_string()),
        ),
    }
}

fn decode_trigger(
    kind: &str,
    fire_at: Option<String>,
    day: Option<i64>,
    time: Option<String>,
) -> Result<Trigger> {
    match kind {
        "once" => {
            let raw = fire_at
                .ok_or_else(|| DongariError::Store("once trigger missing fire_at".into()))?;
            let at = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| DongariError::Store(format!("Bad fire_at '{raw}': {e}")))?
                .with_timezone(&Local);
            Ok(Trigger::Once { at })
        }
        "weekly" => {
            let day = day.ok_or_else(|| DongariError::Store("weekly trigger missing day".into()))?;
            let day = weekday_from_index(day)
                .ok_or_else(|| DongariError::Store(format!("Bad day_of_week {day}")))?;
            let raw =
                time.ok_or_else(|| DongariError::Store("weekly trigger missing time".into()))?;
            let at = NaiveTime::parse_from_str(&raw, "%H:%M:%S")
                .map_err(|e| DongariError::Store(format!("Bad time_of_day '{raw}': {e}")))?;
            Ok(Trigger::Weekly { day, at })
        }
        other => Err(DongariError::Store(format!("Unknown trigger kind '{other}'"))),
    }
}

fn weekday_from_index(idx: i64) -> Option<Weekday> {
    match idx {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

impl NoticeStore for SqliteStore {
    fn list_active(&self) -> Result<Vec<Notice>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, category, trigger_kind, fire_at, day_of_week, time_of_day, message, memo
                 FROM notices ORDER BY id",
            )
            .map_err(|e| DongariError::Store(format!("List notices: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(|e| DongariError::Store(format!("List notices: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DongariError::Store(format!("List notices: {e}")))?;

        let mut notices = Vec::with_capacity(rows.len());
        for (id, category, kind, fire_at, day, time, message, memo) in rows {
            let category = NoticeCategory::parse(&category)
                .ok_or_else(|| DongariError::Store(format!("Unknown category '{category}'")))?;
            let trigger = decode_trigger(&kind, fire_at, day, time)?;

            let mut member_stmt = conn
                .prepare("SELECT member_id FROM notice_members WHERE notice_id = ?1 ORDER BY member_id")
                .map_err(|e| DongariError::Store(format!("List notice members: {e}")))?;
            let members = member_stmt
                .query_map([id], |row| row.get::<_, String>(0))
                .map_err(|e| DongariError::Store(format!("List notice members: {e}")))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DongariError::Store(format!("List notice members: {e}")))?;

            notices.push(Notice {
                id,
                category,
                trigger,
                message,
                memo,
                members,
            });
        }
        Ok(notices)
    }

    fn list_member_ids(&self, filter: &MemberFilter) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let run = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<Vec<String>> {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| DongariError::Store(format!("List members: {e}")))?;
            let ids = stmt
                .query_map(params, |row| row.get::<_, String>(0))
                .map_err(|e| DongariError::Store(format!("List members: {e}")))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DongariError::Store(format!("List members: {e}")))?;
            Ok(ids)
        };

        match filter {
            MemberFilter::AllActive => {
                run("SELECT id FROM members WHERE active = 1 ORDER BY id", &[])
            }
            MemberFilter::ActivePart(part) => run(
                "SELECT id FROM members WHERE active = 1 AND part = ?1 ORDER BY id",
                &[&part.as_str()],
            ),
            MemberFilter::Explicit(ids) => Ok(ids.clone()),
        }
    }

    fn list_device_tokens(&self, member_ids: &[String]) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut tokens = Vec::new();
        for id in member_ids {
            let token: Option<String> = conn
                .query_row(
                    "SELECT device_token FROM members WHERE id = ?1",
                    [id],
                    |row| row.get(0),
                )
                .unwrap_or(None);
            if let Some(token) = token {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }
}

impl ReceiptStore for SqliteStore {
    fn mark_delivered(&self, notice_id: &str, addresses: &[String]) -> Result<()> {
        let id: i64 = notice_id
            .parse()
            .map_err(|_| DongariError::Store(format!("Bad notice id '{notice_id}'")))?;
        let conn = self.conn.lock().unwrap();
        for address in addresses {
            // Topic sends hand us member ids, token sends hand us device
            // tokens; either resolves to the same receipt row.
            conn.execute(
                "UPDATE notice_members SET is_sent = 1
                 WHERE notice_id = ?1
                   AND (member_id = ?2
                        OR member_id IN (SELECT id FROM members WHERE device_token = ?2))",
                rusqlite::params![id, address],
            )
            .map_err(|e| DongariError::Store(format!("Mark delivered: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store_with_members() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_member("kim", Part::Programming, true, Some("tok-kim"))
            .unwrap();
        store
            .upsert_member("lee", Part::Programming, true, None)
            .unwrap();
        store.upsert_member("park", Part::Art, true, Some("tok-park")).unwrap();
        store.upsert_member("choi", Part::Art, false, None).unwrap();
        store
    }

    fn weekly_notice(members: &[&str]) -> Notice {
        Notice {
            id: 0,
            category: NoticeCategory::Cleaning,
            trigger: Trigger::Weekly {
                day: Weekday::Fri,
                at: NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
            },
            message: "청소 알림".into(),
            memo: String::new(),
            members: members.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_notice_round_trip() {
        let store = store_with_members();
        let once = Notice {
            id: 0,
            category: NoticeCategory::Regular,
            trigger: Trigger::Once {
                at: Local.with_ymd_and_hms(2026, 9, 4, 18, 0, 0).unwrap(),
            },
            message: "정기 회의".into(),
            memo: "동방".into(),
            members: vec!["kim".into(), "park".into()],
        };
        store.save_notice(&once).unwrap();
        store.save_notice(&weekly_notice(&["kim"])).unwrap();

        let loaded = store.list_active().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].category, NoticeCategory::Regular);
        assert_eq!(loaded[0].trigger, once.trigger);
        assert_eq!(loaded[0].members, vec!["kim".to_string(), "park".to_string()]);
        assert_eq!(
            loaded[1].trigger,
            Trigger::Weekly {
                day: Weekday::Fri,
                at: NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
            }
        );
    }

    #[test]
    fn test_member_filter_expansion() {
        let store = store_with_members();

        let all = store.list_member_ids(&MemberFilter::AllActive).unwrap();
        assert_eq!(all, vec!["kim".to_string(), "lee".to_string(), "park".to_string()]);

        let art = store
            .list_member_ids(&MemberFilter::ActivePart(Part::Art))
            .unwrap();
        // choi is on leave
        assert_eq!(art, vec!["park".to_string()]);

        let explicit = store
            .list_member_ids(&MemberFilter::Explicit(vec!["kim".into()]))
            .unwrap();
        assert_eq!(explicit, vec!["kim".to_string()]);
    }

    #[test]
    fn test_device_token_lookup_skips_unregistered() {
        let store = store_with_members();
        let tokens = store
            .list_device_tokens(&["kim".into(), "lee".into(), "park".into()])
            .unwrap();
        assert_eq!(tokens, vec!["tok-kim".to_string(), "tok-park".to_string()]);
    }

    #[test]
    fn test_mark_delivered_by_member_id_and_token() {
        let store = store_with_members();
        let id = store.save_notice(&weekly_notice(&["kim", "park"])).unwrap();
        let key = id.to_string();

        // Topic path: member id address
        store.mark_delivered(&key, &["kim".into()]).unwrap();
        assert!(store.is_sent(id, "kim").unwrap());
        assert!(!store.is_sent(id, "park").unwrap());

        // Token path: device token address resolves to the member row
        store.mark_delivered(&key, &["tok-park".into()]).unwrap();
        assert!(store.is_sent(id, "park").unwrap());
    }

    #[test]
    fn test_mark_delivered_is_idempotent() {
        let store = store_with_members();
        let id = store.save_notice(&weekly_notice(&["kim"])).unwrap();
        let key = id.to_string();

        store.mark_delivered(&key, &["kim".into()]).unwrap();
        store.mark_delivered(&key, &["kim".into()]).unwrap();
        assert!(store.is_sent(id, "kim").unwrap());
    }

    #[test]
    fn test_delete_notice_removes_receipts() {
        let store = store_with_members();
        let id = store.save_notice(&weekly_notice(&["kim"])).unwrap();
        store.delete_notice(id).unwrap();
        assert!(store.list_active().unwrap().is_empty());
        assert!(store.is_sent(id, "kim").is_err());
    }
}

#![forbid(unsafe_code)]

//! Short messages shown over the table.
//!
//! Transient notices (a rejected action) expire after a TTL measured in
//! ticked time. Persistent notices (connection lost) stay until cleared by
//! key. Persistent notices are listed first.

use web_time::Duration;

/// Why a persistent notice is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKey {
    ConnectionLost,
    Reconnecting,
}

#[derive(Debug, Clone)]
struct Transient {
    text: String,
    remaining: Duration,
}

/// Live notices.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    persistent: Vec<(NoticeKey, String)>,
    transient: Vec<Transient>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text` for `ttl`.
    pub fn push_transient(&mut self, text: impl Into<String>, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.transient.push(Transient {
            text: text.into(),
            remaining: ttl,
        });
    }

    /// Show `text` until [`clear`](Self::clear) is called with the same key.
    /// Replaces any notice already up under `key`.
    pub fn set(&mut self, key: NoticeKey, text: impl Into<String>) {
        let text = text.into();
        match self.persistent.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = text,
            None => self.persistent.push((key, text)),
        }
    }

    pub fn clear(&mut self, key: NoticeKey) {
        self.persistent.retain(|(k, _)| *k != key);
    }

    #[must_use]
    pub fn is_set(&self, key: NoticeKey) -> bool {
        self.persistent.iter().any(|(k, _)| *k == key)
    }

    /// Age transient notices, dropping the expired ones.
    pub fn tick(&mut self, dt: Duration) {
        for notice in &mut self.transient {
            notice.remaining = notice.remaining.saturating_sub(dt);
        }
        self.transient.retain(|n| !n.remaining.is_zero());
    }

    /// Texts to show, persistent first, oldest first.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.persistent
            .iter()
            .map(|(_, text)| text.clone())
            .chain(self.transient.iter().map(|n| n.text.clone()))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.persistent.is_empty() && self.transient.is_empty()
    }
}

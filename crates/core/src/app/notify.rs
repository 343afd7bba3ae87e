use crate::render::view::{NotificationItem, SectionView};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

pub const AUTO_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Info,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
    expires_at: Instant,
}

/// Non-blocking user messages. Each one disappears on its own after [`AUTO_DISMISS`].
#[derive(Debug)]
pub struct Notifications {
    next_id: u64,
    ttl: Duration,
    items: Vec<Notification>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(AUTO_DISMISS)
    }
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            next_id: 0,
            ttl,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) -> u64 {
        self.next_id += 1;
        let message = message.into();
        tracing::info!(id = self.next_id, %level, %message, "notification raised");
        self.items.push(Notification {
            id: self.next_id,
            level,
            message,
            expires_at: Instant::now() + self.ttl,
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        before != self.items.len()
    }

    /// Drops everything due at `now`. Returns whether anything was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.expires_at > now);
        before != self.items.len()
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.items.iter().map(|n| n.expires_at).min()
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn count(&self, level: Level) -> usize {
        self.items.iter().filter(|n| n.level == level).count()
    }

    pub fn view(&self) -> SectionView {
        SectionView::Notifications {
            items: self
                .items
                .iter()
                .map(|n| NotificationItem {
                    id: n.id,
                    severity: n.level.as_str().to_string(),
                    message: n.message.clone(),
                })
                .collect(),
        }
    }
}

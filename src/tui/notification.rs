use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_VISIBLE: usize = 5;
const MIN_WIDTH: u16 = 20;
const MAX_WIDTH: u16 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    created: Instant,
}

/// Short-lived messages stacked in the top-right corner.
#[derive(Debug)]
pub struct Notifications {
    items: VecDeque<Notification>,
    ttl: Duration,
    width: u16,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
            width: MIN_WIDTH,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NotificationKind::Info, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NotificationKind::Error, message.into());
    }

    fn push(&mut self, kind: NotificationKind, message: String) {
        self.items.push_back(Notification {
            kind,
            message,
            created: Instant::now(),
        });
        while self.items.len() > MAX_VISIBLE {
            self.items.pop_front();
        }
    }

    /// Drops everything older than the TTL as of `now`.
    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.items
            .retain(|n| now.saturating_duration_since(n.created) < ttl);
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    /// Width is 30% of the terminal, clamped to a readable range.
    pub fn set_terminal_width(&mut self, terminal_width: u16) {
        let share = (u32::from(terminal_width) * 3 / 10) as u16;
        self.width = share.clamp(MIN_WIDTH, MAX_WIDTH);
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn last_message(&self) -> Option<&str> {
        self.items.back().map(|n| n.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_expire_after_ttl() {
        // Arrange
        let mut notifications = Notifications::new(Duration::from_secs(3));
        notifications.info("saved");

        // Act
        notifications.expire(Instant::now());
        let after_now = notifications.len();
        notifications.expire(Instant::now() + Duration::from_secs(4));

        // Assert
        assert_eq!(after_now, 1);
        assert!(notifications.is_empty());
    }

    #[test]
    fn test_oldest_notification_is_dropped_when_full() {
        // Arrange
        let mut notifications = Notifications::new(Duration::from_secs(3));

        // Act
        for i in 0..7 {
            notifications.error(format!("error {i}"));
        }

        // Assert
        assert_eq!(notifications.len(), MAX_VISIBLE);
        assert_eq!(notifications.iter().next().map(|n| n.message.as_str()), Some("error 2"));
        assert_eq!(notifications.last_message(), Some("error 6"));
    }

    #[test]
    fn test_width_tracks_terminal_within_bounds() {
        // Arrange
        let mut notifications = Notifications::new(Duration::from_secs(3));

        // Act / Assert
        notifications.set_terminal_width(40);
        assert_eq!(notifications.width(), 20);
        notifications.set_terminal_width(100);
        assert_eq!(notifications.width(), 30);
        notifications.set_terminal_width(400);
        assert_eq!(notifications.width(), 80);
    }
}

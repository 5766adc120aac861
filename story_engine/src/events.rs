//! UI-facing events and the toast feed.

use serde::{Deserialize, Serialize};

/// Icon used when a toast doesn't name one.
pub const DEFAULT_TOAST_ICON: &str = "♥";

/// Full-screen effects the host may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenEffect {
    /// Pulsing red while the poison takes hold.
    PoisonFlash,
    /// Sharp red flashes and a shake.
    StabFlash,
    FadeToBlack,
}

/// Something for the UI to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    /// A short notification, e.g. a fragment unlock.
    Toast { message: String, icon: String },
    /// Large centered text over a black screen.
    Banner {
        title: String,
        subtitle: Option<String>,
    },
    Effect(ScreenEffect),
    /// A locked menu entry or fragment was confirmed.
    MenuLocked,
}

/// A toast currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub message: String,
    pub icon: String,
    pub remaining_ms: u64,
}

impl Toast {
    /// Display text, with the icon on both sides.
    pub fn text(&self) -> String {
        format!("{} {} {}", self.icon, self.message, self.icon)
    }
}

/// Visible toasts, each removed after a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastFeed {
    duration_ms: u64,
    active: Vec<Toast>,
}

impl Default for ToastFeed {
    fn default() -> Self {
        Self::new(3000)
    }
}

impl ToastFeed {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            active: Vec::new(),
        }
    }

    /// Show a toast. Returns the matching event for hosts that log UI traffic.
    pub fn push(&mut self, message: impl Into<String>, icon: Option<&str>) -> UiEvent {
        let message = message.into();
        let icon = icon.unwrap_or(DEFAULT_TOAST_ICON).to_string();
        self.active.push(Toast {
            message: message.clone(),
            icon: icon.clone(),
            remaining_ms: self.duration_ms,
        });
        UiEvent::Toast { message, icon }
    }

    /// Age every toast and drop the expired ones.
    pub fn update(&mut self, elapsed_ms: u64) {
        for toast in &mut self.active {
            toast.remaining_ms = toast.remaining_ms.saturating_sub(elapsed_ms);
        }
        self.active.retain(|t| t.remaining_ms > 0);
    }

    /// Toasts on screen, oldest first.
    pub fn visible(&self) -> &[Toast] {
        &self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire() {
        let mut feed = ToastFeed::new(3000);
        feed.push("Daydream Recovered", None);
        feed.update(1000);
        feed.push("Memory Fragment: The Stray", Some("🐱"));

        feed.update(2000);
        assert_eq!(feed.visible().len(), 1);
        assert_eq!(feed.visible()[0].text(), "🐱 Memory Fragment: The Stray 🐱");

        feed.update(1000);
        assert!(feed.is_empty());
    }

    #[test]
    fn test_push_returns_event() {
        let mut feed = ToastFeed::default();
        let event = feed.push("Dream Completed!", Some("❤️"));
        assert_eq!(
            event,
            UiEvent::Toast {
                message: "Dream Completed!".to_string(),
                icon: "❤️".to_string(),
            }
        );
        assert_eq!(feed.visible()[0].icon, "❤️");
    }

    #[test]
    fn test_default_icon() {
        let mut feed = ToastFeed::default();
        feed.push("Daydream Recovered", None);
        assert_eq!(feed.visible()[0].text(), "♥ Daydream Recovered ♥");
    }
}

//! Transient status messages

use serde::Serialize;

/// How long a flash stays visible, in milliseconds
pub const FLASH_DURATION_MS: i64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// A status message shown after an admin action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
    pub shown_at_ms: i64,
}

impl Flash {
    pub fn success(text: impl Into<String>, now_ms: i64) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
            shown_at_ms: now_ms,
        }
    }

    pub fn error(text: impl Into<String>, now_ms: i64) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
            shown_at_ms: now_ms,
        }
    }

    /// Visible until [`FLASH_DURATION_MS`] has elapsed
    pub fn is_visible(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.shown_at_ms) < FLASH_DURATION_MS
    }

    pub fn is_error(&self) -> bool {
        self.kind == FlashKind::Error
    }
}

/// Holds the most recent flash; a new one replaces the old
#[derive(Debug, Clone, Default)]
pub struct FlashSlot {
    current: Option<Flash>,
}

impl FlashSlot {
    pub fn show(&mut self, flash: Flash) {
        match flash.kind {
            FlashKind::Success => tracing::info!(message = %flash.text, "Admin flash"),
            FlashKind::Error => tracing::warn!(message = %flash.text, "Admin flash"),
        }
        self.current = Some(flash);
    }

    /// The flash if it is still visible at `now_ms`
    pub fn current(&self, now_ms: i64) -> Option<&Flash> {
        self.current.as_ref().filter(|f| f.is_visible(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_dismisses_after_three_seconds() {
        let flash = Flash::success("Saved", 10_000);
        assert!(flash.is_visible(10_000));
        assert!(flash.is_visible(12_999));
        assert!(!flash.is_visible(13_000));
    }

    #[test]
    fn test_slot_replaces_previous() {
        let mut slot = FlashSlot::default();
        slot.show(Flash::error("first", 0));
        slot.show(Flash::success("second", 1_000));

        let current = slot.current(1_500).unwrap();
        assert_eq!(current.text, "second");
        assert!(!current.is_error());
        assert!(slot.current(4_000).is_none());
    }
}

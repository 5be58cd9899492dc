//! Terminal rendering for the overlay and notifications.

use std::io::{stderr, Write};
use std::sync::Mutex;
use std::time::Duration;

use crossterm::{
    cursor::MoveToColumn,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use tracing::debug;

use pn_progress::progress::parse_percent;
use pn_progress::{Frontend, Notification, NotificationKind, NotificationSink};

const BAR_WIDTH: usize = 30;

/// Draws the overlay as a single status line and prints notifications
/// above it. The "page reload" is surfaced to the caller instead of
/// being performed, since a CLI has no page to reload.
#[derive(Default)]
pub struct TerminalFrontend {
    overlay_visible: Mutex<bool>,
    pending_reload: Mutex<Option<Duration>>,
}

impl TerminalFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reload the controller scheduled, if any.
    pub fn take_pending_reload(&self) -> Option<Duration> {
        self.pending_reload.lock().unwrap().take()
    }

    fn draw_status_line(&self, message: &str) {
        let percent = parse_percent(message).unwrap_or(0);
        let filled = BAR_WIDTH * percent as usize / 100;
        let bar: String = "=".repeat(filled) + &" ".repeat(BAR_WIDTH - filled);

        let mut out = stderr();
        let _ = out
            .queue(MoveToColumn(0))
            .and_then(|o| o.queue(Clear(ClearType::CurrentLine)))
            .and_then(|o| o.queue(Print(format!("[{}] {}", bar, message))))
            .and_then(|o| o.flush());
    }

    fn clear_status_line(&self) {
        let mut out = stderr();
        let _ = out
            .queue(MoveToColumn(0))
            .and_then(|o| o.queue(Clear(ClearType::CurrentLine)))
            .and_then(|o| o.flush());
    }

    fn print_tagged(&self, color: Color, tag: &str, message: &str) {
        // Notifications land on their own line so the status line can
        // redraw underneath.
        self.clear_status_line();
        let mut out = stderr();
        let _ = out
            .queue(SetForegroundColor(color))
            .and_then(|o| o.queue(Print(format!("{:>9} ", tag))))
            .and_then(|o| o.queue(ResetColor))
            .and_then(|o| o.queue(Print(format!("{}\n", message))))
            .and_then(|o| o.flush());
    }
}

impl Frontend for TerminalFrontend {
    fn set_busy(&self, category: &str) {
        debug!("busy: {}", category);
    }

    fn restore(&self, category: &str) {
        debug!("restored: {}", category);
    }

    fn show_overlay(&self, message: &str) {
        *self.overlay_visible.lock().unwrap() = true;
        self.draw_status_line(message);
    }

    fn update_overlay(&self, message: &str) {
        if *self.overlay_visible.lock().unwrap() {
            self.draw_status_line(message);
        }
    }

    fn hide_overlay(&self) {
        let mut visible = self.overlay_visible.lock().unwrap();
        if *visible {
            *visible = false;
            self.clear_status_line();
        }
    }

    fn schedule_reload(&self, delay: Duration) {
        *self.pending_reload.lock().unwrap() = Some(delay);
    }
}

impl NotificationSink for TerminalFrontend {
    fn render(&self, notification: &Notification) {
        let (color, tag) = match notification.kind {
            NotificationKind::Success => (Color::Green, "success"),
            NotificationKind::Error => (Color::Red, "error"),
            NotificationKind::Warning => (Color::Yellow, "warning"),
            NotificationKind::Info => (Color::Blue, "info"),
        };
        let message = match &notification.action {
            Some(action) => format!("{} [{}]", notification.message, action.label),
            None => notification.message.clone(),
        };
        self.print_tagged(color, tag, &message);
    }

    fn remove(&self, id: u64) {
        // Printed lines stay in the scrollback; nothing to undo.
        debug!("notification {} dismissed", id);
    }
}

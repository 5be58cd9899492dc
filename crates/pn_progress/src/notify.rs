//! Queued, auto-dismissing notifications.
//!
//! [`NotificationQueue`] is a pure state machine: exactly one
//! notification is visible at a time, the rest wait in FIFO order, and
//! the next one renders only after the previous finished its exit.
//! Hovering pauses the dismiss timer; leaving re-arms it with the full
//! duration. [`Notifier`] is the tokio glue that drives the timers
//! through the injected [`Clock`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

use crate::clock::Clock;

pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);
/// Permission notices carry an action and stay up longer.
pub const PERMISSION_DURATION: Duration = Duration::from_secs(8);
/// How long the exit transition takes before the slot frees up.
pub const EXIT_DURATION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Action button carried by permission notices. Frontends dispatch on
/// the id when the button is pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub label: String,
    pub action_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub duration: Duration,
    pub action: Option<NotificationAction>,
}

/// Rendering seam; the queue never touches a display directly.
pub trait NotificationSink: Send + Sync {
    fn render(&self, notification: &Notification);
    fn remove(&self, id: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Armed,
    Paused,
    Cancelled,
}

struct Visible {
    note: Notification,
    timer: TimerState,
    /// Bumped on every re-arm so stale timer callbacks are ignored.
    generation: u64,
    exiting: bool,
}

pub struct NotificationQueue {
    sink: Arc<dyn NotificationSink>,
    queue: VecDeque<Notification>,
    visible: Option<Visible>,
    next_id: u64,
    next_generation: u64,
}

impl NotificationQueue {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            queue: VecDeque::new(),
            visible: None,
            next_id: 1,
            next_generation: 1,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        self.show_with_duration(message, kind, DEFAULT_DURATION)
    }

    pub fn show_with_duration(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) -> u64 {
        self.enqueue(message.into(), kind, duration, None)
    }

    pub fn show_permission(
        &mut self,
        message: impl Into<String>,
        action: NotificationAction,
    ) -> u64 {
        self.enqueue(
            message.into(),
            NotificationKind::Warning,
            PERMISSION_DURATION,
            Some(action),
        )
    }

    fn enqueue(
        &mut self,
        message: String,
        kind: NotificationKind,
        duration: Duration,
        action: Option<NotificationAction>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push_back(Notification {
            id,
            message,
            kind,
            duration,
            action,
        });
        self.render_next();
        id
    }

    fn render_next(&mut self) {
        if self.visible.is_some() {
            return;
        }
        if let Some(note) = self.queue.pop_front() {
            debug!("rendering notification {} ({:?})", note.id, note.kind);
            self.sink.render(&note);
            let generation = self.next_generation;
            self.next_generation += 1;
            self.visible = Some(Visible {
                note,
                timer: TimerState::Armed,
                generation,
                exiting: false,
            });
        }
    }

    /// The armed dismiss timer, if any: (id, generation, duration).
    pub fn armed(&self) -> Option<(u64, u64, Duration)> {
        let visible = self.visible.as_ref()?;
        if visible.timer == TimerState::Armed && !visible.exiting {
            Some((visible.note.id, visible.generation, visible.note.duration))
        } else {
            None
        }
    }

    /// Auto-dismiss timer elapsed. Returns true when the exit actually
    /// started; stale or paused timers are ignored.
    pub fn timer_fired(&mut self, id: u64, generation: u64) -> bool {
        match self.visible.as_mut() {
            Some(v)
                if v.note.id == id
                    && v.generation == generation
                    && v.timer == TimerState::Armed
                    && !v.exiting =>
            {
                v.exiting = true;
                true
            }
            _ => false,
        }
    }

    pub fn hover_start(&mut self, id: u64) {
        if let Some(v) = self.visible.as_mut() {
            if v.note.id == id && v.timer == TimerState::Armed && !v.exiting {
                v.timer = TimerState::Paused;
            }
        }
    }

    /// Re-arms the full duration, not the remainder.
    pub fn hover_end(&mut self, id: u64) {
        if let Some(v) = self.visible.as_mut() {
            if v.note.id == id && v.timer == TimerState::Paused && !v.exiting {
                v.timer = TimerState::Armed;
                v.generation = self.next_generation;
                self.next_generation += 1;
            }
        }
    }

    /// Manual close: cancel the timer and start the exit immediately.
    /// Returns true when an exit started.
    pub fn close(&mut self, id: u64) -> bool {
        match self.visible.as_mut() {
            Some(v) if v.note.id == id && !v.exiting => {
                v.timer = TimerState::Cancelled;
                v.exiting = true;
                true
            }
            _ => false,
        }
    }

    /// Action button pressed: behaves like close and hands back the
    /// action id for dispatch.
    pub fn action_invoked(&mut self, id: u64) -> Option<String> {
        let action_id = self
            .visible
            .as_ref()
            .filter(|v| v.note.id == id)
            .and_then(|v| v.note.action.as_ref())
            .map(|a| a.action_id.clone())?;
        self.close(id);
        Some(action_id)
    }

    /// Exit transition finished; free the slot and render the next
    /// queued notification.
    pub fn exit_finished(&mut self, id: u64) {
        if let Some(v) = self.visible.as_ref() {
            if v.note.id == id && v.exiting {
                self.sink.remove(id);
                self.visible = None;
                self.render_next();
            }
        }
    }

    /// Drain the queue and force-remove the visible notification.
    pub fn clear_all(&mut self) {
        self.queue.clear();
        if let Some(v) = self.visible.take() {
            self.sink.remove(v.note.id);
        }
    }

    pub fn visible_id(&self) -> Option<u64> {
        self.visible.as_ref().map(|v| v.note.id)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

struct NotifierState {
    queue: NotificationQueue,
    driving: bool,
}

/// Async wrapper that owns the queue and runs its dismiss timers.
#[derive(Clone)]
pub struct Notifier {
    state: Arc<Mutex<NotifierState>>,
    clock: Arc<dyn Clock>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(NotifierState {
                queue: NotificationQueue::new(sink),
                driving: false,
            })),
            clock,
        }
    }

    pub fn show(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        let id = self.state.lock().unwrap().queue.show(message, kind);
        self.ensure_driving();
        id
    }

    pub fn show_with_duration(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) -> u64 {
        let id = self
            .state
            .lock()
            .unwrap()
            .queue
            .show_with_duration(message, kind, duration);
        self.ensure_driving();
        id
    }

    pub fn show_permission(&self, message: impl Into<String>, action: NotificationAction) -> u64 {
        let id = self
            .state
            .lock()
            .unwrap()
            .queue
            .show_permission(message, action);
        self.ensure_driving();
        id
    }

    pub fn hover_start(&self, id: u64) {
        self.state.lock().unwrap().queue.hover_start(id);
    }

    pub fn hover_end(&self, id: u64) {
        self.state.lock().unwrap().queue.hover_end(id);
        self.ensure_driving();
    }

    pub fn close(&self, id: u64) {
        let began = self.state.lock().unwrap().queue.close(id);
        if began {
            self.finish_exit(id);
        }
    }

    pub fn action_invoked(&self, id: u64) -> Option<String> {
        let action = self.state.lock().unwrap().queue.action_invoked(id);
        if action.is_some() {
            self.finish_exit(id);
        }
        action
    }

    pub fn clear_all(&self) {
        self.state.lock().unwrap().queue.clear_all();
    }

    fn finish_exit(&self, id: u64) {
        let state = self.state.clone();
        let clock = self.clock.clone();
        let this = self.clone();
        tokio::spawn(async move {
            clock.sleep(EXIT_DURATION).await;
            state.lock().unwrap().queue.exit_finished(id);
            this.ensure_driving();
        });
    }

    /// Start the timer driver unless one is already running. The flag
    /// and the queue share a lock, so exactly one driver exists.
    fn ensure_driving(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.driving || state.queue.armed().is_none() {
                return;
            }
            state.driving = true;
        }

        let state = self.state.clone();
        let clock = self.clock.clone();
        tokio::spawn(async move {
            loop {
                let armed = {
                    let mut s = state.lock().unwrap();
                    match s.queue.armed() {
                        Some(armed) => armed,
                        None => {
                            s.driving = false;
                            return;
                        }
                    }
                };
                let (id, generation, duration) = armed;
                clock.sleep(duration).await;
                let fired = state.lock().unwrap().queue.timer_fired(id, generation);
                if fired {
                    clock.sleep(EXIT_DURATION).await;
                    state.lock().unwrap().queue.exit_finished(id);
                }
                // On a stale or paused timer just re-read the armed
                // state and go around again.
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;

    fn queue_with_sink() -> (NotificationQueue, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (NotificationQueue::new(sink.clone()), sink)
    }

    #[test]
    fn first_notification_renders_immediately() {
        let (mut queue, sink) = queue_with_sink();
        let id = queue.show("saved", NotificationKind::Success);
        assert_eq!(queue.visible_id(), Some(id));
        assert_eq!(sink.rendered(), vec!["saved".to_string()]);
    }

    #[test]
    fn only_one_visible_rest_queued_fifo() {
        let (mut queue, sink) = queue_with_sink();
        let first = queue.show("first", NotificationKind::Info);
        queue.show("second", NotificationKind::Info);
        queue.show("third", NotificationKind::Info);

        assert_eq!(queue.visible_id(), Some(first));
        assert_eq!(queue.queued(), 2);
        assert_eq!(sink.rendered(), vec!["first".to_string()]);

        let (id, generation, _) = queue.armed().unwrap();
        assert!(queue.timer_fired(id, generation));
        // Next renders only once the exit finishes.
        assert_eq!(sink.rendered().len(), 1);
        queue.exit_finished(id);

        assert_eq!(
            sink.rendered(),
            vec!["first".to_string(), "second".to_string()]
        );
        assert_eq!(queue.queued(), 1);
    }

    #[test]
    fn hover_pauses_and_leave_rearms_full_duration() {
        let (mut queue, _sink) = queue_with_sink();
        let id = queue.show("hover me", NotificationKind::Info);
        let (_, generation, duration) = queue.armed().unwrap();

        queue.hover_start(id);
        assert!(queue.armed().is_none());
        // The old timer firing while paused must not dismiss.
        assert!(!queue.timer_fired(id, generation));
        assert_eq!(queue.visible_id(), Some(id));

        queue.hover_end(id);
        let (_, new_generation, new_duration) = queue.armed().unwrap();
        assert_ne!(new_generation, generation);
        assert_eq!(new_duration, duration);
        // The stale timer stays dead even after re-arm.
        assert!(!queue.timer_fired(id, generation));
        assert!(queue.timer_fired(id, new_generation));
    }

    #[test]
    fn manual_close_cancels_the_timer() {
        let (mut queue, sink) = queue_with_sink();
        let id = queue.show("close me", NotificationKind::Warning);
        let (_, generation, _) = queue.armed().unwrap();

        assert!(queue.close(id));
        assert!(!queue.timer_fired(id, generation));
        queue.exit_finished(id);
        assert_eq!(sink.removed(), vec![id]);
        assert_eq!(queue.visible_id(), None);
    }

    #[test]
    fn action_dismisses_and_returns_the_action_id() {
        let (mut queue, _sink) = queue_with_sink();
        let id = queue.show_permission(
            "premium required",
            NotificationAction {
                label: "Upgrade".to_string(),
                action_id: "upgrade-plan".to_string(),
            },
        );
        assert_eq!(queue.action_invoked(id).as_deref(), Some("upgrade-plan"));
        queue.exit_finished(id);
        assert_eq!(queue.visible_id(), None);
    }

    #[test]
    fn action_on_plain_notification_is_none() {
        let (mut queue, _sink) = queue_with_sink();
        let id = queue.show("plain", NotificationKind::Info);
        assert_eq!(queue.action_invoked(id), None);
        assert_eq!(queue.visible_id(), Some(id));
    }

    #[test]
    fn permission_notices_run_longer() {
        let (mut queue, _sink) = queue_with_sink();
        queue.show_permission(
            "premium required",
            NotificationAction {
                label: "Upgrade".to_string(),
                action_id: "upgrade-plan".to_string(),
            },
        );
        let (_, _, duration) = queue.armed().unwrap();
        assert_eq!(duration, PERMISSION_DURATION);
    }

    #[test]
    fn clear_all_drains_queue_and_removes_visible() {
        let (mut queue, sink) = queue_with_sink();
        let first = queue.show("one", NotificationKind::Info);
        queue.show("two", NotificationKind::Info);
        queue.show("three", NotificationKind::Info);

        queue.clear_all();
        assert_eq!(queue.visible_id(), None);
        assert_eq!(queue.queued(), 0);
        assert_eq!(sink.removed(), vec![first]);
    }

    #[tokio::test]
    async fn notifier_auto_dismisses_through_the_clock() {
        use crate::test_utils::ManualClock;

        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::new();
        let notifier = Notifier::new(sink.clone(), clock.clone());

        notifier.show("one", NotificationKind::Info);
        notifier.show("two", NotificationKind::Info);

        // Manual clock sleeps resolve immediately; yield until the
        // driver worked through both notifications.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        assert_eq!(sink.rendered(), vec!["one".to_string(), "two".to_string()]);
        assert_eq!(sink.removed().len(), 2);
    }
}

#![deny(unused_imports)]

pub mod clock;
pub mod controller;
pub mod notify;
pub mod poller;
pub mod progress;
pub mod test_utils;

pub use clock::{Clock, TokioClock};
pub use controller::{Frontend, TaskController, TaskPhase, RELOAD_AFTER_SUCCESS, RELOAD_AFTER_TIMEOUT};
pub use notify::{
    Notification, NotificationAction, NotificationKind, NotificationQueue, NotificationSink,
    Notifier,
};
pub use poller::{PollConfig, PollOutcome, ProgressEvent, ProgressObserver, TaskPoller};

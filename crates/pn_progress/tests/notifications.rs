use std::sync::Arc;
use std::time::Duration;

use pn_progress::test_utils::{ManualClock, RecordingSink};
use pn_progress::{NotificationAction, NotificationKind, Notifier};

async fn settle() {
    for _ in 0..30 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn queue_drains_in_fifo_order() {
    let sink = Arc::new(RecordingSink::default());
    let clock = ManualClock::new();
    let notifier = Notifier::new(sink.clone(), clock.clone());

    notifier.show("first", NotificationKind::Info);
    notifier.show("second", NotificationKind::Success);
    notifier.show("third", NotificationKind::Warning);
    settle().await;

    assert_eq!(
        sink.rendered(),
        vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string()
        ]
    );
    assert_eq!(sink.removed().len(), 3);
}

#[tokio::test]
async fn custom_durations_reach_the_timer() {
    let sink = Arc::new(RecordingSink::default());
    let clock = ManualClock::new();
    let notifier = Notifier::new(sink.clone(), clock.clone());

    notifier.show_with_duration("quick", NotificationKind::Info, Duration::from_secs(1));
    settle().await;

    assert!(clock.sleeps().contains(&Duration::from_secs(1)));
}

#[tokio::test]
async fn manual_close_frees_the_slot_for_the_next() {
    let sink = Arc::new(RecordingSink::default());
    let clock = ManualClock::new();
    let notifier = Notifier::new(sink.clone(), clock.clone());

    // Long duration so the driver would hold this one for a while.
    let first = notifier.show_with_duration("sticky", NotificationKind::Info, Duration::from_secs(3600));
    notifier.show("queued", NotificationKind::Info);

    notifier.close(first);
    settle().await;

    assert!(sink.rendered().contains(&"queued".to_string()));
    assert!(sink.removed().contains(&first));
}

#[tokio::test]
async fn permission_notice_dispatches_its_action() {
    let sink = Arc::new(RecordingSink::default());
    let clock = ManualClock::new();
    let notifier = Notifier::new(sink.clone(), clock.clone());

    let id = notifier.show_permission(
        "Premium is required for analysis",
        NotificationAction {
            label: "Upgrade".to_string(),
            action_id: "upgrade-plan".to_string(),
        },
    );
    assert_eq!(notifier.action_invoked(id).as_deref(), Some("upgrade-plan"));
    settle().await;

    assert!(sink.removed().contains(&id));
}

#[tokio::test]
async fn clear_all_removes_everything_immediately() {
    let sink = Arc::new(RecordingSink::default());
    let clock = ManualClock::new();
    let notifier = Notifier::new(sink.clone(), clock.clone());

    notifier.show_with_duration("one", NotificationKind::Info, Duration::from_secs(3600));
    notifier.show("two", NotificationKind::Info);
    notifier.clear_all();
    settle().await;

    assert_eq!(sink.rendered(), vec!["one".to_string()]);
    assert_eq!(sink.removed().len(), 1);
}

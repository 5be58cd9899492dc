//! Pure progress/message derivation from status snapshots.
//!
//! Snapshots are heterogeneous: some carry an explicit percentage,
//! some only article counters, some nothing but a state name. Each
//! derivation applies a fixed priority chain so the overlay always has
//! something sensible to show.

use pn_core::{ProgressInfo, TaskState};

/// Derive a display percentage for a snapshot.
///
/// Priority: explicit `current` (clamped to 99 so the bar never claims
/// completion early), then article counters mapped into the 40..=85
/// band, then a coarse per-state estimate, then pure attempt ratio.
pub fn derive_percent(attempt: u32, max_attempts: u32, state: &TaskState) -> u8 {
    let max_attempts = max_attempts.max(1);

    match state {
        TaskState::Succeeded { .. } => return 100,
        TaskState::Failed { .. } => return fallback_percent(attempt, max_attempts),
        _ => {}
    }

    if let Some(info) = state.progress() {
        if let Some(current) = info.current {
            return (current.round().clamp(0.0, 99.0)) as u8;
        }
        if let Some(percent) = article_percent(info) {
            return percent;
        }
    }

    match state {
        TaskState::Running(_) => {
            let time_based = attempt as f64 / max_attempts as f64 * 80.0 + 10.0;
            time_based.min(90.0).round() as u8
        }
        TaskState::Pending | TaskState::Started => {
            let early = attempt as f64 / 10.0 * 15.0;
            early.min(20.0).round() as u8
        }
        _ => fallback_percent(attempt, max_attempts),
    }
}

/// Article-counter percentage, mapped into the 40..=85 band. `None`
/// unless both counters are positive.
fn article_percent(info: &ProgressInfo) -> Option<u8> {
    let processed = info.articles_processed.filter(|&n| n > 0)?;
    let total = info.total_articles_found.filter(|&n| n > 0)?;
    let ratio = processed as f64 / total as f64;
    let percent = (40.0 + ratio * 45.0).round() as u8;
    Some(percent.min(85))
}

/// Time-based estimate used while a status check is failing or no
/// richer signal exists.
pub fn fallback_percent(attempt: u32, max_attempts: u32) -> u8 {
    let max_attempts = max_attempts.max(1);
    let percent = attempt as f64 / max_attempts as f64 * 80.0;
    percent.min(95.0).round() as u8
}

/// Human-readable overlay message for a snapshot, always suffixed with
/// the percentage so frontends can parse the bar fill back out.
///
/// Priority: backend-supplied message verbatim, then a synthesized
/// article-count message, then static per-state text, then a generic
/// line naming the category.
pub fn status_message(state: &TaskState, category: &str, percent: u8) -> String {
    if let Some(info) = state.progress() {
        if let Some(message) = info.message.as_deref() {
            return format!("{} ({}%)", message, percent);
        }
        if let (Some(processed), Some(total)) = (
            info.articles_processed.filter(|&n| n > 0),
            info.total_articles_found.filter(|&n| n > 0),
        ) {
            return format!("Processing articles ({}/{}) ({}%)", processed, total, percent);
        }
    }

    match state {
        TaskState::Pending => format!("{} queued... ({}%)", category, percent),
        TaskState::Started => format!("Starting {}... ({}%)", category, percent),
        TaskState::Running(_) => {
            let stage = if percent < 30 {
                "Loading pages..."
            } else if percent < 60 {
                "Extracting content..."
            } else if percent < 85 {
                "Processing articles..."
            } else {
                "Saving results..."
            };
            format!("{} ({}%)", stage, percent)
        }
        TaskState::Succeeded { .. } => format!("{} completed! ({}%)", category, percent),
        TaskState::Failed { .. } => format!("{} failed ({}%)", category, percent),
    }
}

/// Extract the "(NN%)" suffix from an overlay message.
pub fn parse_percent(message: &str) -> Option<u8> {
    let end = message.rfind("%)")?;
    let start = message[..end].rfind('(')?;
    message[start + 1..end].parse().ok()
}

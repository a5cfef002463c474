//! Plain-text rendering of queue snapshots.

use romen_upload_queue::{TaskSnapshot, TaskStatus};

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Human-readable byte count, e.g. `4.38 GiB`.
pub fn format_size(bytes: u64) -> String {
    match bytes {
        b if b >= GIB => format!("{:.2} GiB", b as f64 / GIB as f64),
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Uploading => "uploading",
        TaskStatus::Processing => "processing",
        TaskStatus::Completed => "done",
        TaskStatus::Failed => "failed",
    }
}

/// One status line for a task.
pub fn render_line(snap: &TaskSnapshot) -> String {
    let head = format!(
        "{:<11} {:>3}%  {}  ({})",
        status_label(snap.status),
        snap.progress_percent,
        snap.identity,
        format_size(snap.size_bytes)
    );

    match snap.status {
        TaskStatus::Completed => {
            let title = snap.display_title.as_deref().unwrap_or(&snap.identity);
            match &snap.cover_url {
                Some(cover) => format!("{head} -> {title} [{cover}]"),
                None => format!("{head} -> {title}"),
            }
        }
        TaskStatus::Failed => {
            format!("{head}: {}", snap.error.as_deref().unwrap_or("unknown error"))
        }
        _ => head,
    }
}

/// Final tally, e.g. `2 completed, 1 failed`.
pub fn summary(snaps: &[TaskSnapshot]) -> String {
    let completed = snaps
        .iter()
        .filter(|s| s.status == TaskStatus::Completed)
        .count();
    let failed = snaps
        .iter()
        .filter(|s| s.status == TaskStatus::Failed)
        .count();
    format!("{completed} completed, {failed} failed")
}

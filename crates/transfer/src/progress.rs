use std::sync::Arc;

/// Callback invoked with a new whole-percent upload value.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Percentage of `total` covered by `sent`, rounded down and clamped to 100.
///
/// Rounding down keeps 100 reserved for "every byte sent". An empty payload
/// is complete as soon as it starts.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total) as u128;
    (sent * 100 / total as u128) as u8
}

/// Accumulates sent bytes for one payload and reports percent changes.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    sent: u64,
    reported: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            sent: 0,
            reported: None,
        }
    }

    /// Records `bytes` more sent.
    ///
    /// Returns the new percentage only when it moved past the last reported
    /// value, so callers see a strictly increasing sequence.
    pub fn record(&mut self, bytes: u64) -> Option<u8> {
        self.sent = self.sent.saturating_add(bytes);
        self.advance()
    }

    /// Reports the starting percentage (0 for a non-empty payload).
    pub fn start(&mut self) -> Option<u8> {
        self.advance()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn percent(&self) -> u8 {
        percent_of(self.sent, self.total)
    }

    fn advance(&mut self) -> Option<u8> {
        let current = self.percent();
        match self.reported {
            Some(last) if current <= last => None,
            _ => {
                self.reported = Some(current);
                Some(current)
            }
        }
    }
}

/// Broadcaster lifecycle.
///
/// ```text
/// active → completed
///        ↘ failed(reason)
/// ```
///
/// Both terminal states look identical to observers: they receive
/// `on_completed` and nothing else. The failure reason is kept here for the
/// broadcaster's owner only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastState {
    Active,
    Completed,
    Failed(String),
}

impl BroadcastState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Counters for debugging a metering pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastDiagnostics {
    pub buffers_received: u64,
    pub snapshots_emitted: u64,
    pub empty_buffers_dropped: u64,
    pub buffers_after_termination: u64,
    pub active_subscribers: usize,
}

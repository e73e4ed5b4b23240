use std::time::Duration;

/// Board behavior knobs loaded alongside the rest of the application config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Refuse to pick up cards sitting in hired/rejected.
    pub lock_terminal_cards: bool,
    pub notification_capacity: usize,
    /// `None` disables the background refresh task.
    pub refresh_interval: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lock_terminal_cards: false,
            notification_capacity: 50,
            refresh_interval: Some(Duration::from_secs(30)),
        }
    }
}

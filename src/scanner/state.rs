use crate::models::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Waiting for the frame source to come up.
    #[default]
    Idle,
    Scanning,
    Submitting,
    Cooldown,
    /// Closed by the user; the frame source has been released.
    Closed,
    /// The frame source could not be acquired. Not retried.
    Unavailable,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Closed | ScanState::Unavailable)
    }

    pub fn can_transition_to(&self, next: ScanState) -> bool {
        use ScanState::*;
        match (self, next) {
            (Closed | Unavailable, _) => false,
            (_, Closed) => true,
            (Idle, Scanning | Unavailable) => true,
            (Scanning, Submitting) => true,
            (Submitting, Cooldown) => true,
            (Cooldown, Scanning) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    StateChanged(ScanState),
    Notice(Notice),
    Recorded(HistoryEntry),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_cycle_is_legal() {
        let cycle = [
            ScanState::Idle,
            ScanState::Scanning,
            ScanState::Submitting,
            ScanState::Cooldown,
            ScanState::Scanning,
        ];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn close_is_reachable_from_every_live_state() {
        for state in [
            ScanState::Idle,
            ScanState::Scanning,
            ScanState::Submitting,
            ScanState::Cooldown,
        ] {
            assert!(state.can_transition_to(ScanState::Closed));
        }
    }

    #[test]
    fn no_shortcuts_around_cooldown() {
        assert!(!ScanState::Submitting.can_transition_to(ScanState::Scanning));
        assert!(!ScanState::Scanning.can_transition_to(ScanState::Cooldown));
        assert!(!ScanState::Scanning.can_transition_to(ScanState::Unavailable));
    }

    #[test]
    fn terminal_states_stay_put() {
        assert!(ScanState::Closed.is_terminal());
        assert!(ScanState::Unavailable.is_terminal());
        assert!(!ScanState::Closed.can_transition_to(ScanState::Scanning));
        assert!(!ScanState::Unavailable.can_transition_to(ScanState::Closed));
    }
}

/// Domain status definitions for tracking traversal progress
use std::fmt;

/// Why a domain stopped before its queue was drained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendReason {
    /// The run's file quota is used up
    Quota,
    /// Too many consecutive failures on this domain
    Breaker,
    /// The run's wall-clock budget is spent
    Time,
    /// Free disk space dropped below the configured floor
    Disk,
    /// A termination signal arrived
    Shutdown,
}

impl SuspendReason {
    /// Returns true if the whole run must stop, not just this domain
    ///
    /// A tripped breaker only parks the offending domain.
    pub fn stops_run(&self) -> bool {
        !matches!(self, Self::Breaker)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quota => "quota",
            Self::Breaker => "breaker",
            Self::Time => "time",
            Self::Disk => "disk",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for SuspendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents where a domain is in its traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DomainStatus {
    /// Not started in this run
    #[default]
    Pending,

    /// Batches are being dispatched
    Active,

    // ===== Terminal States =====
    /// The queue emptied; the next run starts a new epoch
    Drained,

    /// Stopped with work still queued; resumes from the checkpoint
    Suspended(SuspendReason),
}

impl DomainStatus {
    /// Returns true if this is a terminal state for the current run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Drained | Self::Suspended(_))
    }

    /// Returns true when the status ends the entire run
    pub fn stops_run(&self) -> bool {
        match self {
            Self::Suspended(reason) => reason.stops_run(),
            _ => false,
        }
    }

    /// Checks whether moving to `next` is a legal transition
    ///
    /// Pending -> Active -> (Drained | Suspended). A domain may also be
    /// suspended before it ever becomes active, when the run budget is
    /// already exhausted.
    pub fn can_transition_to(&self, next: DomainStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Active) => true,
            (Self::Pending, Self::Suspended(_)) => true,
            (Self::Active, Self::Drained) => true,
            (Self::Active, Self::Suspended(_)) => true,
            _ => false,
        }
    }

    /// String form stored in the global statistics file
    pub fn to_db_string(&self) -> String {
        match self {
            Self::Pending => "pending".to_string(),
            Self::Active => "active".to_string(),
            Self::Drained => "drained".to_string(),
            Self::Suspended(reason) => format!("suspended:{}", reason),
        }
    }

    /// Parses a status from its stored string form
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "drained" => Some(Self::Drained),
            "suspended:quota" => Some(Self::Suspended(SuspendReason::Quota)),
            "suspended:breaker" => Some(Self::Suspended(SuspendReason::Breaker)),
            "suspended:time" => Some(Self::Suspended(SuspendReason::Time)),
            "suspended:disk" => Some(Self::Suspended(SuspendReason::Disk)),
            "suspended:shutdown" => Some(Self::Suspended(SuspendReason::Shutdown)),
            _ => None,
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

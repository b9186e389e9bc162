//! Execution status of a state machine.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// Where a state machine is in its lifecycle.
///
/// ```text
/// Created → Starting → Running ⇄ Transitioning → {Completed | Failed | Cancelled}
///                                                         ↓
///                                      Ready ← Resetting ←┘
/// ```
///
/// `Ready` behaves like `Created` when starting a new run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExecutionStatus {
    /// Freshly constructed, never run.
    Created = 0,
    /// Positioning at the start node.
    Starting = 1,
    /// Executing the current node.
    Running = 2,
    /// Moving between nodes.
    Transitioning = 3,
    /// The last run ended with `Success`.
    Completed = 4,
    /// The last run ended with `Failure` or an error.
    Failed = 5,
    /// The last run was cancelled.
    Cancelled = 6,
    /// Returning to `Ready`.
    Resetting = 7,
    /// Reset and able to run again.
    Ready = 8,
}

impl ExecutionStatus {
    /// Returns `true` while a run is in flight.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Starting | ExecutionStatus::Running | ExecutionStatus::Transitioning
        )
    }

    /// Returns `true` for statuses a run ends in.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Returns `true` if a run may start from this status.
    #[must_use]
    pub fn can_start(self) -> bool {
        matches!(self, ExecutionStatus::Created | ExecutionStatus::Ready)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ExecutionStatus::Created,
            1 => ExecutionStatus::Starting,
            2 => ExecutionStatus::Running,
            3 => ExecutionStatus::Transitioning,
            4 => ExecutionStatus::Completed,
            5 => ExecutionStatus::Failed,
            6 => ExecutionStatus::Cancelled,
            7 => ExecutionStatus::Resetting,
            _ => ExecutionStatus::Ready,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An [`ExecutionStatus`] readable from any thread without locking.
///
/// Only the run that owns the machine writes it.
#[derive(Debug)]
pub struct AtomicStatus(AtomicU8);

impl AtomicStatus {
    /// Creates a cell holding `status`.
    #[must_use]
    pub fn new(status: ExecutionStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    /// Reads the current status.
    #[must_use]
    pub fn load(&self) -> ExecutionStatus {
        ExecutionStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Publishes `next` and returns the previous status.
    pub fn swap(&self, next: ExecutionStatus) -> ExecutionStatus {
        ExecutionStatus::from_u8(self.0.swap(next as u8, Ordering::AcqRel))
    }

    /// Publishes `next` only if the status is still `current`.
    ///
    /// Returns the status observed before the attempt on failure.
    pub fn compare_exchange(
        &self,
        current: ExecutionStatus,
        next: ExecutionStatus,
    ) -> Result<ExecutionStatus, ExecutionStatus> {
        self.0
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ExecutionStatus::from_u8)
            .map_err(ExecutionStatus::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ExecutionStatus; 9] = [
        ExecutionStatus::Created,
        ExecutionStatus::Starting,
        ExecutionStatus::Running,
        ExecutionStatus::Transitioning,
        ExecutionStatus::Completed,
        ExecutionStatus::Failed,
        ExecutionStatus::Cancelled,
        ExecutionStatus::Resetting,
        ExecutionStatus::Ready,
    ];

    #[test]
    fn raw_values_map_back() {
        for status in ALL {
            assert_eq!(ExecutionStatus::from_u8(status as u8), status);
        }
    }

    #[test]
    fn classification_is_disjoint() {
        for status in ALL {
            assert!(!(status.is_active() && status.is_terminal()));
            assert!(!(status.can_start() && status.is_active()));
        }
        assert!(ExecutionStatus::Ready.can_start());
        assert!(!ExecutionStatus::Completed.can_start());
    }

    #[test]
    fn atomic_swap_and_cas() {
        let cell = AtomicStatus::new(ExecutionStatus::Created);
        assert_eq!(cell.swap(ExecutionStatus::Starting), ExecutionStatus::Created);
        assert_eq!(cell.load(), ExecutionStatus::Starting);

        assert_eq!(
            cell.compare_exchange(ExecutionStatus::Running, ExecutionStatus::Resetting),
            Err(ExecutionStatus::Starting)
        );
        assert_eq!(
            cell.compare_exchange(ExecutionStatus::Starting, ExecutionStatus::Running),
            Ok(ExecutionStatus::Starting)
        );
        assert_eq!(cell.load(), ExecutionStatus::Running);
    }

    #[test]
    fn display_matches_variant_name() {
        assert_eq!(ExecutionStatus::Transitioning.to_string(), "Transitioning");
    }
}

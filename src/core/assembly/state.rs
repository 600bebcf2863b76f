//! Per-patient assembly state machine
//!
//! One document moves through
//! `Idle -> Loaded -> BasicGraphBuilt -> MedicationAttached -> ObservationsAttached -> Finalized -> Reset`.
//! With several admissions the last three states repeat once per admission.
//! A patient without admissions goes from `Loaded` straight to `Finalized`.
//! Every exit path ends in `Reset`.

use crate::domain::errors::MedBundleError;
use crate::domain::Result;
use std::fmt;

/// Assembly state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssemblyState {
    /// Nothing started
    Idle,
    /// Patient record read from the source (or found missing)
    Loaded,
    /// Encounter, diagnoses, procedures and ward chain of one admission added
    BasicGraphBuilt,
    /// Medications and statements of the admission added
    MedicationAttached,
    /// Vitals, labs and notes of the admission added
    ObservationsAttached,
    /// Bundle verified and serialized
    Finalized,
    /// Bundle and caches cleared
    Reset,
}

impl AssemblyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::BasicGraphBuilt => "basic_graph_built",
            Self::MedicationAttached => "medication_attached",
            Self::ObservationsAttached => "observations_attached",
            Self::Finalized => "finalized",
            Self::Reset => "reset",
        }
    }

    /// Whether `next` may follow `self`
    pub fn can_advance_to(self, next: AssemblyState) -> bool {
        use AssemblyState::*;

        matches!(
            (self, next),
            (_, Reset)
                | (Idle, Loaded)
                | (Loaded, BasicGraphBuilt)
                | (Loaded, Finalized)
                | (BasicGraphBuilt, MedicationAttached)
                | (MedicationAttached, ObservationsAttached)
                | (ObservationsAttached, BasicGraphBuilt)
                | (ObservationsAttached, Finalized)
        )
    }
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus the path taken through the current document
#[derive(Debug, Clone)]
pub struct StateTracker {
    current: AssemblyState,
    history: Vec<AssemblyState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            current: AssemblyState::Idle,
            history: vec![AssemblyState::Idle],
        }
    }

    /// Start a new document; the previous path is discarded
    pub fn begin(&mut self) {
        self.current = AssemblyState::Idle;
        self.history.clear();
        self.history.push(AssemblyState::Idle);
    }

    /// Move to `next`
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not part of the state machine.
    pub fn advance(&mut self, next: AssemblyState) -> Result<()> {
        if !self.current.can_advance_to(next) {
            return Err(MedBundleError::Other(format!(
                "Illegal assembly transition {} -> {}",
                self.current, next
            )));
        }

        tracing::trace!(from = %self.current, to = %next, "Assembly state transition");
        self.current = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to [`AssemblyState::Reset`], which is reachable from anywhere
    pub fn reset(&mut self) {
        if self.current != AssemblyState::Reset {
            tracing::trace!(from = %self.current, "Assembly state reset");
            self.current = AssemblyState::Reset;
            self.history.push(AssemblyState::Reset);
        }
    }

    pub fn current(&self) -> AssemblyState {
        self.current
    }

    /// States visited since the last [`begin`](Self::begin)
    pub fn history(&self) -> &[AssemblyState] {
        &self.history
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::AssemblyState::*;
    use super::*;

    #[test]
    fn test_happy_path_with_two_admissions() {
        let mut tracker = StateTracker::new();
        tracker.begin();
        for state in [
            Loaded,
            BasicGraphBuilt,
            MedicationAttached,
            ObservationsAttached,
            BasicGraphBuilt,
            MedicationAttached,
            ObservationsAttached,
            Finalized,
        ] {
            tracker.advance(state).unwrap();
        }
        tracker.reset();

        assert_eq!(tracker.current(), Reset);
        assert_eq!(tracker.history().len(), 10);
        assert_eq!(tracker.history()[0], Idle);
    }

    #[test]
    fn test_not_found_short_circuits() {
        let mut tracker = StateTracker::new();
        tracker.advance(Loaded).unwrap();
        tracker.reset();
        assert_eq!(tracker.history(), &[Idle, Loaded, Reset]);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut tracker = StateTracker::new();
        assert!(tracker.advance(Finalized).is_err());
        assert!(tracker.advance(MedicationAttached).is_err());
        assert_eq!(tracker.current(), Idle);

        tracker.advance(Loaded).unwrap();
        tracker.advance(BasicGraphBuilt).unwrap();
        assert!(tracker.advance(ObservationsAttached).is_err());
        assert!(tracker.advance(Finalized).is_err());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut tracker = StateTracker::new();
        tracker.reset();
        tracker.reset();
        assert_eq!(tracker.history(), &[Idle, Reset]);
    }

    #[test]
    fn test_begin_clears_history() {
        let mut tracker = StateTracker::new();
        tracker.advance(Loaded).unwrap();
        tracker.reset();
        tracker.begin();
        assert_eq!(tracker.history(), &[Idle]);
        assert!(Reset.can_advance_to(Reset));
        assert!(!Reset.can_advance_to(Loaded));
    }
}

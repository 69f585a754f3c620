use std::{cell::Cell, rc::Rc};

use crate::sequence::Step;

/// Host surface shown once every step is confirmed.
pub trait CompletionUi {
    fn show_completion(&mut self);
}

/// [`CompletionUi`] that counts how often it was shown. Clones share the count.
#[derive(Debug, Clone, Default)]
pub struct RecordingCompletionUi {
    shown: Rc<Cell<usize>>,
}

impl RecordingCompletionUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn times_shown(&self) -> usize {
        self.shown.get()
    }
}

impl CompletionUi for RecordingCompletionUi {
    fn show_completion(&mut self) {
        self.shown.set(self.shown.get() + 1);
    }
}

/// Fires the completion signal exactly once, when every step is confirmed.
pub struct CompletionTracker {
    signaled: bool,
    ui: Box<dyn CompletionUi>,
}

impl CompletionTracker {
    pub fn new(ui: Box<dyn CompletionUi>) -> Self {
        Self {
            signaled: false,
            ui,
        }
    }

    pub fn all_confirmed(&self, steps: &[Step]) -> bool {
        steps.iter().all(|step| step.confirmed)
    }

    /// Signals completion if all steps are confirmed and it has not been
    /// signaled yet. Returns `true` only on the call that fired the signal.
    pub fn check_and_signal(&mut self, steps: &[Step]) -> bool {
        if self.signaled || !self.all_confirmed(steps) {
            return false;
        }
        self.signaled = true;
        tracing::info!(steps = steps.len(), "assembly complete");
        self.ui.show_completion();
        true
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled
    }
}

impl std::fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("signaled", &self.signaled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EntityId, Pose, SocketId};

    fn steps(confirmed: &[bool]) -> Vec<Step> {
        confirmed
            .iter()
            .enumerate()
            .map(|(index, confirmed)| {
                let mut step = Step::new(
                    index,
                    EntityId(index as u32),
                    SocketId(index as u32),
                    Pose::IDENTITY,
                );
                step.confirmed = *confirmed;
                step
            })
            .collect()
    }

    #[test]
    fn waits_for_every_step() {
        let ui = RecordingCompletionUi::new();
        let mut tracker = CompletionTracker::new(Box::new(ui.clone()));

        assert!(!tracker.check_and_signal(&steps(&[true, false, true])));
        assert_eq!(ui.times_shown(), 0);
        assert!(!tracker.is_signaled());
    }

    #[test]
    fn signals_exactly_once() {
        let ui = RecordingCompletionUi::new();
        let mut tracker = CompletionTracker::new(Box::new(ui.clone()));
        let done = steps(&[true, true, true]);

        assert!(tracker.all_confirmed(&done));
        assert!(tracker.check_and_signal(&done));
        assert!(!tracker.check_and_signal(&done));
        assert!(!tracker.check_and_signal(&done));
        assert_eq!(ui.times_shown(), 1);
    }
}

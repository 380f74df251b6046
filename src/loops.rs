//! The watch/render state machine.
//!
//! Two tasks share one [`LoopState`]: a background watch loop polls the LFL
//! file's modification time and runs a reprocessing pass per observed
//! change, and the render side (the main thread, the only task allowed to
//! touch the UI) calls [`render_tick`] once per frame to consume what the
//! watch loop publishes. The handoff is a single-slot "latest assignment
//! wins" mailbox guarded by a ready flag, plus a bounded LIFO stack of
//! pending error dialogs.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use log::{error, info, warn};

use crate::error::ProcessError;
use crate::reprocess::AxisAssignment;

/// Poll cadence of the watch loop and the idle render side.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Most pending dialogs kept; older ones are dropped first.
pub const ERROR_STACK_CAP: usize = 8;

/// A queued user-facing error dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingError {
    pub title: String,
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// LoopState
// ─────────────────────────────────────────────────────────────────────────────

struct LoopShared {
    exit: AtomicBool,
    ready: AtomicBool,
    slot: Mutex<Option<AxisAssignment>>,
    errors: Mutex<Vec<PendingError>>,
}

/// Cloneable handle to the state shared between the two loops.
#[derive(Clone)]
pub struct LoopState {
    inner: Arc<LoopShared>,
}

impl LoopState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoopShared {
                exit: AtomicBool::new(false),
                ready: AtomicBool::new(false),
                slot: Mutex::new(None),
                errors: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Ask both loops to stop. Observed within one poll interval.
    pub fn request_exit(&self) {
        self.inner.exit.store(true, Ordering::Release);
    }

    pub fn exit_requested(&self) -> bool {
        self.inner.exit.load(Ordering::Acquire)
    }

    /// Publish a fresh assignment; overwrites any unconsumed one.
    pub fn publish(&self, assignment: AxisAssignment) {
        *self.inner.slot.lock().unwrap() = Some(assignment);
        self.inner.ready.store(true, Ordering::Release);
    }

    /// Withdraw the ready flag without touching the slot, so a pass in
    /// flight can never expose a stale assignment.
    pub fn clear_ready(&self) {
        self.inner.ready.store(false, Ordering::Release);
    }

    pub fn ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Consume the published assignment, clearing the ready flag. Returns
    /// `None` when nothing new has been published since the last take.
    pub fn take_ready(&self) -> Option<AxisAssignment> {
        if self.inner.ready.swap(false, Ordering::AcqRel) {
            self.inner.slot.lock().unwrap().take()
        } else {
            None
        }
    }

    pub fn push_error(&self, title: impl Into<String>, message: impl Into<String>) {
        let mut errors = self.inner.errors.lock().unwrap();
        if errors.len() == ERROR_STACK_CAP {
            errors.remove(0);
        }
        errors.push(PendingError {
            title: title.into(),
            message: message.into(),
        });
    }

    pub fn push_process_error(&self, err: &ProcessError) {
        let (title, message) = err.dialog();
        self.push_error(title, message);
    }

    /// Pop the most recently queued error (stack discipline).
    pub fn pop_error(&self) -> Option<PendingError> {
        self.inner.errors.lock().unwrap().pop()
    }
}

impl Default for LoopState {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Watch loop
// ─────────────────────────────────────────────────────────────────────────────

/// Poll `lfl_path` and run `reprocess` once per observed mtime change.
///
/// The new mtime is recorded whether the pass succeeds or fails, so a
/// malformed edit is not retried until the file changes again. Recoverable
/// errors are queued for the render loop; a fatal error is queued, the exit
/// flag is set and the loop returns.
pub fn watch_loop<F>(lfl_path: &Path, state: &LoopState, mut reprocess: F)
where
    F: FnMut() -> Result<AxisAssignment, ProcessError>,
{
    let mut prev_mtime: Option<SystemTime> = None;
    while !state.exit_requested() {
        let mtime = match std::fs::metadata(lfl_path).and_then(|meta| meta.modified()) {
            Ok(mtime) => mtime,
            Err(err) => {
                warn!("cannot stat {}: {err}", lfl_path.display());
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
        };
        if prev_mtime.is_none_or(|prev| mtime > prev) {
            state.clear_ready();
            match reprocess() {
                Ok(assignment) => {
                    info!("pass succeeded with {} axes", assignment.len());
                    state.publish(assignment);
                }
                Err(err) if err.is_fatal() => {
                    error!("fatal: {err}");
                    state.push_process_error(&err);
                    state.request_exit();
                    return;
                }
                Err(err) => {
                    warn!("pass skipped: {err}");
                    state.push_process_error(&err);
                }
            }
            prev_mtime = Some(mtime);
        } else {
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Render tick
// ─────────────────────────────────────────────────────────────────────────────

/// One render-side step: drain a queued error or consume the latest
/// published assignment, whichever is more urgent.
///
/// The window calls this once per frame; headless callers drive it in a
/// loop of their own. Each tick shows at most one pending error (instead
/// of plotting), or plots the latest assignment exactly once. A `Data`
/// error from `plot` abandons only the current tick. Returns `false` once
/// exit has been requested, without touching either callback.
pub fn render_tick<E, P>(state: &LoopState, mut show_error: E, mut plot: P) -> bool
where
    E: FnMut(&PendingError),
    P: FnMut(AxisAssignment) -> Result<(), ProcessError>,
{
    if state.exit_requested() {
        return false;
    }
    if let Some(pending) = state.pop_error() {
        show_error(&pending);
    } else if let Some(assignment) = state.take_ready() {
        if let Err(err) = plot(assignment) {
            error!("plot attempt abandoned: {err}");
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reprocess::AxisAssignment;

    fn assignment() -> AxisAssignment {
        AxisAssignment::new(None, vec![vec!["ALT".into()]])
    }

    #[test]
    fn take_ready_consumes_exactly_once() {
        let state = LoopState::new();
        assert!(state.take_ready().is_none());
        state.publish(assignment());
        assert!(state.ready());
        assert!(state.take_ready().is_some());
        assert!(!state.ready());
        assert!(state.take_ready().is_none());
    }

    #[test]
    fn newest_assignment_wins() {
        let state = LoopState::new();
        state.publish(assignment());
        let second = AxisAssignment::new(None, vec![vec!["ALT".into()], vec!["IAS".into()]]);
        state.publish(second.clone());
        assert_eq!(state.take_ready(), Some(second));
        assert!(state.take_ready().is_none());
    }

    #[test]
    fn clear_ready_hides_the_slot_without_dropping_it() {
        let state = LoopState::new();
        state.publish(assignment());
        state.clear_ready();
        assert!(state.take_ready().is_none());
        // Republish makes it visible again.
        state.publish(assignment());
        assert!(state.take_ready().is_some());
    }

    #[test]
    fn errors_pop_in_lifo_order() {
        let state = LoopState::new();
        state.push_error("first", "a");
        state.push_error("second", "b");
        assert_eq!(state.pop_error().unwrap().title, "second");
        assert_eq!(state.pop_error().unwrap().title, "first");
        assert!(state.pop_error().is_none());
    }

    #[test]
    fn process_error_queues_its_dialog() {
        let state = LoopState::new();
        state.push_process_error(&ProcessError::MissingAxisGroup);
        let pending = state.pop_error().unwrap();
        assert_eq!(pending.title, "AXIS_1 parameter group is not defined!");
    }

    #[test]
    fn error_stack_drops_oldest_beyond_the_cap() {
        let state = LoopState::new();
        for i in 0..ERROR_STACK_CAP + 2 {
            state.push_error(format!("error {i}"), "m");
        }
        // Newest first, and the two oldest fell off.
        let mut popped = Vec::new();
        while let Some(pending) = state.pop_error() {
            popped.push(pending.title);
        }
        assert_eq!(popped.len(), ERROR_STACK_CAP);
        assert_eq!(popped.first().unwrap(), &format!("error {}", ERROR_STACK_CAP + 1));
        assert_eq!(popped.last().unwrap(), "error 2");
    }

    #[test]
    fn tick_prefers_errors_over_plotting() {
        let state = LoopState::new();
        state.publish(assignment());
        state.push_error("Processing failed!", "short read");

        let mut shown = 0;
        let mut plotted = 0;
        assert!(render_tick(&state, |_| shown += 1, |_| {
            plotted += 1;
            Ok(())
        }));
        assert_eq!((shown, plotted), (1, 0));
        assert!(render_tick(&state, |_| shown += 1, |_| {
            plotted += 1;
            Ok(())
        }));
        assert_eq!((shown, plotted), (1, 1));
    }

    #[test]
    fn tick_refuses_to_run_after_exit() {
        let state = LoopState::new();
        state.publish(assignment());
        state.request_exit();
        let touched = std::cell::Cell::new(false);
        assert!(!render_tick(&state, |_| touched.set(true), |_| {
            touched.set(true);
            Ok(())
        }));
        assert!(!touched.get());
    }

    #[test]
    fn exit_flag_round_trips() {
        let state = LoopState::new();
        assert!(!state.exit_requested());
        state.request_exit();
        assert!(state.exit_requested());
        let clone = state.clone();
        assert!(clone.exit_requested());
    }
}

// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::Arc;

use parking_lot::Mutex;

/// Represents the current state of a deferred invocation.
#[derive(PartialEq, Clone, Copy, Debug)]
enum CancelState {
    Pending,
    Fired,
    Cancelled,
}

/// A cancel handle guards a single deferred invocation. Whichever of fire or cancel
/// reaches the handle first wins, and the loser becomes a no-op.
#[derive(Clone)]
pub struct CancelHandle {
    /// The state of the invocation. The lock is held while the invocation runs.
    state: Arc<Mutex<CancelState>>,
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        CancelHandle {
            state: Arc::new(Mutex::new(CancelState::Pending)),
        }
    }

    /// Returns true if the invocation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.state.lock() == CancelState::Cancelled
    }

    /// Returns true if the invocation has already run.
    pub fn is_fired(&self) -> bool {
        *self.state.lock() == CancelState::Fired
    }

    /// Runs the callback unless the handle was cancelled or already fired. The state lock
    /// is held while the callback runs, so a concurrent cancel returns only after the
    /// callback has completed. Returns true if the callback ran.
    pub fn fire<F>(&self, callback: F) -> bool
    where
        F: FnOnce(),
    {
        let mut state = self.state.lock();
        if *state != CancelState::Pending {
            return false;
        }
        *state = CancelState::Fired;
        callback();
        true
    }

    /// Cancels the invocation. Returns true if this call prevented it from running.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        if *state == CancelState::Pending {
            *state = CancelState::Cancelled;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use super::*;

    #[test]
    fn test_cancel_handle_cancelled() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        assert!(cancel_handle.cancel());
        assert!(cancel_handle.is_cancelled());
        assert!(!cancel_handle.fire(|| panic!("cancelled handle should not fire")));

        // A second cancel does nothing.
        assert!(!cancel_handle.cancel());
    }

    #[test]
    fn test_cancel_handle_fired() {
        let cancel_handle = CancelHandle::new();
        let count = Arc::new(AtomicUsize::new(0));

        {
            let count = count.clone();
            assert!(cancel_handle.fire(move || {
                count.fetch_add(1, Ordering::Relaxed);
            }));
        }
        assert!(cancel_handle.is_fired());
        assert!(!cancel_handle.cancel());
        assert!(!cancel_handle.is_cancelled());

        // Firing twice runs the callback once.
        assert!(!cancel_handle.fire(|| panic!("handle should only fire once")));
        assert_eq!(1, count.load(Ordering::Relaxed));
    }

    #[test]
    fn test_cancel_waits_for_running_callback() {
        let cancel_handle = CancelHandle::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();

        let join = {
            let cancel_handle = cancel_handle.clone();
            let finished = finished.clone();
            thread::spawn(move || {
                cancel_handle.fire(move || {
                    started_tx.send(()).expect("unable to signal start");
                    thread::sleep(std::time::Duration::from_millis(50));
                    finished.store(1, Ordering::Relaxed);
                })
            })
        };

        started_rx.recv().expect("callback never started");
        assert!(!cancel_handle.cancel());
        // Cancel could only return once the callback released the lock.
        assert_eq!(1, finished.load(Ordering::Relaxed));
        assert!(join.join().expect("error joining thread"));
    }

    #[test]
    fn test_cancel_after_panicking_callback() {
        let cancel_handle = CancelHandle::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cancel_handle.fire(|| panic!("callback failed"));
        }));
        assert!(result.is_err());

        // The handle stays usable after the callback unwinds.
        assert!(cancel_handle.is_fired());
        assert!(!cancel_handle.cancel());
        assert!(!cancel_handle.is_cancelled());
    }
}

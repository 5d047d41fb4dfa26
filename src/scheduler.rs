// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

//! Deferred invocation and time sources for the playback engine.
//!
//! The engine never touches timers directly. It asks a [`Scheduler`] to run a callback
//! after a delay and keeps the returned [`CancelToken`] so the callback can be revoked.
//! Timestamps come from a [`Clock`] in whole milliseconds.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use crate::playsync::CancelHandle;

mod runtime;
mod virtual_clock;

pub use runtime::TokioScheduler;
pub use virtual_clock::VirtualScheduler;

/// A deferred invocation.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Global counter for generating unique token IDs.
static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a scheduled callback so that it can be cancelled.
#[derive(Clone)]
pub struct CancelToken {
    id: u64,
    handle: CancelHandle,
}

impl CancelToken {
    fn new() -> CancelToken {
        CancelToken {
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            handle: CancelHandle::new(),
        }
    }

    /// The unique ID of this token.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true if the callback has run.
    pub fn is_fired(&self) -> bool {
        self.handle.is_fired()
    }

    /// Returns true if the callback was cancelled before it could run.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    fn handle(&self) -> &CancelHandle {
        &self.handle
    }
}

/// A source of timestamps in milliseconds.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds.
    fn now(&self) -> u64;
}

/// Runs callbacks after a delay.
///
/// Implementations must guarantee that once [`Scheduler::cancel`] returns, the cancelled
/// callback will never run.
pub trait Scheduler: Send + Sync {
    /// Schedules the callback to run after the given delay.
    fn schedule(&self, delay: Duration, callback: Callback) -> CancelToken;

    /// Cancels a scheduled callback. Cancelling a callback that already ran is a no-op.
    fn cancel(&self, token: &CancelToken);
}

/// A monotonic wall clock measured from its creation.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod test {
    use std::{thread, time::Duration};

    use super::{CancelToken, Clock, SystemClock};

    #[test]
    fn test_tokens_are_unique() {
        let first = CancelToken::new();
        let second = CancelToken::new();
        assert_ne!(first.id(), second.id());
        assert!(!first.is_fired());
        assert!(!first.is_cancelled());
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let start = clock.now();
        thread::sleep(Duration::from_millis(20));
        assert!(clock.now() >= start + 20);
    }
}

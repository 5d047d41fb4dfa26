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
use std::{collections::BTreeMap, time::Duration};

use parking_lot::Mutex;

use super::{Callback, CancelToken, Clock, Scheduler};

struct Timer {
    token: CancelToken,
    callback: Callback,
}

struct Inner {
    /// The current virtual time in milliseconds.
    now: u64,
    /// Breaks ties between timers due at the same instant, keeping insertion order.
    seq: u64,
    /// Timers keyed by (due time, sequence).
    timers: BTreeMap<(u64, u64), Timer>,
}

/// A clock and scheduler that only moves when told to. Time advances in whole
/// milliseconds and timers fire in due order as the clock passes them.
pub struct VirtualScheduler {
    inner: Mutex<Inner>,
}

impl VirtualScheduler {
    /// Creates a virtual clock starting at zero.
    pub fn new() -> VirtualScheduler {
        VirtualScheduler::starting_at(0)
    }

    /// Creates a virtual clock starting at the given time.
    pub fn starting_at(now: u64) -> VirtualScheduler {
        VirtualScheduler {
            inner: Mutex::new(Inner {
                now,
                seq: 0,
                timers: BTreeMap::new(),
            }),
        }
    }

    /// The number of timers waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.lock().timers.len()
    }

    /// Moves the clock forward, firing every timer that comes due on the way.
    pub fn advance(&self, millis: u64) {
        let target = self.inner.lock().now + millis;
        self.run_until(target);
    }

    /// Moves the clock to the given time, firing every timer due at or before it.
    /// Callbacks run without the internal lock held and observe the clock at their
    /// own due time.
    pub fn run_until(&self, target: u64) {
        loop {
            let timer = {
                let mut inner = self.inner.lock();
                let due = match inner.timers.keys().next() {
                    Some(&(due, _)) if due <= target => due,
                    _ => {
                        inner.now = inner.now.max(target);
                        return;
                    }
                };
                inner.now = inner.now.max(due);
                inner.timers.pop_first().map(|(_, timer)| timer)
            };

            if let Some(timer) = timer {
                timer.token.handle().fire(timer.callback);
            }
        }
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualScheduler {
    fn now(&self) -> u64 {
        self.inner.lock().now
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&self, delay: Duration, callback: Callback) -> CancelToken {
        let token = CancelToken::new();
        let mut inner = self.inner.lock();
        let due = inner.now + delay.as_millis() as u64;
        let seq = inner.seq;
        inner.seq += 1;
        inner.timers.insert(
            (due, seq),
            Timer {
                token: token.clone(),
                callback,
            },
        );
        token
    }

    fn cancel(&self, token: &CancelToken) {
        token.handle().cancel();
        self.inner
            .lock()
            .timers
            .retain(|_, timer| timer.token.id() != token.id());
    }
}

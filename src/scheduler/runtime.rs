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
use std::{collections::HashMap, error::Error, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{runtime::Handle, task::AbortHandle};
use tracing::debug;

use super::{Callback, CancelToken, Scheduler};

/// Schedules callbacks as sleeping tasks on a tokio runtime.
pub struct TokioScheduler {
    /// The runtime to spawn timers on.
    runtime: Handle,
    /// Abort handles for timers that haven't finished yet.
    tasks: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl TokioScheduler {
    /// Creates a scheduler on the runtime of the caller.
    pub fn new() -> Result<TokioScheduler, Box<dyn Error>> {
        Ok(TokioScheduler::with_handle(Handle::try_current()?))
    }

    /// Creates a scheduler on the given runtime.
    pub fn with_handle(runtime: Handle) -> TokioScheduler {
        TokioScheduler {
            runtime,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: Callback) -> CancelToken {
        let token = CancelToken::new();
        let id = token.id();
        let handle = token.handle().clone();
        let tasks = self.tasks.clone();

        // Hold the lock across the spawn so a zero delay timer can't remove itself
        // before it has been registered.
        let mut pending = self.tasks.lock();
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            handle.fire(callback);
            tasks.lock().remove(&id);
        });
        pending.insert(id, join.abort_handle());

        token
    }

    fn cancel(&self, token: &CancelToken) {
        if token.handle().cancel() {
            debug!(token = token.id(), "Cancelled timer.");
        }
        if let Some(abort) = self.tasks.lock().remove(&token.id()) {
            abort.abort();
        }
    }
}

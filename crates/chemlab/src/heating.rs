//! Heating Loop
//!
//! IDLE / HEATING. While heating, a periodic task raises the flask
//! temperature by a random step. The task is identified by a token so a tick
//! that wakes after `stop()` (or after a restart) is ignored.

use chemlab_common::SessionConfig;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::task::JoinHandle;

struct TickTask {
    token: u64,
    handle: JoinHandle<()>,
}

pub struct HeatingLoop {
    period: Duration,
    step: RangeInclusive<u32>,
    task: Option<TickTask>,
    next_token: u64,
}

impl HeatingLoop {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            period: config.heat_tick(),
            step: config.heat_step_min..=config.heat_step_max,
            task: None,
            next_token: 0,
        }
    }

    /// Start ticking. Any previous task is stopped first.
    pub fn start<F>(&mut self, spawn: F) -> u64
    where
        F: FnOnce(u64, Duration) -> JoinHandle<()>,
    {
        self.stop();
        self.next_token += 1;
        let token = self.next_token;
        let handle = spawn(token, self.period);
        self.task = Some(TickTask { token, handle });
        token
    }

    /// Stop ticking; no further tick from the old task takes effect
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }

    /// Called from the tick task itself when it exits on its own (cap reached)
    pub fn finish(&mut self, token: u64) {
        if self.is_current(token) {
            self.task = None;
        }
    }

    pub fn is_current(&self, token: u64) -> bool {
        matches!(&self.task, Some(t) if t.token == token)
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Random per-tick rise within the configured step range
    pub fn next_increment(&self) -> u32 {
        rand::thread_rng().gen_range(self.step.clone())
    }
}

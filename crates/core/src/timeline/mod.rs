use std::cmp::Ordering;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    pub time_seconds: f32,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f32) {
        if delta.is_finite() {
            self.time_seconds = (self.time_seconds + delta).max(0.0);
        }
    }
}

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    due_seconds: f32,
    sequence: u64,
    task: T,
}

/// Queue of continuations ordered by due time, then by scheduling order.
///
/// Nothing sleeps: a task is handed back once the host tick passes its due
/// time, so callers must re-check their own state when it resumes.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<ScheduledTask<T>>,
    next_sequence: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_sequence: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run once `delay` seconds have elapsed after `now`.
    ///
    /// A zero delay waits for the next tick rather than running immediately.
    pub fn schedule_after(&mut self, now: f32, delay: f32, task: T) {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.tasks.push(ScheduledTask {
            due_seconds: now + delay,
            sequence,
            task,
        });
        self.tasks.sort_by(|a, b| {
            a.due_seconds
                .total_cmp(&b.due_seconds)
                .then(a.sequence.cmp(&b.sequence))
        });
    }

    /// Removes and returns the earliest task due at or before `now`.
    ///
    /// Tasks scheduled during the current tick with a zero delay are not
    /// returned until a later call observes a strictly newer `now`.
    pub fn pop_due(&mut self, now: f32, tick_started_sequence: u64) -> Option<T> {
        let first = self.tasks.first()?;
        let ready = match first.due_seconds.total_cmp(&now) {
            Ordering::Less => true,
            Ordering::Equal => first.sequence < tick_started_sequence,
            Ordering::Greater => false,
        };
        if !ready {
            return None;
        }
        Some(self.tasks.remove(0).task)
    }

    /// Sequence number that the next scheduled task will receive. Capture it at
    /// the start of a tick and pass it to [`Scheduler::pop_due`].
    pub fn watermark(&self) -> u64 {
        self.next_sequence
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

//! Delayed tasks
//!
//! A one-shot timer queue on the host clock. The host calls
//! [`TaskQueue::run_due`] whenever it gets control (each frame or event);
//! tasks whose due time has passed run in due order, ties broken by
//! scheduling order. Every task is cancellable through its [`DelayedTask`]
//! handle, and dropping the handle cancels it as well.

use holo_platform::FrameHost;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle to a scheduled task
    pub struct TaskId;
}

struct Task {
    due_ms: f64,
    seq: u64,
    run: Box<dyn FnOnce()>,
}

struct TaskQueueInner {
    tasks: SlotMap<TaskId, Task>,
    next_seq: u64,
    host: Rc<dyn FrameHost>,
}

/// Queue of one-shot delayed callbacks
#[derive(Clone)]
pub struct TaskQueue {
    inner: Rc<RefCell<TaskQueueInner>>,
}

impl TaskQueue {
    pub fn new(host: Rc<dyn FrameHost>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TaskQueueInner {
                tasks: SlotMap::with_key(),
                next_seq: 0,
                host,
            })),
        }
    }

    /// Run `f` once, `delay_ms` from now
    pub fn schedule<F>(&self, delay_ms: f64, f: F) -> DelayedTask
    where
        F: FnOnce() + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let due_ms = inner.host.now_ms() + delay_ms.max(0.0);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let id = inner.tasks.insert(Task {
            due_ms,
            seq,
            run: Box::new(f),
        });

        DelayedTask {
            queue: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Run every task that is due; returns how many ran
    ///
    /// Tasks scheduled by a running task are picked up in the same call if
    /// they are already due.
    pub fn run_due(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut inner = self.inner.borrow_mut();
                let now = inner.host.now_ms();
                let next = inner
                    .tasks
                    .iter()
                    .filter(|(_, t)| t.due_ms <= now)
                    .min_by(|(_, a), (_, b)| {
                        a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq))
                    })
                    .map(|(id, _)| id);
                match next {
                    Some(id) => inner.tasks.remove(id),
                    None => None,
                }
            };

            match task {
                Some(task) => {
                    (task.run)();
                    ran += 1;
                }
                None => break,
            }
        }
        ran
    }

    /// Earliest due time among pending tasks
    pub fn next_due(&self) -> Option<f64> {
        self.inner
            .borrow()
            .tasks
            .values()
            .map(|t| t.due_ms)
            .min_by(f64::total_cmp)
    }

    pub fn now_ms(&self) -> f64 {
        self.inner.borrow().host.now_ms()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.borrow().tasks.len()
    }
}

/// Handle to a scheduled task; dropping it cancels the task
pub struct DelayedTask {
    queue: Weak<RefCell<TaskQueueInner>>,
    id: TaskId,
}

impl DelayedTask {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Cancel the task if it has not run yet
    pub fn cancel(&self) {
        if let Some(inner) = self.queue.upgrade() {
            // Dropped outside the borrow: the closure may own other handles
            let removed = inner.borrow_mut().tasks.remove(self.id);
            drop(removed);
        }
    }

    /// Whether the task is still waiting to run
    pub fn is_pending(&self) -> bool {
        self.queue
            .upgrade()
            .is_some_and(|inner| inner.borrow().tasks.contains_key(self.id))
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for DelayedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedTask")
            .field("id", &self.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holo_platform::ManualHost;
    use std::cell::Cell;

    fn setup() -> (Rc<ManualHost>, TaskQueue) {
        let host = Rc::new(ManualHost::new());
        let queue = TaskQueue::new(host.clone());
        (host, queue)
    }

    #[test]
    fn test_task_runs_when_due() {
        let (host, queue) = setup();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let task = queue.schedule(120.0, move || flag.set(true));

        host.advance(119.0);
        assert_eq!(queue.run_due(), 0);
        assert!(task.is_pending());

        host.advance(1.0);
        assert_eq!(queue.run_due(), 1);
        assert!(fired.get());
        assert!(!task.is_pending());
    }

    #[test]
    fn test_cancel_prevents_run() {
        let (host, queue) = setup();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let task = queue.schedule(10.0, move || flag.set(true));

        task.cancel();
        host.advance(100.0);
        queue.run_due();
        assert!(!fired.get());
    }

    #[test]
    fn test_drop_cancels() {
        let (host, queue) = setup();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        drop(queue.schedule(10.0, move || flag.set(true)));

        assert_eq!(queue.pending_count(), 0);
        host.advance(100.0);
        queue.run_due();
        assert!(!fired.get());
    }

    #[test]
    fn test_due_order_with_ties() {
        let (host, queue) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));

        let push = |label: &'static str| {
            let order = Rc::clone(&order);
            move || order.borrow_mut().push(label)
        };
        let _c = queue.schedule(30.0, push("c"));
        let _a = queue.schedule(10.0, push("a"));
        let _b = queue.schedule(10.0, push("b"));

        assert_eq!(queue.next_due(), Some(10.0));
        host.advance(50.0);
        assert_eq!(queue.run_due(), 3);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_task_can_schedule_followup() {
        let (host, queue) = setup();
        let count = Rc::new(Cell::new(0));
        let keep: Rc<RefCell<Option<DelayedTask>>> = Rc::new(RefCell::new(None));

        let inner_count = Rc::clone(&count);
        let inner_queue = queue.clone();
        let slot = Rc::clone(&keep);
        let _first = queue.schedule(0.0, move || {
            inner_count.set(inner_count.get() + 1);
            let again = Rc::clone(&inner_count);
            *slot.borrow_mut() = Some(inner_queue.schedule(0.0, move || again.set(again.get() + 1)));
        });

        host.advance(1.0);
        assert_eq!(queue.run_due(), 2);
        assert_eq!(count.get(), 2);
    }
}

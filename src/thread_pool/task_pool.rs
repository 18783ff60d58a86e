//! Fixed-size worker pool draining a shared FIFO queue
//!
//! Every submitted task receives a strictly increasing id. Completion is
//! tracked as a low watermark (every id below it is done) plus a sparse set
//! of finished ids above it, so `wait_all` is an exact barrier: it returns
//! once the watermark reaches the number of submitted tasks.

use std::any::Any;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashSet;

use crate::error::{EngineError, EngineResult};

pub type TaskId = u64;

type Job = Box<dyn FnOnce() + Send + 'static>;
type PanicPayload = Box<dyn Any + Send + 'static>;

struct Task {
    id: TaskId,
    job: Job,
}

struct Queue {
    tasks: VecDeque<Task>,
    quit: bool,
}

struct Completion {
    watermark: TaskId,
    finished: FxHashSet<TaskId>,
}

impl Completion {
    fn is_done(&self, id: TaskId) -> bool {
        id < self.watermark || self.finished.contains(&id)
    }

    fn mark_done(&mut self, id: TaskId) {
        if id != self.watermark {
            self.finished.insert(id);
            return;
        }
        self.watermark += 1;
        while self.finished.remove(&self.watermark) {
            self.watermark += 1;
        }
    }
}

struct Shared {
    queue: Mutex<Queue>,
    task_added: Condvar,
    submitted: AtomicU64,
    completion: Mutex<Completion>,
    task_done: Condvar,
    // first panic raised by a task, re-raised on the waiting thread
    panic: Mutex<Option<PanicPayload>>,
}

pub struct TaskPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskPool {
    /// Starts `threads` workers. Zero is clamped to one.
    pub fn new(threads: usize) -> EngineResult<Self> {
        let threads = if threads == 0 {
            log::warn!("Task pool requested with 0 workers, using 1");
            1
        } else {
            threads
        };

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
                quit: false,
            }),
            task_added: Condvar::new(),
            submitted: AtomicU64::new(0),
            completion: Mutex::new(Completion {
                watermark: 0,
                finished: FxHashSet::default(),
            }),
            task_done: Condvar::new(),
            panic: Mutex::new(None),
        });

        // Already started workers are joined by Drop if a later spawn fails.
        let mut pool = TaskPool {
            shared,
            workers: Vec::with_capacity(threads),
        };

        for n in 0..threads {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("fluid-worker-{n}"))
                .spawn(move || worker_loop(&shared))
                .map_err(EngineError::ThreadSpawn)?;
            pool.workers.push(handle);
        }

        log::debug!("Task pool started with {} workers", threads);
        Ok(pool)
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Queues a task and returns its id without waiting.
    pub fn submit<F>(&self, job: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(job))
    }

    fn enqueue(&self, job: Job) -> TaskId {
        let mut queue = self.shared.queue.lock();
        // ids are handed out under the queue lock so FIFO order matches id order
        let id = self.shared.submitted.fetch_add(1, Ordering::AcqRel);
        queue.tasks.push_back(Task { id, job });
        drop(queue);
        self.shared.task_added.notify_one();
        id
    }

    /// Blocks until task `id` has finished.
    pub fn wait(&self, id: TaskId) {
        {
            let mut completion = self.shared.completion.lock();
            self.shared
                .task_done
                .wait_while(&mut completion, |completion| !completion.is_done(id));
        }
        self.resume_task_panic();
    }

    /// Blocks until every task submitted so far has finished.
    ///
    /// A panic raised inside any of those tasks is re-raised here.
    pub fn wait_all(&self) {
        self.wait_idle();
        self.resume_task_panic();
    }

    fn wait_idle(&self) {
        let mut completion = self.shared.completion.lock();
        let shared = &self.shared;
        shared.task_done.wait_while(&mut completion, |completion| {
            completion.watermark < shared.submitted.load(Ordering::Acquire)
        });
    }

    fn resume_task_panic(&self) {
        if let Some(payload) = self.shared.panic.lock().take() {
            panic::resume_unwind(payload);
        }
    }

    /// Runs `f` with a scope whose tasks may borrow from the caller.
    ///
    /// Every task submitted through the scope has finished when this
    /// returns, including when `f` unwinds.
    pub fn scope<'env, F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Scope<'_, 'env>) -> R,
    {
        let scope = Scope {
            pool: self,
            _env: PhantomData,
        };
        let result = {
            let _barrier = ScopeBarrier(self);
            f(&scope)
        };
        self.resume_task_panic();
        result
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shared.queue.lock().quit = true;
        self.shared.task_added.notify_all();
        for worker in self.workers.drain(..) {
            // worker panics are caught per task, a join error cannot carry new information
            let _ = worker.join();
        }
        log::debug!("Task pool stopped");
    }
}

/// Submission handle for tasks borrowing data that lives for `'env`
pub struct Scope<'pool, 'env> {
    pool: &'pool TaskPool,
    _env: PhantomData<&'env mut &'env ()>,
}

impl<'pool, 'env> Scope<'pool, 'env> {
    pub fn submit<F>(&self, job: F) -> TaskId
    where
        F: FnOnce() + Send + 'env,
    {
        let job: Box<dyn FnOnce() + Send + 'env> = Box::new(job);
        // SAFETY: `TaskPool::scope` does not return (or finish unwinding)
        // before every task has run, so nothing borrowed for 'env is
        // touched after 'env ends. Only the lifetime bound is erased.
        let job: Job = unsafe { std::mem::transmute::<Box<dyn FnOnce() + Send + 'env>, Job>(job) };
        self.pool.enqueue(job)
    }

    pub fn wait_all(&self) {
        self.pool.wait_all();
    }
}

struct ScopeBarrier<'a>(&'a TaskPool);

impl Drop for ScopeBarrier<'_> {
    fn drop(&mut self) {
        self.0.wait_idle();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            shared
                .task_added
                .wait_while(&mut queue, |queue| !queue.quit && queue.tasks.is_empty());
            if queue.quit {
                break;
            }
            match queue.tasks.pop_front() {
                Some(task) => task,
                None => continue,
            }
        };

        let Task { id, job } = task;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let mut slot = shared.panic.lock();
            if slot.is_none() {
                *slot = Some(payload);
            }
        }

        shared.completion.lock().mark_done(id);
        shared.task_done.notify_all();
    }
}

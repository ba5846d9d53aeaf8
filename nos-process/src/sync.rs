//! Blocking primitives used by the process subsystem
//!
//! `Mutex` is the spin mutex used across the NOS crates; holding its
//! guard is what "holding the lock" means, so releasing a lock the caller
//! does not hold cannot be expressed. `CondVar` and `Semaphore` are built on
//! top of it and relax the CPU between checks instead of parking, which is
//! all the process subsystem needs from a wait channel.

use core::sync::atomic::{AtomicUsize, Ordering};

use nos_api::sync::relax;
pub use spin::{Mutex, MutexGuard};

/// Condition variable paired with a [`Mutex`].
///
/// Wakeups may be spurious; waiters must re-check their condition in a loop.
pub struct CondVar {
    /// Bumped by every `notify_all`
    epoch: AtomicUsize,
    /// Threads between `wait` entry and exit
    waiters: AtomicUsize,
    /// Outstanding single wakeups handed out by `notify_one`
    permits: AtomicUsize,
}

impl CondVar {
    pub const fn new() -> Self {
        Self {
            epoch: AtomicUsize::new(0),
            waiters: AtomicUsize::new(0),
            permits: AtomicUsize::new(0),
        }
    }

    /// Release `guard`, block until notified, and reacquire `mutex`.
    ///
    /// The waiter is registered before the guard is dropped, so a notify
    /// issued by a thread that then takes the mutex is never lost.
    pub fn wait<'a, T>(&self, mutex: &'a Mutex<T>, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.waiters.fetch_add(1, Ordering::SeqCst);
        drop(guard);

        loop {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                break;
            }
            let permits = self.permits.load(Ordering::SeqCst);
            if permits > 0
                && self
                    .permits
                    .compare_exchange(permits, permits - 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                break;
            }
            relax();
        }

        self.waiters.fetch_sub(1, Ordering::SeqCst);
        mutex.lock()
    }

    /// Wake at least one waiter, if any.
    pub fn notify_one(&self) {
        if self.waiters.load(Ordering::SeqCst) > self.permits.load(Ordering::SeqCst) {
            self.permits.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Wake every current waiter.
    pub fn notify_all(&self) {
        if self.waiters.load(Ordering::SeqCst) > 0 {
            self.permits.store(0, Ordering::SeqCst);
            self.epoch.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of threads currently blocked in `wait`.
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::SeqCst)
    }
}

impl Default for CondVar {
    fn default() -> Self {
        Self::new()
    }
}

/// Counting semaphore.
pub struct Semaphore {
    count: Mutex<usize>,
    cv: CondVar,
}

impl Semaphore {
    pub const fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cv: CondVar::new(),
        }
    }

    /// P: block until the count is positive, then decrement it.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            count = self.cv.wait(&self.count, count);
        }
        *count -= 1;
    }

    /// V: increment the count and wake one waiter.
    pub fn signal(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cv.notify_one();
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}

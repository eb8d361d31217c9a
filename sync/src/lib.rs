// Copyright 2018 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Thin wrappers around `std::sync::Mutex` and `std::sync::Condvar` that
//! treat a poisoned lock as a bug in the holder of the lock, not a condition
//! every caller up the stack needs to plumb through a `Result`. A panic
//! while holding one of these locks aborts the process in every binary in
//! this workspace anyway (none of them catch panics across threads), so
//! poisoning can never actually happen in practice; unwrapping it here keeps
//! `tpool`'s pool and task code free of `.unwrap()` noise at every lock site.

use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::LockResult;
use std::sync::MutexGuard;
use std::time::Duration;

/// A `std::sync::Mutex` that resolves poisoning by taking the guard anyway.
#[derive(Debug, Default)]
pub struct Mutex<T: ?Sized>(std::sync::Mutex<T>);

impl<T> Mutex<T> {
    pub fn new(val: T) -> Self {
        Mutex(std::sync::Mutex::new(val))
    }

    pub fn into_inner(self) -> T {
        clean(self.0.into_inner())
    }
}

impl<T: ?Sized> Mutex<T> {
    pub fn lock(&self) -> MutexGuard<T> {
        clean(self.0.lock())
    }

    pub fn try_lock(&self) -> Option<MutexGuard<T>> {
        match self.0.try_lock() {
            Ok(guard) => Some(guard),
            Err(std::sync::TryLockError::Poisoned(p)) => Some(p.into_inner()),
            Err(std::sync::TryLockError::WouldBlock) => None,
        }
    }

    fn get_mut(&mut self) -> &mut T {
        clean(self.0.get_mut())
    }
}

impl<T: ?Sized> Deref for Mutex<T> {
    type Target = std::sync::Mutex<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<T> for Mutex<T> {
    fn from(val: T) -> Self {
        Mutex::new(val)
    }
}

/// A `std::sync::Condvar` companion to [`Mutex`] with the same poison-proof
/// `wait`/`wait_timeout`.
#[derive(Debug, Default)]
pub struct Condvar(std::sync::Condvar);

impl Condvar {
    pub fn new() -> Self {
        Condvar(std::sync::Condvar::new())
    }

    pub fn notify_one(&self) {
        self.0.notify_one();
    }

    pub fn notify_all(&self) {
        self.0.notify_all();
    }

    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        clean(self.0.wait(guard))
    }

    pub fn wait_timeout<'a, T>(
        &self,
        guard: MutexGuard<'a, T>,
        dur: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
        match self.0.wait_timeout(guard, dur) {
            Ok((guard, timeout)) => (guard, timeout.timed_out()),
            Err(p) => {
                let (guard, timeout) = p.into_inner();
                (guard, timeout.timed_out())
            }
        }
    }

    /// Blocks until `condition` holds, re-checking it after every wakeup.
    pub fn wait_while<'a, T, F>(&self, mut guard: MutexGuard<'a, T>, mut condition: F) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut guard) {
            guard = self.wait(guard);
        }
        guard
    }
}

fn clean<T>(result: LockResult<T>) -> T {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<T: ?Sized> DerefMut for Mutex<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.get_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::Condvar;
    use super::Mutex;

    #[test]
    fn mutex_basic() {
        let m = Mutex::new(5);
        *m.lock() += 1;
        assert_eq!(*m.lock(), 6);
    }

    #[test]
    fn condvar_wait_while() {
        let pair = Arc::new((Mutex::new(false), Condvar::new()));
        let pair2 = pair.clone();

        thread::spawn(move || {
            let (lock, cvar) = &*pair2;
            *lock.lock() = true;
            cvar.notify_one();
        });

        let (lock, cvar) = &*pair;
        let guard = cvar.wait_while(lock.lock(), |ready| !*ready);
        assert!(*guard);
    }

    #[test]
    fn mutex_survives_poison() {
        let m = Arc::new(Mutex::new(0));
        let m2 = m.clone();
        let _ = thread::spawn(move || {
            let _guard = m2.lock();
            panic!("poison the lock");
        })
        .join();

        // A panicking holder does not make the mutex unusable.
        assert_eq!(*m.lock(), 0);
    }
}

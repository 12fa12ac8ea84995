//! Lock helpers for coordinator state
//!
//! A poisoned lock means a panic happened while coordinator state was being
//! changed. It is reported as `CoordinatorError::Internal` naming the lock.

use crate::coordinator::CoordinatorError;
use std::sync::{Mutex, MutexGuard};

/// Lock `mutex`, turning poisoning into an internal coordinator error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use ddq::core::sync::lock_named;
///
/// let in_transit = Mutex::new(2);
/// let guard = lock_named(&in_transit, "in-transit counter").unwrap();
/// assert_eq!(*guard, 2);
/// ```
pub fn lock_named<'a, T>(
    mutex: &'a Mutex<T>,
    name: &str,
) -> Result<MutexGuard<'a, T>, CoordinatorError> {
    mutex.lock().map_err(|_| CoordinatorError::Internal {
        message: format!("{} lock poisoned by an earlier panic", name),
    })
}

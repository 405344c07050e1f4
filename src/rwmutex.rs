use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A reader-writer lock that can be switched off per instance.
///
/// With `safe` set, guards block like an ordinary [`RwLock`]. Without it the
/// guards never wait: they claim the lock with a single non-blocking attempt
/// and panic if another access overlaps. A single-threaded caller pays for one
/// uncontended atomic per operation, and concurrent misuse of an unsafe
/// instance is reported instead of corrupting the tree.
///
/// # Examples
///
/// ```
/// use gtree::RwMutex;
///
/// let counter = RwMutex::new(0, true);
/// *counter.write() += 1;
/// assert_eq!(*counter.read(), 1);
/// assert!(counter.is_safe());
/// ```
pub struct RwMutex<T> {
    lock: RwLock<T>,
    safe: bool,
}

impl<T> RwMutex<T> {
    pub fn new(value: T, safe: bool) -> Self {
        Self {
            lock: RwLock::new(value),
            safe,
        }
    }

    /// Returns `true` when the guards really block.
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        self.safe
    }

    /// Acquires shared access.
    ///
    /// # Panics
    ///
    /// Panics in unsafe mode if a writer currently holds the lock.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        if self.safe {
            return self.lock.read();
        }
        self.lock
            .try_read()
            .expect("`RwMutex::read()` - concurrent access to a tree created without `safe`")
    }

    /// Acquires exclusive access.
    ///
    /// # Panics
    ///
    /// Panics in unsafe mode if any other guard currently holds the lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        if self.safe {
            return self.lock.write();
        }
        self.lock
            .try_write()
            .expect("`RwMutex::write()` - concurrent access to a tree created without `safe`")
    }

    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn unsafe_mode_allows_shared_readers() {
        let lock = RwMutex::new(5, false);
        let a = lock.read();
        let b = lock.read();
        assert_eq!(*a + *b, 10);
    }

    #[test]
    #[should_panic(expected = "concurrent access to a tree created without `safe`")]
    fn unsafe_mode_reports_overlapping_writer() {
        let lock = RwMutex::new(5, false);
        let _reader = lock.read();
        let _writer = lock.write();
    }

    #[test]
    fn safe_mode_serializes_writers() {
        let lock = RwMutex::new(0_u32, true);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        *lock.write() += 1;
                    }
                });
            }
        });
        assert_eq!(lock.into_inner(), 4000);
    }
}

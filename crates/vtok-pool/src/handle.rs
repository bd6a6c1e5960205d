use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use vtok_types::ObjectHandle;

/// Monotonic source of object handles.
///
/// One generator is shared by a token pool and every session pool opened
/// against it, so a handle identifies one object across all of them and is
/// never issued twice while the generator lives.
#[derive(Debug)]
pub struct HandleGenerator {
    next: AtomicU64,
}

static GLOBAL: OnceLock<Arc<HandleGenerator>> = OnceLock::new();

impl HandleGenerator {
    /// A fresh generator whose first handle is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// The process-wide generator.
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Issue the next handle.
    pub fn next_handle(&self) -> ObjectHandle {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        ObjectHandle::new(raw).expect("handle counter starts at 1 and never wraps")
    }

    /// Number of handles issued so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for HandleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn starts_at_one_and_increases() {
        let gen = HandleGenerator::new();
        assert_eq!(gen.next_handle().as_u64(), 1);
        assert_eq!(gen.next_handle().as_u64(), 2);
        assert_eq!(gen.issued(), 2);
    }

    #[test]
    fn global_is_shared() {
        let a = HandleGenerator::global();
        let b = HandleGenerator::global();
        assert!(Arc::ptr_eq(&a, &b));
        let first = a.next_handle();
        assert!(b.next_handle() > first);
    }

    #[test]
    fn concurrent_handles_never_collide() {
        let gen = Arc::new(HandleGenerator::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let gen = Arc::clone(&gen);
                thread::spawn(move || (0..250).map(|_| gen.next_handle()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for worker in workers {
            for handle in worker.join().unwrap() {
                assert!(seen.insert(handle));
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}

//! Per-cycle critical sections
//!
//! The completion coordinator holds a cycle's lock for the whole
//! recount-and-cascade sequence, so two writers of the same cycle never
//! evaluate completion at the same time. Different cycles proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::CycleError;
use crate::models::CycleId;

/// Registry of one mutex per cycle
#[derive(Debug, Default)]
pub struct CycleLocks {
    locks: Mutex<HashMap<CycleId, Arc<Mutex<()>>>>,
}

impl CycleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock handle for a cycle, creating it on first use
    pub fn handle(&self, cycle_id: CycleId) -> Result<Arc<Mutex<()>>, CycleError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| CycleError::Storage(format!("Failed to acquire lock registry: {}", e)))?;
        Ok(Arc::clone(locks.entry(cycle_id).or_default()))
    }

    /// Run `f` while holding the cycle's lock
    pub fn with_cycle<T, F>(&self, cycle_id: CycleId, f: F) -> Result<T, CycleError>
    where
        F: FnOnce() -> Result<T, CycleError>,
    {
        let handle = self.handle(cycle_id)?;
        let _guard = handle
            .lock()
            .map_err(|e| CycleError::Storage(format!("Failed to acquire cycle lock: {}", e)))?;
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_same_cycle_shares_handle() {
        let locks = CycleLocks::new();
        let id = CycleId::new();
        let a = locks.handle(id).unwrap();
        let b = locks.handle(id).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &locks.handle(CycleId::new()).unwrap()));
    }

    #[test]
    fn test_with_cycle_serializes_critical_sections() {
        let locks = CycleLocks::new();
        let id = CycleId::new();
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    locks
                        .with_cycle(id, || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            std::thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}

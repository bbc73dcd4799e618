//! In-memory storage service.
//!
//! A FIFO of storage ids over a resident object map, guarded by a mutex and
//! two condition variables (one for consumers waiting on data, one for
//! producers waiting on space). This is the reference store the integration
//! tests run against; flight deployments plug in their own provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use bp6_core::types::{IpnAddress, Timeout};

use crate::{Sid, StorageProvider, StoreError, StoreKind, StoreObject};

/// Default object capacity of one RAM store.
pub const DEFAULT_CAPACITY: usize = 16_384;

struct Inner {
    queue: VecDeque<Sid>,
    resident: HashMap<Sid, Vec<u8>>,
    next_sid: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

/// One in-memory object queue.
#[derive(Clone)]
pub struct RamStorage {
    shared: Arc<Shared>,
}

impl RamStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    queue: VecDeque::new(),
                    resident: HashMap::new(),
                    next_sid: 1,
                }),
                readable: Condvar::new(),
                writable: Condvar::new(),
                capacity,
            }),
        }
    }
}

impl Default for RamStorage {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Wait on `condvar` until `ready` holds or the timeout elapses.
///
/// Returns the guard and whether the condition held. Spurious wakeups are
/// re-checked against the remaining time budget.
fn wait_until<'a, T>(
    condvar: &Condvar,
    mut guard: std::sync::MutexGuard<'a, T>,
    timeout: Timeout,
    mut ready: impl FnMut(&T) -> bool,
) -> (std::sync::MutexGuard<'a, T>, bool) {
    if ready(&guard) {
        return (guard, true);
    }
    match timeout {
        Timeout::Check => (guard, false),
        Timeout::Pend => {
            while !ready(&guard) {
                guard = condvar.wait(guard).expect("storage lock poisoned");
            }
            (guard, true)
        }
        Timeout::Millis(_) => {
            let budget = timeout.as_duration().expect("bounded timeout");
            let deadline = Instant::now() + budget;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    let is_ready = ready(&guard);
                    return (guard, is_ready);
                }
                let (g, _) = condvar
                    .wait_timeout(guard, deadline - now)
                    .expect("storage lock poisoned");
                guard = g;
                if ready(&guard) {
                    return (guard, true);
                }
            }
        }
    }
}

impl crate::StorageService for RamStorage {
    fn enqueue(&self, data: &[u8], timeout: Timeout) -> Result<(), StoreError> {
        let guard = self.shared.inner.lock().expect("storage lock poisoned");
        let capacity = self.shared.capacity;
        let (mut guard, ready) = wait_until(&self.shared.writable, guard, timeout, |inner| {
            inner.resident.len() < capacity
        });
        if !ready {
            return Err(StoreError::Full { capacity });
        }

        let sid = Sid(guard.next_sid);
        guard.next_sid += 1;
        guard.resident.insert(sid, data.to_vec());
        guard.queue.push_back(sid);
        drop(guard);

        self.shared.readable.notify_one();
        Ok(())
    }

    fn dequeue(&self, timeout: Timeout) -> Result<StoreObject, StoreError> {
        let guard = self.shared.inner.lock().expect("storage lock poisoned");
        let (mut guard, ready) = wait_until(&self.shared.readable, guard, timeout, |inner| {
            !inner.queue.is_empty()
        });
        if !ready {
            return Err(StoreError::Timeout);
        }

        let sid = guard.queue.pop_front().expect("queue checked non-empty");
        let data = guard
            .resident
            .get(&sid)
            .cloned()
            .ok_or(StoreError::NotFound(sid))?;
        Ok(StoreObject { sid, data })
    }

    fn retrieve(&self, sid: Sid, _timeout: Timeout) -> Result<StoreObject, StoreError> {
        let guard = self.shared.inner.lock().expect("storage lock poisoned");
        guard
            .resident
            .get(&sid)
            .cloned()
            .map(|data| StoreObject { sid, data })
            .ok_or(StoreError::NotFound(sid))
    }

    fn relinquish(&self, sid: Sid) -> Result<(), StoreError> {
        let mut guard = self.shared.inner.lock().expect("storage lock poisoned");
        let existed = guard.resident.remove(&sid).is_some();
        guard.queue.retain(|queued| *queued != sid);
        drop(guard);

        if existed {
            self.shared.writable.notify_one();
            Ok(())
        } else {
            Err(StoreError::NotFound(sid))
        }
    }

    fn count(&self) -> usize {
        let guard = self.shared.inner.lock().expect("storage lock poisoned");
        guard.resident.len()
    }
}

/// Provider handing out independent [`RamStorage`] queues.
#[derive(Debug, Clone)]
pub struct RamProvider {
    capacity: usize,
}

impl RamProvider {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for RamProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StorageProvider for RamProvider {
    type Service = RamStorage;

    fn create(&self, kind: StoreKind, addr: IpnAddress) -> Result<RamStorage, StoreError> {
        tracing::debug!(?kind, endpoint = %addr, capacity = self.capacity, "created RAM store");
        Ok(RamStorage::new(self.capacity))
    }
}

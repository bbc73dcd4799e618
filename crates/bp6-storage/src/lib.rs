//! Pluggable storage service for bundle endpoints.
//!
//! A channel persists three kinds of objects: outbound data bundles,
//! inbound payloads awaiting the application, and outbound custody-signal
//! records. Each lives in its own store created from a [`StorageProvider`].
//! Stores queue opaque byte objects: the engine never interprets a
//! [`Sid`] beyond equality with the vacant sentinel.

use core::fmt;

use bp6_core::types::{IpnAddress, Timeout};

pub mod ram;

pub use ram::{RamProvider, RamStorage};

/// Opaque storage id for an object held by a store.
///
/// `Sid::VACANT` is never assigned to a stored object; the active table uses
/// it to mark empty slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sid(pub u64);

impl Sid {
    /// Sentinel for "no object".
    pub const VACANT: Sid = Sid(0);

    pub fn is_vacant(&self) -> bool {
        *self == Self::VACANT
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sid:{}", self.0)
    }
}

/// An object handed out by a store. The store keeps the object resident
/// (addressable via `retrieve`) until it is relinquished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreObject {
    pub sid: Sid,
    pub data: Vec<u8>,
}

/// Which of a channel's stores is being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Outbound data bundles.
    Bundles,
    /// Inbound payloads awaiting `accept`.
    Payloads,
    /// Outbound aggregate custody signal records.
    Records,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The operation could not complete within its timeout. For a `Check`
    /// dequeue this simply means the store was empty.
    #[error("storage operation timed out")]
    Timeout,

    /// No object with the requested sid is resident.
    #[error("no object stored under {0}")]
    NotFound(Sid),

    /// The store cannot accept more objects.
    #[error("store is full ({capacity} objects)")]
    Full { capacity: usize },

    /// The backing service failed.
    #[error("storage service failure: {0}")]
    Service(String),
}

/// One queue of stored objects.
///
/// `dequeue` pops objects in FIFO order but leaves them resident so a
/// custody engine can `retrieve` them again for retransmission; an object's
/// life ends only at `relinquish`.
pub trait StorageService: Send + Sync {
    /// Append an object to the queue.
    fn enqueue(&self, data: &[u8], timeout: Timeout) -> Result<(), StoreError>;

    /// Pop the oldest queued object. The object stays resident.
    fn dequeue(&self, timeout: Timeout) -> Result<StoreObject, StoreError>;

    /// Fetch a resident object by sid without affecting the queue.
    fn retrieve(&self, sid: Sid, timeout: Timeout) -> Result<StoreObject, StoreError>;

    /// Release an object permanently.
    fn relinquish(&self, sid: Sid) -> Result<(), StoreError>;

    /// Number of objects currently resident.
    fn count(&self) -> usize;
}

/// Factory for a channel's stores.
pub trait StorageProvider {
    type Service: StorageService;

    /// Create the store of the given kind for the endpoint at `addr`.
    fn create(&self, kind: StoreKind, addr: IpnAddress) -> Result<Self::Service, StoreError>;
}

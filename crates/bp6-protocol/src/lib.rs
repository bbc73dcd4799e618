//! Custody and retransmission engines for a BPv6 bundle endpoint.
//!
//! The stateful half of the stack: the CID range set, the circular active
//! table of in-flight bundles, the aggregate custody signal engine, and the
//! channel engine that ties them to a storage service.

pub mod acs;
pub mod active_table;
pub mod channel;
pub mod custody;
pub mod error;
pub mod range_set;
pub mod stats;

pub use active_table::{ActiveBundle, ActiveTable};
pub use channel::{Channel, Disposition, Opt, OptMode};
pub use custody::CustodyEngine;
pub use error::ChannelError;
pub use range_set::{Range, RangeSet, RangeSetError};
pub use stats::ChannelStats;

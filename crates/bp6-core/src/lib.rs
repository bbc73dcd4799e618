//! Core types, codecs, and wire formats for the BPv6 bundle protocol stack.
//!
//! This crate defines the value types, channel attributes, SDNV and EID
//! codecs, block wire formats, and the bundle builder/parser shared by the
//! rest of the stack. Everything here is stateless with respect to I/O.

pub mod attributes;
pub mod blocks;
pub mod bundle;
pub mod clock;
pub mod constants;
pub mod eid;
pub mod error;
pub mod sdnv;
pub mod types;

pub use attributes::{ChannelAttributes, WrapResponse};
pub use bundle::{BundleBuilder, BundleRecord, PayloadRecord, Reception};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ClockError, CodecError, EidError};
pub use types::{BpVal, EventFlags, IpnAddress, Route, SdnvField, Timeout};

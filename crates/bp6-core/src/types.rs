//! Value types shared across the bundle protocol stack.
//!
//! These types bound what a bundle field can carry on the wire (`BpVal`),
//! describe where a field lives inside a block image (`SdnvField`), and
//! carry addressing, timeout, and advisory-flag information between the
//! engine and its callers.

use core::fmt;
use core::ops::BitOrAssign;
use core::time::Duration;

use serde::{Deserialize, Serialize};

/// The value domain of an SDNV-encoded bundle field.
pub type BpVal = u64;

/// The largest value an SDNV-encoded field can carry.
pub const MAX_ENCODED_VALUE: BpVal = u64::MAX;

/// A fixed-position SDNV field inside a block image.
///
/// `index` is the byte offset of the field within its block buffer and
/// `width` the number of bytes the encoding occupies. A width of zero means
/// the field is variable-length (reads consume until the continuation bit
/// clears; writes use the minimum encoding).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdnvField {
    /// Value of the field.
    pub value: BpVal,
    /// Byte offset of the field within its block buffer.
    pub index: usize,
    /// Fixed byte width of the encoding; 0 = variable.
    pub width: usize,
}

impl SdnvField {
    /// A field at a fixed position with a fixed width.
    pub const fn at(value: BpVal, index: usize, width: usize) -> Self {
        Self {
            value,
            index,
            width,
        }
    }
}

/// An IPN-scheme endpoint address: node number and service number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpnAddress {
    pub node: BpVal,
    pub service: BpVal,
}

impl IpnAddress {
    /// The null endpoint (`ipn:0.0`), used for records with no custodian.
    pub const NULL: IpnAddress = IpnAddress {
        node: 0,
        service: 0,
    };

    pub const fn new(node: BpVal, service: BpVal) -> Self {
        Self { node, service }
    }

    /// Whether this is the null endpoint.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl fmt::Display for IpnAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.service)
    }
}

/// Addressing information for a channel: where bundles come from, where they
/// go, and where status reports would be sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Route {
    pub local: IpnAddress,
    pub destination: IpnAddress,
    pub report: IpnAddress,
}

impl Route {
    pub const fn new(local: IpnAddress, destination: IpnAddress) -> Self {
        Self {
            local,
            destination,
            report: IpnAddress::NULL,
        }
    }
}

/// How long a blocking operation may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Block until the operation can complete.
    Pend,
    /// Do not block; fail immediately if the operation would wait.
    Check,
    /// Block for at most the given number of milliseconds.
    Millis(u32),
}

impl Timeout {
    /// The wait bound as a duration, or `None` for an unbounded pend.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Pend => None,
            Timeout::Check => Some(Duration::ZERO),
            Timeout::Millis(ms) => Some(Duration::from_millis(u64::from(*ms))),
        }
    }
}

/// Advisory event flags accumulated on a caller-supplied word.
///
/// Flags never fail an operation by themselves; they record conditions the
/// caller may want to react to (storage trouble, suspicious clock readings,
/// noncompliant peers). Bits are only ever ORed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFlags(u32);

impl EventFlags {
    /// Valid bundle, but the agent could not comply with the standard.
    pub const NONCOMPLIANT: u32 = 0x0000_0001;
    /// A block in the bundle was not recognized.
    pub const INCOMPLETE: u32 = 0x0000_0002;
    /// The clock returned a suspicious value.
    pub const UNRELIABLE_TIME: u32 = 0x0000_0004;
    /// Bundle dropped because a required extension block could not be processed.
    pub const DROPPED: u32 = 0x0000_0008;
    /// A bundle with a BIB failed the payload integrity check.
    pub const FAILED_INTEGRITY_CHECK: u32 = 0x0000_0010;
    /// Size of bundle exceeds the capacity allowed by the library.
    pub const BUNDLE_TOO_LARGE: u32 = 0x0000_0020;
    /// The bundle returned should be routed before transmission.
    pub const ROUTE_NEEDED: u32 = 0x0000_0040;
    /// The storage service failed to deliver data.
    pub const STORE_FAILURE: u32 = 0x0000_0080;
    /// Received a CID acknowledgment for which no bundle was found.
    pub const UNKNOWN_CID: u32 = 0x0000_0100;
    /// Insufficient room in the value to read/write an SDNV.
    pub const SDNV_OVERFLOW: u32 = 0x0000_0200;
    /// Insufficient room in the block to read/write an SDNV.
    pub const SDNV_INCOMPLETE: u32 = 0x0000_0400;
    /// The active table wrapped.
    pub const ACTIVE_TABLE_WRAP: u32 = 0x0000_0800;
    /// Multiple bundles on the network carry the same custody id.
    pub const DUPLICATES: u32 = 0x0000_1000;
    /// The custody range set was full.
    pub const CUSTODY_FULL: u32 = 0x0000_2000;
    /// Bundle contained an unknown administrative record.
    pub const UNKNOWN_RECORD: u32 = 0x0000_4000;
    /// Invalid cipher suite id found in a BIB.
    pub const INVALID_CIPHER_SUITE: u32 = 0x0000_8000;
    /// Invalid result type found in a BIB.
    pub const INVALID_BIB_RESULT_TYPE: u32 = 0x0001_0000;
    /// Invalid target type found in a BIB.
    pub const INVALID_BIB_TARGET_TYPE: u32 = 0x0002_0000;
    /// Unable to parse the bundle due to internal inconsistencies.
    pub const FAILED_TO_PARSE: u32 = 0x0004_0000;
    /// Calling code used the library incorrectly.
    pub const API_ERROR: u32 = 0x0008_0000;

    pub const fn new() -> Self {
        Self(0)
    }

    /// OR the given bits into the flag word.
    pub fn raise(&mut self, bits: u32) {
        self.0 |= bits;
    }

    /// Whether all of the given bits are set.
    pub fn contains(&self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    /// Whether any flag is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The raw bit word.
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl BitOrAssign for EventFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

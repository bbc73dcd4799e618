//! Block wire codecs for BPv6 bundles.
//!
//! Each codec owns a fixed-position field layout so a prebuilt header image
//! can be patched in place (custody id, creation time, payload length)
//! without re-encoding the whole block.

pub mod custody;
pub mod integrity;
pub mod payload;
pub mod primary;

pub use custody::CustodyBlock;
pub use integrity::IntegrityBlock;
pub use payload::PayloadBlock;
pub use primary::PrimaryBlock;

//! Channel attributes and their defaults.

use crate::constants::BIB_CRC16_X25;
use crate::types::BpVal;

/// What `load` does when the active table has no room for a new bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapResponse {
    /// Retransmit the bundle occupying the needed slot.
    Resend,
    /// Wait for an acknowledgment to free a slot, then report overflow.
    #[default]
    Block,
    /// Drop the bundle occupying the needed slot and take its place.
    Drop,
}

/// Per-channel configuration.
///
/// The dynamic attributes can be changed at runtime through the channel's
/// `config` surface; the fixed attributes are set at open and never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAttributes {
    // ---- Dynamic ----
    /// Seconds from creation until a bundle expires; 0 = never.
    pub lifetime: BpVal,
    /// Request custody transfer on outgoing bundles.
    pub request_custody: bool,
    /// Tag outgoing bundles as administrative records.
    pub admin_record: bool,
    /// Include a bundle integrity block.
    pub integrity_check: bool,
    /// Permit fragmenting bundles that exceed the maximum length.
    pub allow_fragmentation: bool,
    /// Never discard bundles for age.
    pub ignore_expiration: bool,
    /// Reuse the original custody id when retransmitting.
    pub cid_reuse: bool,
    /// BIB cipher suite id.
    pub cipher_suite: BpVal,
    /// Priority of generated bundles.
    pub class_of_service: u8,
    /// Retransmit timeout in seconds; 0 = no retransmission.
    pub timeout: BpVal,
    /// Maximum size of an emitted bundle in bytes.
    pub max_length: usize,
    /// Seconds between forced ACS emissions; 0 = threshold-only.
    pub dacs_rate: BpVal,

    // ---- Fixed ----
    /// Number of unacknowledged bundles to track.
    pub active_table_size: usize,
    /// Limits the size of one ACS record.
    pub max_fills_per_dacs: u32,
    /// Number of CID ranges the custody set can hold.
    pub max_gaps_per_dacs: u32,
    /// Policy when the active table wraps.
    pub wrap_response: WrapResponse,
    /// Upper bound on a single wrap wait, in milliseconds.
    pub wrap_timeout_ms: u32,
}

impl Default for ChannelAttributes {
    fn default() -> Self {
        Self {
            lifetime: 86_400,
            request_custody: true,
            admin_record: false,
            integrity_check: true,
            allow_fragmentation: false,
            ignore_expiration: false,
            cid_reuse: false,
            cipher_suite: BIB_CRC16_X25,
            class_of_service: 1,
            timeout: 10,
            max_length: 4096,
            dacs_rate: 5,
            active_table_size: 16_384,
            max_fills_per_dacs: 64,
            max_gaps_per_dacs: 1028,
            wrap_response: WrapResponse::Block,
            wrap_timeout_ms: 1000,
        }
    }
}

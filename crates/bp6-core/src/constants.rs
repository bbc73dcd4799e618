//! Protocol constants for BPv6 block and record encoding.

/// Bundle protocol version encoded in the primary block.
pub const PROTOCOL_VERSION: u8 = 0x06;

/// Size of the scratch buffer a bundle header is assembled into.
pub const BUNDLE_HDR_BUF_SIZE: usize = 128;

// ---- Block type codes ----

/// Payload block.
pub const PAY_BLK_TYPE: u8 = 0x01;

/// Custody Transfer Enhancement Block.
pub const CTEB_BLK_TYPE: u8 = 0x0A;

/// Bundle Integrity Block.
pub const BIB_BLK_TYPE: u8 = 0x0D;

// ---- Administrative record type codes ----

/// Status report record.
pub const STAT_REC_TYPE: u8 = 0x10;

/// Custody signal record (RFC 5050 style, unsupported).
pub const CS_REC_TYPE: u8 = 0x20;

/// Aggregate custody signal record.
pub const ACS_REC_TYPE: u8 = 0x40;

// ---- Aggregate custody signal record layout ----

/// Offset of the record type byte in an ACS record.
pub const ACS_REC_TYPE_INDEX: usize = 0;

/// Offset of the status byte in an ACS record.
pub const ACS_REC_STATUS_INDEX: usize = 1;

/// ACK bit of the ACS status byte; set when custody transfer succeeded.
pub const ACS_ACK_MASK: u8 = 0x01;

// ---- Block processing control flags ----

/// Block must be replicated in every fragment.
pub const BLK_REPALL_MASK: u64 = 0x01;

/// Transmit a status report if the block cannot be processed.
pub const BLK_NOTIFYNOPROC_MASK: u64 = 0x02;

/// Delete the bundle if the block cannot be processed.
pub const BLK_DELETENOPROC_MASK: u64 = 0x04;

/// Last block in the bundle.
pub const BLK_LASTBLOCK_MASK: u64 = 0x08;

/// Drop the block if it cannot be processed.
pub const BLK_DROPNOPROC_MASK: u64 = 0x10;

/// Block was forwarded without being processed.
pub const BLK_FORWARDNOPROC_MASK: u64 = 0x20;

// ---- Primary block processing control flags ----

/// Bundle is a fragment.
pub const PCF_FRAGMENT_MASK: u64 = 0x000001;

/// Bundle is an administrative record.
pub const PCF_ADMIN_MASK: u64 = 0x000002;

/// Bundle must not be fragmented.
pub const PCF_NOFRAG_MASK: u64 = 0x000004;

/// Custody transfer is requested.
pub const PCF_CSTRQST_MASK: u64 = 0x000008;

/// Destination endpoint is a singleton.
pub const PCF_SINGLETON_MASK: u64 = 0x000010;

/// Acknowledgement is requested from the application.
pub const PCF_ACKRQST_MASK: u64 = 0x000020;

// ---- BIB cipher suites ----

/// No integrity check.
pub const BIB_NONE: u64 = 0;

/// CRC-16/X.25 over the payload (2-byte security result).
pub const BIB_CRC16_X25: u64 = 10;

/// CRC-32/Castagnoli over the payload (4-byte security result).
pub const BIB_CRC32_CASTAGNOLI: u64 = 11;

/// BIB security result type for an integrity signature.
pub const BIB_INTEGRITY_SIGNATURE: u8 = 5;

// ---- EID text format ----

/// Maximum length of an `ipn:N.S` endpoint id string.
pub const MAX_EID_STRING: usize = 128;

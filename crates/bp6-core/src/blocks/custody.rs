//! Custody Transfer Enhancement Block codec.
//!
//! The CTEB carries the custody id assigned to an in-flight bundle and the
//! custodian's endpoint id. The CID field sits at a fixed offset inside the
//! block so a retransmitted bundle can have a fresh CID patched into its
//! stored header without re-encoding.

use crate::constants::{BLK_REPALL_MASK, CTEB_BLK_TYPE, MAX_EID_STRING};
use crate::eid;
use crate::error::CodecError;
use crate::sdnv;
use crate::types::{EventFlags, IpnAddress, SdnvField};

/// Parsed or template form of a custody transfer enhancement block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustodyBlock {
    pub block_flags: SdnvField,
    pub blklen: SdnvField,
    pub cid: SdnvField,
    pub custodian: IpnAddress,
}

impl CustodyBlock {
    /// Template with the fixed field layout used for prebuilt headers.
    pub fn template() -> Self {
        Self {
            //                            value  index  width
            block_flags: SdnvField::at(0, 1, 1),
            blklen: SdnvField::at(0, 2, 1),
            cid: SdnvField::at(0, 3, 4),
            custodian: IpnAddress::NULL,
        }
    }

    /// Serialize the block at its template field positions.
    ///
    /// The custodian EID is written as text after the CID field. Returns the
    /// number of bytes written.
    pub fn write(&mut self, buffer: &mut [u8], flags: &mut EventFlags) -> Result<usize, CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }

        let eid = eid::format(self.custodian);
        debug_assert!(eid.len() <= MAX_EID_STRING);

        self.block_flags.value |= BLK_REPALL_MASK;

        buffer[0] = CTEB_BLK_TYPE;
        let mut write_flags = EventFlags::new();
        sdnv::write(buffer, self.block_flags, &mut write_flags);
        let eid_index = sdnv::write(buffer, self.cid, &mut write_flags);

        let bytes_written = eid_index + eid.len();
        if bytes_written > buffer.len() {
            return Err(CodecError::TooShort {
                min: bytes_written,
                actual: buffer.len(),
            });
        }
        buffer[eid_index..bytes_written].copy_from_slice(eid.as_bytes());

        self.blklen.value = (bytes_written - self.cid.index) as u64;
        sdnv::write(buffer, self.blklen, &mut write_flags);

        if !write_flags.is_empty() {
            *flags |= write_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField {
                index: self.cid.index,
            });
        }
        Ok(bytes_written)
    }

    /// Parse a CTEB from the start of `buffer` (buffer begins at the block
    /// type byte). Returns the parsed block and the number of bytes consumed.
    pub fn read(buffer: &[u8], flags: &mut EventFlags) -> Result<(Self, usize), CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }

        let mut cteb = Self::default();
        let mut parse_flags = EventFlags::new();

        cteb.block_flags.index = 1;
        cteb.blklen.index = sdnv::read(buffer, &mut cteb.block_flags, &mut parse_flags);
        cteb.cid.index = sdnv::read(buffer, &mut cteb.blklen, &mut parse_flags);
        let eid_index = sdnv::read(buffer, &mut cteb.cid, &mut parse_flags);

        if !parse_flags.is_empty() {
            *flags |= parse_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField {
                index: cteb.cid.index,
            });
        }

        let eid_len = (cteb.blklen.value as usize)
            .checked_sub(eid_index - cteb.cid.index)
            .ok_or(CodecError::MalformedField {
                index: cteb.blklen.index,
            })?;
        let end = eid_index + eid_len;
        if end > buffer.len() {
            return Err(CodecError::TooShort {
                min: end,
                actual: buffer.len(),
            });
        }

        let eid_str = core::str::from_utf8(&buffer[eid_index..end])
            .map_err(|_| CodecError::MalformedField { index: eid_index })?;
        cteb.custodian = eid::parse(eid_str)?;

        Ok((cteb, end))
    }
}

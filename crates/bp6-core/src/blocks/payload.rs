//! Payload block codec.
//!
//! The payload block closes every bundle: a type byte, processing flags, and
//! the payload length, followed by the payload bytes themselves. Only the
//! fixed-size prefix is encoded here; the payload travels separately until
//! the bundle is laid out on the wire.

use crate::constants::{BLK_LASTBLOCK_MASK, BLK_REPALL_MASK, PAY_BLK_TYPE};
use crate::error::CodecError;
use crate::sdnv;
use crate::types::{EventFlags, SdnvField};

/// Parsed or template form of a payload block prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadBlock {
    pub block_flags: SdnvField,
    pub blklen: SdnvField,
}

impl PayloadBlock {
    /// Encoded size of the prefix in the template layout.
    pub const PREFIX_SIZE: usize = 6;

    /// Template with the fixed field layout used for prebuilt headers.
    pub fn template() -> Self {
        Self {
            //                            value  index  width
            block_flags: SdnvField::at(0, 1, 1),
            blklen: SdnvField::at(0, 2, 4),
        }
    }

    /// Serialize the prefix for a payload of `payload_size` bytes.
    pub fn write(
        &mut self,
        buffer: &mut [u8],
        payload_size: usize,
        flags: &mut EventFlags,
    ) -> Result<usize, CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }

        self.block_flags.value = BLK_REPALL_MASK | BLK_LASTBLOCK_MASK;
        self.blklen.value = payload_size as u64;

        buffer[0] = PAY_BLK_TYPE;
        let mut write_flags = EventFlags::new();
        sdnv::write(buffer, self.block_flags, &mut write_flags);
        let bytes_written = sdnv::write(buffer, self.blklen, &mut write_flags);

        if !write_flags.is_empty() {
            *flags |= write_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField { index: 0 });
        }
        Ok(bytes_written)
    }

    /// Parse a payload block prefix. Returns the parsed block and the number
    /// of prefix bytes consumed; the payload follows immediately after.
    pub fn read(buffer: &[u8], flags: &mut EventFlags) -> Result<(Self, usize), CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }

        let mut pay = Self::default();
        let mut parse_flags = EventFlags::new();

        pay.block_flags.index = 1;
        pay.blklen.index = sdnv::read(buffer, &mut pay.block_flags, &mut parse_flags);
        let bytes_read = sdnv::read(buffer, &mut pay.blklen, &mut parse_flags);

        if !parse_flags.is_empty() {
            *flags |= parse_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField { index: 0 });
        }
        Ok((pay, bytes_read))
    }

    /// Size of the payload this block announces.
    pub fn payload_size(&self) -> usize {
        self.blklen.value as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let mut buf = [0u8; 16];
        let mut flags = EventFlags::new();

        let mut pay = PayloadBlock::template();
        let written = pay.write(&mut buf, 512, &mut flags).unwrap();
        assert_eq!(written, PayloadBlock::PREFIX_SIZE);
        assert_eq!(buf[0], PAY_BLK_TYPE);

        let (parsed, read) = PayloadBlock::read(&buf, &mut flags).unwrap();
        assert_eq!(read, written);
        assert_eq!(parsed.payload_size(), 512);
    }

    #[test]
    fn zero_length_payload() {
        let mut buf = [0u8; 16];
        let mut flags = EventFlags::new();
        PayloadBlock::template().write(&mut buf, 0, &mut flags).unwrap();

        let (parsed, _) = PayloadBlock::read(&buf, &mut flags).unwrap();
        assert_eq!(parsed.payload_size(), 0);
    }
}

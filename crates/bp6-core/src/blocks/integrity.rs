//! Bundle Integrity Block codec.
//!
//! The BIB protects the payload block with a checksum selected by cipher
//! suite id: CRC-16/X.25 (suite 10) or CRC-32/Castagnoli (suite 11). The
//! security result sits at a fixed offset so each fragment's checksum can be
//! patched into the prebuilt header.

use crc::{Crc, CRC_16_IBM_SDLC, CRC_32_ISCSI};

use crate::constants::{
    BIB_BLK_TYPE, BIB_CRC16_X25, BIB_CRC32_CASTAGNOLI, BIB_INTEGRITY_SIGNATURE, BLK_REPALL_MASK,
    PAY_BLK_TYPE,
};
use crate::error::CodecError;
use crate::sdnv;
use crate::types::{BpVal, EventFlags, SdnvField};

/// CRC-16/X.25, polynomial 0x1021 reflected, init/xorout 0xFFFF.
const CRC16_X25: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// CRC-32/Castagnoli, polynomial 0x1EDC6F41 reflected, init/xorout 0xFFFFFFFF.
const CRC32_CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// The security result carried by a BIB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityResult {
    Crc16(u16),
    Crc32(u32),
}

/// Parsed or template form of a bundle integrity block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityBlock {
    pub block_flags: SdnvField,
    pub block_length: SdnvField,
    pub security_target_count: SdnvField,
    pub security_target_type: u8,
    pub cipher_suite_id: SdnvField,
    pub cipher_suite_flags: SdnvField,
    pub compound_length: SdnvField,
    pub security_result_type: u8,
    pub security_result_length: SdnvField,
    pub result: SecurityResult,
}

impl IntegrityBlock {
    /// Template with the fixed field layout used for prebuilt headers.
    pub fn template(cipher_suite: BpVal) -> Self {
        Self {
            //                                      value         index  width
            block_flags: SdnvField::at(0, 1, 1),
            block_length: SdnvField::at(0, 2, 4),
            security_target_count: SdnvField::at(1, 6, 1),
            security_target_type: PAY_BLK_TYPE,
            cipher_suite_id: SdnvField::at(cipher_suite, 8, 1),
            cipher_suite_flags: SdnvField::at(0, 9, 1),
            compound_length: SdnvField::at(0, 10, 1),
            security_result_type: BIB_INTEGRITY_SIGNATURE,
            security_result_length: SdnvField::at(0, 12, 1),
            result: SecurityResult::Crc16(0),
        }
    }

    fn checksum(&self, payload: &[u8]) -> Result<SecurityResult, CodecError> {
        match self.cipher_suite_id.value {
            BIB_CRC16_X25 => Ok(SecurityResult::Crc16(CRC16_X25.checksum(payload))),
            BIB_CRC32_CASTAGNOLI => Ok(SecurityResult::Crc32(CRC32_CASTAGNOLI.checksum(payload))),
            other => Err(CodecError::UnknownCipherSuite(other)),
        }
    }

    /// Byte offset of the security result data within the block image.
    fn result_index(&self) -> usize {
        self.security_result_length.index + self.security_result_length.width
    }

    /// Serialize the block at its template field positions.
    pub fn write(&mut self, buffer: &mut [u8], flags: &mut EventFlags) -> Result<usize, CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }
        if self.security_target_type != PAY_BLK_TYPE {
            flags.raise(EventFlags::INVALID_BIB_TARGET_TYPE);
            return Err(CodecError::InvalidBibTarget(self.security_target_type));
        }
        if self.security_result_type != BIB_INTEGRITY_SIGNATURE {
            flags.raise(EventFlags::INVALID_BIB_RESULT_TYPE);
            return Err(CodecError::InvalidBibResult(self.security_result_type));
        }

        match self.cipher_suite_id.value {
            BIB_CRC16_X25 => {
                self.compound_length.value = 4;
                self.security_result_length.value = 2;
            }
            BIB_CRC32_CASTAGNOLI => {
                self.compound_length.value = 6;
                self.security_result_length.value = 4;
            }
            other => {
                flags.raise(EventFlags::INVALID_CIPHER_SUITE);
                return Err(CodecError::UnknownCipherSuite(other));
            }
        }

        self.block_flags.value |= BLK_REPALL_MASK;

        buffer[0] = BIB_BLK_TYPE;
        let mut write_flags = EventFlags::new();
        sdnv::write(buffer, self.block_flags, &mut write_flags);
        let mut index = sdnv::write(buffer, self.security_target_count, &mut write_flags);
        if index >= buffer.len() {
            return Err(CodecError::TooShort {
                min: index + 1,
                actual: buffer.len(),
            });
        }
        buffer[index] = self.security_target_type;

        sdnv::write(buffer, self.cipher_suite_id, &mut write_flags);
        sdnv::write(buffer, self.cipher_suite_flags, &mut write_flags);
        index = sdnv::write(buffer, self.compound_length, &mut write_flags);
        if index >= buffer.len() {
            return Err(CodecError::TooShort {
                min: index + 1,
                actual: buffer.len(),
            });
        }
        buffer[index] = self.security_result_type;

        index = sdnv::write(buffer, self.security_result_length, &mut write_flags);

        let result_len = self.security_result_length.value as usize;
        if index + result_len > buffer.len() {
            return Err(CodecError::TooShort {
                min: index + result_len,
                actual: buffer.len(),
            });
        }
        match self.result {
            SecurityResult::Crc16(crc) => {
                buffer[index..index + 2].copy_from_slice(&crc.to_be_bytes());
            }
            SecurityResult::Crc32(crc) => {
                buffer[index..index + 4].copy_from_slice(&crc.to_be_bytes());
            }
        }
        let bytes_written = index + result_len;

        self.block_length.value = (bytes_written - self.security_target_count.index) as u64;
        sdnv::write(buffer, self.block_length, &mut write_flags);

        if !write_flags.is_empty() {
            *flags |= write_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField { index: 0 });
        }
        Ok(bytes_written)
    }

    /// Parse a BIB from the start of `buffer` (buffer begins at the block
    /// type byte). Returns the parsed block and the number of bytes consumed.
    pub fn read(buffer: &[u8], flags: &mut EventFlags) -> Result<(Self, usize), CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }
        if buffer[0] != BIB_BLK_TYPE {
            return Err(CodecError::MalformedField { index: 0 });
        }

        let mut bib = Self::template(0);
        for field in [
            &mut bib.block_flags,
            &mut bib.block_length,
            &mut bib.security_target_count,
            &mut bib.cipher_suite_id,
            &mut bib.cipher_suite_flags,
            &mut bib.compound_length,
            &mut bib.security_result_length,
        ] {
            field.width = 0;
            field.value = 0;
        }

        let mut parse_flags = EventFlags::new();
        bib.block_flags.index = 1;
        bib.block_length.index = sdnv::read(buffer, &mut bib.block_flags, &mut parse_flags);
        bib.security_target_count.index =
            sdnv::read(buffer, &mut bib.block_length, &mut parse_flags);
        let mut index = sdnv::read(buffer, &mut bib.security_target_count, &mut parse_flags);

        if index >= buffer.len() {
            return Err(CodecError::TooShort {
                min: index + 1,
                actual: buffer.len(),
            });
        }
        bib.security_target_type = buffer[index];
        bib.cipher_suite_id.index = index + 1;

        bib.cipher_suite_flags.index = sdnv::read(buffer, &mut bib.cipher_suite_id, &mut parse_flags);
        bib.compound_length.index = sdnv::read(buffer, &mut bib.cipher_suite_flags, &mut parse_flags);
        index = sdnv::read(buffer, &mut bib.compound_length, &mut parse_flags);

        if index >= buffer.len() {
            return Err(CodecError::TooShort {
                min: index + 1,
                actual: buffer.len(),
            });
        }
        bib.security_result_type = buffer[index];
        bib.security_result_length.index = index + 1;

        index = sdnv::read(buffer, &mut bib.security_result_length, &mut parse_flags);

        if bib.security_target_type != PAY_BLK_TYPE {
            flags.raise(EventFlags::INVALID_BIB_TARGET_TYPE);
            return Err(CodecError::InvalidBibTarget(bib.security_target_type));
        }
        if bib.security_result_type != BIB_INTEGRITY_SIGNATURE {
            flags.raise(EventFlags::INVALID_BIB_RESULT_TYPE);
            return Err(CodecError::InvalidBibResult(bib.security_result_type));
        }

        match bib.cipher_suite_id.value {
            BIB_CRC16_X25 => {
                if bib.security_result_length.value != 2 || index + 2 > buffer.len() {
                    return Err(CodecError::TooShort {
                        min: index + 2,
                        actual: buffer.len(),
                    });
                }
                bib.result =
                    SecurityResult::Crc16(u16::from_be_bytes([buffer[index], buffer[index + 1]]));
                index += 2;
            }
            BIB_CRC32_CASTAGNOLI => {
                if bib.security_result_length.value != 4 || index + 4 > buffer.len() {
                    return Err(CodecError::TooShort {
                        min: index + 4,
                        actual: buffer.len(),
                    });
                }
                bib.result = SecurityResult::Crc32(u32::from_be_bytes([
                    buffer[index],
                    buffer[index + 1],
                    buffer[index + 2],
                    buffer[index + 3],
                ]));
                index += 4;
            }
            other => {
                flags.raise(EventFlags::INVALID_CIPHER_SUITE);
                return Err(CodecError::UnknownCipherSuite(other));
            }
        }

        if !parse_flags.is_empty() {
            *flags |= parse_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField { index: 0 });
        }
        Ok((bib, index))
    }

    /// Recompute the checksum over `payload` and patch it into the block
    /// image (which begins at the block type byte).
    pub fn update(
        &mut self,
        block: &mut [u8],
        payload: &[u8],
        flags: &mut EventFlags,
    ) -> Result<(), CodecError> {
        self.result = self.checksum(payload)?;

        let index = self.result_index();
        let needed = index + self.security_result_length.value as usize;
        if block.len() < needed {
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::TooShort {
                min: needed,
                actual: block.len(),
            });
        }
        match self.result {
            SecurityResult::Crc16(crc) => block[index..index + 2].copy_from_slice(&crc.to_be_bytes()),
            SecurityResult::Crc32(crc) => block[index..index + 4].copy_from_slice(&crc.to_be_bytes()),
        }
        Ok(())
    }

    /// Verify a received payload against the checksum carried by this block.
    pub fn verify(&self, payload: &[u8], flags: &mut EventFlags) -> Result<(), CodecError> {
        let computed = self.checksum(payload)?;
        if computed != self.result {
            flags.raise(EventFlags::FAILED_INTEGRITY_CHECK);
            return Err(CodecError::IntegrityCheckFailed);
        }
        Ok(())
    }
}

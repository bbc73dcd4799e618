//! Primary block codec.
//!
//! The primary block leads every bundle: a version byte, the processing
//! control flags, and the addressing, timing, and fragmentation fields, all
//! SDNV-encoded. Writes use the fixed template layout so later patches
//! (creation time, sequence, fragment offset) land at known offsets; reads
//! accept any valid variable-width encoding.

use crate::constants::{
    PCF_ACKRQST_MASK, PCF_ADMIN_MASK, PCF_CSTRQST_MASK, PCF_FRAGMENT_MASK, PCF_NOFRAG_MASK,
    PCF_SINGLETON_MASK, PROTOCOL_VERSION,
};
use crate::error::CodecError;
use crate::sdnv;
use crate::types::{EventFlags, SdnvField};

/// Parsed or template form of a bundle primary block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryBlock {
    pub version: u8,
    pub pcf: SdnvField,
    pub blklen: SdnvField,
    pub dstnode: SdnvField,
    pub dstserv: SdnvField,
    pub srcnode: SdnvField,
    pub srcserv: SdnvField,
    pub rptnode: SdnvField,
    pub rptserv: SdnvField,
    pub cstnode: SdnvField,
    pub cstserv: SdnvField,
    pub createsec: SdnvField,
    pub createseq: SdnvField,
    pub lifetime: SdnvField,
    pub dictlen: SdnvField,
    pub fragoffset: SdnvField,
    pub paylen: SdnvField,

    pub is_admin_record: bool,
    pub is_fragment: bool,
    pub allow_fragmentation: bool,
    pub request_custody: bool,
    pub app_ack: bool,
}

impl PrimaryBlock {
    /// Template with the fixed field layout used for prebuilt headers.
    pub fn template() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            //                    value  index  width
            pcf: SdnvField::at(0, 1, 3),
            blklen: SdnvField::at(0, 4, 1),
            dstnode: SdnvField::at(0, 5, 4),
            dstserv: SdnvField::at(0, 9, 2),
            srcnode: SdnvField::at(0, 11, 4),
            srcserv: SdnvField::at(0, 15, 2),
            rptnode: SdnvField::at(0, 17, 4),
            rptserv: SdnvField::at(0, 21, 2),
            cstnode: SdnvField::at(0, 23, 4),
            cstserv: SdnvField::at(0, 27, 2),
            createsec: SdnvField::at(0, 29, 6),
            createseq: SdnvField::at(0, 35, 2),
            lifetime: SdnvField::at(0, 37, 6),
            dictlen: SdnvField::at(0, 43, 1),
            fragoffset: SdnvField::at(0, 44, 4),
            paylen: SdnvField::at(0, 48, 4),
            is_admin_record: false,
            is_fragment: false,
            allow_fragmentation: false,
            request_custody: true,
            app_ack: false,
        }
    }

    /// Serialize the block at its template field positions.
    ///
    /// Returns the number of bytes written. The fragmentation fields are
    /// emitted only when the fragment flag is set, so the wire image always
    /// matches what the PCF announces.
    pub fn write(&mut self, buffer: &mut [u8], flags: &mut EventFlags) -> Result<usize, CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }

        self.pcf.value |= PCF_SINGLETON_MASK;
        if self.is_admin_record {
            self.pcf.value |= PCF_ADMIN_MASK;
        }
        if self.is_fragment {
            self.pcf.value |= PCF_FRAGMENT_MASK;
        }
        if self.request_custody {
            self.pcf.value |= PCF_CSTRQST_MASK;
        }
        if self.app_ack {
            self.pcf.value |= PCF_ACKRQST_MASK;
        }
        if !self.allow_fragmentation {
            self.pcf.value |= PCF_NOFRAG_MASK;
        }

        buffer[0] = self.version;
        sdnv::write(buffer, self.pcf, flags);
        sdnv::write(buffer, self.dstnode, flags);
        sdnv::write(buffer, self.dstserv, flags);
        sdnv::write(buffer, self.srcnode, flags);
        sdnv::write(buffer, self.srcserv, flags);
        sdnv::write(buffer, self.rptnode, flags);
        sdnv::write(buffer, self.rptserv, flags);
        sdnv::write(buffer, self.cstnode, flags);
        sdnv::write(buffer, self.cstserv, flags);
        sdnv::write(buffer, self.createsec, flags);
        sdnv::write(buffer, self.createseq, flags);
        sdnv::write(buffer, self.lifetime, flags);

        let bytes_written = if self.is_fragment {
            sdnv::write(buffer, self.dictlen, flags);
            sdnv::write(buffer, self.fragoffset, flags);
            sdnv::write(buffer, self.paylen, flags)
        } else {
            sdnv::write(buffer, self.dictlen, flags)
        };

        // Block length counts everything after its own field.
        self.blklen.value = (bytes_written - self.dstnode.index) as u64;
        sdnv::write(buffer, self.blklen, flags);

        if !flags.is_empty() {
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField { index: 0 });
        }
        Ok(bytes_written)
    }

    /// Parse a primary block from the start of `buffer`.
    ///
    /// Returns the parsed block and the number of bytes consumed.
    pub fn read(buffer: &[u8], flags: &mut EventFlags) -> Result<(Self, usize), CodecError> {
        if buffer.is_empty() {
            return Err(CodecError::TooShort {
                min: 1,
                actual: 0,
            });
        }

        let mut pri = Self {
            version: buffer[0],
            ..Self::default()
        };
        let mut parse_flags = EventFlags::new();

        pri.pcf.index = 1;
        pri.blklen.index = sdnv::read(buffer, &mut pri.pcf, &mut parse_flags);
        pri.dstnode.index = sdnv::read(buffer, &mut pri.blklen, &mut parse_flags);
        pri.dstserv.index = sdnv::read(buffer, &mut pri.dstnode, &mut parse_flags);
        pri.srcnode.index = sdnv::read(buffer, &mut pri.dstserv, &mut parse_flags);
        pri.srcserv.index = sdnv::read(buffer, &mut pri.srcnode, &mut parse_flags);
        pri.rptnode.index = sdnv::read(buffer, &mut pri.srcserv, &mut parse_flags);
        pri.rptserv.index = sdnv::read(buffer, &mut pri.rptnode, &mut parse_flags);
        pri.cstnode.index = sdnv::read(buffer, &mut pri.rptserv, &mut parse_flags);
        pri.cstserv.index = sdnv::read(buffer, &mut pri.cstnode, &mut parse_flags);
        pri.createsec.index = sdnv::read(buffer, &mut pri.cstserv, &mut parse_flags);
        pri.createseq.index = sdnv::read(buffer, &mut pri.createsec, &mut parse_flags);
        pri.lifetime.index = sdnv::read(buffer, &mut pri.createseq, &mut parse_flags);
        pri.dictlen.index = sdnv::read(buffer, &mut pri.lifetime, &mut parse_flags);

        let bytes_read = if pri.pcf.value & PCF_FRAGMENT_MASK != 0 {
            pri.fragoffset.index = sdnv::read(buffer, &mut pri.dictlen, &mut parse_flags);
            pri.paylen.index = sdnv::read(buffer, &mut pri.fragoffset, &mut parse_flags);
            sdnv::read(buffer, &mut pri.paylen, &mut parse_flags)
        } else {
            sdnv::read(buffer, &mut pri.dictlen, &mut parse_flags)
        };

        pri.is_admin_record = pri.pcf.value & PCF_ADMIN_MASK != 0;
        pri.allow_fragmentation = pri.pcf.value & PCF_NOFRAG_MASK == 0;
        pri.is_fragment = pri.pcf.value & PCF_FRAGMENT_MASK != 0;
        pri.request_custody = pri.pcf.value & PCF_CSTRQST_MASK != 0;
        pri.app_ack = pri.pcf.value & PCF_ACKRQST_MASK != 0;

        if !parse_flags.is_empty() {
            *flags |= parse_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField { index: 0 });
        }
        if pri.version != PROTOCOL_VERSION {
            return Err(CodecError::WrongVersion(pri.version));
        }
        Ok((pri, bytes_read))
    }
}

//! Bundle assembly and reception.
//!
//! [`BundleBuilder`] owns a channel's prebuilt header image: the primary
//! block plus optional custody-transfer and integrity blocks, assembled once
//! from the channel attributes and then patched per bundle (creation time,
//! sequence, payload length, checksum, custody id). `send` turns an
//! application payload into one or more [`BundleRecord`]s ready for storage;
//! `receive` parses a wire bundle and classifies what should happen to it.

use serde::{Deserialize, Serialize};

use crate::attributes::ChannelAttributes;
use crate::blocks::{CustodyBlock, IntegrityBlock, PayloadBlock, PrimaryBlock};
use crate::constants::{
    ACS_REC_TYPE, BIB_BLK_TYPE, BLK_DELETENOPROC_MASK, BLK_NOTIFYNOPROC_MASK, BUNDLE_HDR_BUF_SIZE,
    CS_REC_TYPE, CTEB_BLK_TYPE, PAY_BLK_TYPE, STAT_REC_TYPE,
};
use crate::error::CodecError;
use crate::sdnv;
use crate::types::{BpVal, EventFlags, IpnAddress, Route, SdnvField, MAX_ENCODED_VALUE};

/// Ceiling on blocks in one bundle before parsing gives up.
const MAX_BLOCKS_PER_BUNDLE: usize = 16;

/// The stored form of an outbound bundle.
///
/// The header image and payload are kept separate so the custody id can be
/// patched into the header without touching payload bytes. A `cteb_offset`
/// of zero means the bundle does not request custody transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRecord {
    /// Absolute expiration time in seconds; 0 = never expires.
    pub exprtime: BpVal,
    /// Offset of the CTEB within the header; 0 = no custody transfer.
    pub cteb_offset: usize,
    /// Position of the custody id SDNV within the header.
    pub cid_field: SdnvField,
    /// Header image: primary block through payload block prefix.
    pub header: Vec<u8>,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl BundleRecord {
    /// Total wire size of the bundle.
    pub fn wire_size(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    /// Whether the bundle requests custody transfer.
    pub fn requests_custody(&self) -> bool {
        self.cteb_offset != 0
    }

    /// Patch a custody id into the stored header.
    pub fn rewrite_cid(&mut self, cid: BpVal, flags: &mut EventFlags) {
        self.cid_field.value = cid;
        sdnv::mask(&mut self.cid_field);
        sdnv::write(&mut self.header, self.cid_field, flags);
    }

    /// Lay the bundle out as contiguous wire bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_size());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Copy the wire image into `out`. The caller has already checked that
    /// `out` is large enough.
    pub fn copy_to(&self, out: &mut [u8]) -> usize {
        let size = self.wire_size();
        out[..self.header.len()].copy_from_slice(&self.header);
        out[self.header.len()..size].copy_from_slice(&self.payload);
        size
    }

    /// Serialize for the storage service.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserialize from the storage service.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// The stored form of an inbound payload awaiting `accept`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRecord {
    /// Absolute expiration time in seconds; 0 = never expires.
    pub exprtime: BpVal,
    /// The application requested an acknowledgment for this payload.
    pub app_ack: bool,
    /// Payload bytes.
    pub bytes: Vec<u8>,
}

impl PayloadRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// What a received bundle turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reception {
    /// The bundle's lifetime elapsed before processing.
    Expired,
    /// An administrative record carrying an aggregate custody signal.
    Acknowledgment {
        custodian: IpnAddress,
        record: Vec<u8>,
    },
    /// A payload whose sender requested custody transfer.
    CustodyTransfer {
        custodian: IpnAddress,
        cid: BpVal,
        payload: PayloadRecord,
    },
    /// A payload with no custody transfer.
    Delivered { payload: PayloadRecord },
}

/// Builder for a channel's outbound bundles and parser for its inbound ones.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    route: Route,
    pub attributes: ChannelAttributes,
    primary: PrimaryBlock,
    integrity: IntegrityBlock,
    payload: PayloadBlock,
    header: Vec<u8>,
    cteb_offset: usize,
    bib_offset: usize,
    pay_offset: usize,
    cid_field: SdnvField,
    prebuilt: bool,
}

impl BundleBuilder {
    pub fn new(route: Route, attributes: ChannelAttributes) -> Self {
        Self {
            route,
            integrity: IntegrityBlock::template(attributes.cipher_suite),
            attributes,
            primary: PrimaryBlock::template(),
            payload: PayloadBlock::template(),
            header: vec![0; BUNDLE_HDR_BUF_SIZE],
            cteb_offset: 0,
            bib_offset: 0,
            pay_offset: 0,
            cid_field: SdnvField::default(),
            prebuilt: false,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Point outgoing bundles at a new destination. Forces a header rebuild.
    pub fn retarget(&mut self, destination: IpnAddress) {
        self.route.destination = destination;
        self.prebuilt = false;
    }

    /// Force the next `send` to rebuild the header from current attributes.
    pub fn invalidate(&mut self) {
        self.prebuilt = false;
    }

    pub fn is_prebuilt(&self) -> bool {
        self.prebuilt
    }

    /// Assemble the header image from the current route and attributes.
    ///
    /// `fragmenting` reserves the fragment fields (and sets the PCF fragment
    /// flag) so `send` can patch per-fragment offsets into the image.
    fn build(&mut self, fragmenting: bool, flags: &mut EventFlags) -> Result<(), CodecError> {
        let attrs = &self.attributes;
        self.header.iter_mut().for_each(|b| *b = 0);

        // Primary block. The creation sequence survives rebuilds.
        let createseq = self.primary.createseq.value;
        let mut pri = PrimaryBlock::template();
        pri.is_fragment = fragmenting;
        pri.createseq.value = createseq;
        pri.dstnode.value = self.route.destination.node;
        pri.dstserv.value = self.route.destination.service;
        pri.srcnode.value = self.route.local.node;
        pri.srcserv.value = self.route.local.service;
        pri.rptnode.value = self.route.report.node;
        pri.rptserv.value = self.route.report.service;
        if attrs.request_custody {
            pri.cstnode.value = self.route.local.node;
            pri.cstserv.value = self.route.local.service;
        }
        pri.lifetime.value = attrs.lifetime;
        pri.is_admin_record = attrs.admin_record;
        pri.allow_fragmentation = attrs.allow_fragmentation;
        pri.request_custody = attrs.request_custody;

        let mut hdr_index = pri.write(&mut self.header, flags)?;
        self.primary = pri;

        // Custody transfer enhancement block.
        if self.primary.request_custody {
            let mut cteb = CustodyBlock::template();
            cteb.custodian = self.route.local;
            self.cteb_offset = hdr_index;
            let written = cteb.write(&mut self.header[hdr_index..], flags)?;
            self.cid_field = SdnvField::at(0, hdr_index + cteb.cid.index, cteb.cid.width);
            hdr_index += written;
        } else {
            self.cteb_offset = 0;
            self.cid_field = SdnvField::default();
        }

        // Bundle integrity block.
        if attrs.integrity_check {
            let mut bib = IntegrityBlock::template(attrs.cipher_suite);
            self.bib_offset = hdr_index;
            hdr_index += bib.write(&mut self.header[hdr_index..], flags)?;
            self.integrity = bib;
        } else {
            self.bib_offset = 0;
        }

        self.payload = PayloadBlock::template();
        self.pay_offset = hdr_index;
        self.prebuilt = true;

        tracing::debug!(
            destination = %self.route.destination,
            custody = self.primary.request_custody,
            integrity = attrs.integrity_check,
            header_len = hdr_index,
            "rebuilt bundle header"
        );
        Ok(())
    }

    /// Encode `payload` into one stored bundle per fragment.
    ///
    /// `now` is the current time in seconds; `reliable` is false when the
    /// clock could not be read, in which case creation time is zeroed and
    /// the lifetime pinned to the maximum so the bundle cannot expire by
    /// accident.
    pub fn send(
        &mut self,
        payload: &[u8],
        now: BpVal,
        reliable: bool,
        flags: &mut EventFlags,
    ) -> Result<Vec<BundleRecord>, CodecError> {
        if !self.prebuilt {
            self.build(false, flags)?;
        }

        let mut header_len = self.pay_offset + PayloadBlock::PREFIX_SIZE;
        if self.attributes.max_length <= header_len {
            flags.raise(EventFlags::BUNDLE_TOO_LARGE);
            return Err(CodecError::BundleTooLarge {
                size: header_len,
                max: self.attributes.max_length,
            });
        }
        let mut max_paysize = self.attributes.max_length - header_len;

        let fragmenting = payload.len() > max_paysize;
        if fragmenting && !self.attributes.allow_fragmentation {
            flags.raise(EventFlags::BUNDLE_TOO_LARGE);
            return Err(CodecError::BundleTooLarge {
                size: header_len + payload.len(),
                max: self.attributes.max_length,
            });
        }
        if fragmenting != self.primary.is_fragment {
            // The header image reserves fragment fields only when needed;
            // switching modes changes every block offset.
            self.build(fragmenting, flags)?;
            header_len = self.pay_offset + PayloadBlock::PREFIX_SIZE;
            if self.attributes.max_length <= header_len {
                flags.raise(EventFlags::BUNDLE_TOO_LARGE);
                return Err(CodecError::BundleTooLarge {
                    size: header_len,
                    max: self.attributes.max_length,
                });
            }
            max_paysize = self.attributes.max_length - header_len;
        }

        // Stamp creation time and sequence into the prebuilt header. An
        // unreliable clock pins the lifetime so the bundle cannot expire.
        let mut lifetime = self.primary.lifetime;
        let createsec = if reliable { now } else { 0 };
        if !reliable {
            lifetime.value = MAX_ENCODED_VALUE;
            sdnv::write(&mut self.header, lifetime, flags);
        }
        self.primary.createsec.value = createsec;
        sdnv::write(&mut self.header, self.primary.createsec, flags);
        sdnv::write(&mut self.header, self.primary.createseq, flags);

        let exprtime = if lifetime.value != 0 {
            createsec.checked_add(lifetime.value).unwrap_or_else(|| {
                flags.raise(EventFlags::SDNV_OVERFLOW);
                MAX_ENCODED_VALUE
            })
        } else {
            0
        };

        let mut records = Vec::new();
        let mut offset = 0;
        while offset < payload.len() {
            let remaining = payload.len() - offset;
            let fragment_size = max_paysize.min(remaining);
            let fragment = &payload[offset..offset + fragment_size];

            if self.primary.is_fragment {
                self.primary.fragoffset.value = offset as u64;
                self.primary.paylen.value = payload.len() as u64;
                sdnv::write(&mut self.header, self.primary.fragoffset, flags);
                sdnv::write(&mut self.header, self.primary.paylen, flags);
            }

            if self.bib_offset != 0 {
                self.integrity
                    .update(&mut self.header[self.bib_offset..], fragment, flags)?;
            }

            let prefix = self
                .payload
                .write(&mut self.header[self.pay_offset..], fragment_size, flags)?;
            let header_size = self.pay_offset + prefix;

            records.push(BundleRecord {
                exprtime,
                cteb_offset: self.cteb_offset,
                cid_field: self.cid_field,
                header: self.header[..header_size].to_vec(),
                payload: fragment.to_vec(),
            });
            offset += fragment_size;
        }

        tracing::trace!(
            fragments = records.len(),
            payload_len = payload.len(),
            exprtime,
            "encoded bundle"
        );
        Ok(records)
    }

    /// Advance the creation sequence after the encoded bundles were
    /// successfully committed to storage.
    pub fn advance_sequence(&mut self) {
        self.primary.createseq.value += 1;
        sdnv::mask(&mut self.primary.createseq);
    }

    /// Parse a received bundle and classify its disposition.
    pub fn receive(
        &self,
        buffer: &[u8],
        now: BpVal,
        reliable: bool,
        flags: &mut EventFlags,
    ) -> Result<Reception, CodecError> {
        let (pri, mut index) = PrimaryBlock::read(buffer, flags)?;

        if pri.dictlen.value != 0 {
            flags.raise(EventFlags::NONCOMPLIANT);
            return Err(CodecError::DictionaryPresent(pri.dictlen.value));
        }

        let mut exprtime = pri.createsec.value.saturating_add(pri.lifetime.value);
        if !reliable || pri.createsec.value == 0 || self.attributes.ignore_expiration {
            exprtime = 0;
        } else if now >= exprtime {
            return Ok(Reception::Expired);
        }

        let mut cteb: Option<CustodyBlock> = None;
        let mut bib: Option<IntegrityBlock> = None;
        let mut blocks_seen = 0;

        while index < buffer.len() {
            blocks_seen += 1;
            if blocks_seen > MAX_BLOCKS_PER_BUNDLE {
                flags.raise(EventFlags::NONCOMPLIANT);
                return Err(CodecError::TooManyBlocks);
            }

            let blk_type = buffer[index];
            match blk_type {
                BIB_BLK_TYPE => {
                    let (block, read) = IntegrityBlock::read(&buffer[index..], flags)?;
                    bib = Some(block);
                    index += read;
                }
                CTEB_BLK_TYPE => {
                    let (block, read) = CustodyBlock::read(&buffer[index..], flags)?;
                    cteb = Some(block);
                    index += read;
                }
                PAY_BLK_TYPE => {
                    let (pay, prefix) = PayloadBlock::read(&buffer[index..], flags)?;
                    let data_start = index + prefix;
                    let data_end = data_start.saturating_add(pay.payload_size());
                    if data_end > buffer.len() {
                        return Err(CodecError::TooShort {
                            min: data_end,
                            actual: buffer.len(),
                        });
                    }
                    let payload_bytes = &buffer[data_start..data_end];

                    if let Some(ref bib) = bib {
                        bib.verify(payload_bytes, flags)?;
                    }

                    if pri.is_admin_record && payload_bytes.len() < 2 {
                        flags.raise(EventFlags::FAILED_TO_PARSE);
                        return Err(CodecError::TooShort {
                            min: 2,
                            actual: payload_bytes.len(),
                        });
                    }

                    // This endpoint does not forward; anything not addressed
                    // to it needs routing elsewhere.
                    if pri.dstnode.value != self.route.local.node {
                        flags.raise(EventFlags::ROUTE_NEEDED);
                        return Err(CodecError::ForeignDestination(pri.dstnode.value));
                    }
                    if self.route.local.service != 0
                        && pri.dstserv.value != self.route.local.service
                    {
                        flags.raise(EventFlags::ROUTE_NEEDED);
                        return Err(CodecError::WrongService(pri.dstserv.value));
                    }

                    if pri.is_admin_record {
                        let rec_type = payload_bytes[0];
                        return match rec_type {
                            ACS_REC_TYPE => Ok(Reception::Acknowledgment {
                                custodian: IpnAddress::new(
                                    pri.cstnode.value,
                                    pri.cstserv.value,
                                ),
                                record: payload_bytes.to_vec(),
                            }),
                            CS_REC_TYPE | STAT_REC_TYPE => {
                                flags.raise(EventFlags::NONCOMPLIANT);
                                Err(CodecError::UnsupportedRecord(rec_type))
                            }
                            other => {
                                flags.raise(EventFlags::UNKNOWN_RECORD);
                                Err(CodecError::UnknownRecord(other))
                            }
                        };
                    }

                    let payload = PayloadRecord {
                        exprtime,
                        app_ack: pri.app_ack,
                        bytes: payload_bytes.to_vec(),
                    };

                    return if pri.request_custody {
                        match cteb {
                            Some(cteb) => Ok(Reception::CustodyTransfer {
                                custodian: cteb.custodian,
                                cid: cteb.cid.value,
                                payload,
                            }),
                            None => {
                                flags.raise(EventFlags::NONCOMPLIANT);
                                Err(CodecError::MissingCustodyBlock)
                            }
                        }
                    } else {
                        Ok(Reception::Delivered { payload })
                    };
                }
                _ => {
                    // Unrecognized extension block: honor its processing
                    // control flags, then skip it.
                    let sub = &buffer[index..];
                    let mut blk_flags = SdnvField::at(0, 1, 0);
                    let mut blk_len = SdnvField::default();
                    let mut parse_flags = EventFlags::new();
                    blk_len.index = sdnv::read(sub, &mut blk_flags, &mut parse_flags);
                    let data_index = sdnv::read(sub, &mut blk_len, &mut parse_flags);
                    if !parse_flags.is_empty() {
                        *flags |= parse_flags;
                        flags.raise(EventFlags::FAILED_TO_PARSE);
                        return Err(CodecError::MalformedField { index });
                    }

                    flags.raise(EventFlags::INCOMPLETE);
                    if blk_flags.value & BLK_NOTIFYNOPROC_MASK != 0 {
                        flags.raise(EventFlags::NONCOMPLIANT);
                    }
                    if blk_flags.value & BLK_DELETENOPROC_MASK != 0 {
                        flags.raise(EventFlags::DROPPED);
                        return Err(CodecError::BlockRequiredProcessing);
                    }

                    index = index.saturating_add(data_index.saturating_add(blk_len.value as usize));
                }
            }
        }

        Err(CodecError::MissingPayloadBlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_a_to_b() -> Route {
        Route::new(IpnAddress::new(9, 1), IpnAddress::new(4, 2))
    }

    fn route_b_from_a() -> Route {
        Route::new(IpnAddress::new(4, 2), IpnAddress::new(9, 1))
    }

    fn sender(attrs: ChannelAttributes) -> BundleBuilder {
        BundleBuilder::new(route_a_to_b(), attrs)
    }

    fn receiver() -> BundleBuilder {
        BundleBuilder::new(route_b_from_a(), ChannelAttributes::default())
    }

    #[test]
    fn custody_bundle_roundtrip() {
        let mut flags = EventFlags::new();
        let mut tx = sender(ChannelAttributes::default());

        let mut records = tx.send(b"hello", 1000, true, &mut flags).unwrap();
        assert_eq!(records.len(), 1);
        assert!(flags.is_empty(), "flags: {flags}");

        let record = &mut records[0];
        assert!(record.requests_custody());
        record.rewrite_cid(1, &mut flags);

        let wire = record.to_wire();
        let reception = receiver().receive(&wire, 1000, true, &mut flags).unwrap();
        match reception {
            Reception::CustodyTransfer {
                custodian,
                cid,
                payload,
            } => {
                assert_eq!(custodian, IpnAddress::new(9, 1));
                assert_eq!(cid, 1);
                assert_eq!(payload.bytes, b"hello");
                assert!(!payload.app_ack);
            }
            other => panic!("expected custody transfer, got {other:?}"),
        }
    }

    #[test]
    fn non_custody_bundle_delivers() {
        let mut flags = EventFlags::new();
        let mut attrs = ChannelAttributes::default();
        attrs.request_custody = false;
        let mut tx = sender(attrs);

        let records = tx.send(b"fire and forget", 500, true, &mut flags).unwrap();
        assert!(!records[0].requests_custody());

        let reception = receiver()
            .receive(&records[0].to_wire(), 500, true, &mut flags)
            .unwrap();
        match reception {
            Reception::Delivered { payload } => assert_eq!(payload.bytes, b"fire and forget"),
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[test]
    fn expired_bundle_detected() {
        let mut flags = EventFlags::new();
        let mut attrs = ChannelAttributes::default();
        attrs.lifetime = 100;
        let mut tx = sender(attrs);

        let records = tx.send(b"stale", 1000, true, &mut flags).unwrap();
        let reception = receiver()
            .receive(&records[0].to_wire(), 1100, true, &mut flags)
            .unwrap();
        assert_eq!(reception, Reception::Expired);
    }

    #[test]
    fn expiration_ignored_when_configured() {
        let mut flags = EventFlags::new();
        let mut attrs = ChannelAttributes::default();
        attrs.lifetime = 100;
        let mut tx = sender(attrs);
        let mut records = tx.send(b"stale", 1000, true, &mut flags).unwrap();
        records[0].rewrite_cid(1, &mut flags);

        let mut rx = receiver();
        rx.attributes.ignore_expiration = true;
        let reception = rx
            .receive(&records[0].to_wire(), 1_000_000, true, &mut flags)
            .unwrap();
        assert!(matches!(reception, Reception::CustodyTransfer { .. }));
    }

    #[test]
    fn corrupted_payload_fails_integrity() {
        let mut flags = EventFlags::new();
        let mut tx = sender(ChannelAttributes::default());

        let mut records = tx.send(b"protect me", 100, true, &mut flags).unwrap();
        records[0].rewrite_cid(1, &mut flags);
        let mut wire = records[0].to_wire();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let result = receiver().receive(&wire, 100, true, &mut flags);
        assert!(matches!(result, Err(CodecError::IntegrityCheckFailed)));
        assert!(flags.contains(EventFlags::FAILED_INTEGRITY_CHECK));
    }

    #[test]
    fn oversize_payload_rejected_without_fragmentation() {
        let mut flags = EventFlags::new();
        let mut attrs = ChannelAttributes::default();
        attrs.max_length = 128;
        let mut tx = sender(attrs);

        let payload = vec![0xAB; 256];
        let result = tx.send(&payload, 0, true, &mut flags);
        assert!(matches!(result, Err(CodecError::BundleTooLarge { .. })));
        assert!(flags.contains(EventFlags::BUNDLE_TOO_LARGE));
    }

    #[test]
    fn oversize_payload_fragments_when_allowed() {
        let mut flags = EventFlags::new();
        let mut attrs = ChannelAttributes::default();
        attrs.max_length = 160;
        attrs.allow_fragmentation = true;
        attrs.request_custody = false;
        let mut tx = sender(attrs);

        let payload: Vec<u8> = (0..=255).collect();
        let records = tx.send(&payload, 0, true, &mut flags).unwrap();
        assert!(records.len() > 1, "expected fragmentation");

        let total: usize = records.iter().map(|r| r.payload.len()).sum();
        assert_eq!(total, payload.len());
        for record in &records {
            assert!(record.wire_size() <= 160);
        }

        // Fragments reassemble in order.
        let mut reassembled = Vec::new();
        for record in &records {
            reassembled.extend_from_slice(&record.payload);
        }
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn foreign_destination_rejected() {
        let mut flags = EventFlags::new();
        let mut tx = sender(ChannelAttributes::default());
        let mut records = tx.send(b"hello", 0, true, &mut flags).unwrap();
        records[0].rewrite_cid(1, &mut flags);

        // A receiver with a different node number cannot process it.
        let stranger = BundleBuilder::new(
            Route::new(IpnAddress::new(77, 1), IpnAddress::new(9, 1)),
            ChannelAttributes::default(),
        );
        let result = stranger.receive(&records[0].to_wire(), 0, true, &mut flags);
        assert!(matches!(result, Err(CodecError::ForeignDestination(4))));
        assert!(flags.contains(EventFlags::ROUTE_NEEDED));
    }

    #[test]
    fn sequence_advances_after_commit() {
        let mut flags = EventFlags::new();
        let mut tx = sender(ChannelAttributes::default());
        tx.send(b"one", 0, true, &mut flags).unwrap();
        tx.advance_sequence();
        let records = tx.send(b"two", 0, true, &mut flags).unwrap();

        let (pri, _) = PrimaryBlock::read(&records[0].header, &mut flags).unwrap();
        assert_eq!(pri.createseq.value, 1);
    }

    #[test]
    fn unreliable_clock_pins_lifetime() {
        let mut flags = EventFlags::new();
        let mut tx = sender(ChannelAttributes::default());
        let records = tx.send(b"no clock", 0, false, &mut flags).unwrap();
        // Creation time zero and maximum lifetime: effectively never expires.
        assert_eq!(records[0].exprtime, MAX_ENCODED_VALUE);

        let (pri, _) = PrimaryBlock::read(&records[0].header, &mut flags).unwrap();
        assert_eq!(pri.createsec.value, 0);
    }

    #[test]
    fn record_storage_roundtrip() {
        let mut flags = EventFlags::new();
        let mut tx = sender(ChannelAttributes::default());
        let records = tx.send(b"persist me", 42, true, &mut flags).unwrap();

        let bytes = records[0].to_bytes().unwrap();
        let restored = BundleRecord::from_bytes(&bytes).unwrap();
        assert_eq!(restored, records[0]);
    }

    #[test]
    fn truncated_bundle_rejected() {
        let mut flags = EventFlags::new();
        let mut tx = sender(ChannelAttributes::default());
        let records = tx.send(b"hello", 0, true, &mut flags).unwrap();
        let wire = records[0].to_wire();

        let result = receiver().receive(&wire[..wire.len() - 3], 0, true, &mut flags);
        assert!(result.is_err());
    }
}

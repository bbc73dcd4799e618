//! Aggregate custody signal record codec.
//!
//! An ACS record acknowledges a set of custody ids as run-length fills: a
//! record type byte, a status byte with the ACK bit, the first CID as an
//! SDNV, then alternating SDNV pairs of present-run and absent-run lengths.
//! Writing drains ranges out of a [`RangeSet`]; reading walks the fills and
//! acknowledges each present CID through a callback.

use bp6_core::constants::{ACS_ACK_MASK, ACS_REC_STATUS_INDEX, ACS_REC_TYPE, ACS_REC_TYPE_INDEX};
use bp6_core::error::CodecError;
use bp6_core::sdnv;
use bp6_core::types::{BpVal, EventFlags, SdnvField};

use crate::range_set::RangeSet;

/// First-CID field: fixed 4-byte SDNV following the two record bytes.
const FIRST_CID_INDEX: usize = 2;
const FIRST_CID_WIDTH: usize = 4;

/// Fill fields: fixed 2-byte SDNVs (runs up to 16383).
const FILL_WIDTH: usize = 2;

/// Bytes a record buffer needs for `max_fills` fills.
pub fn record_capacity(max_fills: u32) -> usize {
    FIRST_CID_INDEX + FIRST_CID_WIDTH + FILL_WIDTH * max_fills as usize
}

/// Serialize one ACS record from the lowest ranges of `set`.
///
/// Each emitted range is removed from the set; deletions skip rebalancing
/// because the caller keeps writing records until the set is empty. At most
/// `max_fills` fills are written (the first CID and its run count as two).
/// Returns the record size in bytes.
///
/// The set must not be empty.
pub fn write_record(
    buf: &mut [u8],
    set: &mut RangeSet,
    max_fills: u32,
    flags: &mut EventFlags,
) -> Result<usize, CodecError> {
    debug_assert!(!set.is_empty());

    if buf.len() < FIRST_CID_INDEX + FIRST_CID_WIDTH {
        return Err(CodecError::TooShort {
            min: FIRST_CID_INDEX + FIRST_CID_WIDTH,
            actual: buf.len(),
        });
    }

    let mut write_flags = EventFlags::new();

    buf[ACS_REC_TYPE_INDEX] = ACS_REC_TYPE;
    buf[ACS_REC_STATUS_INDEX] = ACS_ACK_MASK;

    set.goto_first();
    let first = set.next(true, false).ok_or(CodecError::MalformedField {
        index: FIRST_CID_INDEX,
    })?;

    let mut index = sdnv::write(
        buf,
        SdnvField::at(first.value, FIRST_CID_INDEX, FIRST_CID_WIDTH),
        &mut write_flags,
    );
    index = sdnv::write(
        buf,
        SdnvField::at(first.offset, index, FILL_WIDTH),
        &mut write_flags,
    );
    let mut fills = 2u32;

    let mut prev = first;
    while fills < max_fills {
        let Some(range) = set.next(true, false) else {
            break;
        };

        // Absent run between the previous range and this one, then the
        // present run itself.
        let gap = range.value - (prev.value + prev.offset);
        index = sdnv::write(buf, SdnvField::at(gap, index, FILL_WIDTH), &mut write_flags);
        index = sdnv::write(
            buf,
            SdnvField::at(range.offset, index, FILL_WIDTH),
            &mut write_flags,
        );
        fills += 2;
        prev = range;
    }

    if !write_flags.is_empty() {
        *flags |= write_flags;
        flags.raise(EventFlags::FAILED_TO_PARSE);
        return Err(CodecError::MalformedField { index });
    }

    tracing::trace!(first_cid = first.value, fills, size = index, "wrote custody signal record");
    Ok(index)
}

/// Parse an ACS record, invoking `ack` for every acknowledged CID.
///
/// `ack` returns whether the CID released a tracked bundle; the total of
/// successful acknowledgments is returned. A record whose ACK bit is clear
/// walks the fills without acknowledging anything.
pub fn read_record(
    buf: &[u8],
    mut ack: impl FnMut(BpVal) -> bool,
    flags: &mut EventFlags,
) -> Result<u32, CodecError> {
    if buf.len() < FIRST_CID_INDEX {
        return Err(CodecError::TooShort {
            min: FIRST_CID_INDEX,
            actual: buf.len(),
        });
    }
    let ack_success = buf[ACS_REC_STATUS_INDEX] & ACS_ACK_MASK == ACS_ACK_MASK;

    let mut parse_flags = EventFlags::new();
    let mut cid_field = SdnvField::at(0, FIRST_CID_INDEX, 0);
    let mut index = sdnv::read(buf, &mut cid_field, &mut parse_flags);
    if !parse_flags.is_empty() {
        *flags |= parse_flags;
        flags.raise(EventFlags::FAILED_TO_PARSE);
        return Err(CodecError::MalformedField {
            index: FIRST_CID_INDEX,
        });
    }

    let mut cid = cid_field.value;
    let mut present = true;
    let mut acknowledged = 0u32;

    while index < buf.len() {
        let mut fill = SdnvField::at(0, index, 0);
        index = sdnv::read(buf, &mut fill, &mut parse_flags);
        if !parse_flags.is_empty() {
            *flags |= parse_flags;
            flags.raise(EventFlags::FAILED_TO_PARSE);
            return Err(CodecError::MalformedField { index });
        }

        if present && ack_success {
            for i in 0..fill.value {
                if ack(cid.saturating_add(i)) {
                    acknowledged += 1;
                }
            }
        }
        present = !present;
        cid = cid.saturating_add(fill.value);
    }

    Ok(acknowledged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(values: &[u64]) -> RangeSet {
        let mut set = RangeSet::new(64).unwrap();
        for &v in values {
            set.insert(v).unwrap();
        }
        set
    }

    fn decode_all(buf: &[u8]) -> Vec<u64> {
        let mut flags = EventFlags::new();
        let mut acked = Vec::new();
        read_record(
            buf,
            |cid| {
                acked.push(cid);
                true
            },
            &mut flags,
        )
        .unwrap();
        assert!(flags.is_empty());
        acked
    }

    #[test]
    fn roundtrip_single_range() {
        let mut set = set_of(&[1, 2, 3]);
        let mut buf = vec![0u8; record_capacity(64)];
        let mut flags = EventFlags::new();

        let size = write_record(&mut buf, &mut set, 64, &mut flags).unwrap();
        assert!(set.is_empty());
        assert_eq!(buf[0], ACS_REC_TYPE);
        assert_eq!(buf[1] & ACS_ACK_MASK, ACS_ACK_MASK);

        assert_eq!(decode_all(&buf[..size]), vec![1, 2, 3]);
    }

    #[test]
    fn roundtrip_with_gaps() {
        let values = [1, 2, 3, 7, 8, 12];
        let mut set = set_of(&values);
        let mut buf = vec![0u8; record_capacity(64)];
        let mut flags = EventFlags::new();

        let size = write_record(&mut buf, &mut set, 64, &mut flags).unwrap();
        assert_eq!(decode_all(&buf[..size]), values);
    }

    #[test]
    fn fill_budget_splits_records() {
        // Four ranges need 8 fills; a budget of 4 takes two ranges per record.
        let mut set = set_of(&[1, 5, 9, 13]);
        let mut buf = vec![0u8; record_capacity(64)];
        let mut flags = EventFlags::new();

        let size = write_record(&mut buf, &mut set, 4, &mut flags).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(decode_all(&buf[..size]), vec![1, 5]);

        let size = write_record(&mut buf, &mut set, 4, &mut flags).unwrap();
        assert!(set.is_empty());
        assert_eq!(decode_all(&buf[..size]), vec![9, 13]);
    }

    #[test]
    fn clear_ack_bit_acknowledges_nothing() {
        let mut set = set_of(&[4, 5]);
        let mut buf = vec![0u8; record_capacity(64)];
        let mut flags = EventFlags::new();

        let size = write_record(&mut buf, &mut set, 64, &mut flags).unwrap();
        buf[ACS_REC_STATUS_INDEX] = 0;

        let count = read_record(&buf[..size], |_| true, &mut flags).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn ack_count_reflects_callback() {
        let mut set = set_of(&[10, 11, 12, 20]);
        let mut buf = vec![0u8; record_capacity(64)];
        let mut flags = EventFlags::new();

        let size = write_record(&mut buf, &mut set, 64, &mut flags).unwrap();
        // Only even CIDs release a bundle.
        let count = read_record(&buf[..size], |cid| cid % 2 == 0, &mut flags).unwrap();
        assert_eq!(count, 3); // 10, 12, 20
    }

    #[test]
    fn truncated_record_rejected() {
        let mut set = set_of(&[1, 5]);
        let mut buf = vec![0u8; record_capacity(64)];
        let mut flags = EventFlags::new();

        let size = write_record(&mut buf, &mut set, 64, &mut flags).unwrap();
        // Chop mid-fill: the trailing SDNV becomes incomplete.
        let result = read_record(&buf[..size - 1], |_| true, &mut flags);
        assert!(result.is_err());
        assert!(flags.contains(EventFlags::SDNV_INCOMPLETE));
    }

    #[test]
    fn large_first_cid_roundtrip() {
        // 4 fixed SDNV bytes carry 28 bits.
        let mut set = set_of(&[0x0FFF_FF00, 0x0FFF_FF01]);
        let mut buf = vec![0u8; record_capacity(64)];
        let mut flags = EventFlags::new();

        let size = write_record(&mut buf, &mut set, 64, &mut flags).unwrap();
        assert_eq!(decode_all(&buf[..size]), vec![0x0FFF_FF00, 0x0FFF_FF01]);
    }
}

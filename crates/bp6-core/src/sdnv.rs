//! Self-Delimiting Numeric Value codec.
//!
//! SDNVs carry 7 value bits per byte with the top bit as a continuation
//! marker. Reads make no assumption about encoded length, but flag
//! `SDNV_OVERFLOW` when the decoded value cannot fit a [`BpVal`]. Writes
//! honor a fixed field width, padding short values with leading continuation
//! bytes so a prebuilt block image can be patched in place; a value that
//! does not fit its width flags `SDNV_OVERFLOW`, and a field that runs off
//! the end of its buffer flags `SDNV_INCOMPLETE`.

use crate::types::{BpVal, EventFlags, SdnvField, MAX_ENCODED_VALUE};

/// Decode an SDNV from `block` at `field.index`.
///
/// Updates `field.value` and returns the index one past the last byte
/// consumed. When `field.width` is zero the read continues until the
/// continuation bit clears or the block ends.
pub fn read(block: &[u8], field: &mut SdnvField, flags: &mut EventFlags) -> usize {
    let size = block.len();
    let width = if field.width == 0 { size } else { field.width };

    field.value = 0;

    let mut i = field.index;
    while i < field.index + width && i < size {
        // Shift in the next 7 bits, checking for lost high bits.
        let before = field.value;
        field.value <<= 7;
        if field.value >> 7 != before {
            flags.raise(EventFlags::SDNV_OVERFLOW);
        }
        field.value |= BpVal::from(block[i] & 0x7F);

        if block[i] & 0x80 == 0 {
            return i + 1;
        }
        i += 1;
    }

    // The SDNV wanted to keep going but the block ended first.
    flags.raise(EventFlags::SDNV_INCOMPLETE);
    i
}

/// Encode an SDNV into `block` at `field.index`.
///
/// Returns the index one past the last byte written. A zero `field.width`
/// writes the minimum encoding; otherwise exactly `field.width` bytes are
/// written regardless of the value.
pub fn write(block: &mut [u8], field: SdnvField, flags: &mut EventFlags) -> usize {
    let size = block.len();

    let mut fixed_width = if field.width == 0 {
        // Minimum bytes needed to hold the value.
        let mut tmp = field.value;
        let mut needed = 1;
        while tmp > 0x7F {
            needed += 1;
            tmp >>= 7;
        }
        needed
    } else {
        field.width
    };

    // Truncate fields that run off the end of the block.
    if field.index >= size {
        flags.raise(EventFlags::SDNV_INCOMPLETE);
        return field.index;
    }
    if fixed_width > size - field.index {
        flags.raise(EventFlags::SDNV_INCOMPLETE);
        fixed_width = size - field.index;
    }

    let mut value = field.value;
    let end = field.index + fixed_width - 1;
    let mut i = end;
    loop {
        if i == end {
            block[i] = (value & 0x7F) as u8;
        } else {
            block[i] = (value as u8) | 0x80;
        }
        value >>= 7;
        if i == field.index {
            break;
        }
        i -= 1;
    }

    if value > 0 {
        flags.raise(EventFlags::SDNV_OVERFLOW);
    }

    field.index + fixed_width
}

/// Truncate a field's value to what its fixed width can encode.
pub fn mask(field: &mut SdnvField) {
    let num_bits = field.width * 7;
    if num_bits < BpVal::BITS as usize {
        field.value &= MAX_ENCODED_VALUE >> (BpVal::BITS as usize - num_bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: BpVal, width: usize) -> BpVal {
        let mut buf = [0u8; 16];
        let mut flags = EventFlags::new();
        let next = write(&mut buf, SdnvField::at(value, 0, width), &mut flags);
        assert!(flags.is_empty(), "write flags: {flags}");

        let mut field = SdnvField::at(0, 0, 0);
        let read_next = read(&buf, &mut field, &mut flags);
        assert!(flags.is_empty(), "read flags: {flags}");
        assert_eq!(next, read_next);
        field.value
    }

    #[test]
    fn roundtrip_variable_width() {
        for value in [0, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 123_456_789, u64::MAX] {
            assert_eq!(roundtrip(value, 0), value);
        }
    }

    #[test]
    fn roundtrip_fixed_width_pads() {
        let mut buf = [0u8; 8];
        let mut flags = EventFlags::new();
        let next = write(&mut buf, SdnvField::at(5, 0, 4), &mut flags);
        assert_eq!(next, 4);
        assert_eq!(buf[..4], [0x80, 0x80, 0x80, 0x05]);
        assert!(flags.is_empty());
    }

    #[test]
    fn single_byte_encoding() {
        let mut buf = [0u8; 4];
        let mut flags = EventFlags::new();
        let next = write(&mut buf, SdnvField::at(0x7F, 0, 0), &mut flags);
        assert_eq!(next, 1);
        assert_eq!(buf[0], 0x7F);
    }

    #[test]
    fn two_byte_encoding() {
        let mut buf = [0u8; 4];
        let mut flags = EventFlags::new();
        let next = write(&mut buf, SdnvField::at(0x80, 0, 0), &mut flags);
        assert_eq!(next, 2);
        assert_eq!(buf[..2], [0x81, 0x00]);
    }

    #[test]
    fn write_overflow_on_narrow_width() {
        let mut buf = [0u8; 8];
        let mut flags = EventFlags::new();
        // 0x4000 needs 3 SDNV bytes; a 1-byte field loses bits.
        write(&mut buf, SdnvField::at(0x4000, 0, 1), &mut flags);
        assert!(flags.contains(EventFlags::SDNV_OVERFLOW));
    }

    #[test]
    fn write_incomplete_on_short_block() {
        let mut buf = [0u8; 2];
        let mut flags = EventFlags::new();
        write(&mut buf, SdnvField::at(1, 0, 4), &mut flags);
        assert!(flags.contains(EventFlags::SDNV_INCOMPLETE));
    }

    #[test]
    fn read_incomplete_when_continuation_runs_out() {
        // All continuation bits set; the block ends mid-value.
        let buf = [0x81u8, 0x82, 0x83];
        let mut flags = EventFlags::new();
        let mut field = SdnvField::at(0, 0, 0);
        let next = read(&buf, &mut field, &mut flags);
        assert_eq!(next, 3);
        assert!(flags.contains(EventFlags::SDNV_INCOMPLETE));
    }

    #[test]
    fn read_overflow_past_64_bits() {
        // Ten continuation bytes followed by a terminator encode > 64 bits.
        let mut buf = [0xFFu8; 11];
        buf[10] = 0x7F;
        let mut flags = EventFlags::new();
        let mut field = SdnvField::at(0, 0, 0);
        read(&buf, &mut field, &mut flags);
        assert!(flags.contains(EventFlags::SDNV_OVERFLOW));
    }

    #[test]
    fn read_at_offset() {
        let mut buf = [0u8; 8];
        let mut flags = EventFlags::new();
        write(&mut buf, SdnvField::at(300, 3, 0), &mut flags);

        let mut field = SdnvField::at(0, 3, 0);
        read(&buf, &mut field, &mut flags);
        assert_eq!(field.value, 300);
    }

    #[test]
    fn mask_truncates_to_width() {
        let mut field = SdnvField::at(0xFFFF, 0, 2);
        mask(&mut field);
        assert_eq!(field.value, 0x3FFF);

        // A 10-byte width covers the full 64-bit range.
        let mut wide = SdnvField::at(u64::MAX, 0, 10);
        mask(&mut wide);
        assert_eq!(wide.value, u64::MAX);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn roundtrip_any_value(value in any::<u64>()) {
                prop_assert_eq!(roundtrip(value, 0), value);
            }

            #[test]
            fn fixed_width_roundtrip_within_range(value in 0u64..0x0FFF_FFFF) {
                // 4 SDNV bytes carry 28 bits.
                prop_assert_eq!(roundtrip(value, 4), value);
            }
        }
    }
}

//! Formats which can read and write a finished memory image to disk.
//!
//! The [`ImageFormat`] trait describes an implementation of reading/writing
//! memory images. This module provides one implementation:
//! - [`RawFormat`]: the `v2.0 raw` text dump a Logisim-style RAM component
//!   loads directly.

use std::fmt::Write;

use super::MemoryImage;

/// A trait defining memory image file formats.
pub trait ImageFormat {
    /// Representation of the serialized format.
    ///
    /// For binary formats, `[u8]` should be used.
    /// For text-based formats, `str` should be used.
    type Stream: ToOwned + ?Sized;

    /// Serializes into the stream format.
    fn serialize(image: &MemoryImage) -> <Self::Stream as ToOwned>::Owned;

    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    fn deserialize(stream: &Self::Stream) -> Option<MemoryImage>;
}

/// The `v2.0 raw` text dump.
///
/// The dump is a header line reading `v2.0 raw`, then all 256 slots in
/// address order as two lowercase hex digits each, 8 slots per row
/// separated by single spaces. Unwritten slots dump as `00`; the format
/// cannot distinguish an unwritten slot from a written zero, so a
/// deserialized image reads back every slot as written.
pub struct RawFormat;

const RAW_HEADER: &str = "v2.0 raw";
const SLOTS_PER_ROW: usize = 8;

impl ImageFormat for RawFormat {
    type Stream = str;

    fn serialize(image: &MemoryImage) -> String {
        let mut out = String::with_capacity(RAW_HEADER.len() + 1 + MemoryImage::SIZE * 3);
        out.push_str(RAW_HEADER);
        out.push('\n');

        for (i, slot) in image.slots.iter().enumerate() {
            let sep = if (i + 1) % SLOTS_PER_ROW == 0 { '\n' } else { ' ' };
            // Infallible for writes into a String.
            let _ = write!(out, "{:02x}{}", slot.unwrap_or(0), sep);
        }

        out
    }

    fn deserialize(stream: &str) -> Option<MemoryImage> {
        let body = stream.trim_start().strip_prefix(RAW_HEADER)?;

        let mut slots = [None; MemoryImage::SIZE];
        let mut tokens = body.split_whitespace();
        for slot in slots.iter_mut() {
            let token = tokens.next()?;
            if token.len() != 2 {
                return None;
            }
            *slot = Some(u8::from_str_radix(token, 16).ok()?);
        }
        // Trailing tokens mean this is not a 256-byte dump.
        if tokens.next().is_some() {
            return None;
        }

        Some(MemoryImage { slots, addr: 0 })
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::MemoryImage;

    use super::{ImageFormat, RawFormat};

    #[test]
    fn test_serialize_layout() {
        let mut image = MemoryImage::new();
        image.emit(0xab).unwrap();
        image.emit(0x01).unwrap();

        let dump = RawFormat::serialize(&image);
        let mut lines = dump.lines();
        assert_eq!(lines.next(), Some("v2.0 raw"));
        assert_eq!(lines.next(), Some("ab 01 00 00 00 00 00 00"));
        // 32 rows of 8 slots, plus the header.
        assert_eq!(dump.lines().count(), 33);
        assert!(dump.ends_with('\n'));
    }

    #[test]
    fn test_round_trip() {
        let mut image = MemoryImage::new();
        image.set_address(0x7f).unwrap();
        image.emit(0xee).unwrap();
        image.emit(0x20).unwrap();

        let reread = RawFormat::deserialize(&RawFormat::serialize(&image)).unwrap();
        assert_eq!(reread.get(0x7f), Some(0xee));
        assert_eq!(reread.get(0x80), Some(0x20));
        // Unwritten slots read back as written zeroes.
        assert_eq!(reread.get(0), Some(0));
        assert_eq!(reread.bytes_used(), 256);
    }

    #[test]
    fn test_deserialize_accepts_trailing_space_rows() {
        // Dumps from other emitters pad every slot with a trailing space.
        let mut padded = String::from("v2.0 raw\n");
        for _ in 0..MemoryImage::SIZE {
            padded.push_str("11 ");
        }

        let image = RawFormat::deserialize(&padded).unwrap();
        assert_eq!(image.get(255), Some(0x11));
    }

    #[test]
    fn test_deserialize_rejects_malformed() {
        assert!(RawFormat::deserialize("").is_none());
        assert!(RawFormat::deserialize("v3.0 raw\n00").is_none());

        // Too few slots.
        assert!(RawFormat::deserialize("v2.0 raw\n00 01 02").is_none());

        // Too many slots.
        let mut long = RawFormat::serialize(&MemoryImage::new());
        long.push_str("00\n");
        assert!(RawFormat::deserialize(&long).is_none());

        // Not hex, and not two digits.
        let good = RawFormat::serialize(&MemoryImage::new());
        assert!(RawFormat::deserialize(&good.replace("00 00", "zz 00")).is_none());
        assert!(RawFormat::deserialize(&good.replace("00 00", "0 000")).is_none());
    }
}

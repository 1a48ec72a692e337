use crate::{Error, Result, reader::Reader};

/// Size of the fixed header in front of every chunk.
pub const CHUNK_HEADER_SIZE: usize = 0x20;
/// Bytes of the fixed header which are counted by the data offset.
pub const MIN_DATA_OFFSET: u8 = 0x18;

pub const CRID: u32 = u32::from_be_bytes(*b"CRID");
pub const SFV: u32 = u32::from_be_bytes(*b"@SFV");
pub const SFA: u32 = u32::from_be_bytes(*b"@SFA");
pub const CUE: u32 = u32::from_be_bytes(*b"@CUE");

/// Header of a single container chunk.
///
/// ```text
/// 0x00 signature     u32
/// 0x04 data size     u32  (bytes after this field)
/// 0x08 -             u8
/// 0x09 data offset   u8   (from 0x08 to the payload)
/// 0x0A padding size  u16
/// 0x0C channel       u8
/// 0x0D -             u16
/// 0x0F data type     u8
/// 0x10 -             16 bytes
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub signature: u32,
    pub data_size: u32,
    pub data_offset: u8,
    pub padding_size: u16,
    pub channel: u8,
    pub data_type: u8,
}

impl ChunkHeader {
    pub fn parse(data: &[u8; CHUNK_HEADER_SIZE]) -> Result<Self> {
        let mut reader = Reader::new(data);

        let signature = reader.read_u32()? & 0x7F7F7F7F;
        let data_size = reader.read_u32()?;
        reader.skip(1)?;
        let data_offset = reader.read_u8()?;
        let padding_size = reader.read_u16()?;
        let channel = reader.read_u8()?;
        reader.skip(2)?;
        let data_type = reader.read_u8()?;

        let header = Self {
            signature,
            data_size,
            data_offset,
            padding_size,
            channel,
            data_type,
        };

        if data_offset < MIN_DATA_OFFSET || header.payload_size() < 0 {
            return Err(Error::InvalidChunk {
                data_size,
                data_offset,
                padding_size,
            });
        }

        Ok(header)
    }

    /// Bytes between the fixed header and the payload.
    pub fn extra_header_size(&self) -> u64 {
        (self.data_offset - MIN_DATA_OFFSET) as u64
    }

    /// Payload bytes after the extra header. Sizes of 2 GiB and above wrap negative and are
    /// rejected by [`parse`](Self::parse).
    pub fn payload_size(&self) -> i32 {
        self.data_size
            .wrapping_sub(self.data_offset as u32)
            .wrapping_sub(self.padding_size as u32) as i32
    }
}

#[cfg(test)]
pub(crate) fn header_bytes(
    signature: &[u8; 4],
    data_size: u32,
    data_offset: u8,
    padding_size: u16,
    channel: u8,
    data_type: u8,
) -> [u8; CHUNK_HEADER_SIZE] {
    let mut data = [0u8; CHUNK_HEADER_SIZE];
    data[..4].copy_from_slice(signature);
    data[4..8].copy_from_slice(&data_size.to_be_bytes());
    data[9] = data_offset;
    data[10..12].copy_from_slice(&padding_size.to_be_bytes());
    data[12] = channel;
    data[15] = data_type;
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fields() {
        let header = ChunkHeader::parse(&header_bytes(b"@SFA", 0x118, 0x18, 0x10, 3, 0)).unwrap();

        assert_eq!(header.signature, SFA);
        assert_eq!(header.channel, 3);
        assert_eq!(header.data_type, 0);
        assert_eq!(header.extra_header_size(), 0);
        assert_eq!(header.payload_size(), 0xF0);
    }

    #[test]
    fn masks_signature_high_bits() {
        let mut data = header_bytes(b"@SFV", 0x18, 0x18, 0, 0, 0);
        for x in &mut data[..4] {
            *x |= 0x80;
        }

        assert_eq!(ChunkHeader::parse(&data).unwrap().signature, SFV);
    }

    #[test]
    fn rejects_small_data_offset() {
        let result = ChunkHeader::parse(&header_bytes(b"@SFV", 0x100, 0x17, 0, 0, 0));
        assert!(matches!(
            result,
            Err(Error::InvalidChunk {
                data_offset: 0x17,
                ..
            })
        ));
    }

    #[test]
    fn rejects_negative_payload() {
        let result = ChunkHeader::parse(&header_bytes(b"@SFV", 0x20, 0x18, 0x10, 0, 0));
        assert!(matches!(result, Err(Error::InvalidChunk { .. })));
    }

    #[test]
    fn rejects_payloads_from_2_gib() {
        for data_size in [0xFFFF_FF00, 0x8000_0018] {
            let result = ChunkHeader::parse(&header_bytes(b"@SFA", data_size, 0x18, 0, 0, 0));
            assert!(matches!(result, Err(Error::InvalidChunk { .. })));
        }

        let header = ChunkHeader::parse(&header_bytes(b"@SFA", 0x8000_0017, 0x18, 0, 0, 0)).unwrap();
        assert_eq!(header.payload_size(), i32::MAX);
    }

    #[test]
    fn accepts_empty_payload() {
        let header = ChunkHeader::parse(&header_bytes(b"CRID", 0x28, 0x18, 0x10, 0, 0)).unwrap();
        assert_eq!(header.payload_size(), 0);
    }
}

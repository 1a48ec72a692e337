use crate::{Error, Result, reader::Reader};

/// Bytes in front of the sub-blocks: magic, version and header size.
pub const MAGIC_SIZE: usize = 8;

pub const HCA: u32 = u32::from_be_bytes(*b"HCA\0");
pub const FMT: u32 = u32::from_be_bytes(*b"fmt\0");
pub const COMP: u32 = u32::from_be_bytes(*b"comp");
pub const DEC: u32 = u32::from_be_bytes(*b"dec\0");
pub const VBR: u32 = u32::from_be_bytes(*b"vbr\0");
pub const ATH: u32 = u32::from_be_bytes(*b"ath\0");
pub const LOOP: u32 = u32::from_be_bytes(*b"loop");
pub const CIPH: u32 = u32::from_be_bytes(*b"ciph");
pub const RVA: u32 = u32::from_be_bytes(*b"rva\0");
pub const COMM: u32 = u32::from_be_bytes(*b"comm");
pub const PAD: u32 = u32::from_be_bytes(*b"pad\0");

/// Top bit of every tag byte may be set to hide the tag, it carries no information.
const CASE_FOLD: u32 = 0x7F7F7F7F;

/// Cipher applied to the audio blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipherType {
    /// Blocks are stored in clear.
    None,
    /// Fixed table shared by every key.
    Fixed,
    /// Table derived from the key.
    Keyed,
}

impl TryFrom<u16> for CipherType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Fixed),
            56 => Ok(Self::Keyed),
            x => Err(Error::UnknownCipherType(x)),
        }
    }
}

/// Fields of the audio header needed to walk the blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub block_size: u16,
    pub cipher_type: CipherType,
}

/// Reads the magic and header size, case folding the magic in place.
///
/// Returns the total header size, magic included.
pub fn parse_magic(magic: &mut [u8; MAGIC_SIZE]) -> Result<usize> {
    let mut reader = Reader::new(magic);
    let signature = reader.read_u32()? & CASE_FOLD;
    reader.skip(2)?;
    let header_size = reader.read_u16()? as usize;

    if signature != HCA || header_size < MAGIC_SIZE {
        return Err(Error::InvalidSignature(hex::encode_upper(&magic[..])));
    }

    magic[..4].copy_from_slice(&signature.to_be_bytes());
    Ok(header_size)
}

impl Header {
    /// Walks the sub-blocks following the magic, case folding every tag in place.
    pub fn parse(blocks: &mut [u8]) -> Result<Self> {
        let mut block_size = 0;
        let mut cipher_type = 0;
        let mut offset = 0;

        while blocks.len() - offset >= 4 {
            let data = &mut blocks[offset..];
            let tag = Reader::new(data).read_u32()? & CASE_FOLD;
            data[..4].copy_from_slice(&tag.to_be_bytes());

            let mut reader = Reader::new(data);
            reader.skip(4)?;

            let size = match tag {
                FMT if data.len() >= 16 => 16,
                COMP if data.len() >= 16 => {
                    block_size = reader.read_u16()?;
                    16
                }
                DEC if data.len() >= 12 => {
                    block_size = reader.read_u16()?;
                    12
                }
                VBR if data.len() >= 8 => 8,
                ATH if data.len() >= 6 => 6,
                LOOP if data.len() >= 16 => 16,
                CIPH if data.len() >= 6 => {
                    cipher_type = reader.read_u16()?;
                    6
                }
                RVA if data.len() >= 8 => 8,
                COMM if data.len() >= 5 => 5,
                PAD => break,
                tag => return Err(Error::UnknownHeaderBlock(tag)),
            };

            offset += size;
        }

        if block_size == 0 {
            return Err(Error::BlockSizeIsZero);
        }

        Ok(Self {
            block_size,
            cipher_type: cipher_type.try_into()?,
        })
    }
}

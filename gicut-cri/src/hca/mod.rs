//! Block decryptor for `HCA` audio streams.
//!
//! The header is rewritten with case folded tags and a fresh checksum, then every block is
//! passed through a [`SubstitutionTable`] and re-stamped. Checksums found in the input are
//! never verified.

mod header;

pub use header::{CipherType, Header, MAGIC_SIZE};

use crate::{
    Cancellation, Error, Result, SubstitutionTable, checksum,
    events::{self, Diagnostics, Event},
    reader,
};
use std::io::{Read, Write};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Audio cipher context for one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hca {
    table: SubstitutionTable,
}

impl Hca {
    pub fn new(key: u64) -> Self {
        Self {
            table: SubstitutionTable::new(key),
        }
    }

    /// Substitution table for `cipher_type`. `None` means the blocks are stored in clear.
    pub fn table(&self, cipher_type: CipherType) -> Option<&SubstitutionTable> {
        match cipher_type {
            CipherType::None => None,
            CipherType::Fixed => Some(&SubstitutionTable::FIXED),
            CipherType::Keyed => Some(&self.table),
        }
    }

    /// Decrypts a whole audio stream from `input` into `output`.
    ///
    /// Format failures are reported to `events` and returned as errors, nothing is written
    /// to `output` before the header has been validated.
    pub fn decrypt<R, W>(
        &self,
        input: &mut R,
        output: &mut W,
        events: Option<&dyn Diagnostics>,
        cancellation: &Cancellation,
    ) -> Result<()>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let header = match read_header(input, events) {
            Ok((header, bytes)) => {
                output.write_all(&bytes)?;
                header
            }
            Err(e) => {
                report(events, &e);
                return Err(e);
            }
        };

        match self.table(header.cipher_type) {
            None => copy(input, output, cancellation)?,
            Some(table) => decrypt_blocks(
                input,
                output,
                table,
                header.block_size as usize,
                events,
                cancellation,
            )?,
        }

        output.flush()?;
        Ok(())
    }
}

/// Reads, validates and re-stamps the complete header.
fn read_header<R: Read + ?Sized>(
    input: &mut R,
    events: Option<&dyn Diagnostics>,
) -> Result<(Header, Vec<u8>)> {
    let mut magic = [0u8; MAGIC_SIZE];
    let read = reader::read_full(input, &mut magic)?;

    if read != MAGIC_SIZE {
        return Err(stream_ended(events, MAGIC_SIZE, read));
    }

    let header_size = header::parse_magic(&mut magic)?;
    let mut bytes = vec![0u8; header_size];
    bytes[..MAGIC_SIZE].copy_from_slice(&magic);

    let read = reader::read_full(input, &mut bytes[MAGIC_SIZE..])?;

    if read != header_size - MAGIC_SIZE {
        return Err(stream_ended(events, header_size - MAGIC_SIZE, read));
    }

    let header = Header::parse(&mut bytes[MAGIC_SIZE..])?;
    checksum::stamp(&mut bytes);
    Ok((header, bytes))
}

fn decrypt_blocks<R, W>(
    input: &mut R,
    output: &mut W,
    table: &SubstitutionTable,
    block_size: usize,
    events: Option<&dyn Diagnostics>,
    cancellation: &Cancellation,
) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut block = vec![0u8; block_size];

    loop {
        cancellation.check()?;
        let read = reader::read_full(input, &mut block)?;

        if read == 0 {
            return Ok(());
        }

        table.apply(&mut block[..read]);

        if read == block_size {
            checksum::stamp(&mut block);
            output.write_all(&block)?;
            continue;
        }

        events::emit(
            events,
            Event::StreamEndedTooEarly {
                expected: block_size,
                actual: read,
            },
        );

        if read + 1 == block_size {
            block[read] = (checksum::checksum(&block[..read]) >> 8) as u8;
            output.write_all(&block)?;
        } else {
            output.write_all(&block[..read])?;
        }

        return Ok(());
    }
}

fn copy<R, W>(input: &mut R, output: &mut W, cancellation: &Cancellation) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        cancellation.check()?;
        let read = reader::read_full(input, &mut buf)?;

        if read == 0 {
            return Ok(());
        }

        output.write_all(&buf[..read])?;
    }
}

fn stream_ended(events: Option<&dyn Diagnostics>, expected: usize, actual: usize) -> Error {
    events::emit(events, Event::StreamEndedTooEarly { expected, actual });
    Error::UnexpectedEof { expected, actual }
}

/// Mirrors header failures as diagnostic events.
fn report(events: Option<&dyn Diagnostics>, error: &Error) {
    let event = match error {
        Error::InvalidSignature(signature) => Event::InvalidSignature { signature },
        Error::UnknownHeaderBlock(tag) => Event::UnknownHeaderBlock { tag: *tag },
        Error::BlockSizeIsZero => Event::BlockSizeIsZero,
        Error::UnknownCipherType(cipher_type) => Event::UnknownCipherType {
            cipher_type: *cipher_type,
        },
        _ => return,
    };

    events::emit(events, event);
}

/// Printable form of a header tag, e.g. `comp`.
pub fn tag_to_string(tag: u32) -> String {
    tag.to_be_bytes()
        .iter()
        .map(|&x| match x {
            0 => "\\0".to_owned(),
            x if x.is_ascii_graphic() => (x as char).to_string(),
            x => format!("\\x{x:02X}"),
        })
        .collect()
}

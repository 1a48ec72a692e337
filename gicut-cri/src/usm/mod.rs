//! Demultiplexer for the chunked `USM` video container.
//!
//! Video payloads are unmasked on the fly, audio payloads are forwarded untouched to one
//! sink per channel. Sinks are requested lazily from the caller supplied factories.

mod chunk;
mod mask;

pub use chunk::{CHUNK_HEADER_SIZE, CRID, CUE, ChunkHeader, MIN_DATA_OFFSET, SFA, SFV};
pub use mask::{VIDEO_MIN_MASKED_SIZE, VIDEO_SUBHEADER_SIZE};

use crate::{
    Cancellation, Error, MaskSet, Result,
    events::{self, Diagnostics, Event},
    reader,
};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    io::{self, Read, Seek, Write},
};

/// Destination for demultiplexed bytes.
pub type Sink<'a> = Box<dyn Write + 'a>;
/// Invoked at most once, on the first usable video payload.
pub type VideoSinkFactory<'a, 'b> = &'b mut dyn FnMut() -> io::Result<Sink<'a>>;
/// Invoked at most once per channel number, on its first usable audio payload.
pub type AudioSinkFactory<'a, 'b> = &'b mut dyn FnMut(u8) -> io::Result<Sink<'a>>;

/// Container cipher context for one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Usm {
    masks: MaskSet,
}

impl Usm {
    pub fn new(key: u64) -> Self {
        Self {
            masks: MaskSet::new(key),
        }
    }

    /// Removes the video mask from a single `@SFV` payload in place.
    pub fn unmask_video(&self, payload: &mut [u8]) {
        mask::unmask_video(&self.masks, payload);
    }

    /// Walk every chunk of `input` until the stream ends.
    ///
    /// Either factory may be `None`, in which case the matching chunks are skipped.
    /// Every sink that was created is flushed and dropped before returning, whatever the
    /// outcome.
    pub fn demux<'a, R: Read + Seek + ?Sized>(
        &self,
        input: &mut R,
        video: Option<VideoSinkFactory<'a, '_>>,
        audio: Option<AudioSinkFactory<'a, '_>>,
        events: Option<&dyn Diagnostics>,
        cancellation: &Cancellation,
    ) -> Result<()> {
        let mut outputs = Outputs::default();
        let result = self.demux_chunks(
            input,
            video,
            audio,
            events,
            cancellation,
            &mut outputs,
        );

        match result {
            Ok(()) => outputs.close().map_err(Error::from),
            Err(e) => {
                let _ = outputs.close();
                Err(e)
            }
        }
    }

    fn demux_chunks<'a, R: Read + Seek + ?Sized>(
        &self,
        input: &mut R,
        mut video: Option<VideoSinkFactory<'a, '_>>,
        mut audio: Option<AudioSinkFactory<'a, '_>>,
        events: Option<&dyn Diagnostics>,
        cancellation: &Cancellation,
        outputs: &mut Outputs<'a>,
    ) -> Result<()> {
        let mut header = [0u8; CHUNK_HEADER_SIZE];
        let mut data = Vec::new();

        loop {
            cancellation.check()?;

            if reader::read_full(input, &mut header)? != CHUNK_HEADER_SIZE {
                return Ok(());
            }

            let chunk = match ChunkHeader::parse(&header) {
                Ok(chunk) => chunk,
                Err(e) => {
                    if let Error::InvalidChunk {
                        data_size,
                        data_offset,
                        padding_size,
                    } = e
                    {
                        events::emit(
                            events,
                            Event::InvalidChunk {
                                data_size,
                                data_offset,
                                padding_size,
                            },
                        );
                    }
                    return Err(e);
                }
            };

            reader::skip(input, chunk.extra_header_size())?;

            let size = chunk.payload_size() as usize;
            data.clear();
            let read = Read::take(&mut *input, size as u64).read_to_end(&mut data)?;

            if read < size {
                events::emit(
                    events,
                    Event::StreamEndedTooEarly {
                        expected: size,
                        actual: read,
                    },
                );
                return Err(Error::UnexpectedEof {
                    expected: size,
                    actual: read,
                });
            }

            match chunk.signature {
                CRID => (),
                SFV => match video.as_mut() {
                    None => events::emit(events, Event::SkipVideoChunk),
                    Some(factory) if chunk.data_type == 0 => {
                        self.unmask_video(&mut data);
                        outputs.video(factory)?.write_all(&data)?;
                    }
                    Some(_) => events::emit(
                        events,
                        Event::SkipVideoDataType {
                            data_type: chunk.data_type,
                        },
                    ),
                },
                SFA => match audio.as_mut() {
                    None => events::emit(events, Event::SkipAudioChunk),
                    Some(factory) if chunk.data_type == 0 => {
                        outputs.audio(chunk.channel, factory)?.write_all(&data)?;
                    }
                    Some(_) => events::emit(
                        events,
                        Event::SkipAudioDataType {
                            data_type: chunk.data_type,
                        },
                    ),
                },
                CUE => events::emit(events, Event::SkipCueChunk),
                signature => events::emit(events, Event::SkipUnknownChunk { signature }),
            }

            reader::skip(input, chunk.padding_size as u64)?;
        }
    }
}

/// Sinks opened during one demux pass.
#[derive(Default)]
struct Outputs<'a> {
    video: Option<Sink<'a>>,
    audio: BTreeMap<u8, Sink<'a>>,
}

impl<'a> Outputs<'a> {
    fn video(
        &mut self,
        factory: &mut dyn FnMut() -> io::Result<Sink<'a>>,
    ) -> io::Result<&mut Sink<'a>> {
        let sink = match self.video.take() {
            Some(sink) => sink,
            None => factory()?,
        };

        Ok(self.video.insert(sink))
    }

    fn audio(
        &mut self,
        channel: u8,
        factory: &mut dyn FnMut(u8) -> io::Result<Sink<'a>>,
    ) -> io::Result<&mut Sink<'a>> {
        Ok(match self.audio.entry(channel) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(factory(channel)?),
        })
    }

    /// Flush and drop every sink, reporting the first failure.
    fn close(self) -> io::Result<()> {
        let mut result = Ok(());

        for mut sink in self.video.into_iter().chain(self.audio.into_values()) {
            if let Err(e) = sink.flush()
                && result.is_ok()
            {
                result = Err(e);
            }
        }

        result
    }
}

/// Printable form of a chunk signature, e.g. `@SFV`.
pub fn signature_to_string(signature: u32) -> String {
    signature
        .to_be_bytes()
        .iter()
        .map(|&x| {
            if x.is_ascii_graphic() {
                x as char
            } else {
                '.'
            }
        })
        .collect()
}

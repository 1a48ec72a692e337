//! Structured diagnostics emitted while walking containers and audio streams.
//!
//! None of these events affect the outcome of an operation, they only make it observable.
//! Pass `None` wherever an `Option<&dyn Diagnostics>` is expected to stay silent, or
//! [`LogDiagnostics`] to forward everything to the [`log`] facade.

use crate::{Error, hca, usm};
use log::Level;
use std::fmt;

/// A single diagnostic event.
#[derive(Debug)]
pub enum Event<'a> {
    /// Container or audio stream ended before a structure was complete.
    StreamEndedTooEarly { expected: usize, actual: usize },
    /// Chunk header with an impossible payload layout.
    InvalidChunk {
        data_size: u32,
        data_offset: u8,
        padding_size: u16,
    },
    /// `@SFV` chunk skipped because no video sink factory was supplied.
    SkipVideoChunk,
    /// `@SFA` chunk skipped because no audio sink factory was supplied.
    SkipAudioChunk,
    SkipCueChunk,
    SkipUnknownChunk { signature: u32 },
    SkipVideoDataType { data_type: u8 },
    SkipAudioDataType { data_type: u8 },
    /// Audio stream magic, as hex.
    InvalidSignature { signature: &'a str },
    UnknownHeaderBlock { tag: u32 },
    BlockSizeIsZero,
    UnknownCipherType { cipher_type: u16 },
    /// Decoding of one audio channel failed, other channels are unaffected.
    ChannelFailed { channel: u8, error: Option<&'a Error> },
}

impl Event<'_> {
    /// Stable numeric identifier of the event kind.
    pub fn id(&self) -> u16 {
        match self {
            Self::SkipVideoChunk => 2100,
            Self::SkipAudioChunk => 2101,
            Self::SkipCueChunk => 2102,
            Self::SkipUnknownChunk { .. } => 2103,
            Self::SkipVideoDataType { .. } => 2104,
            Self::SkipAudioDataType { .. } => 2105,
            Self::StreamEndedTooEarly { .. } => 9000,
            Self::InvalidChunk { .. } => 9100,
            Self::InvalidSignature { .. } => 9200,
            Self::UnknownHeaderBlock { .. } => 9201,
            Self::BlockSizeIsZero => 9202,
            Self::UnknownCipherType { .. } => 9203,
            Self::ChannelFailed { .. } => 9903,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Self::SkipVideoChunk
            | Self::SkipAudioChunk
            | Self::SkipVideoDataType { .. }
            | Self::SkipAudioDataType { .. } => Level::Debug,
            Self::SkipCueChunk | Self::SkipUnknownChunk { .. } => Level::Info,
            _ => Level::Error,
        }
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamEndedTooEarly { expected, actual } => {
                write!(f, "Stream ended too early, expected {expected}, read {actual}")
            }
            Self::InvalidChunk {
                data_size,
                data_offset,
                padding_size,
            } => write!(
                f,
                "Invalid data: {data_size}, {data_offset}, {padding_size}"
            ),
            Self::SkipVideoChunk => write!(f, "Skip @SFV chunk because video output is disabled"),
            Self::SkipAudioChunk => write!(f, "Skip @SFA chunk because audio output is disabled"),
            Self::SkipCueChunk => write!(f, "Skip unused @CUE chunk"),
            Self::SkipUnknownChunk { signature } => {
                write!(f, "Skip unknown chunk {}", usm::signature_to_string(*signature))
            }
            Self::SkipVideoDataType { data_type } => {
                write!(f, "Skip unused video data type {data_type}")
            }
            Self::SkipAudioDataType { data_type } => {
                write!(f, "Skip unused audio data type {data_type}")
            }
            Self::InvalidSignature { signature } => write!(f, "Invalid signature: {signature}"),
            Self::UnknownHeaderBlock { tag } => {
                write!(f, "Invalid header: unknown block {}", hca::tag_to_string(*tag))
            }
            Self::BlockSizeIsZero => write!(f, "Invalid header: block size is zero"),
            Self::UnknownCipherType { cipher_type } => {
                write!(f, "Invalid header: unknown cipher type {cipher_type}")
            }
            Self::ChannelFailed { channel, error } => match error {
                Some(error) => write!(f, "HCA decrypt failed: Ch.{channel}: {error}"),
                None => write!(f, "HCA decrypt failed: Ch.{channel}"),
            },
        }
    }
}

/// Receiver of [`Event`]s. Shared between the demultiplexer and every channel worker.
pub trait Diagnostics: Sync {
    fn emit(&self, event: &Event<'_>);
}

impl<F> Diagnostics for F
where
    F: Fn(&Event<'_>) + Sync,
{
    fn emit(&self, event: &Event<'_>) {
        self(event)
    }
}

/// Forwards events to the [`log`] facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, event: &Event<'_>) {
        log::log!(target: "gicut_cri", event.level(), "{}", event);
    }
}

pub(crate) fn emit(events: Option<&dyn Diagnostics>, event: Event<'_>) {
    if let Some(events) = events {
        events.emit(&event);
    }
}

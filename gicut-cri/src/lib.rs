//! This crate contains a demultiplexer for CRI `USM` containers and a block decryptor for the
//! `HCA` audio streams they carry.
//!
//! Both formats are obfuscated with tables derived from a 64-bit key. [`KeySet`] derives
//! every table for one key, [`Usm::demux`] splits a container into its video and raw audio
//! streams, [`Hca::decrypt`] decrypts a single audio stream, and [`demux_and_decrypt`] does
//! both in one pass with a worker thread per audio channel.
//!
//! ```no_run
//! use gicut_cri::{Cancellation, KeySet, LogDiagnostics, demux_and_decrypt};
//! use std::fs::File;
//!
//! let keys = KeySet::new(0x0123456789ABCDEF);
//! let mut input = File::open("movie.usm")?;
//! let mut video = || -> std::io::Result<gicut_cri::Sink<'static>> {
//!     Ok(Box::new(File::create("movie.ivf")?))
//! };
//! let audio = |channel: u8| File::create(format!("movie.{channel}.hca"));
//!
//! let ok = demux_and_decrypt(
//!     &keys,
//!     &mut input,
//!     Some(&mut video),
//!     Some(&audio),
//!     Some(&LogDiagnostics),
//!     &Cancellation::new(),
//! )?;
//! println!("complete: {ok}");
//! # Ok::<(), gicut_cri::Error>(())
//! ```

pub mod checksum;
pub mod events;
pub mod hca;
pub mod pipe;
pub mod usm;

mod cancel;
mod error;
mod keys;
mod pipeline;
mod reader;

pub use cancel::Cancellation;
pub use error::Error;
pub use events::{Diagnostics, Event, LogDiagnostics};
pub use hca::Hca;
pub use keys::{MASK_SIZE, MaskSet, SubstitutionTable};
pub use pipeline::{KeySet, demux_and_decrypt};
pub use usm::{Sink, Usm};

/// A `Result` alias where the `Err` case is `gicut_cri::Error`.
pub type Result<T> = std::result::Result<T, Error>;

//! One demultiplexing pass feeding a decrypt worker per audio channel.

use crate::{
    Cancellation, Error, Hca, Result, Usm,
    events::{self, Diagnostics, Event},
    pipe::{self, PipeReader},
    usm::{Sink, VideoSinkFactory},
};
use std::{
    io::{self, Read, Seek, Write},
    thread,
};

/// Every cipher context derived from one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeySet {
    pub usm: Usm,
    pub hca: Hca,
}

impl KeySet {
    pub fn new(key: u64) -> Self {
        Self {
            usm: Usm::new(key),
            hca: Hca::new(key),
        }
    }
}

/// Demultiplexes `input` and decrypts every audio channel on its own thread.
///
/// Raw audio payloads are piped to a worker spawned on the first payload of each channel.
/// The worker asks `audio` for its output and runs [`Hca::decrypt`] into it, so `audio` is
/// called from the worker thread.
///
/// Returns `Ok(true)` when the container was walked completely and every channel decrypted.
/// Format failures and failed channels give `Ok(false)`, the reason is reported to `events`.
/// Errors of the input stream and cancellation are returned as `Err`.
pub fn demux_and_decrypt<'a, R, F, W>(
    keys: &KeySet,
    input: &mut R,
    video: Option<VideoSinkFactory<'a, '_>>,
    audio: Option<&F>,
    events: Option<&dyn Diagnostics>,
    cancellation: &Cancellation,
) -> Result<bool>
where
    R: Read + Seek + ?Sized,
    F: Fn(u8) -> io::Result<W> + Sync,
    W: Write,
{
    let (demuxed, channels_ok) = thread::scope(|scope| {
        let mut workers = Vec::new();

        let demuxed = match audio {
            Some(audio) => {
                let mut spawn = |channel: u8| -> io::Result<Sink<'a>> {
                    let (writer, reader) = pipe::pipe(pipe::DEFAULT_CAPACITY, cancellation);
                    let cancellation = cancellation.clone();

                    log::debug!("spawning decrypt worker for channel {channel}");
                    let handle = scope.spawn(move || {
                        decrypt_channel(keys, channel, reader, audio, events, &cancellation)
                    });

                    workers.push((channel, handle));
                    Ok(Box::new(writer))
                };

                keys.usm
                    .demux(input, video, Some(&mut spawn), events, cancellation)
            }
            None => keys.usm.demux(input, video, None, events, cancellation),
        };

        let mut channels_ok = true;

        for (channel, handle) in workers {
            let failure = match handle.join() {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => Some(e),
                Err(_) => None,
            };

            channels_ok = false;
            events::emit(
                events,
                Event::ChannelFailed {
                    channel,
                    error: failure.as_ref(),
                },
            );
        }

        (demuxed, channels_ok)
    });

    if cancellation.is_cancelled() {
        return Err(Error::Cancelled);
    }

    match demuxed {
        Ok(()) => Ok(channels_ok),
        Err(e) if e.is_io() => Err(e),
        Err(e) => {
            log::debug!("container rejected: {e}");
            Ok(false)
        }
    }
}

fn decrypt_channel<F, W>(
    keys: &KeySet,
    channel: u8,
    mut reader: PipeReader,
    audio: &F,
    events: Option<&dyn Diagnostics>,
    cancellation: &Cancellation,
) -> Result<()>
where
    F: Fn(u8) -> io::Result<W>,
    W: Write,
{
    let mut output = audio(channel)?;
    let result = keys
        .hca
        .decrypt(&mut reader, &mut output, events, cancellation);
    let flushed = output.flush();

    drop(output);
    drop(reader);

    result?;
    flushed?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Cursor, sync::Mutex};

    #[test]
    fn key_sets_compare_by_content() {
        assert_eq!(KeySet::new(7), KeySet::new(7));
        assert_ne!(KeySet::new(7), KeySet::new(8));
    }

    #[test]
    fn empty_input_succeeds_without_sinks() {
        let created = Mutex::new(0);
        let audio = |_: u8| -> io::Result<Vec<u8>> {
            *created.lock().unwrap() += 1;
            Ok(Vec::new())
        };

        let result = demux_and_decrypt(
            &KeySet::new(1),
            &mut Cursor::new(Vec::new()),
            None,
            Some(&audio),
            None,
            &Cancellation::new(),
        );

        assert!(result.unwrap());
        assert_eq!(*created.lock().unwrap(), 0);
    }

    #[test]
    fn cancelled_pass_is_an_error() {
        let cancellation = Cancellation::new();
        cancellation.cancel();

        let result = demux_and_decrypt::<_, fn(u8) -> io::Result<Vec<u8>>, _>(
            &KeySet::new(1),
            &mut Cursor::new(vec![0; 64]),
            None,
            None,
            None,
            &cancellation,
        );

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}

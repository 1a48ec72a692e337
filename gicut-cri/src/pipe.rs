//! Bounded in-process byte pipe connecting the demultiplexer to one channel worker.

use crate::{Cancellation, Error};
use std::{
    io::{self, Read, Write},
    sync::mpsc::{self, Receiver, SyncSender},
};

/// Number of writes a pipe buffers before the writer blocks.
pub const DEFAULT_CAPACITY: usize = 64;

/// Creates a connected pipe holding at most `capacity` pending writes.
pub fn pipe(capacity: usize, cancellation: &Cancellation) -> (PipeWriter, PipeReader) {
    let (sender, receiver) = mpsc::sync_channel(capacity);

    (
        PipeWriter {
            sender,
            cancellation: cancellation.clone(),
        },
        PipeReader {
            receiver,
            buffer: Vec::new(),
            position: 0,
            cancellation: cancellation.clone(),
        },
    )
}

/// Sending half. Dropping it signals end of stream to the reader.
///
/// Writes succeed even after the reader is gone, the bytes are discarded.
#[derive(Debug)]
pub struct PipeWriter {
    sender: SyncSender<Vec<u8>>,
    cancellation: Cancellation,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.cancellation.is_cancelled() {
            return Err(io::Error::other(Error::Cancelled));
        }

        if !buf.is_empty() {
            let _ = self.sender.send(buf.to_vec());
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Receiving half. Blocks while the pipe is empty and the writer is alive.
#[derive(Debug)]
pub struct PipeReader {
    receiver: Receiver<Vec<u8>>,
    buffer: Vec<u8>,
    position: usize,
    cancellation: Cancellation,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancellation.is_cancelled() {
            return Err(io::Error::other(Error::Cancelled));
        }

        if buf.is_empty() {
            return Ok(0);
        }

        if self.position == self.buffer.len() {
            match self.receiver.recv() {
                Ok(data) => {
                    self.buffer = data;
                    self.position = 0;
                }
                Err(_) => return Ok(0),
            }
        }

        let n = buf.len().min(self.buffer.len() - self.position);
        buf[..n].copy_from_slice(&self.buffer[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn bytes_arrive_in_order() {
        let (mut writer, mut reader) = pipe(2, &Cancellation::new());

        let producer = thread::spawn(move || {
            for i in 0..100u8 {
                writer.write_all(&[i; 3]).unwrap();
            }
        });

        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        producer.join().unwrap();

        let expected: Vec<u8> = (0..100u8).flat_map(|i| [i; 3]).collect();
        assert_eq!(data, expected);
    }

    #[test]
    fn writes_after_reader_dropped_are_discarded() {
        let (mut writer, reader) = pipe(1, &Cancellation::new());
        drop(reader);

        writer.write_all(b"first").unwrap();
        writer.write_all(b"second").unwrap();
    }

    #[test]
    fn cancellation_stops_both_ends() {
        let cancellation = Cancellation::new();
        let (mut writer, mut reader) = pipe(1, &cancellation);
        writer.write_all(b"x").unwrap();
        cancellation.cancel();

        let error = writer.write(b"y").unwrap_err();
        assert!(matches!(
            error.get_ref().and_then(|e| e.downcast_ref::<Error>()),
            Some(Error::Cancelled)
        ));
        assert!(reader.read(&mut [0; 4]).is_err());
    }
}

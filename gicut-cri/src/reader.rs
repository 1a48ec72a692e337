use std::io::{self, ErrorKind, Read, Seek};

/// Big endian field reader over an in-memory header.
#[derive(Clone, Debug)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn skip(&mut self, bytes: usize) -> io::Result<()> {
        self.take(bytes).map(|_| ())
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        let buf = self.take(2)?;
        Ok(u16::from_be_bytes([buf[0], buf[1]]))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        let buf = self.take(4)?;
        Ok(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
    }

    fn take(&mut self, bytes: usize) -> io::Result<&'a [u8]> {
        if bytes > self.remaining() {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                "Reader skips out of memory bounds.",
            ));
        }

        let data = &self.data[self.position..self.position + bytes];
        self.position += bytes;
        Ok(data)
    }
}

/// Reads until `buf` is full or the stream ends, returning the number of bytes read.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0;

    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(read)
}

/// Moves the read head forward without looking at the bytes.
///
/// Buffered readers keep their buffer when the target is inside it.
pub fn skip<R: Seek + ?Sized>(reader: &mut R, bytes: u64) -> io::Result<()> {
    if bytes > 0 {
        reader.seek_relative(bytes as i64)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_big_endian_fields() {
        let mut reader = Reader::new(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE]);

        assert_eq!(reader.read_u32().unwrap(), 0x12345678);
        assert_eq!(reader.read_u16().unwrap(), 0x9ABC);
        assert_eq!(reader.read_u8().unwrap(), 0xDE);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn skip_is_bounded() {
        let mut reader = Reader::new(&[0; 4]);
        assert!(reader.skip(5).is_err());
        assert_eq!(reader.remaining(), 4);
        reader.skip(4).unwrap();
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn read_full_stops_at_end_of_stream() {
        let mut input = Cursor::new(vec![1, 2, 3]);
        let mut buf = [0; 8];
        assert_eq!(read_full(&mut input, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(read_full(&mut input, &mut buf).unwrap(), 0);
    }

    #[test]
    fn skip_keeps_buffered_position() {
        let mut input = std::io::BufReader::with_capacity(4, Cursor::new((0..10).collect::<Vec<u8>>()));
        let mut buf = [0; 2];

        read_full(&mut input, &mut buf).unwrap();
        skip(&mut input, 3).unwrap();
        read_full(&mut input, &mut buf).unwrap();
        assert_eq!(buf, [5, 6]);
    }
}

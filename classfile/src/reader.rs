//! Positioned big-endian reader, with a buffer-backed and a file-backed
//! implementation sharing one trait (§4.1, §4.9 "Polymorphic reader").

use byteorder::{ReadBytesExt, BE};
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

#[derive(Debug)]
pub enum ReaderError {
    UnexpectedEnd,
    InvalidSeek,
    Io(io::Error),
}

impl Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::UnexpectedEnd => write!(f, "unexpected end of input"),
            ReaderError::InvalidSeek => write!(f, "invalid seek"),
            ReaderError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for ReaderError {}

fn map_io(e: io::Error) -> ReaderError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ReaderError::UnexpectedEnd
    } else {
        ReaderError::Io(e)
    }
}

/// Seek origin. End-relative seeking is intentionally not offered.
#[derive(Debug, Clone, Copy)]
pub enum Whence {
    Set,
    Cur,
}

pub trait Reader {
    fn read_u1(&mut self) -> Result<u8, ReaderError>;
    fn read_u2(&mut self) -> Result<u16, ReaderError>;
    fn read_u4(&mut self) -> Result<u32, ReaderError>;
    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, ReaderError>;
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, ReaderError>;
    fn tell(&self) -> u64;
    fn tell_prev(&self) -> u64;
}

/// Buffer-backed reader: used both for the top-level byte stream and for
/// the nested decode of an attribute's raw bytes (e.g. `Code`).
pub struct SliceReader<'a> {
    cursor: Cursor<&'a [u8]>,
    prev: u64,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceReader {
            cursor: Cursor::new(data),
            prev: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.position() >= self.cursor.get_ref().len() as u64
    }
}

impl<'a> Reader for SliceReader<'a> {
    fn read_u1(&mut self) -> Result<u8, ReaderError> {
        self.prev = self.cursor.position();
        self.cursor.read_u8().map_err(map_io)
    }

    fn read_u2(&mut self) -> Result<u16, ReaderError> {
        self.prev = self.cursor.position();
        self.cursor.read_u16::<BE>().map_err(map_io)
    }

    fn read_u4(&mut self) -> Result<u32, ReaderError> {
        self.prev = self.cursor.position();
        self.cursor.read_u32::<BE>().map_err(map_io)
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, ReaderError> {
        self.prev = self.cursor.position();
        let mut buf = vec![0u8; n];
        self.cursor.read_exact(&mut buf).map_err(map_io)?;
        Ok(buf)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, ReaderError> {
        self.prev = self.cursor.position();
        let target = match whence {
            Whence::Set if offset >= 0 => SeekFrom::Start(offset as u64),
            Whence::Set => return Err(ReaderError::InvalidSeek),
            Whence::Cur => SeekFrom::Current(offset),
        };
        self.cursor.seek(target).map_err(|_| ReaderError::InvalidSeek)
    }

    fn tell(&self) -> u64 {
        self.cursor.position()
    }

    fn tell_prev(&self) -> u64 {
        self.prev
    }
}

/// Random-access-file-backed reader, for the top-level stream when a class
/// file is driven directly from disk instead of a slurped buffer.
pub struct FileReader {
    file: File,
    pos: u64,
    prev: u64,
}

impl FileReader {
    pub fn new(mut file: File) -> Result<Self, ReaderError> {
        let pos = file.stream_position().map_err(map_io)?;
        Ok(FileReader { file, pos, prev: pos })
    }
}

impl Reader for FileReader {
    fn read_u1(&mut self) -> Result<u8, ReaderError> {
        self.prev = self.pos;
        let v = self.file.read_u8().map_err(map_io)?;
        self.pos += 1;
        Ok(v)
    }

    fn read_u2(&mut self) -> Result<u16, ReaderError> {
        self.prev = self.pos;
        let v = self.file.read_u16::<BE>().map_err(map_io)?;
        self.pos += 2;
        Ok(v)
    }

    fn read_u4(&mut self) -> Result<u32, ReaderError> {
        self.prev = self.pos;
        let v = self.file.read_u32::<BE>().map_err(map_io)?;
        self.pos += 4;
        Ok(v)
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, ReaderError> {
        self.prev = self.pos;
        let mut buf = vec![0u8; n];
        self.file.read_exact(&mut buf).map_err(map_io)?;
        self.pos += n as u64;
        Ok(buf)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, ReaderError> {
        self.prev = self.pos;
        let target = match whence {
            Whence::Set if offset >= 0 => SeekFrom::Start(offset as u64),
            Whence::Set => return Err(ReaderError::InvalidSeek),
            Whence::Cur => SeekFrom::Current(offset),
        };
        self.pos = self.file.seek(target).map_err(map_io)?;
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn tell_prev(&self) -> u64 {
        self.prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut r = SliceReader::new(&data);
        assert_eq!(r.read_u2().unwrap(), 0x0102);
        assert_eq!(r.read_u2().unwrap(), 0x0304);
    }

    #[test]
    fn tracks_prev_offset() {
        let data = [0xAA, 0xBB, 0xCC, 0xDD];
        let mut r = SliceReader::new(&data);
        r.read_u1().unwrap();
        assert_eq!(r.tell_prev(), 0);
        assert_eq!(r.tell(), 1);
        r.read_u2().unwrap();
        assert_eq!(r.tell_prev(), 1);
        assert_eq!(r.tell(), 3);
    }

    #[test]
    fn unexpected_end() {
        let data = [0x00];
        let mut r = SliceReader::new(&data);
        assert!(matches!(r.read_u2(), Err(ReaderError::UnexpectedEnd)));
    }

    #[test]
    fn seek_set_and_cur() {
        let data = [0, 1, 2, 3, 4, 5];
        let mut r = SliceReader::new(&data);
        r.seek(4, Whence::Set).unwrap();
        assert_eq!(r.read_u1().unwrap(), 4);
        r.seek(-2, Whence::Cur).unwrap();
        assert_eq!(r.read_u1().unwrap(), 3);
    }

    #[test]
    fn negative_set_seek_rejected() {
        let data = [0, 1, 2];
        let mut r = SliceReader::new(&data);
        assert!(matches!(r.seek(-1, Whence::Set), Err(ReaderError::InvalidSeek)));
    }
}

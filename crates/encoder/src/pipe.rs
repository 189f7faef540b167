//! Anonymous unidirectional pipe.

use std::io::{PipeReader, PipeWriter};

use framepipe_common::error::{FramepipeError, FramepipeResult};

/// Both ends of a freshly created pipe.
///
/// Each end is closed when dropped, so a failure anywhere between creating
/// the pipe and handing the ends out cannot leak a descriptor. Both ends are
/// close-on-exec; a child only sees an end that is explicitly passed to it.
#[derive(Debug)]
pub struct PipeHandle {
    pub read: PipeReader,
    pub write: PipeWriter,
}

impl PipeHandle {
    /// Create the pipe. Both ends are created by one system call.
    pub fn open() -> FramepipeResult<Self> {
        let (read, write) = std::io::pipe().map_err(|source| FramepipeError::Pipe { source })?;
        Ok(Self { read, write })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bytes_flow_from_write_to_read_end() {
        let PipeHandle {
            mut read,
            mut write,
        } = PipeHandle::open().unwrap();
        write.write_all(b"rgba").unwrap();
        drop(write);

        let mut received = Vec::new();
        read.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"rgba");
    }

    #[test]
    fn test_writing_after_reader_closed_fails() {
        let PipeHandle { read, mut write } = PipeHandle::open().unwrap();
        drop(read);
        let err = write.write_all(&[0u8; 16]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}

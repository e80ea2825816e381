//! Buffered writes into the write target

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::VfsResult;

/// File opened for writing under the write target.
///
/// Buffered; pending data is flushed by [`finish`](Self::finish) or, with
/// errors ignored, on drop.
#[derive(Debug)]
pub struct WriteStream {
    path: String,
    native: PathBuf,
    writer: BufWriter<File>,
}

impl WriteStream {
    pub(crate) fn create(path: String, native: PathBuf, append: bool) -> VfsResult<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(&native)?;
        Ok(Self {
            path,
            native,
            writer: BufWriter::new(file),
        })
    }

    /// Logical path this stream writes.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Native file behind the stream.
    pub fn native_path(&self) -> &Path {
        &self.native
    }

    /// Flush buffered data and sync it to disk.
    pub fn finish(mut self) -> VfsResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

impl Write for WriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_truncate_then_append() {
        let dir = TempDir::new().unwrap();
        let native = dir.path().join("log.txt");

        let mut stream = WriteStream::create("log.txt".into(), native.clone(), false).unwrap();
        stream.write_all(b"first").unwrap();
        stream.finish().unwrap();

        let mut stream = WriteStream::create("log.txt".into(), native.clone(), true).unwrap();
        stream.write_all(b" second").unwrap();
        assert_eq!(stream.path(), "log.txt");
        stream.finish().unwrap();
        assert_eq!(std::fs::read(&native).unwrap(), b"first second");

        let mut stream = WriteStream::create("log.txt".into(), native.clone(), false).unwrap();
        stream.write_all(b"x").unwrap();
        drop(stream);
        assert_eq!(std::fs::read(&native).unwrap(), b"x");
    }
}

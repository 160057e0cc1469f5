use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use super::DriveTransport;

#[doc = r#"
The drive controller's serial device, opened as a plain read/write file.

Line settings are left to the device's defaults. A device that cannot be
opened gives a disconnected transport: drive output is off for the session.
"#]
#[derive(Debug)]
pub struct SerialTransport {
    path: PathBuf,
    file: Option<File>,
}

impl SerialTransport {
    /// Open the device at `path`
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => {
                info!(port = %path.display(), "drive controller connected");
                Some(file)
            }
            Err(e) => {
                warn!(port = %path.display(), error = %e, "drive controller unavailable, drives disabled");
                None
            }
        };
        Self { path, file }
    }

    /// The device path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port not open"))
    }
}

impl DriveTransport for SerialTransport {
    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let file = self.file()?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }
}

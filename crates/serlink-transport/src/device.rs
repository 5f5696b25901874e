use std::fs::{File, OpenOptions};
use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::IoTransport;

/// Default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Line settings for [`SerialDevice::open`].
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Baud rate applied to tty devices. Ignored for other nodes.
    pub baud_rate: u32,
    /// How long a read waits for a byte before reporting "no byte".
    ///
    /// Keep this near the reader's poll interval so idle timeouts and
    /// cancellation stay responsive.
    pub read_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(10),
        }
    }
}

enum Port {
    Serial(Box<dyn serialport::SerialPort>),
    Node(File),
}

/// A serial device opened for reading and writing.
///
/// Terminals are opened through `serialport` with the configured baud rate
/// and read timeout; a read that times out surfaces as
/// [`std::io::ErrorKind::TimedOut`], which [`IoTransport`] reports as "no
/// byte". Other nodes (FIFOs, capture files) are opened non-blocking, so an
/// empty read is likewise "no byte" instead of a stall.
pub struct SerialDevice {
    port: Port,
    path: PathBuf,
}

impl SerialDevice {
    /// Open the device at `path` for reading and writing.
    ///
    /// The path must already exist; it is never created or truncated.
    pub fn open(path: impl AsRef<Path>, config: &DeviceConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source: std::io::Error| TransportError::Open {
            path: path.clone(),
            source,
        };

        let metadata = std::fs::metadata(&path).map_err(open_error)?;
        if metadata.is_dir() {
            return Err(open_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path is a directory",
            )));
        }

        let file = open_node(&path).map_err(open_error)?;
        if !file.is_terminal() {
            debug!(?path, "opened device node");
            return Ok(Self {
                port: Port::Node(file),
                path,
            });
        }
        drop(file);

        let port = serialport::new(path.to_string_lossy(), config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|err| open_error(err.into()))?;
        debug!(?path, baud = config.baud_rate, "opened serial port");
        Ok(Self {
            port: Port::Serial(port),
            path,
        })
    }

    /// Open the device and wrap it as a byte transport.
    pub fn open_transport(
        path: impl AsRef<Path>,
        config: &DeviceConfig,
    ) -> Result<IoTransport<Self>> {
        Ok(IoTransport::new(Self::open(path, config)?))
    }

    /// The path this device was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the device is a terminal driven through `serialport`.
    pub fn is_serial_port(&self) -> bool {
        matches!(self.port, Port::Serial(_))
    }
}

#[cfg(unix)]
fn open_node(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(path)
}

#[cfg(not(unix))]
fn open_node(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

impl Read for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.port {
            Port::Serial(port) => port.read(buf),
            Port::Node(file) => file.read(buf),
        }
    }
}

impl Write for SerialDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.port {
            Port::Serial(port) => port.write(buf),
            Port::Node(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.port {
            Port::Serial(port) => port.flush(),
            Port::Node(file) => file.flush(),
        }
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("path", &self.path)
            .field("serial", &self.is_serial_port())
            .finish()
    }
}

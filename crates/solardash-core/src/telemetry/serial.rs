//! Serial port handling
//!
//! Opens the power telemetry link and turns the byte stream into lines.

use serialport::SerialPort;
use std::io::{self, Read};
use std::time::Duration;
use tracing::{debug, warn};

use super::ParseError;
use crate::sensors::{LineSource, SensorError};

/// Longest line accepted before the buffer is discarded
pub const MAX_LINE_LEN: usize = 4096;

/// Open a serial port; `read_timeout` bounds every blocking read
pub fn open_port(
    name: &str,
    baud_rate: u32,
    read_timeout: Duration,
) -> Result<Box<dyn SerialPort>, ParseError> {
    serialport::new(name, baud_rate)
        .timeout(read_timeout)
        .open()
        .map_err(|e| ParseError::SerialError(format!("{name}: {e}")))
}

/// Configure a port for the telemetry link (8N1, no flow control)
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ParseError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| ParseError::SerialError(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| ParseError::SerialError(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| ParseError::SerialError(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| ParseError::SerialError(e.to_string()))?;

    if let Err(e) = port.clear(serialport::ClearBuffer::Input) {
        debug!("configure_port: could not clear input buffer: {e} (continuing)");
    }

    Ok(())
}

/// Decode bytes as Latin-1 (every byte maps to the code point of the same value)
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Line reader over a byte stream with read timeouts
///
/// Partial lines survive a timed-out read and are completed by later reads.
pub struct SerialLineSource<R> {
    reader: R,
    pending: Vec<u8>,
    read_timeout: Duration,
}

impl SerialLineSource<Box<dyn SerialPort>> {
    /// Open and configure `port` for line reading
    pub fn open(port: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, ParseError> {
        let mut serial = open_port(port, baud_rate, read_timeout)?;
        configure_port(serial.as_mut())?;
        Ok(Self::new(serial, read_timeout))
    }
}

impl<R: Read + Send> SerialLineSource<R> {
    /// Wrap an already opened reader
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            read_timeout,
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(decode_latin1(&line[..end]).trim_end_matches('\r').to_string())
    }
}

impl<R: Read + Send> LineSource for SerialLineSource<R> {
    fn read_line(&mut self) -> Result<String, SensorError> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            if self.pending.len() > MAX_LINE_LEN {
                warn!("Dropping {} bytes of serial data without a line break", self.pending.len());
                self.pending.clear();
                return Err(SensorError::Fault("serial line too long".to_string()));
            }

            match self.reader.read(&mut buf) {
                Ok(0) => return Err(SensorError::Unavailable("serial stream closed".to_string())),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Err(SensorError::Timeout {
                        source_name: "serial".to_string(),
                        after_ms: self.read_timeout.as_millis() as u64,
                    })
                }
                Err(e) => return Err(SensorError::Io(e)),
            }
        }
    }
}

use serialport::SerialPort;
use std::io::{self, Read};

use crate::config::LoggerConfig;
use crate::port::PortOpenError;
use crate::source::{LineBuffer, LineSource};

/// The microcontroller's serial port.
///
/// Reads are bounded by the configured timeout. The port is closed when this is dropped.
pub struct SerialLineSource {
    port: Box<dyn SerialPort>,
    path: String,
    buffer: LineBuffer,
}

impl SerialLineSource {
    pub fn open(config: &LoggerConfig) -> Result<Self, PortOpenError> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| PortOpenError::new(config, e.to_string()))?;

        Ok(Self {
            port,
            path: config.port_path.clone(),
            buffer: LineBuffer::new(),
        })
    }
}

impl LineSource for SerialLineSource {
    fn bytes_available(&mut self) -> io::Result<usize> {
        if self.buffer.has_line() {
            return Ok(self.buffer.len());
        }
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.buffer.take_line() {
                return Ok(Some(line));
            }

            match self.port.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => self.buffer.extend(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}

impl Drop for SerialLineSource {
    fn drop(&mut self) {
        log::info!("Closing serial port {}", self.path);
    }
}

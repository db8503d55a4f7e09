//! Serial port transport (§6), via the `serialport` crate — the same
//! dependency the wider Rust GNSS corpus reaches for to talk to receivers
//! over RS232/USB-serial.

use std::io::Read as _;
use std::time::Duration;

use log::info;
use serialport::SerialPort;

use super::Reader;
use crate::error::TransportError;

pub struct SerialTransport {
    port_name: String,
    baudrate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>, baudrate: u32, timeout: Duration) -> Self {
        Self {
            port_name: port_name.into(),
            baudrate,
            timeout,
            port: None,
        }
    }

    pub fn connect(&mut self) -> Result<(), TransportError> {
        let port = serialport::new(&self.port_name, self.baudrate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(self.timeout)
            .open()
            .map_err(|e| TransportError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        info!("opened serial port {} at {} baud", self.port_name, self.baudrate);
        self.port = Some(port);
        Ok(())
    }
}

impl Reader for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn close(&mut self) {
        self.port = None;
    }
}

//! NTRIP client (§6): TCP connection, HTTP/1.0 GET with Basic auth,
//! "200 OK" response check. Ported from `ntrip_client.py`'s socket-based
//! client.

use std::io::{Read as _, Write as _};
use std::net::TcpStream;
use std::time::Duration;

use log::{info, warn};

use super::Reader;
use crate::error::TransportError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal base64 encoder for the `Authorization: Basic` header. No
/// example repo in this corpus depends on the `base64` crate, so this
/// stays a small hand-rolled helper rather than an added dependency.
fn base64_encode(input: &str) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let bytes = input.as_bytes();
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);

    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied();
        let b2 = chunk.get(2).copied();

        out.push(ALPHABET[(b0 >> 2) as usize] as char);
        out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1.unwrap_or(0) >> 4)) as usize] as char);
        out.push(match b1 {
            Some(b1) => ALPHABET[(((b1 & 0x0F) << 2) | (b2.unwrap_or(0) >> 6)) as usize] as char,
            None => '=',
        });
        out.push(match b2 {
            Some(b2) => ALPHABET[(b2 & 0x3F) as usize] as char,
            None => '=',
        });
    }

    out
}

pub struct NtripClient {
    host: String,
    port: u16,
    mountpoint: String,
    auth: String,
    stream: Option<TcpStream>,
}

impl NtripClient {
    pub fn new(host: impl Into<String>, port: u16, mountpoint: impl Into<String>, user: &str, password: &str) -> Self {
        Self {
            host: host.into(),
            port,
            mountpoint: mountpoint.into(),
            auth: base64_encode(&format!("{user}:{password}")),
            stream: None,
        }
    }

    pub fn connect(&mut self) -> Result<(), TransportError> {
        let addr = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect(&addr)?;
        stream.set_read_timeout(Some(READ_TIMEOUT)).ok();
        stream.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();

        let request = format!(
            "GET /{} HTTP/1.0\r\nUser-Agent: rtcmlib\r\nAuthorization: Basic {}\r\n\r\n",
            self.mountpoint, self.auth
        );

        let mut stream = stream;
        stream.write_all(request.as_bytes())?;

        let mut response = Vec::new();
        let mut chunk = [0u8; 1024];
        while !response.windows(1).any(|w| w == b"\n") {
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            response.extend_from_slice(&chunk[..n]);
            if response.len() > 8192 {
                break; // malformed/oversized header, give up rather than loop forever
            }
        }

        let text = String::from_utf8_lossy(&response);
        if !text.contains("200 OK") {
            warn!("NTRIP caster rejected mountpoint {}: {}", self.mountpoint, text.trim());
            return Err(TransportError::NtripRejected(text.trim().to_string()));
        }

        info!("connected to NTRIP mountpoint {}", self.mountpoint);
        self.stream = Some(stream);
        Ok(())
    }
}

impl Reader for NtripClient {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        Ok(stream.read(buf)?)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_matches_known_vector() {
        assert_eq!(base64_encode("user:pass"), "dXNlcjpwYXNz");
        assert_eq!(base64_encode(""), "");
        assert_eq!(base64_encode("a"), "YQ==");
        assert_eq!(base64_encode("ab"), "YWI=");
        assert_eq!(base64_encode("abc"), "YWJj");
    }
}

//! Typed error surfaces, one enum per crate boundary (§7 of the design).

use thiserror::Error;

/// Errors raised while reading bytes from a transport (NTRIP socket or serial port).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("socket/serial read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("NTRIP handshake rejected by caster: {0}")]
    NtripRejected(String),

    #[error("transport closed")]
    Closed,
}

/// Errors raised while framing a raw RTCM byte stream (§4.1).
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("payload length {0} exceeds the 10-bit RTCM field")]
    LengthOverflow(u16),

    #[error("CRC-24Q mismatch at frame start")]
    CrcMismatch,
}

/// Errors raised while decoding a framed RTCM message into typed ephemeris
/// or observation records (§4.6).
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("message type {0} not recognized")]
    UnknownType(u16),

    #[error("message type {0} is recognized but truncated: need {1} bits, have {2}")]
    Truncated(u16, usize, usize),

    #[error("required field missing for message type {0}: {1}")]
    MissingField(u16, &'static str),

    #[error("satellite system '{0}' excluded by target_systems configuration")]
    SystemExcluded(char),
}

/// Errors surfaced by the WLS-SPP solver (§4.8, §7).
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("fewer than {min_satellites} usable satellites (have {have})")]
    InsufficientSatellites { have: usize, min_satellites: usize },

    #[error("singular normal equations")]
    Degenerate,
}

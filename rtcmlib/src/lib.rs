//! Real-time GNSS RTCM ingest and single-point-positioning engine.
//!
//! Byte source -> [`framer`] -> [`decoder`] -> [`ephemeris`] cache /
//! [`merger`] -> [`solver`], wired together by [`pipeline`] over the
//! bounded [`ringbuffer`]. [`config`] carries the engine's tunables and
//! the shared approximate-position cell; [`error`] holds the typed error
//! enum for each crate boundary.

pub mod bitstream;
pub mod config;
pub mod decoder;
pub mod ephemeris;
pub mod error;
pub mod framer;
pub mod geometry;
pub mod logger;
pub mod merger;
pub mod pipeline;
pub mod ringbuffer;
pub mod solver;
pub mod time;
pub mod transport;
pub mod types;

pub use config::{ApproxPosition, Config, ConnectionSettings};
pub use decoder::{DecodedMessage, MessageDecoder};
pub use ephemeris::cache::{EphemerisCache, EphemerisStore};
pub use ephemeris::Ephemeris;
pub use framer::{RtcmFrame, RtcmFramer};
pub use logger::{ObservationCsvLogger, RawFrameLogger};
pub use merger::EpochMerger;
pub use pipeline::{Pipeline, PipelineEvent};
pub use ringbuffer::RingBuffer;
pub use solver::{PositioningSolution, PositioningStats, PositionTrack, SolutionStatus, WeightMode};
pub use types::{EpochObservation, SatKey, SatelliteState, SignalObservation};

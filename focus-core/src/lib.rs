//! FOCUS core library
//!
//! A Rust-native implementation of the FOCUS screen-to-camera OFDM
//! physical and link layer: spatial-frequency subchannel mapping, QPSK
//! modulation, Reed-Solomon framing and an in-process worker pool for
//! batch decoding.

pub mod config;
pub mod errors;
pub mod fft;
pub mod framer;
pub mod header;
pub mod link;
pub mod logging;
pub mod mapping;
pub mod modulation;
pub mod multiproc;
pub mod physical;
pub mod receiver;
pub mod rscode;
pub mod spectrum;
pub mod transmitter;
pub mod utils;

pub use config::{SessionConfig, Shape, WorkerPoolConfig};
pub use errors::{FocusError, Result};
pub use multiproc::{FrameDecoder, WorkerPool};
pub use receiver::{DecodeOutcome, Receiver};
pub use transmitter::Transmitter;

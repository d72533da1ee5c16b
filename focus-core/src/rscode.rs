//! Reed-Solomon forward error correction for subchannel fragments.
//!
//! The original ties FOCUS to an external `rscode` Python binding; this
//! port uses the `reed-solomon` crate directly, grounded in
//! `examples/HeZeBang-TrackMaker-rs/src/error_correction/reed_solomon.rs`.

use reed_solomon::{Decoder, Encoder};

/// A fixed-parity Reed-Solomon codec for one fragment size.
pub struct RsCodec {
    parity_len: usize,
    encoder: Encoder,
    decoder: Decoder,
}

impl RsCodec {
    pub fn new(parity_len: usize) -> Self {
        Self {
            parity_len,
            encoder: Encoder::new(parity_len),
            decoder: Decoder::new(parity_len),
        }
    }

    pub fn parity_len(&self) -> usize {
        self.parity_len
    }

    /// Appends `parity_len` parity bytes to `data`.
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let buffer = self.encoder.encode(data);
        let mut out = Vec::with_capacity(data.len() + self.parity_len);
        out.extend_from_slice(buffer.data());
        out.extend_from_slice(buffer.ecc());
        out
    }

    /// Attempts to correct `coded` (data followed by parity bytes) in
    /// place. Returns `None` if the fragment has more errors than the
    /// code can correct -- the caller represents this as a missing
    /// fragment rather than propagating an error, since a handful of
    /// uncorrectable fragments out of many is an expected, recoverable
    /// outcome (see spec.md S7 behavior under partial loss).
    pub fn decode(&self, coded: &[u8]) -> Option<Vec<u8>> {
        let mut buf = coded.to_vec();
        match self.decoder.correct(&mut buf, None) {
            Ok(corrected) => Some(corrected.data().to_vec()),
            Err(_) => None,
        }
    }
}

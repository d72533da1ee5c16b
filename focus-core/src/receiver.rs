//! Captured-frame to recovered-fragment orchestration: locate -> extract ->
//! strip cyclic prefix -> forward FFT -> crop -> unload -> demodulate ->
//! RS-decode -> unmask.
//!
//! Grounded in `focus.receiver.Receiver`.

use ndarray::{Array2, Array3};
use num_complex::Complex32;

use crate::config::{SessionConfig, Shape};
use crate::errors::Result;
use crate::framer::{Corners, Framer, Hints};
use crate::link::mask_fragment;
use crate::modulation::Qpsk;
use crate::physical;
use crate::rscode::RsCodec;
use crate::spectrum::{self, SubchannelIndex};

/// Reduces a captured frame to grayscale by keeping only the green channel,
/// which is the most reliable channel on typical Bayer sensors at the
/// target wavelength band (see spec.md 4.7). Red and blue are discarded
/// rather than averaged in.
pub fn green_channel(frame: &Array3<u8>) -> Array2<u8> {
    frame.index_axis(ndarray::Axis(2), 1).to_owned()
}

/// Outcome of decoding one captured frame.
///
/// A marker-location failure is represented as `NotFound`, not an `Err`:
/// per spec.md section 7, it is a recoverable per-frame outcome, not a
/// propagating error.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    /// The framer could not locate calibration markers in this frame.
    NotFound,
    /// Markers were located and the frame was carried all the way through
    /// demodulation and RS decoding. Per-channel fragments that failed RS
    /// correction are `None`.
    Decoded {
        fragments: Vec<Option<Vec<u8>>>,
        corners: Corners,
        symbols: Vec<Vec<Complex32>>,
        coded_fragments: Vec<Vec<u8>>,
    },
}

impl DecodeOutcome {
    pub fn fragments(&self) -> &[Option<Vec<u8>>] {
        match self {
            DecodeOutcome::NotFound => &[],
            DecodeOutcome::Decoded { fragments, .. } => fragments,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, DecodeOutcome::Decoded { .. })
    }
}

/// Recovers fragment payloads from captured frames of a FOCUS code.
pub struct Receiver<F> {
    config: SessionConfig,
    rs: RsCodec,
    qpsk: Qpsk,
    idxs: Vec<SubchannelIndex>,
    bbox: (usize, usize),
    framer: F,
    hints: Option<Hints>,
}

impl<F: Framer> Receiver<F> {
    pub fn new(config: SessionConfig, framer: F, use_hints: bool) -> Result<Self> {
        let idxs = spectrum::subchannel_indices(
            config.nsubchannels,
            config.nelements_per_subchannel,
            config.shape,
        )?;
        let bbox = spectrum::bbox(&idxs, config.shape);
        Ok(Self {
            rs: RsCodec::new(config.parity_len),
            qpsk: Qpsk::new(),
            idxs,
            bbox,
            config,
            framer,
            hints: use_hints.then(Vec::new),
        })
    }

    pub fn shape_with_cp(&self) -> Shape {
        self.config.shape_with_cp()
    }

    /// Decodes one captured, already-grayscale frame.
    ///
    /// State machine per spec.md 4.7: `Received -> Located -> Extracted ->
    /// Demodulated -> Decoded`. A locate failure short-circuits straight to
    /// `NotFound`; a demodulation failure (zero-magnitude symbol, partial
    /// byte) is fatal to the whole frame and surfaces as an `Err`; a
    /// per-channel RS failure never poisons the other channels.
    pub fn decode(&mut self, frame: &Array2<u8>) -> Result<DecodeOutcome> {
        let shape_with_cp = self.shape_with_cp();
        let corners = match self.framer.locate(frame, self.hints.as_mut()) {
            Ok(c) => c,
            Err(_) => return Ok(DecodeOutcome::NotFound),
        };

        let extracted = self
            .framer
            .extract(frame, shape_with_cp, corners, self.hints.as_mut());
        let code = physical::strip_cyclic_prefix(&extracted, self.config.cyclic_prefix);

        let spectrum = physical::rx(&code);
        let cropped = spectrum::crop(&spectrum, self.bbox.0, self.bbox.1);
        let symbols = spectrum::unload(&cropped, &self.idxs);

        let coded_fragments: Vec<Vec<u8>> = symbols
            .iter()
            .map(|channel_symbols| self.qpsk.demodulate(channel_symbols))
            .collect::<std::result::Result<_, _>>()?;

        let mut fragments = Vec::with_capacity(coded_fragments.len());
        for (channel_idx, coded) in coded_fragments.iter().enumerate() {
            let fragment = self.rs.decode(coded).map(|mut data| {
                mask_fragment(&mut data, channel_idx);
                data
            });
            fragments.push(fragment);
        }

        Ok(DecodeOutcome::Decoded {
            fragments,
            corners,
            symbols,
            coded_fragments,
        })
    }

    /// Decodes several frames in sequence, in input order.
    pub fn decode_many(&mut self, frames: &[Array2<u8>]) -> Result<Vec<DecodeOutcome>> {
        frames.iter().map(|f| self.decode(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::PassthroughFramer;
    use crate::transmitter::Transmitter;

    fn small_config() -> SessionConfig {
        SessionConfig {
            nsubchannels: 4,
            nelements_per_subchannel: 64,
            parity_len: 4,
            shape: (64, 64),
            border: 0.1,
            cyclic_prefix: 4,
        }
    }

    #[test]
    fn locate_failure_yields_not_found_without_an_error() {
        let config = small_config();
        let framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let mut recv = Receiver::new(config, framer, false).unwrap();
        let tiny_frame = Array2::<u8>::zeros((2, 2));
        let outcome = recv.decode(&tiny_frame).unwrap();
        assert!(matches!(outcome, DecodeOutcome::NotFound));
    }

    #[test]
    fn end_to_end_round_trip_recovers_every_fragment() {
        let config = small_config();
        let per_channel = config.data_bytes_per_subchannel();
        let nsub = config.nsubchannels;

        let tx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let tx = Transmitter::new(config.clone(), tx_framer).unwrap();

        let data: Vec<u8> = (0..(nsub * per_channel) as u32).map(|i| i as u8).collect();
        let frame = tx.encode(&data).unwrap();

        let rx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let mut recv = Receiver::new(config, rx_framer, true).unwrap();
        let outcome = recv.decode(&frame).unwrap();

        match outcome {
            DecodeOutcome::Decoded { fragments, .. } => {
                assert_eq!(fragments.len(), nsub);
                let mut recovered = Vec::new();
                for (i, frag) in fragments.into_iter().enumerate() {
                    let frag = frag.unwrap_or_else(|| panic!("channel {i} failed to decode"));
                    recovered.extend_from_slice(&frag[..per_channel]);
                }
                assert_eq!(recovered, data);
            }
            DecodeOutcome::NotFound => panic!("expected markers to be located"),
        }
    }

    #[test]
    fn hints_accumulate_across_frames_when_enabled() {
        let config = small_config();
        let framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let mut recv = Receiver::new(config.clone(), framer, true).unwrap();
        assert_eq!(recv.hints.as_ref().map(Vec::len), Some(0));

        let tx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
        let tx = Transmitter::new(config.clone(), tx_framer).unwrap();
        let per_channel = config.data_bytes_per_subchannel();
        let data = vec![0u8; config.nsubchannels * per_channel];
        let frame = tx.encode(&data).unwrap();

        recv.decode(&frame).unwrap();
        // PassthroughFramer never appends to hints; this only exercises
        // that `decode` accepts and threads the hints list without panicking.
        assert!(recv.hints.is_some());
    }
}

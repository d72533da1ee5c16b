//! Encodes a payload into a displayable screen-to-camera code frame.
//!
//! Grounded in `focus.transmitter.Transmitter`: mask -> Reed-Solomon
//! encode -> QPSK modulate -> pack spectrum -> inverse FFT -> cyclic
//! prefix -> markers.

use ndarray::Array2;

use crate::config::{SessionConfig, Shape};
use crate::errors::{ConfigError, FocusError};
use crate::framer::Framer;
use crate::link::mask_fragment;
use crate::modulation::Qpsk;
use crate::physical;
use crate::rscode::RsCodec;
use crate::spectrum::{self, SubchannelIndex};

pub struct Transmitter<F> {
    config: SessionConfig,
    rs: RsCodec,
    qpsk: Qpsk,
    idxs: Vec<SubchannelIndex>,
    framer: F,
}

impl<F: Framer> Transmitter<F> {
    pub fn new(config: SessionConfig, framer: F) -> Result<Self, FocusError> {
        let idxs = spectrum::subchannel_indices(
            config.nsubchannels,
            config.nelements_per_subchannel,
            config.shape,
        )?;
        let rs = RsCodec::new(config.parity_len);
        Ok(Self {
            qpsk: Qpsk::new(),
            idxs,
            rs,
            config,
            framer,
        })
    }

    pub fn shape_with_cp(&self) -> Shape {
        self.config.shape_with_cp()
    }

    /// Encodes `data` (exactly `nsubchannels * data_bytes_per_subchannel`
    /// bytes) into a frame ready for display.
    pub fn encode(&self, data: &[u8]) -> Result<Array2<u8>, FocusError> {
        let per_channel = self.config.data_bytes_per_subchannel();
        let expected = self.config.nsubchannels * per_channel;
        if data.len() != expected {
            return Err(FocusError::Config(ConfigError::PayloadSizeMismatch {
                expected,
                actual: data.len(),
                nsubchannels: self.config.nsubchannels,
                per_channel,
            }));
        }

        let mut coded_fragments: Vec<Vec<u8>> = Vec::with_capacity(self.config.nsubchannels);
        for (i, chunk) in data.chunks(per_channel).enumerate() {
            let mut fragment = chunk.to_vec();
            mask_fragment(&mut fragment, i);
            coded_fragments.push(self.rs.encode(&fragment));
        }

        let symbols: Vec<_> = coded_fragments
            .iter()
            .map(|frag| self.qpsk.modulate(frag, true))
            .collect();

        let spectrum = spectrum::construct(&symbols, self.config.shape, &self.idxs);
        let code = physical::tx(&spectrum, self.config.shape.1, true);
        let with_cp = physical::add_cyclic_prefix(&code, self.config.cyclic_prefix);
        Ok(self.framer.add_markers(&with_cp))
    }
}

//! Configuration types for the FOCUS screen-to-camera pipeline.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Height/width of a spectrum or frame buffer, in that order -- matching
/// `original_source/focus`'s `(height, width)` convention everywhere a
/// shape tuple is passed around.
pub type Shape = (usize, usize);

/// Parse a `"WxH"` resolution string into a `(height, width)` shape.
///
/// Mirrors `focus.util.parse_resolution`, which splits on `x` and reverses
/// the resulting tuple -- so `"768x512"` (width x height) becomes
/// `(512, 768)` (height, width).
pub fn parse_resolution(s: &str) -> Result<Shape, ConfigError> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(ConfigError::InvalidResolution { input: s.to_string() });
    }
    let w: usize = parts[0]
        .parse()
        .map_err(|_| ConfigError::InvalidResolution { input: s.to_string() })?;
    let h: usize = parts[1]
        .parse()
        .map_err(|_| ConfigError::InvalidResolution { input: s.to_string() })?;
    if w == 0 || h == 0 {
        return Err(ConfigError::InvalidResolution { input: s.to_string() });
    }
    Ok((h, w))
}

/// Shared session parameters for a `Transmitter`/`Receiver` pair.
///
/// Both sides of a link must agree on every field here; there is no
/// negotiation phase (see spec.md Non-goals).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub nsubchannels: usize,
    pub nelements_per_subchannel: usize,
    pub parity_len: usize,
    pub shape: Shape,
    pub border: f64,
    pub cyclic_prefix: usize,
}

impl SessionConfig {
    /// `shape` inflated by twice the cyclic prefix, the size actually
    /// handed to the framer.
    pub fn shape_with_cp(&self) -> Shape {
        (
            self.shape.0 + 2 * self.cyclic_prefix,
            self.shape.1 + 2 * self.cyclic_prefix,
        )
    }

    /// Number of data bytes (pre Reed-Solomon, pre QPSK) carried in a
    /// single subchannel's fragment.
    pub fn data_bytes_per_subchannel(&self) -> usize {
        self.nelements_per_subchannel / 4 - self.parity_len
    }
}

impl Default for SessionConfig {
    /// Matches `focus.transmitter.Transmitter`'s defaults:
    /// `nelements_per_subchannel=(64+16)*8/2`, `parity=16`,
    /// `shape=(512, 512)`, `border=0.15`, `cyclic_prefix=8`.
    fn default() -> Self {
        Self {
            nsubchannels: 16,
            nelements_per_subchannel: (64 + 16) * 8 / 2,
            parity_len: 16,
            shape: (512, 512),
            border: 0.15,
            cyclic_prefix: 8,
        }
    }
}

/// Tunables for the in-process `MultiProcReceiver`-equivalent dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    pub nworkers: usize,
    pub nframes_per_worker: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            nworkers: 4,
            nframes_per_worker: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolution_as_height_width() {
        assert_eq!(parse_resolution("768x512").unwrap(), (512, 768));
        assert_eq!(parse_resolution("512x512").unwrap(), (512, 512));
    }

    #[test]
    fn rejects_malformed_resolution() {
        assert!(parse_resolution("512").is_err());
        assert!(parse_resolution("0x512").is_err());
        assert!(parse_resolution("512xabc").is_err());
    }

    #[test]
    fn shape_with_cp_adds_twice_the_prefix() {
        let cfg = SessionConfig {
            cyclic_prefix: 8,
            shape: (512, 512),
            ..SessionConfig::default()
        };
        assert_eq!(cfg.shape_with_cp(), (528, 528));
    }
}

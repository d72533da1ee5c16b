//! Gray-coded QPSK modulation with byte-level lookup tables.
//!
//! Grounded in `focus.modulation.QPSK`: phases map to bit pairs as
//! `00 -> pi/4`, `01 -> 3pi/4`, `11 -> -3pi/4`, `10 -> -pi/4`, and a byte
//! is split into four 2-bit symbols, least-significant pair first by
//! default.

use std::f32::consts::PI;

use num_complex::Complex32;

use crate::errors::DemodError;

const BITS_TO_PHASE: [(u8, f32); 4] = [
    (0b00, PI / 4.0),
    (0b01, 3.0 * PI / 4.0),
    (0b11, -3.0 * PI / 4.0),
    (0b10, -PI / 4.0),
];

fn bits_to_symbol(bits: u8) -> Complex32 {
    let phase = BITS_TO_PHASE
        .iter()
        .find(|(b, _)| *b == bits)
        .map(|(_, p)| *p)
        .expect("bits is always a 2-bit value");
    Complex32::new(phase.cos(), phase.sin())
}

fn modulate_byte(byte: u8) -> [Complex32; 4] {
    [
        bits_to_symbol((byte >> 0) & 0b11),
        bits_to_symbol((byte >> 2) & 0b11),
        bits_to_symbol((byte >> 4) & 0b11),
        bits_to_symbol((byte >> 6) & 0b11),
    ]
}

/// A QPSK modulator/demodulator with precomputed 256-entry lookup tables.
///
/// `lss_lookup[byte]` modulates with the least-significant bit pair
/// first; `mss_lookup[byte]` is the same four symbols reversed (most
/// significant pair first). Only `lss_first = true` is exercised by the
/// transmit/receive paths; the other order is kept for parity with the
/// original API and pinned by a dedicated test.
pub struct Qpsk {
    lss_lookup: Vec<[Complex32; 4]>,
    mss_lookup: Vec<[Complex32; 4]>,
}

impl Qpsk {
    pub fn new() -> Self {
        let mut lss_lookup = Vec::with_capacity(256);
        let mut mss_lookup = Vec::with_capacity(256);
        for byte in 0..=255u8 {
            let mod_ = modulate_byte(byte);
            lss_lookup.push(mod_);
            let mut rev = mod_;
            rev.reverse();
            mss_lookup.push(rev);
        }
        Self {
            lss_lookup,
            mss_lookup,
        }
    }

    /// Modulates `bytes` into `4 * bytes.len()` QPSK symbols.
    pub fn modulate(&self, bytes: &[u8], lss_first: bool) -> Vec<Complex32> {
        let lookup = if lss_first {
            &self.lss_lookup
        } else {
            &self.mss_lookup
        };
        let mut symbols = Vec::with_capacity(4 * bytes.len());
        for &byte in bytes {
            symbols.extend_from_slice(&lookup[byte as usize]);
        }
        symbols
    }

    /// Demodulates a symbol stream back into bytes.
    ///
    /// A symbol with zero magnitude cannot be assigned a phase and is
    /// rejected rather than silently treated as a `0b00` bit pair: the
    /// caller (or its FEC layer) should decide how to handle an erased
    /// fragment, so surfacing the error here avoids masking it as valid
    /// data.
    pub fn demodulate(&self, symbols: &[Complex32]) -> Result<Vec<u8>, DemodError> {
        if symbols.len() % 4 != 0 {
            return Err(DemodError::IncompleteByte { len: symbols.len() });
        }

        let mut bits = Vec::with_capacity(symbols.len());
        for (i, sym) in symbols.iter().enumerate() {
            // A non-finite sample (NaN/Inf, e.g. from a divide-by-zero
            // upstream) is swapped for the 00 symbol so FEC sees it as an
            // ordinary bit error rather than propagating NaN through the
            // rest of the pipeline.
            let sym = if sym.re.is_finite() && sym.im.is_finite() {
                *sym
            } else {
                Complex32::new(1.0, 0.0)
            };
            if sym.norm() == 0.0 {
                return Err(DemodError::ZeroMagnitude { index: i });
            }
            let phase = sym.arg();
            let piq = PI / 4.0;
            let bit_pair = BITS_TO_PHASE
                .iter()
                .find(|(_, p)| *p - piq <= phase && phase < *p + piq)
                .map(|(b, _)| *b)
                .unwrap_or(0b00);
            bits.push(bit_pair);
        }

        Ok(bits
            .chunks(4)
            .map(|c| (c[3] << 6) | (c[2] << 4) | (c[1] << 2) | (c[0] << 0))
            .collect())
    }
}

impl Default for Qpsk {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulate_demodulate_round_trips() {
        let qpsk = Qpsk::new();
        let data: Vec<u8> = (0..=255u8).collect();
        let symbols = qpsk.modulate(&data, true);
        let demod = qpsk.demodulate(&symbols).unwrap();
        assert_eq!(demod, data);
    }

    #[test]
    fn mss_lookup_is_lss_reversed() {
        let qpsk = Qpsk::new();
        let data = vec![0b10110100u8];
        let lss = qpsk.modulate(&data, true);
        let mss = qpsk.modulate(&data, false);
        let mut reversed = lss.clone();
        reversed.reverse();
        assert_eq!(mss, reversed);
    }

    #[test]
    fn zero_magnitude_symbol_is_rejected() {
        let qpsk = Qpsk::new();
        let symbols = vec![Complex32::new(0.0, 0.0); 4];
        assert!(qpsk.demodulate(&symbols).is_err());
    }

    #[test]
    fn non_finite_symbol_is_treated_as_the_00_bit_pair() {
        let qpsk = Qpsk::new();
        let mut symbols = vec![Complex32::new(1.0, 0.0); 4];
        symbols[2] = Complex32::new(f32::NAN, f32::INFINITY);
        let decoded = qpsk.demodulate(&symbols).unwrap();
        assert_eq!(decoded, vec![0u8]);
    }

    #[test]
    fn non_multiple_of_four_is_rejected() {
        let qpsk = Qpsk::new();
        let symbols = vec![Complex32::new(1.0, 1.0); 3];
        assert!(qpsk.demodulate(&symbols).is_err());
    }

    #[test]
    fn gray_codes_are_adjacent_in_phase() {
        // 00 and 01 differ by one bit and are pi/2 apart in phase,
        // as are every other Gray-adjacent pair.
        let p00 = BITS_TO_PHASE[0].1;
        let p01 = BITS_TO_PHASE[1].1;
        assert!((p01 - p00 - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}

//! On-wire fragment header and payload fragmentation.
//!
//! Grounded in `focus.simpletxrx`: each fragment is prefixed with a
//! 4-byte big-endian header of `(nfragments: u16, payload_len: u16)`,
//! letting the receiver recover the original payload length and the
//! fragment count even if some fragments fail to decode.

pub const HEADER_LEN: usize = 4;
pub const DEFAULT_FRAGMENT_SIZE: usize = 64;

/// Packs `(nfragments, payload_len)` into a 4-byte big-endian header.
pub fn pack_header(nfragments: u16, payload_len: u16) -> [u8; HEADER_LEN] {
    let mut out = [0u8; HEADER_LEN];
    out[0..2].copy_from_slice(&nfragments.to_be_bytes());
    out[2..4].copy_from_slice(&payload_len.to_be_bytes());
    out
}

/// Reads a header from the first 4 bytes of `fragment`.
pub fn unpack_header(fragment: &[u8]) -> (u16, u16) {
    let nfragments = u16::from_be_bytes([fragment[0], fragment[1]]);
    let payload_len = u16::from_be_bytes([fragment[2], fragment[3]]);
    (nfragments, payload_len)
}

/// Minimum number of `fragment_size`-byte fragments needed to carry
/// `payload_len` bytes (always at least 1, even for an empty payload).
pub fn required_fragment_count(payload_len: usize, fragment_size: usize) -> usize {
    if payload_len == 0 {
        return 1;
    }
    (payload_len + fragment_size - 1) / fragment_size
}

/// Splits `payload` into `nfragments` fragments of `fragment_size` bytes
/// each, every fragment prefixed with `header`. An empty payload still
/// produces exactly one, all-header fragment.
pub fn fragment_payload(
    payload: &[u8],
    header: [u8; HEADER_LEN],
    nfragments: usize,
    fragment_size: usize,
) -> Vec<Vec<u8>> {
    let body_size = fragment_size - HEADER_LEN;
    if payload.is_empty() {
        let mut frag = vec![0u8; fragment_size];
        frag[..HEADER_LEN].copy_from_slice(&header);
        return vec![frag];
    }

    let mut fragments = Vec::with_capacity(nfragments);
    for chunk in payload.chunks(body_size) {
        let mut frag = Vec::with_capacity(fragment_size);
        frag.extend_from_slice(&header);
        frag.extend_from_slice(chunk);
        frag.resize(fragment_size, 0);
        fragments.push(frag);
    }
    fragments
}

/// Reassembles a payload from possibly-partial fragments. `None` entries
/// (fragments that failed FEC correction) are filled with `b'X'` and the
/// result is truncated to `payload_len`.
pub fn reassemble_payload(fragments: &[Option<Vec<u8>>], header_len: usize, payload_len: usize) -> Vec<u8> {
    if fragments.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for frag in fragments {
        match frag {
            Some(bytes) => out.extend_from_slice(&bytes[header_len..]),
            None => {
                // Mirrors the original's filler length, which (somewhat
                // inconsistently) uses the full fragment length rather
                // than the header-stripped body length: the result is
                // truncated to `payload_len` regardless, so an
                // over-long filler is harmless.
                let filler_len = fragments
                    .iter()
                    .filter_map(|f| f.as_ref().map(|b| b.len()))
                    .max()
                    .unwrap_or(DEFAULT_FRAGMENT_SIZE);
                out.extend(std::iter::repeat(b'X').take(filler_len));
            }
        }
    }
    out.truncate(payload_len);
    out
}

/// Returns the header value agreed on by every decoded fragment, or
/// `(0, 0)` if zero or more than one distinct header was observed
/// (the caller should treat either case as "decode failed").
pub fn extract_header(fragments: &[Option<Vec<u8>>]) -> (u16, u16) {
    let mut headers = std::collections::HashSet::new();
    for frag in fragments.iter().flatten() {
        headers.insert(unpack_header(frag));
    }
    if headers.len() == 1 {
        *headers.iter().next().unwrap()
    } else {
        (0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = pack_header(12, 700);
        assert_eq!(unpack_header(&header), (12, 700));
    }

    #[test]
    fn required_fragment_count_for_empty_payload_is_one() {
        assert_eq!(required_fragment_count(0, 60), 1);
    }

    #[test]
    fn required_fragment_count_rounds_up() {
        assert_eq!(required_fragment_count(121, 60), 3);
        assert_eq!(required_fragment_count(120, 60), 2);
        assert_eq!(required_fragment_count(1, 60), 1);
    }

    #[test]
    fn fragment_and_reassemble_round_trip() {
        let payload = b"the quick brown fox jumps over the lazy dog".to_vec();
        let nfrag = required_fragment_count(payload.len(), DEFAULT_FRAGMENT_SIZE - HEADER_LEN);
        let header = pack_header(nfrag as u16, payload.len() as u16);
        let fragments = fragment_payload(&payload, header, nfrag, DEFAULT_FRAGMENT_SIZE);
        assert_eq!(fragments.len(), nfrag);

        let opt_fragments: Vec<Option<Vec<u8>>> = fragments.into_iter().map(Some).collect();
        let (got_nfrag, got_len) = extract_header(&opt_fragments);
        assert_eq!(got_nfrag as usize, nfrag);
        assert_eq!(got_len as usize, payload.len());

        let recovered = reassemble_payload(&opt_fragments, HEADER_LEN, payload.len());
        assert_eq!(recovered, payload);
    }

    #[test]
    fn extract_header_fails_closed_on_disagreement() {
        let a = pack_header(3, 100).to_vec();
        let b = pack_header(4, 100).to_vec();
        let fragments = vec![Some(a), Some(b)];
        assert_eq!(extract_header(&fragments), (0, 0));
    }

    #[test]
    fn extract_header_fails_closed_on_no_fragments() {
        let fragments: Vec<Option<Vec<u8>>> = vec![None, None];
        assert_eq!(extract_header(&fragments), (0, 0));
    }

    #[test]
    fn reassemble_fills_missing_fragments_with_filler() {
        let good = {
            let mut f = pack_header(2, 8).to_vec();
            f.extend_from_slice(b"abcd");
            f
        };
        let fragments = vec![Some(good), None];
        let recovered = reassemble_payload(&fragments, HEADER_LEN, 8);
        assert_eq!(&recovered[0..4], b"abcd");
        assert_eq!(recovered.len(), 8);
    }
}

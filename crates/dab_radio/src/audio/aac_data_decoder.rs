use log::debug;

use crate::pad::pad_processor::{PadProcessor, PadUpdates};

/// Syntactic element id of the AAC data_stream_element.
const ID_DSE: u8 = 0b100;

/// Extracts the programme associated data from access units.
///
/// DAB+ carries PAD in a data_stream_element at the start of the raw AAC access unit:
/// a three bit element id, the instance tag, an optional escaped byte count and then
/// the PAD field itself.
pub struct AacDataDecoder {
    pad_processor: PadProcessor,
}

impl AacDataDecoder {
    pub fn new() -> Self {
        Self { pad_processor: PadProcessor::new() }
    }

    pub fn process_access_unit(&mut self, au: &[u8]) -> PadUpdates {
        let Some(pad) = extract_data_stream_element(au) else {
            return PadUpdates::default();
        };
        self.pad_processor.process_pad(pad)
    }
}

impl Default for AacDataDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_data_stream_element(au: &[u8]) -> Option<&[u8]> {
    if au.len() < 3 {
        return None;
    }
    if (au[0] >> 5) != ID_DSE {
        return None;
    }

    let mut count = usize::from(au[1]);
    let mut start = 2;
    if count == 255 {
        count += usize::from(au[2]);
        start = 3;
    }
    if start + count > au.len() {
        debug!("data_stream_element of {} bytes overflows the access unit", count);
        return None;
    }
    Some(&au[start..start + count])
}

/// Wraps a PAD field into a data_stream_element for the tests.
#[cfg(test)]
pub fn build_data_stream_element(pad: &[u8]) -> Vec<u8> {
    let mut au = Vec::new();
    au.push(ID_DSE << 5);
    if pad.len() < 255 {
        au.push(pad.len() as u8);
    } else {
        au.push(255);
        au.push((pad.len() - 255) as u8);
    }
    au.extend_from_slice(pad);
    au
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dse_payload_is_extracted() {
        let au = build_data_stream_element(b"pad bytes");
        assert_eq!(extract_data_stream_element(&au), Some(&b"pad bytes"[..]));
    }

    #[test]
    fn escaped_count_is_honoured() {
        let pad = vec![0x42u8; 300];
        let au = build_data_stream_element(&pad);
        assert_eq!(extract_data_stream_element(&au), Some(&pad[..]));
    }

    #[test]
    fn non_dse_access_units_have_no_pad() {
        assert!(extract_data_stream_element(&[0b0010_0000, 2, 0, 0]).is_none());
        assert!(extract_data_stream_element(&[]).is_none());
    }

    #[test]
    fn truncated_dse_is_rejected() {
        let mut au = build_data_stream_element(b"pad bytes");
        au.truncate(5);
        assert!(extract_data_stream_element(&au).is_none());
    }
}

use log::debug;

use crate::fec::crc16::validate_trailing_inverted_crc16;
use crate::pad::pad_data_group::PadDataGroup;

/// A completely assembled dynamic label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicLabel {
    pub label: Vec<u8>,
    pub charset: u8,
}

const NB_MAX_SEGMENTS: usize = 8;
const COMMAND_CLEAR_DISPLAY: u8 = 0b0001;

/// Assembles dynamic label segments carried in X-PAD application types 2 and 3.
///
/// Each segment travels as its own small data group whose length is derived from the
/// two byte prefix. Segments are collected by index until the one flagged last has
/// arrived together with all of its predecessors; a flipped toggle bit starts a new
/// label.
pub struct PadDynamicLabel {
    group: PadDataGroup,
    segments: [Option<Vec<u8>>; NB_MAX_SEGMENTS],
    total_segments: Option<usize>,
    toggle_flag: Option<bool>,
    charset: u8,
}

impl PadDynamicLabel {
    pub fn new() -> Self {
        Self {
            group: PadDataGroup::new(),
            segments: Default::default(),
            total_segments: None,
            toggle_flag: None,
            charset: 0,
        }
    }

    /// Consumes the bytes of one X-PAD subfield. `is_start` is true for application
    /// type 2. Returns a label when this subfield completed it.
    pub fn process_xpad(&mut self, is_start: bool, buf: &[u8]) -> Option<DynamicLabel> {
        if is_start {
            self.group.reset();
        }

        let mut remain = buf;
        while !remain.is_empty() && !self.group.is_complete() {
            // The first prefix byte fixes the group length.
            if self.group.required_bytes().is_none() {
                let taken = self.group.consume(&remain[..1]);
                remain = &remain[taken..];
                let prefix = self.group.data()[0];
                let is_command = (prefix & 0b0001_0000) != 0;
                let nb_group_bytes = if is_command {
                    2 + 2
                } else {
                    let nb_chars = usize::from(prefix & 0b0000_1111) + 1;
                    2 + nb_chars + 2
                };
                self.group.set_required_bytes(nb_group_bytes);
                continue;
            }
            let taken = self.group.consume(remain);
            remain = &remain[taken..];
        }

        if !self.group.is_complete() {
            return None;
        }
        let label = self.interpret_segment();
        self.group.reset();
        label
    }

    fn interpret_segment(&mut self) -> Option<DynamicLabel> {
        let data = self.group.data();
        if !validate_trailing_inverted_crc16(data) {
            debug!("dynamic label segment crc mismatch");
            return None;
        }

        let prefix = data[0];
        let field = data[1];
        let toggle = (prefix & 0b1000_0000) != 0;
        let is_first = (prefix & 0b0100_0000) != 0;
        let is_last = (prefix & 0b0010_0000) != 0;
        let is_command = (prefix & 0b0001_0000) != 0;

        if is_command {
            let command = prefix & 0b0000_1111;
            if command == COMMAND_CLEAR_DISPLAY {
                self.reset_assembly();
            } else {
                debug!("dynamic label command {} ignored", command);
            }
            return None;
        }

        let nb_chars = usize::from(prefix & 0b0000_1111) + 1;
        let chars = data[2..2 + nb_chars].to_vec();

        if self.toggle_flag != Some(toggle) {
            self.reset_assembly();
            self.toggle_flag = Some(toggle);
        }

        let segment_index = if is_first {
            self.charset = (field & 0b1111_0000) >> 4;
            0
        } else {
            usize::from((field & 0b0111_0000) >> 4)
        };
        if segment_index >= NB_MAX_SEGMENTS {
            return None;
        }

        if self.segments[segment_index].is_none() {
            self.segments[segment_index] = Some(chars);
        }
        if is_last {
            self.total_segments = Some(segment_index + 1);
        }

        let total = self.total_segments?;
        if !self.segments[..total].iter().all(Option::is_some) {
            return None;
        }

        let mut label = Vec::new();
        for segment in self.segments[..total].iter().flatten() {
            label.extend_from_slice(segment);
        }
        Some(DynamicLabel { label, charset: self.charset })
    }

    fn reset_assembly(&mut self) {
        self.segments = Default::default();
        self.total_segments = None;
    }
}

impl Default for PadDynamicLabel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::crc16::calculate_crc16;

    fn build_segment(toggle: bool, is_first: bool, is_last: bool, segment_index: usize, charset: u8, chars: &[u8]) -> Vec<u8> {
        assert!(!chars.is_empty() && chars.len() <= 16);
        let mut segment = Vec::new();
        let mut prefix = (chars.len() - 1) as u8;
        if toggle {
            prefix |= 0b1000_0000;
        }
        if is_first {
            prefix |= 0b0100_0000;
        }
        if is_last {
            prefix |= 0b0010_0000;
        }
        segment.push(prefix);
        if is_first {
            segment.push(charset << 4);
        } else {
            segment.push((segment_index as u8) << 4);
        }
        segment.extend_from_slice(chars);
        let crc = calculate_crc16(&segment) ^ 0xFFFF;
        segment.extend_from_slice(&crc.to_be_bytes());
        segment
    }

    #[test]
    fn single_segment_label() {
        let mut assembler = PadDynamicLabel::new();
        let segment = build_segment(false, true, true, 0, 15, b"Morning news");
        let label = assembler.process_xpad(true, &segment).unwrap();
        assert_eq!(label.label, b"Morning news");
        assert_eq!(label.charset, 15);
    }

    #[test]
    fn multi_segment_label_across_subfields() {
        let mut assembler = PadDynamicLabel::new();
        let first = build_segment(false, true, false, 0, 15, b"Now playing: ");
        let second = build_segment(false, false, true, 1, 15, b"Blue Train");

        // The first segment arrives split over a start and a continuation subfield.
        assert!(assembler.process_xpad(true, &first[..5]).is_none());
        assert!(assembler.process_xpad(false, &first[5..]).is_none());

        let label = assembler.process_xpad(true, &second).unwrap();
        assert_eq!(label.label, b"Now playing: Blue Train");
    }

    #[test]
    fn toggle_change_restarts_assembly() {
        let mut assembler = PadDynamicLabel::new();
        let stale = build_segment(false, true, false, 0, 15, b"stale ");
        assert!(assembler.process_xpad(true, &stale).is_none());

        let fresh_first = build_segment(true, true, false, 0, 15, b"fresh ");
        let fresh_last = build_segment(true, false, true, 1, 15, b"label");
        assert!(assembler.process_xpad(true, &fresh_first).is_none());
        let label = assembler.process_xpad(true, &fresh_last).unwrap();
        assert_eq!(label.label, b"fresh label");
    }

    #[test]
    fn corrupted_segment_is_dropped() {
        let mut assembler = PadDynamicLabel::new();
        let mut segment = build_segment(false, true, true, 0, 15, b"ok");
        segment[2] ^= 0x01;
        assert!(assembler.process_xpad(true, &segment).is_none());
    }
}

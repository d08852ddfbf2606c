use log::debug;

use crate::mot::mot_entities::MotEntity;
use crate::mot::mot_processor::MotProcessor;
use crate::mot::msc_data_group::parse_msc_data_group;
use crate::pad::pad_data_group::PadDataGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitLength,
    WaitStart,
    ReadData,
}

/// Reassembles MOT MSC data groups from X-PAD application types 12 and 13.
///
/// The group length arrives separately through the data group length indicator, so the
/// machine waits for a length, then for a subfield flagged as a start, then reads
/// contiguous bytes until the group is full. A completed group is decoded as an MSC
/// data group and fed to the MOT segment assembly.
pub struct PadMotProcessor {
    state: State,
    group: PadDataGroup,
    last_group_length: Option<usize>,
    mot_processor: MotProcessor,
}

impl PadMotProcessor {
    pub fn new() -> Self {
        Self {
            state: State::WaitLength,
            group: PadDataGroup::new(),
            last_group_length: None,
            mot_processor: MotProcessor::new(),
        }
    }

    /// Applies a data group length indicator. The length covers the next MSC data
    /// group including its CRC.
    pub fn set_group_length(&mut self, nb_bytes: u16) {
        self.group.reset();
        self.group.set_required_bytes(usize::from(nb_bytes));
        self.last_group_length = Some(usize::from(nb_bytes));
        self.state = State::WaitStart;
    }

    /// Consumes the bytes of one MOT X-PAD subfield. `is_start` is true for
    /// application type 12.
    pub fn process_xpad(&mut self, is_start: bool, buf: &[u8]) -> Option<MotEntity> {
        match self.state {
            State::WaitLength => {
                debug!("mot xpad bytes before any group length, dropped");
                None
            }
            State::WaitStart => {
                if !is_start {
                    return None;
                }
                self.state = State::ReadData;
                self.consume(buf)
            }
            State::ReadData => {
                if is_start {
                    // A new group start while reading discards the partial group.
                    let Some(length) = self.last_group_length else {
                        self.state = State::WaitLength;
                        return None;
                    };
                    self.group.reset();
                    self.group.set_required_bytes(length);
                }
                self.consume(buf)
            }
        }
    }

    fn consume(&mut self, buf: &[u8]) -> Option<MotEntity> {
        self.group.consume(buf);
        if !self.group.is_complete() {
            return None;
        }

        let entity = match parse_msc_data_group(self.group.data()) {
            Some((header, data_field)) => self.mot_processor.process_data_group(&header, data_field),
            None => {
                debug!("mot data group failed validation");
                None
            }
        };

        self.group.reset();
        self.state = State::WaitLength;
        entity
    }
}

impl Default for PadMotProcessor {
    fn default() -> Self {
        Self::new()
    }
}

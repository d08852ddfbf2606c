use log::debug;

use crate::fec::crc16::validate_trailing_inverted_crc16;
use crate::mot::mot_entities::MotEntity;
use crate::pad::pad_dynamic_label::{DynamicLabel, PadDynamicLabel};
use crate::pad::pad_mot_processor::PadMotProcessor;

/// X-PAD application types handled by this receiver.
const APP_TYPE_DATA_GROUP_LENGTH: u8 = 1;
const APP_TYPE_DYNAMIC_LABEL_START: u8 = 2;
const APP_TYPE_DYNAMIC_LABEL_CONTINUATION: u8 = 3;
const APP_TYPE_MOT_START: u8 = 12;
const APP_TYPE_MOT_CONTINUATION: u8 = 13;

/// Subfield sizes selected by the contents indicator length code.
const XPAD_LENGTH_CODES: [usize; 8] = [4, 6, 8, 12, 16, 24, 32, 48];

/// Everything a single access unit's PAD produced.
#[derive(Debug, Default)]
pub struct PadUpdates {
    pub dynamic_label: Option<DynamicLabel>,
    pub mot_entities: Vec<MotEntity>,
}

#[derive(Debug, Clone, Copy)]
struct XpadSubfield {
    app_type: u8,
    nb_bytes: usize,
}

/// Decodes the programme associated data carried at the end of each access unit.
///
/// The two F-PAD bytes close the field; the X-PAD bytes before them are transmitted in
/// reverse order. When the contents indicator flag is clear the subfield layout of the
/// previous X-PAD applies again.
pub struct PadProcessor {
    dynamic_label: PadDynamicLabel,
    mot: PadMotProcessor,
    previous_subfields: Vec<XpadSubfield>,
    previous_short_app_type: Option<u8>,
}

impl PadProcessor {
    pub fn new() -> Self {
        Self {
            dynamic_label: PadDynamicLabel::new(),
            mot: PadMotProcessor::new(),
            previous_subfields: Vec::new(),
            previous_short_app_type: None,
        }
    }

    pub fn process_pad(&mut self, pad: &[u8]) -> PadUpdates {
        let mut updates = PadUpdates::default();
        if pad.len() < 2 {
            return updates;
        }

        let (xpad_reversed, fpad) = pad.split_at(pad.len() - 2);
        let fpad_type = (fpad[0] & 0b1100_0000) >> 6;
        let xpad_indicator = (fpad[0] & 0b0011_0000) >> 4;
        let ci_flag = (fpad[1] & 0b0000_0010) != 0;

        if fpad_type != 0b00 {
            debug!("fpad type {} not supported", fpad_type);
            return updates;
        }

        let xpad: Vec<u8> = xpad_reversed.iter().rev().copied().collect();
        match xpad_indicator {
            0b00 => {}
            0b01 => self.process_short_xpad(&xpad, ci_flag, &mut updates),
            0b10 => self.process_variable_xpad(&xpad, ci_flag, &mut updates),
            other => debug!("xpad indicator {} not supported", other),
        }
        updates
    }

    fn process_short_xpad(&mut self, xpad: &[u8], ci_flag: bool, updates: &mut PadUpdates) {
        if xpad.len() < 4 {
            return;
        }
        if ci_flag {
            let app_type = xpad[0] & 0b0001_1111;
            if app_type == 0 {
                return;
            }
            self.previous_short_app_type = Some(app_type);
            self.dispatch_subfield(app_type, &xpad[1..4], updates);
        } else if let Some(app_type) = self.previous_short_app_type {
            // Continuation subfields carry data of the previously signalled type.
            let app_type = continuation_of(app_type);
            self.dispatch_subfield(app_type, &xpad[..4], updates);
        }
    }

    fn process_variable_xpad(&mut self, xpad: &[u8], ci_flag: bool, updates: &mut PadUpdates) {
        let mut curr_byte = 0;
        let subfields = if ci_flag {
            let mut subfields = Vec::new();
            // Up to four contents indicators, terminated by the end marker type 0.
            for _ in 0..4 {
                if curr_byte >= xpad.len() {
                    break;
                }
                let indicator = xpad[curr_byte];
                curr_byte += 1;
                let app_type = indicator & 0b0001_1111;
                if app_type == 0 {
                    break;
                }
                let nb_bytes = XPAD_LENGTH_CODES[usize::from(indicator >> 5)];
                subfields.push(XpadSubfield { app_type, nb_bytes });
            }
            self.previous_subfields = subfields.clone();
            subfields
        } else {
            // Without contents indicators the previous layout repeats, with every
            // start type degraded to its continuation type.
            self.previous_subfields
                .iter()
                .map(|subfield| XpadSubfield {
                    app_type: continuation_of(subfield.app_type),
                    nb_bytes: subfield.nb_bytes,
                })
                .collect()
        };

        for subfield in subfields {
            if curr_byte >= xpad.len() {
                break;
            }
            let nb_take = subfield.nb_bytes.min(xpad.len() - curr_byte);
            let data = &xpad[curr_byte..curr_byte + nb_take];
            curr_byte += nb_take;
            self.dispatch_subfield(subfield.app_type, data, updates);
        }
    }

    fn dispatch_subfield(&mut self, app_type: u8, data: &[u8], updates: &mut PadUpdates) {
        match app_type {
            APP_TYPE_DATA_GROUP_LENGTH => {
                if data.len() >= 4 && validate_trailing_inverted_crc16(&data[..4]) {
                    let length = u16::from_be_bytes([data[0], data[1]]) & 0x3FFF;
                    self.mot.set_group_length(length);
                } else {
                    debug!("data group length indicator failed validation");
                }
            }
            APP_TYPE_DYNAMIC_LABEL_START | APP_TYPE_DYNAMIC_LABEL_CONTINUATION => {
                let is_start = app_type == APP_TYPE_DYNAMIC_LABEL_START;
                if let Some(label) = self.dynamic_label.process_xpad(is_start, data) {
                    updates.dynamic_label = Some(label);
                }
            }
            APP_TYPE_MOT_START | APP_TYPE_MOT_CONTINUATION => {
                let is_start = app_type == APP_TYPE_MOT_START;
                if let Some(entity) = self.mot.process_xpad(is_start, data) {
                    updates.mot_entities.push(entity);
                }
            }
            other => {
                debug!("xpad application type {} ignored", other);
            }
        }
    }
}

fn continuation_of(app_type: u8) -> u8 {
    match app_type {
        APP_TYPE_DYNAMIC_LABEL_START => APP_TYPE_DYNAMIC_LABEL_CONTINUATION,
        APP_TYPE_MOT_START => APP_TYPE_MOT_CONTINUATION,
        other => other,
    }
}

impl Default for PadProcessor {
    fn default() -> Self {
        Self::new()
    }
}

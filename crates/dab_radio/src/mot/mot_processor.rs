use std::collections::HashMap;

use log::debug;

use crate::mot::mot_assembler::MotAssembler;
use crate::mot::mot_entities::{parse_mot_header, MotEntity};
use crate::mot::msc_data_group::{
    MscDataGroupHeader, DATA_GROUP_TYPE_MOT_BODY, DATA_GROUP_TYPE_MOT_HEADER,
};

/// Assembles MOT entities from MSC data groups.
///
/// Header and body segments are collected per transport id. When both sides are
/// complete the header entity is parsed and the finished object is handed back; the
/// assemblers for that transport id are dropped so a repeated broadcast starts clean.
pub struct MotProcessor {
    header_assemblers: HashMap<u16, MotAssembler>,
    body_assemblers: HashMap<u16, MotAssembler>,
}

impl MotProcessor {
    pub fn new() -> Self {
        Self {
            header_assemblers: HashMap::new(),
            body_assemblers: HashMap::new(),
        }
    }

    /// Feeds one MSC data group. Returns a finished entity when this group completed
    /// the object.
    pub fn process_data_group(
        &mut self,
        header: &MscDataGroupHeader,
        data_field: &[u8],
    ) -> Option<MotEntity> {
        let Some(transport_id) = header.transport_id else {
            debug!("mot data group without transport id");
            return None;
        };
        let Some(segment_number) = header.segment_number else {
            debug!("mot data group without segment number");
            return None;
        };

        // Each segment carries its own 2 byte segmentation header.
        if data_field.len() < 2 {
            return None;
        }
        let segment_size = (usize::from(data_field[0] & 0b0001_1111) << 8) | usize::from(data_field[1]);
        let segment_buf = &data_field[2..];
        if segment_buf.len() < segment_size {
            debug!("mot segment shorter than declared ({}/{})", segment_buf.len(), segment_size);
            return None;
        }
        let segment_buf = &segment_buf[..segment_size];

        let assembler = match header.data_group_type {
            DATA_GROUP_TYPE_MOT_HEADER => self.header_assemblers.entry(transport_id).or_default(),
            DATA_GROUP_TYPE_MOT_BODY => self.body_assemblers.entry(transport_id).or_default(),
            other => {
                debug!("unhandled msc data group type {}", other);
                return None;
            }
        };

        assembler.add_segment(usize::from(segment_number), segment_buf);
        if header.is_last_segment {
            assembler.set_total_segments(usize::from(segment_number) + 1);
        }

        self.try_complete(transport_id)
    }

    fn try_complete(&mut self, transport_id: u16) -> Option<MotEntity> {
        let header_complete = self
            .header_assemblers
            .get(&transport_id)
            .map(MotAssembler::check_complete)
            .unwrap_or(false);
        let body_complete = self
            .body_assemblers
            .get(&transport_id)
            .map(MotAssembler::check_complete)
            .unwrap_or(false);
        if !header_complete || !body_complete {
            return None;
        }

        let mut header_assembler = self.header_assemblers.remove(&transport_id)?;
        let mut body_assembler = self.body_assemblers.remove(&transport_id)?;

        let header = parse_mot_header(header_assembler.get_data())?;
        let body = body_assembler.get_data().to_vec();
        debug!(
            "mot entity transport_id={} content_type={} body={} bytes",
            transport_id, header.content_type, body.len()
        );
        Some(MotEntity { transport_id, header, body })
    }
}

impl Default for MotProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mot::mot_entities::build_mot_header;
    use crate::mot::msc_data_group::{build_msc_data_group, parse_msc_data_group};

    fn segment_field(payload: &[u8]) -> Vec<u8> {
        let mut field = Vec::new();
        field.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        field.extend_from_slice(payload);
        field
    }

    fn feed(
        processor: &mut MotProcessor,
        group_type: u8,
        segment_number: u16,
        is_last: bool,
        transport_id: u16,
        payload: &[u8],
    ) -> Option<MotEntity> {
        let group = build_msc_data_group(
            group_type,
            0,
            segment_number,
            is_last,
            transport_id,
            &segment_field(payload),
        );
        let (header, data) = parse_msc_data_group(&group).unwrap();
        processor.process_data_group(&header, data)
    }

    #[test]
    fn header_and_body_segments_form_an_entity() {
        let mut processor = MotProcessor::new();
        let header_bytes = build_mot_header(6, 2, 1, Some("img.jpg"));

        assert!(feed(&mut processor, DATA_GROUP_TYPE_MOT_HEADER, 0, true, 42, &header_bytes).is_none());
        assert!(feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 1, false, 42, b"bb").is_none());
        assert!(feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 2, true, 42, b"cc").is_none());
        let entity = feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 0, false, 42, b"aa")
            .expect("final segment completes the entity");

        assert_eq!(entity.transport_id, 42);
        assert_eq!(entity.body, b"aabbcc");
        assert_eq!(entity.header.content_name.as_deref(), Some("img.jpg"));
        assert_eq!(entity.header.content_type, 2);
    }

    #[test]
    fn duplicate_body_segment_is_a_no_op() {
        let mut processor = MotProcessor::new();
        let header_bytes = build_mot_header(4, 2, 1, None);

        feed(&mut processor, DATA_GROUP_TYPE_MOT_HEADER, 0, true, 9, &header_bytes);
        feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 0, false, 9, b"aa");
        feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 0, false, 9, b"xx");
        let entity = feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 1, true, 9, b"bb").unwrap();
        assert_eq!(entity.body, b"aabb");
    }

    #[test]
    fn different_transport_ids_do_not_mix() {
        let mut processor = MotProcessor::new();
        let header_bytes = build_mot_header(2, 2, 1, None);

        feed(&mut processor, DATA_GROUP_TYPE_MOT_HEADER, 0, true, 1, &header_bytes);
        feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 0, true, 2, b"zz");
        assert!(feed(&mut processor, DATA_GROUP_TYPE_MOT_BODY, 0, true, 1, b"aa").is_some());
    }
}

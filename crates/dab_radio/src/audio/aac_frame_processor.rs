use log::{debug, error};
use reed_solomon::Decoder as ReedSolomonDecoder;

use crate::fec::crc16::calculate_crc16;
use crate::fec::firecode::FirecodeChecker;

/// Number of logical frames collected into one audio super frame.
pub const NB_FRAMES_PER_SUPER_FRAME: usize = 5;

const NB_RS_CODEWORD_BYTES: usize = 120;
const NB_RS_DATA_BYTES: usize = 110;
const NB_RS_PARITY_BYTES: usize = 10;

/// Decoded audio parameters of a super frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperFrameHeader {
    pub sampling_rate: u32,
    pub is_sbr: bool,
    pub is_ps: bool,
    pub is_stereo: bool,
    pub mpeg_surround_config: u8,
}

/// Events produced while a super frame is taken apart. Handlers must not call back
/// into the processor.
pub trait AacFrameEventHandler {
    fn on_super_frame_header(&mut self, header: SuperFrameHeader);
    fn on_access_unit(&mut self, au_index: usize, nb_aus: usize, buf: &[u8]);
    fn on_firecode_error(&mut self, crc_rx: u16, crc_calculated: u16);
    fn on_rs_error(&mut self, column_index: usize, nb_columns: usize);
    fn on_access_unit_crc_error(&mut self, au_index: usize, nb_aus: usize, crc_rx: u16, crc_calculated: u16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitingFrameStart,
    CollectingFrames,
}

/// Reassembles DAB+ audio super frames out of MSC logical frames.
///
/// A passing firecode marks the first logical frame of a super frame. Five frames are
/// collected, the body is corrected column by column with the shortened Reed-Solomon
/// code, and the access units are carved out of the corrected bytes and checked
/// individually.
pub struct AacFrameProcessor {
    state: State,
    firecode: FirecodeChecker,
    rs_decoder: ReedSolomonDecoder,
    super_frame_buffer: Vec<u8>,
    nb_frame_bytes: usize,
    curr_frame: usize,
    total_desync_frames: usize,
}

impl AacFrameProcessor {
    pub fn new() -> Self {
        Self {
            state: State::WaitingFrameStart,
            firecode: FirecodeChecker::new(),
            rs_decoder: ReedSolomonDecoder::new(NB_RS_PARITY_BYTES),
            super_frame_buffer: Vec::new(),
            nb_frame_bytes: 0,
            curr_frame: 0,
            total_desync_frames: 0,
        }
    }

    /// Consumes one decoded MSC logical frame.
    pub fn process<H: AacFrameEventHandler>(&mut self, frame: &[u8], handler: &mut H) {
        if frame.len() != self.nb_frame_bytes {
            self.nb_frame_bytes = frame.len();
            self.super_frame_buffer = vec![0u8; frame.len() * NB_FRAMES_PER_SUPER_FRAME];
            self.state = State::WaitingFrameStart;
            self.curr_frame = 0;
        }
        if frame.len() < 11 {
            error!("logical frame of {} bytes cannot hold a super frame header", frame.len());
            return;
        }

        match self.state {
            State::WaitingFrameStart => {
                let crc_rx = u16::from_be_bytes([frame[0], frame[1]]);
                let crc_calculated = self.firecode.calculate(&frame[2..11]);
                if crc_rx != crc_calculated {
                    self.total_desync_frames += 1;
                    handler.on_firecode_error(crc_rx, crc_calculated);
                    return;
                }
                self.super_frame_buffer[..frame.len()].copy_from_slice(frame);
                self.curr_frame = 1;
                self.state = State::CollectingFrames;
            }
            State::CollectingFrames => {
                let offset = self.curr_frame * self.nb_frame_bytes;
                self.super_frame_buffer[offset..offset + frame.len()].copy_from_slice(frame);
                self.curr_frame += 1;
                if self.curr_frame == NB_FRAMES_PER_SUPER_FRAME {
                    self.process_super_frame(handler);
                    self.state = State::WaitingFrameStart;
                    self.curr_frame = 0;
                }
            }
        }
    }

    /// Number of logical frames skipped while hunting for a valid super frame start.
    pub fn total_desync_frames(&self) -> usize {
        self.total_desync_frames
    }

    fn process_super_frame<H: AacFrameEventHandler>(&mut self, handler: &mut H) {
        let nb_super_frame_bytes = self.super_frame_buffer.len();
        if nb_super_frame_bytes % NB_RS_CODEWORD_BYTES != 0 {
            error!(
                "super frame of {} bytes is not a whole number of RS codewords",
                nb_super_frame_bytes
            );
            return;
        }
        let nb_columns = nb_super_frame_bytes / NB_RS_CODEWORD_BYTES;

        // The super frame is a matrix with 120 rows; each column is one shortened
        // RS(120,110) codeword protecting the 110 data rows above the parity rows.
        let mut codeword = [0u8; NB_RS_CODEWORD_BYTES];
        for column in 0..nb_columns {
            for row in 0..NB_RS_CODEWORD_BYTES {
                codeword[row] = self.super_frame_buffer[row * nb_columns + column];
            }
            match self.rs_decoder.correct(&codeword, None) {
                Ok(corrected) => {
                    for (row, &byte) in corrected.data().iter().enumerate() {
                        self.super_frame_buffer[row * nb_columns + column] = byte;
                    }
                }
                Err(_) => {
                    // Keep the uncorrected bytes and let the per AU checks decide.
                    handler.on_rs_error(column, nb_columns);
                }
            }
        }

        let nb_data_bytes = NB_RS_DATA_BYTES * nb_columns;
        let data = &self.super_frame_buffer[..nb_data_bytes];

        let descriptor = data[2];
        let dac_rate = (descriptor & 0b0100_0000) != 0;
        let sbr_flag = (descriptor & 0b0010_0000) != 0;
        let aac_channel_mode = (descriptor & 0b0001_0000) != 0;
        let ps_flag = (descriptor & 0b0000_1000) != 0;
        let mpeg_surround_config = descriptor & 0b0000_0111;

        let (nb_aus, au_start_0) = match (dac_rate, sbr_flag) {
            (false, false) => (4, 8),
            (false, true) => (2, 5),
            (true, false) => (6, 11),
            (true, true) => (3, 6),
        };
        let sampling_rate = match (dac_rate, sbr_flag) {
            (false, false) => 32000,
            (false, true) => 16000,
            (true, false) => 48000,
            (true, true) => 24000,
        };

        handler.on_super_frame_header(SuperFrameHeader {
            sampling_rate,
            is_sbr: sbr_flag,
            is_ps: ps_flag,
            is_stereo: aac_channel_mode,
            mpeg_surround_config,
        });

        // The directory packs a 12 bit start address for every access unit but the
        // first, immediately after the descriptor byte.
        let mut au_start = [0usize; 6];
        au_start[0] = au_start_0;
        let mut bit_reader = BitReader::new(&data[3..]);
        for start in au_start.iter_mut().take(nb_aus).skip(1) {
            let Some(value) = bit_reader.read_bits(12) else {
                error!("access unit directory overflows the super frame");
                return;
            };
            *start = value as usize;
        }

        for au_index in 0..nb_aus {
            let start = au_start[au_index];
            let end = if au_index + 1 < nb_aus { au_start[au_index + 1] } else { nb_data_bytes };
            if start + 2 > end || end > nb_data_bytes {
                error!("access unit {} has invalid bounds {}..{}", au_index, start, end);
                return;
            }

            let au = &data[start..end];
            let (payload, crc) = au.split_at(au.len() - 2);
            let crc_rx = u16::from_be_bytes([crc[0], crc[1]]) ^ 0xFFFF;
            let crc_calculated = calculate_crc16(payload);
            if crc_rx != crc_calculated {
                debug!("access unit {}/{} crc mismatch", au_index, nb_aus);
                handler.on_access_unit_crc_error(au_index, nb_aus, crc_rx, crc_calculated);
                continue;
            }
            handler.on_access_unit(au_index, nb_aus, payload);
        }
    }
}

impl Default for AacFrameProcessor {
    fn default() -> Self {
        Self::new()
    }
}

struct BitReader<'a> {
    buf: &'a [u8],
    bit_index: usize,
}

impl<'a> BitReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_index: 0 }
    }

    fn read_bits(&mut self, nb_bits: usize) -> Option<u32> {
        if self.bit_index + nb_bits > self.buf.len() * 8 {
            return None;
        }
        let mut value = 0u32;
        for _ in 0..nb_bits {
            let byte = self.buf[self.bit_index / 8];
            let bit = (byte >> (7 - self.bit_index % 8)) & 0b1;
            value = (value << 1) | u32::from(bit);
            self.bit_index += 1;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reed_solomon::Encoder as ReedSolomonEncoder;

    #[derive(Default)]
    struct RecordingHandler {
        headers: Vec<SuperFrameHeader>,
        access_units: Vec<(usize, usize, Vec<u8>)>,
        firecode_errors: usize,
        rs_errors: usize,
        au_crc_errors: usize,
    }

    impl AacFrameEventHandler for RecordingHandler {
        fn on_super_frame_header(&mut self, header: SuperFrameHeader) {
            self.headers.push(header);
        }
        fn on_access_unit(&mut self, au_index: usize, nb_aus: usize, buf: &[u8]) {
            self.access_units.push((au_index, nb_aus, buf.to_vec()));
        }
        fn on_firecode_error(&mut self, _crc_rx: u16, _crc_calculated: u16) {
            self.firecode_errors += 1;
        }
        fn on_rs_error(&mut self, _column_index: usize, _nb_columns: usize) {
            self.rs_errors += 1;
        }
        fn on_access_unit_crc_error(&mut self, _au_index: usize, _nb_aus: usize, _crc_rx: u16, _crc_calculated: u16) {
            self.au_crc_errors += 1;
        }
    }

    /// Builds a 240 byte super frame (16 kbps, 2 columns) carrying two access units
    /// with valid CRCs, then applies the column wise RS parity.
    fn build_super_frame(au_payloads: [&[u8]; 2]) -> Vec<u8> {
        let nb_columns = 2;
        let nb_data_bytes = NB_RS_DATA_BYTES * nb_columns;
        let mut data = vec![0u8; nb_data_bytes];

        // dac_rate=0, sbr=1, mono with parametric stereo: 2 AUs starting at byte 5.
        data[2] = 0b0010_1000;

        let au_start_0 = 5usize;
        let au_len_0 = au_payloads[0].len() + 2;
        let au_start_1 = au_start_0 + au_len_0;

        // One 12 bit directory entry for the second AU, then 4 alignment bits.
        data[3] = (au_start_1 >> 4) as u8;
        data[4] = ((au_start_1 & 0x0F) << 4) as u8;

        let mut write_au = |start: usize, payload: &[u8]| {
            data[start..start + payload.len()].copy_from_slice(payload);
            let crc = calculate_crc16(payload) ^ 0xFFFF;
            data[start + payload.len()..start + payload.len() + 2].copy_from_slice(&crc.to_be_bytes());
        };
        write_au(au_start_0, au_payloads[0]);
        write_au(au_start_1, au_payloads[1]);
        assert!(au_start_1 + au_payloads[1].len() + 2 <= nb_data_bytes);

        // Firecode over header bytes 2..11.
        let firecode = FirecodeChecker::new();
        let crc = firecode.calculate(&data[2..11]);
        data[0..2].copy_from_slice(&crc.to_be_bytes());

        // Column wise RS parity.
        let mut buffer = vec![0u8; NB_RS_CODEWORD_BYTES * nb_columns];
        buffer[..nb_data_bytes].copy_from_slice(&data);
        let encoder = ReedSolomonEncoder::new(NB_RS_PARITY_BYTES);
        for column in 0..nb_columns {
            let mut message = [0u8; NB_RS_DATA_BYTES];
            for row in 0..NB_RS_DATA_BYTES {
                message[row] = buffer[row * nb_columns + column];
            }
            let encoded = encoder.encode(&message);
            for (row, &byte) in encoded.ecc().iter().enumerate() {
                buffer[(NB_RS_DATA_BYTES + row) * nb_columns + column] = byte;
            }
        }
        buffer
    }

    fn feed_super_frame(processor: &mut AacFrameProcessor, handler: &mut RecordingHandler, buffer: &[u8]) {
        let nb_frame_bytes = buffer.len() / NB_FRAMES_PER_SUPER_FRAME;
        for frame in buffer.chunks_exact(nb_frame_bytes) {
            processor.process(frame, handler);
        }
    }

    #[test]
    fn clean_super_frame_delivers_all_access_units() {
        let buffer = build_super_frame([b"first access unit payload", b"second one"]);
        let mut processor = AacFrameProcessor::new();
        let mut handler = RecordingHandler::default();
        feed_super_frame(&mut processor, &mut handler, &buffer);

        assert_eq!(handler.firecode_errors, 0);
        assert_eq!(handler.rs_errors, 0);
        assert_eq!(handler.au_crc_errors, 0);
        assert_eq!(handler.headers.len(), 1);
        let header = handler.headers[0];
        assert_eq!(header.sampling_rate, 16000);
        assert!(header.is_sbr);
        assert!(header.is_ps);
        assert!(!header.is_stereo);

        assert_eq!(handler.access_units.len(), 2);
        assert_eq!(handler.access_units[0].2, b"first access unit payload");
        assert_eq!(handler.access_units[1].2, b"second one");
    }

    #[test]
    fn byte_errors_are_corrected_by_reed_solomon() {
        let mut buffer = build_super_frame([b"first access unit payload", b"second one"]);
        // Five corrupted bytes in one column are correctable.
        for row in [20, 40, 60, 80, 100] {
            buffer[row * 2] ^= 0x5A;
        }
        let mut processor = AacFrameProcessor::new();
        let mut handler = RecordingHandler::default();
        feed_super_frame(&mut processor, &mut handler, &buffer);

        assert_eq!(handler.rs_errors, 0);
        assert_eq!(handler.access_units.len(), 2);
        assert_eq!(handler.access_units[0].2, b"first access unit payload");
    }

    #[test]
    fn uncorrectable_column_raises_rs_error_and_au_crc_errors() {
        let mut buffer = build_super_frame([b"first access unit payload", b"second one"]);
        for row in 10..30 {
            buffer[row * 2] ^= 0xFF;
        }
        let mut processor = AacFrameProcessor::new();
        let mut handler = RecordingHandler::default();
        feed_super_frame(&mut processor, &mut handler, &buffer);

        assert!(handler.rs_errors > 0);
        assert!(handler.au_crc_errors > 0);
    }

    #[test]
    fn bad_firecode_keeps_hunting_until_the_next_super_frame() {
        let buffer = build_super_frame([b"first access unit payload", b"second one"]);
        let nb_frame_bytes = buffer.len() / NB_FRAMES_PER_SUPER_FRAME;

        let mut processor = AacFrameProcessor::new();
        let mut handler = RecordingHandler::default();

        // A frame that is not a super frame start is skipped with an error event.
        let garbage = vec![0xA5u8; nb_frame_bytes];
        processor.process(&garbage, &mut handler);
        assert_eq!(handler.firecode_errors, 1);
        assert!(handler.headers.is_empty());

        feed_super_frame(&mut processor, &mut handler, &buffer);
        assert_eq!(handler.headers.len(), 1);
        assert_eq!(handler.access_units.len(), 2);
    }
}

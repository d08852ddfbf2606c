mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reed_solomon::Encoder as ReedSolomonEncoder;

use dab_core::dab_parameters::get_dab_parameters;
use dab_core::dab_transmission_modes::DabTransmissionMode;
use dab_radio::audio::aac_audio_decoder::{
    AacAudioDecoder, AacAudioDecoderFactory, AudioDecodeResult, AudioDecoderParams,
};
use dab_radio::audio::pcm_sink::{PcmParameters, PcmSink};
use dab_radio::database::entities::{EepOption, Subchannel, SubchannelProtection};
use dab_radio::fec::crc16::calculate_crc16;
use dab_radio::fec::firecode::FirecodeChecker;
use dab_radio::msc::protection_tables::get_puncture_profile;
use dab_radio::radio::dab_radio::DabRadio;

use common::{encode_fib_group, encode_subchannel_frame, seal_fib, SubchannelInterleaver};

const SUBCHANNEL_ID: u8 = 5;
const START_ADDRESS: u16 = 10;
const LABEL_TEXT: &[u8] = b"Blue Train";

struct TestAudioDecoder {
    params: AudioDecoderParams,
    nb_decoded: Arc<AtomicUsize>,
}

impl AacAudioDecoder for TestAudioDecoder {
    fn params(&self) -> AudioDecoderParams {
        self.params
    }

    fn decode_frame(&mut self, _buf: &[u8]) -> AudioDecodeResult {
        self.nb_decoded.fetch_add(1, Ordering::SeqCst);
        AudioDecodeResult { audio_pcm: vec![0u8; 64], is_error: false, error_code: 0 }
    }
}

struct TestAudioDecoderFactory {
    nb_created: Arc<AtomicUsize>,
    nb_decoded: Arc<AtomicUsize>,
}

impl AacAudioDecoderFactory for TestAudioDecoderFactory {
    fn create_decoder(&self, params: AudioDecoderParams) -> Box<dyn AacAudioDecoder> {
        self.nb_created.fetch_add(1, Ordering::SeqCst);
        Box::new(TestAudioDecoder { params, nb_decoded: self.nb_decoded.clone() })
    }
}

struct TestPcmSink {
    params: PcmParameters,
    nb_consumed_bytes: usize,
}

impl PcmSink for TestPcmSink {
    fn set_parameters(&mut self, params: PcmParameters) -> bool {
        self.params = params;
        true
    }

    fn get_parameters(&self) -> PcmParameters {
        self.params
    }

    fn consume_buffer(&mut self, buf: &[u8]) {
        self.nb_consumed_bytes += buf.len();
    }
}

fn fib_payload(figs: &[&[u8]]) -> [u8; 30] {
    let mut payload = [0xFFu8; 30];
    let mut index = 0;
    for fig in figs {
        payload[index..index + fig.len()].copy_from_slice(fig);
        index += fig.len();
    }
    payload
}

fn build_fic_group() -> Vec<i8> {
    // Ensemble announcement, the sub-channel description (EEP 3-A, 6 capacity units at
    // address 10) and a programme service with one audio component.
    let payload_0 = fib_payload(&[
        &[0x05, 0x00, 0x40, 0x12, 0xC0, 0x7B],
        &[0x05, 0x01, SUBCHANNEL_ID << 2, START_ADDRESS as u8, 0x88, 0x06],
    ]);
    let payload_1 = fib_payload(&[&[0x06, 0x02, 0x4C, 0x21, 0x01, 63, SUBCHANNEL_ID << 2 | 0b10]]);
    let payload_2 = fib_payload(&[]);
    encode_fib_group(&[seal_fib(&payload_0), seal_fib(&payload_1), seal_fib(&payload_2)])
}

/// Builds the PAD field carrying one complete dynamic label segment.
fn build_label_pad() -> Vec<u8> {
    let mut segment = Vec::new();
    segment.push(0b0110_0000 | (LABEL_TEXT.len() - 1) as u8);
    segment.push(15 << 4);
    segment.extend_from_slice(LABEL_TEXT);
    let crc = calculate_crc16(&segment) ^ 0xFFFF;
    segment.extend_from_slice(&crc.to_be_bytes());

    // Variable X-PAD: one contents indicator, the end marker, then the subfield
    // padded to its length code of 16 bytes.
    let mut xpad = Vec::new();
    xpad.push((4u8 << 5) | 2);
    xpad.push(0x00);
    xpad.extend_from_slice(&segment);
    xpad.resize(2 + 16, 0x00);

    let mut pad: Vec<u8> = xpad.iter().rev().copied().collect();
    pad.push(0b0010_0000);
    pad.push(0b0000_0010);
    pad
}

fn build_data_stream_element(pad: &[u8]) -> Vec<u8> {
    let mut au = Vec::new();
    au.push(0b100 << 5);
    au.push(pad.len() as u8);
    au.extend_from_slice(pad);
    au
}

/// One 120 byte super frame (16 kbps): 2 access units, the first carrying the label.
fn build_super_frame() -> Vec<u8> {
    let nb_data_bytes = 110;
    let mut data = vec![0u8; nb_data_bytes];
    // dac_rate=0, sbr=1, mono core with parametric stereo.
    data[2] = 0b0010_1000;

    let au_payload_0 = build_data_stream_element(&build_label_pad());
    let au_start_0 = 5usize;
    let au_start_1 = au_start_0 + au_payload_0.len() + 2;
    data[3] = (au_start_1 >> 4) as u8;
    data[4] = ((au_start_1 & 0x0F) << 4) as u8;

    let au_payload_1 = vec![0x22u8; nb_data_bytes - au_start_1 - 2];

    let mut write_au = |start: usize, payload: &[u8]| {
        data[start..start + payload.len()].copy_from_slice(payload);
        let crc = calculate_crc16(payload) ^ 0xFFFF;
        data[start + payload.len()..start + payload.len() + 2].copy_from_slice(&crc.to_be_bytes());
    };
    write_au(au_start_0, &au_payload_0);
    write_au(au_start_1, &au_payload_1);

    let firecode = FirecodeChecker::new();
    let crc = firecode.calculate(&data[2..11]);
    data[0..2].copy_from_slice(&crc.to_be_bytes());

    // One RS(120,110) codeword column.
    let encoder = ReedSolomonEncoder::new(10);
    let encoded = encoder.encode(&data);
    let mut super_frame = data;
    super_frame.extend_from_slice(encoded.ecc());
    assert_eq!(super_frame.len(), 120);
    super_frame
}

#[test]
fn radio_decodes_a_complete_service() {
    let params = get_dab_parameters(DabTransmissionMode::II);
    let mut radio = DabRadio::new(&params);

    let nb_directory_changes = Arc::new(AtomicUsize::new(0));
    radio.subscribe_service_directory_change({
        let nb_directory_changes = nb_directory_changes.clone();
        move || {
            nb_directory_changes.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Pre-compute the whole sub-channel transmission.
    let subchannel = Subchannel {
        id: SUBCHANNEL_ID,
        start_address: START_ADDRESS,
        protection: SubchannelProtection::Eep { option: EepOption::A, level: 3, size: 6 },
        fec_scheme: None,
    };
    let profile = get_puncture_profile(&subchannel.protection).unwrap();
    let nb_frame_bytes = profile.nb_decoded_bytes();
    assert_eq!(nb_frame_bytes, 24);

    let super_frame = build_super_frame();
    let total_frames = 56;
    let mut interleaver = SubchannelInterleaver::new(profile.nb_subchannel_bits());
    for t in 0..total_frames {
        let offset = (t % 5) * nb_frame_bytes;
        let logical_frame = &super_frame[offset..offset + nb_frame_bytes];
        interleaver.push_frame(encode_subchannel_frame(logical_frame, &profile));
    }

    let fic_bits = build_fic_group();
    let start_bit = usize::from(START_ADDRESS) * 64;
    let build_frame = |n: usize| -> Vec<i8> {
        let mut frame = vec![0i8; params.nb_frame_bits];
        frame[..params.nb_fic_bits].copy_from_slice(&fic_bits);
        let slice = interleaver.cif_slice(n);
        let msc = &mut frame[params.nb_fic_bits..];
        msc[start_bit..start_bit + slice.len()].copy_from_slice(&slice);
        frame
    };

    // The first frame announces the service directory and spawns the worker.
    radio.process(&build_frame(0));
    assert!(nb_directory_changes.load(Ordering::SeqCst) > 0);
    let snapshot = radio.database_snapshot();
    assert_eq!(snapshot.subchannels.get(&SUBCHANNEL_ID).unwrap().protection, subchannel.protection);
    assert_eq!(snapshot.services.len(), 1);
    let channel = radio.channel(SUBCHANNEL_ID).expect("channel worker should exist");

    let nb_access_units = Arc::new(AtomicUsize::new(0));
    let nb_audio_blocks = Arc::new(AtomicUsize::new(0));
    let labels = Arc::new(Mutex::new(Vec::<(String, u8)>::new()));
    let nb_created = Arc::new(AtomicUsize::new(0));
    let nb_decoded = Arc::new(AtomicUsize::new(0));
    let pcm_sink = Arc::new(Mutex::new(TestPcmSink {
        params: PcmParameters { sample_rate: 0, total_channels: 0, bytes_per_sample: 0, block_size: 1024 },
        nb_consumed_bytes: 0,
    }));
    {
        let mut channel = channel.lock().unwrap();
        channel.attach_pcm_sink(pcm_sink.clone());
        channel.set_audio_decoder_factory(Box::new(TestAudioDecoderFactory {
            nb_created: nb_created.clone(),
            nb_decoded: nb_decoded.clone(),
        }));
        channel.subscribe_access_unit({
            let nb_access_units = nb_access_units.clone();
            move |_au_index, _nb_aus, _buf| {
                nb_access_units.fetch_add(1, Ordering::SeqCst);
            }
        });
        channel.subscribe_audio_data({
            let nb_audio_blocks = nb_audio_blocks.clone();
            move |params, pcm| {
                assert_eq!(params.frequency, 16000);
                assert_eq!(pcm.len(), 64);
                nb_audio_blocks.fetch_add(1, Ordering::SeqCst);
            }
        });
        channel.subscribe_dynamic_label({
            let labels = labels.clone();
            move |label, charset| {
                labels.lock().unwrap().push((label.to_string(), charset));
            }
        });
    }

    // With every control flag clear the worker does nothing.
    for n in 1..6 {
        radio.process(&build_frame(n));
    }
    assert_eq!(nb_access_units.load(Ordering::SeqCst), 0);
    assert_eq!(nb_decoded.load(Ordering::SeqCst), 0);

    // Enabling playback also enables audio decoding.
    let controls = radio.channel_controls(SUBCHANNEL_ID).unwrap();
    controls.set_play_audio(true);
    controls.set_decode_data(true);
    assert!(controls.is_decode_audio());

    for n in 6..total_frames {
        radio.process(&build_frame(n));
    }
    radio.stop();

    assert!(nb_access_units.load(Ordering::SeqCst) >= 10);
    assert_eq!(nb_created.load(Ordering::SeqCst), 1);
    assert!(nb_decoded.load(Ordering::SeqCst) >= 10);
    assert!(nb_audio_blocks.load(Ordering::SeqCst) >= 10);

    // The play flag routed the decoded PCM into the playback device.
    {
        let sink = pcm_sink.lock().unwrap();
        assert!(sink.nb_consumed_bytes > 0);
        assert_eq!(sink.params.sample_rate, 16000);
        assert_eq!(sink.params.total_channels, 2);
    }

    let labels = labels.lock().unwrap();
    assert!(!labels.is_empty());
    for (label, charset) in labels.iter() {
        assert_eq!(label.as_bytes(), LABEL_TEXT);
        assert_eq!(*charset, 15);
    }

    // The last super frame decoded cleanly, so the error latches ended up clear.
    let channel = channel.lock().unwrap();
    assert!(!channel.is_firecode_error());
    assert!(!channel.is_rs_error());
    assert!(!channel.is_au_error());
    assert!(!channel.is_codec_error());
    let header = channel.super_frame_header().expect("header should be decoded");
    assert!(header.is_sbr);
    assert!(header.is_ps);
    assert_eq!(header.sampling_rate, 16000);
}

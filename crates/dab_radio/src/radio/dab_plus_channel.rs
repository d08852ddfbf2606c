use std::sync::{Arc, Mutex};

use log::{debug, error};

use dab_core::dab_parameters::DabParameters;

use crate::audio::aac_audio_decoder::{AacAudioDecoder, AacAudioDecoderFactory, AudioDecoderParams};
use crate::audio::aac_data_decoder::AacDataDecoder;
use crate::audio::aac_frame_processor::{AacFrameEventHandler, AacFrameProcessor, SuperFrameHeader};
use crate::audio::pcm_sink::{PcmParameters, PcmSink};
use crate::database::entities::Subchannel;
use crate::mot::mot_entities::MotEntity;
use crate::mot::mot_slideshow_processor::Slideshow;
use crate::msc::msc_decoder::MscDecoder;
use crate::msc::protection_tables::ProtectionProfileError;
use crate::radio::channel_controls::ChannelControls;
use crate::radio::slideshow_manager::SlideshowManager;

/// Format of a decoded block of PCM handed to audio observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParams {
    pub frequency: u32,
    pub is_stereo: bool,
    pub bytes_per_sample: u8,
}

type SuperFrameHeaderCallback = Box<dyn FnMut(SuperFrameHeader) + Send + Sync + 'static>;
type AccessUnitCallback = Box<dyn FnMut(usize, usize, &[u8]) + Send + Sync + 'static>;
type AudioDataCallback = Box<dyn FnMut(AudioParams, &[u8]) + Send + Sync + 'static>;
type DynamicLabelCallback = Box<dyn FnMut(&str, u8) + Send + Sync + 'static>;
type MotEntityCallback = Box<dyn FnMut(&MotEntity) + Send + Sync + 'static>;
type SlideshowCallback = Box<dyn FnMut(&Slideshow) + Send + Sync + 'static>;

#[derive(Default)]
struct ChannelObservers {
    super_frame_header: Vec<SuperFrameHeaderCallback>,
    access_unit: Vec<AccessUnitCallback>,
    audio_data: Vec<AudioDataCallback>,
    dynamic_label: Vec<DynamicLabelCallback>,
    mot_entity: Vec<MotEntityCallback>,
    slideshow: Vec<SlideshowCallback>,
}

/// Decodes one DAB+ sub-channel from MSC bits down to PCM, labels and slideshows.
///
/// The channel owns the whole downstream pipeline. Observers are notification sinks
/// invoked on the worker thread that produced the event; they never own or call back
/// into the producers.
pub struct DabPlusChannel {
    params: DabParameters,
    subchannel: Subchannel,
    controls: Arc<ChannelControls>,
    msc_decoder: MscDecoder,
    frame_processor: AacFrameProcessor,
    pipeline: ChannelPipeline,
}

struct ChannelPipeline {
    controls: Arc<ChannelControls>,
    decoder_factory: Option<Box<dyn AacAudioDecoderFactory>>,
    audio_decoder: Option<Box<dyn AacAudioDecoder>>,
    data_decoder: AacDataDecoder,
    slideshow_manager: SlideshowManager,
    observers: ChannelObservers,
    super_frame_header: Option<SuperFrameHeader>,
    dynamic_label: String,
    dynamic_label_charset: u8,
    is_firecode_error: bool,
    is_rs_error: bool,
    is_au_error: bool,
    is_codec_error: bool,
}

impl DabPlusChannel {
    pub fn new(params: &DabParameters, subchannel: &Subchannel) -> Result<Self, ProtectionProfileError> {
        let controls = Arc::new(ChannelControls::new());
        Ok(Self {
            params: *params,
            subchannel: *subchannel,
            controls: controls.clone(),
            msc_decoder: MscDecoder::new(subchannel)?,
            frame_processor: AacFrameProcessor::new(),
            pipeline: ChannelPipeline {
                controls,
                decoder_factory: None,
                audio_decoder: None,
                data_decoder: AacDataDecoder::new(),
                slideshow_manager: SlideshowManager::new(),
                observers: ChannelObservers::default(),
                super_frame_header: None,
                dynamic_label: String::new(),
                dynamic_label_charset: 0,
                is_firecode_error: false,
                is_rs_error: false,
                is_au_error: false,
                is_codec_error: false,
            },
        })
    }

    /// Consumes the MSC bits of one transmission frame.
    pub fn process(&mut self, msc_bits: &[i8]) {
        if msc_bits.len() != self.params.nb_msc_bits {
            error!(
                "got incorrect number of MSC bits {}/{}",
                msc_bits.len(),
                self.params.nb_msc_bits
            );
            return;
        }

        // With every control flag clear the sub-channel does no work this frame.
        if !self.controls.is_any_enabled() {
            return;
        }

        for cif_bits in msc_bits.chunks_exact(self.params.nb_cif_bits) {
            let frame_bytes = self.msc_decoder.decode_cif(cif_bits);
            // Empty while the deinterleaver is still collecting history.
            if frame_bytes.is_empty() {
                continue;
            }
            self.frame_processor.process(&frame_bytes, &mut self.pipeline);
        }
    }

    pub fn subchannel(&self) -> &Subchannel {
        &self.subchannel
    }

    pub fn controls(&self) -> Arc<ChannelControls> {
        self.controls.clone()
    }

    pub fn set_audio_decoder_factory(&mut self, factory: Box<dyn AacAudioDecoderFactory>) {
        self.pipeline.decoder_factory = Some(factory);
    }

    pub fn super_frame_header(&self) -> Option<SuperFrameHeader> {
        self.pipeline.super_frame_header
    }

    pub fn dynamic_label(&self) -> (&str, u8) {
        (&self.pipeline.dynamic_label, self.pipeline.dynamic_label_charset)
    }

    pub fn slideshows(&self) -> impl Iterator<Item = &Slideshow> {
        self.pipeline.slideshow_manager.slideshows()
    }

    pub fn is_firecode_error(&self) -> bool {
        self.pipeline.is_firecode_error
    }

    pub fn is_rs_error(&self) -> bool {
        self.pipeline.is_rs_error
    }

    pub fn is_au_error(&self) -> bool {
        self.pipeline.is_au_error
    }

    pub fn is_codec_error(&self) -> bool {
        self.pipeline.is_codec_error
    }

    /// Routes decoded PCM into a playback device whenever the play flag is set. The
    /// sink is reconfigured when the stream parameters change.
    pub fn attach_pcm_sink(&mut self, sink: Arc<Mutex<dyn PcmSink>>) {
        let controls = self.controls.clone();
        let mut active_params: Option<PcmParameters> = None;
        self.subscribe_audio_data(move |params, pcm| {
            if !controls.is_play_audio() {
                return;
            }
            let mut sink = sink.lock().unwrap();
            let desired = PcmParameters {
                sample_rate: params.frequency,
                total_channels: if params.is_stereo { 2 } else { 1 },
                bytes_per_sample: params.bytes_per_sample,
                block_size: sink.get_parameters().block_size,
            };
            if active_params != Some(desired) {
                if !sink.set_parameters(desired) {
                    return;
                }
                active_params = Some(desired);
            }
            sink.consume_buffer(pcm);
        });
    }

    pub fn subscribe_super_frame_header(&mut self, callback: impl FnMut(SuperFrameHeader) + Send + Sync + 'static) {
        self.pipeline.observers.super_frame_header.push(Box::new(callback));
    }

    pub fn subscribe_access_unit(&mut self, callback: impl FnMut(usize, usize, &[u8]) + Send + Sync + 'static) {
        self.pipeline.observers.access_unit.push(Box::new(callback));
    }

    pub fn subscribe_audio_data(&mut self, callback: impl FnMut(AudioParams, &[u8]) + Send + Sync + 'static) {
        self.pipeline.observers.audio_data.push(Box::new(callback));
    }

    pub fn subscribe_dynamic_label(&mut self, callback: impl FnMut(&str, u8) + Send + Sync + 'static) {
        self.pipeline.observers.dynamic_label.push(Box::new(callback));
    }

    pub fn subscribe_mot_entity(&mut self, callback: impl FnMut(&MotEntity) + Send + Sync + 'static) {
        self.pipeline.observers.mot_entity.push(Box::new(callback));
    }

    pub fn subscribe_slideshow(&mut self, callback: impl FnMut(&Slideshow) + Send + Sync + 'static) {
        self.pipeline.observers.slideshow.push(Box::new(callback));
    }
}

impl AacFrameEventHandler for ChannelPipeline {
    fn on_super_frame_header(&mut self, header: SuperFrameHeader) {
        self.super_frame_header = Some(header);
        self.is_firecode_error = false;
        self.is_rs_error = false;

        let decoder_params = AudioDecoderParams {
            sampling_frequency: header.sampling_rate,
            is_sbr: header.is_sbr,
            is_ps: header.is_ps,
            is_stereo: header.is_stereo,
        };
        let needs_replacement = match self.audio_decoder.as_ref() {
            None => true,
            Some(decoder) => decoder.params() != decoder_params,
        };
        if needs_replacement {
            if let Some(factory) = self.decoder_factory.as_ref() {
                self.audio_decoder = Some(factory.create_decoder(decoder_params));
            }
        }

        for callback in self.observers.super_frame_header.iter_mut() {
            callback(header);
        }
    }

    fn on_access_unit(&mut self, au_index: usize, nb_aus: usize, buf: &[u8]) {
        if au_index == 0 {
            self.is_au_error = false;
        }
        for callback in self.observers.access_unit.iter_mut() {
            callback(au_index, nb_aus, buf);
        }

        if self.controls.is_decode_audio() {
            self.decode_audio(au_index, nb_aus, buf);
        }
        if self.controls.is_decode_data() {
            self.decode_data(buf);
        }
    }

    fn on_firecode_error(&mut self, crc_rx: u16, crc_calculated: u16) {
        debug!("firecode error {:04x}/{:04x}", crc_rx, crc_calculated);
        self.is_firecode_error = true;
    }

    fn on_rs_error(&mut self, column_index: usize, nb_columns: usize) {
        debug!("reed-solomon uncorrectable column {}/{}", column_index, nb_columns);
        self.is_rs_error = true;
    }

    fn on_access_unit_crc_error(&mut self, au_index: usize, nb_aus: usize, _crc_rx: u16, _crc_calculated: u16) {
        debug!("access unit crc error {}/{}", au_index, nb_aus);
        self.is_au_error = true;
    }
}

impl ChannelPipeline {
    fn decode_audio(&mut self, au_index: usize, nb_aus: usize, buf: &[u8]) {
        let Some(decoder) = self.audio_decoder.as_mut() else {
            return;
        };
        let result = decoder.decode_frame(buf);
        if au_index == 0 {
            self.is_codec_error = result.is_error;
        }
        if result.is_error {
            error!(
                "audio decoder error={} au_index={}/{}",
                result.error_code, au_index, nb_aus
            );
            self.is_codec_error = true;
            return;
        }

        let decoder_params = decoder.params();
        let params = AudioParams {
            frequency: decoder_params.sampling_frequency,
            is_stereo: true,
            bytes_per_sample: 2,
        };
        for callback in self.observers.audio_data.iter_mut() {
            callback(params, &result.audio_pcm);
        }
    }

    fn decode_data(&mut self, buf: &[u8]) {
        let updates = self.data_decoder.process_access_unit(buf);

        if let Some(label) = updates.dynamic_label {
            self.dynamic_label = String::from_utf8_lossy(&label.label).into_owned();
            self.dynamic_label_charset = label.charset;
            debug!("dynamic_label[{}]={}", self.dynamic_label.len(), self.dynamic_label);
            for callback in self.observers.dynamic_label.iter_mut() {
                callback(&self.dynamic_label, label.charset);
            }
        }

        for entity in updates.mot_entities.iter() {
            match self.slideshow_manager.process_mot_entity(entity) {
                Some(slideshow) => {
                    for callback in self.observers.slideshow.iter_mut() {
                        callback(&slideshow);
                    }
                }
                None => {
                    for callback in self.observers.mot_entity.iter_mut() {
                        callback(entity);
                    }
                }
            }
        }
    }
}

/// Parameters an AAC decoder instance is created with. They change only when a new
/// super frame header announces a different configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioDecoderParams {
    pub sampling_frequency: u32,
    pub is_sbr: bool,
    pub is_ps: bool,
    pub is_stereo: bool,
}

/// Outcome of decoding one access unit. PCM is interleaved 16 bit stereo at the
/// configured sample rate.
#[derive(Debug, Clone, Default)]
pub struct AudioDecodeResult {
    pub audio_pcm: Vec<u8>,
    pub is_error: bool,
    pub error_code: i32,
}

/// Contract of the external HE-AAC decoder. Any implementation satisfying it is
/// substitutable, including a test double.
pub trait AacAudioDecoder: Send {
    fn params(&self) -> AudioDecoderParams;
    fn decode_frame(&mut self, buf: &[u8]) -> AudioDecodeResult;
}

/// Creates decoder instances on demand. The channel replaces its decoder whenever the
/// super frame header parameters change.
pub trait AacAudioDecoderFactory: Send + Sync {
    fn create_decoder(&self, params: AudioDecoderParams) -> Box<dyn AacAudioDecoder>;
}

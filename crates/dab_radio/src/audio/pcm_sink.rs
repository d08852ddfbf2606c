/// Stream parameters of a PCM output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmParameters {
    pub sample_rate: u32,
    pub total_channels: u8,
    pub bytes_per_sample: u8,
    pub block_size: u32,
}

/// Contract of the external PCM playback device.
///
/// `consume_buffer` may block for up to one block of samples; it is called from the
/// sub-channel worker thread after audio decoding.
pub trait PcmSink: Send {
    fn set_parameters(&mut self, params: PcmParameters) -> bool;
    fn get_parameters(&self) -> PcmParameters;
    fn consume_buffer(&mut self, buf: &[u8]);
}

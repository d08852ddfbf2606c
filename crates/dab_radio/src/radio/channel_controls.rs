use std::sync::atomic::{AtomicU8, Ordering};

const FLAG_DECODE_AUDIO: u8 = 0b1000_0000;
const FLAG_DECODE_DATA: u8 = 0b0100_0000;
const FLAG_PLAY_AUDIO: u8 = 0b0010_0000;
const FLAG_ALL_SELECTED: u8 = 0b1110_0000;

/// Run time switches of a sub-channel, packed into one atomic byte so the worker can
/// sample them without locking.
///
/// Playing audio requires decoding it, so setting the play flag also sets the decode
/// flag and clearing the decode flag also clears the play flag.
pub struct ChannelControls {
    flags: AtomicU8,
}

impl ChannelControls {
    pub fn new() -> Self {
        Self { flags: AtomicU8::new(0) }
    }

    pub fn is_any_enabled(&self) -> bool {
        self.flags.load(Ordering::SeqCst) != 0
    }

    pub fn is_all_enabled(&self) -> bool {
        self.flags.load(Ordering::SeqCst) == FLAG_ALL_SELECTED
    }

    pub fn run_all(&self) {
        self.flags.store(FLAG_ALL_SELECTED, Ordering::SeqCst);
    }

    pub fn stop_all(&self) {
        self.flags.store(0, Ordering::SeqCst);
    }

    pub fn is_decode_audio(&self) -> bool {
        self.flags.load(Ordering::SeqCst) & FLAG_DECODE_AUDIO != 0
    }

    pub fn set_decode_audio(&self, is_enabled: bool) {
        if is_enabled {
            self.flags.fetch_or(FLAG_DECODE_AUDIO, Ordering::SeqCst);
        } else {
            self.flags.fetch_and(!(FLAG_DECODE_AUDIO | FLAG_PLAY_AUDIO), Ordering::SeqCst);
        }
    }

    pub fn is_decode_data(&self) -> bool {
        self.flags.load(Ordering::SeqCst) & FLAG_DECODE_DATA != 0
    }

    pub fn set_decode_data(&self, is_enabled: bool) {
        if is_enabled {
            self.flags.fetch_or(FLAG_DECODE_DATA, Ordering::SeqCst);
        } else {
            self.flags.fetch_and(!FLAG_DECODE_DATA, Ordering::SeqCst);
        }
    }

    pub fn is_play_audio(&self) -> bool {
        self.flags.load(Ordering::SeqCst) & FLAG_PLAY_AUDIO != 0
    }

    pub fn set_play_audio(&self, is_enabled: bool) {
        if is_enabled {
            self.flags.fetch_or(FLAG_PLAY_AUDIO | FLAG_DECODE_AUDIO, Ordering::SeqCst);
        } else {
            self.flags.fetch_and(!FLAG_PLAY_AUDIO, Ordering::SeqCst);
        }
    }
}

impl Default for ChannelControls {
    fn default() -> Self {
        Self::new()
    }
}

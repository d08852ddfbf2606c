/// Scattering sequence of the time interleaver. Bit position `i` of a logical frame is
/// transmitted `SCATTERING_SEQUENCE[i % 16]` CIFs after the frame's own CIF.
pub const SCATTERING_SEQUENCE: [usize; 16] = [0, 8, 4, 12, 2, 10, 6, 14, 1, 9, 5, 13, 3, 11, 7, 15];

const NB_HISTORY_FRAMES: usize = 16;

/// Reverses the 16 frame time interleaving of a sub-channel.
///
/// Soft decision bits are collected into a ring of the last 16 CIF slices. Until the
/// ring is full nothing can be reconstructed and the caller simply waits.
pub struct CifDeinterleaver {
    history: Vec<Vec<i8>>,
    total_frames: usize,
    nb_frame_bits: usize,
}

impl CifDeinterleaver {
    pub fn new(nb_frame_bits: usize) -> Self {
        Self {
            history: vec![vec![0i8; nb_frame_bits]; NB_HISTORY_FRAMES],
            total_frames: 0,
            nb_frame_bits,
        }
    }

    /// Consumes one CIF slice of the sub-channel. Once 16 slices have been collected
    /// every call reconstructs the oldest pending logical frame into `frame_out` and
    /// returns true.
    pub fn process(&mut self, cif_slice: &[i8], frame_out: &mut [i8]) -> bool {
        assert!(cif_slice.len() == self.nb_frame_bits);
        assert!(frame_out.len() == self.nb_frame_bits);

        let slot = self.total_frames % NB_HISTORY_FRAMES;
        self.history[slot].copy_from_slice(cif_slice);
        self.total_frames += 1;

        if self.total_frames < NB_HISTORY_FRAMES {
            return false;
        }

        // The frame being emitted is 15 CIFs old; bit i arrived SCATTERING_SEQUENCE
        // CIFs after it started.
        let newest = self.total_frames - 1;
        for (i, bit) in frame_out.iter_mut().enumerate() {
            let source = (newest + 1 + SCATTERING_SEQUENCE[i % 16]) % NB_HISTORY_FRAMES;
            *bit = self.history[source][i];
        }
        true
    }

    pub fn reset(&mut self) {
        self.total_frames = 0;
    }
}

/// Accumulates the bytes of one PAD data group across X-PAD subfields.
pub struct PadDataGroup {
    buffer: Vec<u8>,
    nb_required_bytes: Option<usize>,
}

impl PadDataGroup {
    pub fn new() -> Self {
        Self { buffer: Vec::new(), nb_required_bytes: None }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.nb_required_bytes = None;
    }

    /// Fixes the total group length once it is known.
    pub fn set_required_bytes(&mut self, nb_bytes: usize) {
        self.nb_required_bytes = Some(nb_bytes);
    }

    pub fn required_bytes(&self) -> Option<usize> {
        self.nb_required_bytes
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends bytes up to the required length and returns how many were taken.
    /// Without a known length everything is taken.
    pub fn consume(&mut self, buf: &[u8]) -> usize {
        let nb_take = match self.nb_required_bytes {
            Some(required) => buf.len().min(required.saturating_sub(self.buffer.len())),
            None => buf.len(),
        };
        self.buffer.extend_from_slice(&buf[..nb_take]);
        nb_take
    }

    pub fn is_complete(&self) -> bool {
        match self.nb_required_bytes {
            Some(required) => self.buffer.len() >= required,
            None => false,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }
}

impl Default for PadDataGroup {
    fn default() -> Self {
        Self::new()
    }
}

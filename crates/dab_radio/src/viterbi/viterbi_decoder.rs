use crate::viterbi::branch_table::{
    BranchTable, CODE_RATE, NB_STATES, SOFT_DECISION_HIGH, SOFT_DECISION_LOW,
    SOFT_DECISION_PUNCTURED,
};

/// Highest branch error a single trellis step can accumulate.
const SOFT_DECISION_MAX_ERROR: u16 =
    (SOFT_DECISION_HIGH as i16 - SOFT_DECISION_LOW as i16) as u16 * CODE_RATE as u16;

const INITIAL_START_ERROR: u16 = 0;
const INITIAL_NON_START_ERROR: u16 = 5 * SOFT_DECISION_MAX_ERROR;
const RENORMALISATION_THRESHOLD: u16 = u16::MAX - 5 * SOFT_DECISION_MAX_ERROR;

const PUNCTURED_SYMBOL: i16 = SOFT_DECISION_PUNCTURED as i16;

/// Soft decision Viterbi decoder for the DAB mother code.
///
/// Path metrics are kept as u16 lanes. Whenever any surviving metric crosses the
/// renormalisation threshold the minimum metric is subtracted from every state so the
/// lanes never overflow; the subtracted total is added back when the path error is
/// reported.
pub struct ViterbiDecoder {
    branch_table: &'static BranchTable,
    metrics: [u16; NB_STATES],
    metrics_next: [u16; NB_STATES],
    /// One decision word per trellis step. Bit `s` selects the surviving predecessor of
    /// state `s`.
    decisions: Vec<u64>,
    depunctured_symbols: Vec<i16>,
    renormalisation_offset: u64,
}

impl ViterbiDecoder {
    pub fn new() -> Self {
        Self {
            branch_table: BranchTable::initialize_once(),
            metrics: [INITIAL_NON_START_ERROR; NB_STATES],
            metrics_next: [0u16; NB_STATES],
            decisions: Vec::new(),
            depunctured_symbols: Vec::new(),
            renormalisation_offset: 0,
        }
    }

    /// Restarts the trellis so that only `starting_state` carries the low initial metric.
    pub fn reset(&mut self, starting_state: usize) {
        assert!(starting_state < NB_STATES);
        self.metrics = [INITIAL_NON_START_ERROR; NB_STATES];
        self.metrics[starting_state] = INITIAL_START_ERROR;
        self.decisions.clear();
        self.renormalisation_offset = 0;
    }

    /// Depunctures `punctured_symbols` with the cyclic `puncture_code` and advances the
    /// trellis by `requested_output_symbols` code symbols. A `1` in the puncture code
    /// takes the next input symbol, a `0` substitutes a punctured symbol.
    ///
    /// Returns the number of input symbols consumed. If the input cannot supply the
    /// requested symbols nothing is consumed and 0 is returned.
    pub fn update(
        &mut self,
        punctured_symbols: &[i8],
        puncture_code: &[u8],
        requested_output_symbols: usize,
    ) -> usize {
        assert!(requested_output_symbols % CODE_RATE == 0);
        assert!(!puncture_code.is_empty());

        let nb_required: usize = (0..requested_output_symbols)
            .filter(|i| puncture_code[i % puncture_code.len()] == 1)
            .count();
        debug_assert!(
            nb_required <= punctured_symbols.len(),
            "Puncture code requested {} symbols but input only has {}",
            nb_required,
            punctured_symbols.len()
        );
        if nb_required > punctured_symbols.len() {
            return 0;
        }

        self.depunctured_symbols.clear();
        self.depunctured_symbols.reserve(requested_output_symbols);
        let mut index_punctured_symbol = 0;
        for i in 0..requested_output_symbols {
            let is_transmitted = puncture_code[i % puncture_code.len()] == 1;
            if is_transmitted {
                let symbol = punctured_symbols[index_punctured_symbol];
                index_punctured_symbol += 1;
                self.depunctured_symbols.push(i16::from(symbol));
            } else {
                self.depunctured_symbols.push(PUNCTURED_SYMBOL);
            }
        }

        let total_steps = requested_output_symbols / CODE_RATE;
        for step in 0..total_steps {
            let symbols = [
                self.depunctured_symbols[step * CODE_RATE],
                self.depunctured_symbols[step * CODE_RATE + 1],
                self.depunctured_symbols[step * CODE_RATE + 2],
                self.depunctured_symbols[step * CODE_RATE + 3],
            ];
            self.advance_step(&symbols);
        }

        index_punctured_symbol
    }

    /// Traces the survivor ending in `end_state` back over `8*bytes_out.len()` decoded
    /// bits. Trellis steps beyond the requested bits are treated as flush steps and
    /// discarded. Bits are packed most significant first.
    ///
    /// Returns the accumulated path error of the chosen survivor.
    pub fn chainback(&self, bytes_out: &mut [u8], end_state: usize) -> u64 {
        let total_bits = bytes_out.len() * 8;
        let total_steps = self.decisions.len();
        assert!(end_state < NB_STATES);
        assert!(
            total_bits <= total_steps,
            "Chainback requested {} bits but only {} trellis steps were decoded",
            total_bits,
            total_steps
        );

        bytes_out.fill(0);
        let mut state = end_state;
        for step in (0..total_steps).rev() {
            if step < total_bits {
                let bit = (state & 0b1) as u8;
                bytes_out[step / 8] |= bit << (7 - (step % 8));
            }
            let decision = (self.decisions[step] >> state) & 0b1;
            state = ((decision as usize) << 5) | (state >> 1);
        }

        u64::from(self.metrics[end_state]) + self.renormalisation_offset
    }

    /// Number of trellis steps decoded since the last reset.
    pub fn current_decoded_bits(&self) -> usize {
        self.decisions.len()
    }

    // Add-compare-select over all 32 butterflies. This is the kernel an architecture
    // specific implementation would replace; any replacement must produce identical
    // metrics and decisions.
    fn advance_step(&mut self, symbols: &[i16; CODE_RATE]) {
        let mut decision: u64 = 0;

        for state in 0..NB_STATES {
            let mut error_low: u16 = 0;
            for (j, &symbol) in symbols.iter().enumerate() {
                if symbol == PUNCTURED_SYMBOL {
                    continue;
                }
                let expected = self.branch_table.expected_symbol(j, state);
                error_low += symbol.abs_diff(expected);
            }
            let error_high = {
                let mut error: u16 = 0;
                for (j, &symbol) in symbols.iter().enumerate() {
                    if symbol == PUNCTURED_SYMBOL {
                        continue;
                    }
                    let expected = -self.branch_table.expected_symbol(j, state);
                    error += symbol.abs_diff(expected);
                }
                error
            };

            let predecessor_low = state >> 1;
            let predecessor_high = (state >> 1) | (NB_STATES >> 1);
            let metric_low = self.metrics[predecessor_low].saturating_add(error_low);
            let metric_high = self.metrics[predecessor_high].saturating_add(error_high);

            if metric_high < metric_low {
                self.metrics_next[state] = metric_high;
                decision |= 1u64 << state;
            } else {
                self.metrics_next[state] = metric_low;
            }
        }

        let maximum = *self.metrics_next.iter().max().expect("Metrics cannot be empty");
        if maximum > RENORMALISATION_THRESHOLD {
            let minimum = *self.metrics_next.iter().min().expect("Metrics cannot be empty");
            for metric in self.metrics_next.iter_mut() {
                *metric -= minimum;
            }
            self.renormalisation_offset += u64::from(minimum);
        }

        self.metrics = self.metrics_next;
        self.decisions.push(decision);
    }
}

impl Default for ViterbiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a hard bit into its maximum confidence soft decision value.
pub fn hard_to_soft_bit(bit: u8) -> i8 {
    if bit == 0 {
        SOFT_DECISION_LOW
    } else {
        SOFT_DECISION_HIGH
    }
}

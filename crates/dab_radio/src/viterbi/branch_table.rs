use std::sync::OnceLock;

/// Generator polynomials of the DAB mother code in reversed binary form.
/// Octal {133, 171, 145, 133} with the newest shift register bit at the least
/// significant position becomes decimal {109, 79, 83, 109}.
pub const CODE_POLYNOMIALS: [u8; 4] = [109, 79, 83, 109];

/// Constraint length of the mother code.
pub const CONSTRAINT_LENGTH: usize = 7;

/// Number of code symbols produced per input bit.
pub const CODE_RATE: usize = 4;

/// Number of trellis states.
pub const NB_STATES: usize = 1 << (CONSTRAINT_LENGTH - 1);

/// Highest value of a soft decision bit.
pub const SOFT_DECISION_HIGH: i8 = 127;

/// Lowest value of a soft decision bit.
pub const SOFT_DECISION_LOW: i8 = -127;

/// Sentinel for a punctured soft decision bit. It lies outside the valid range and
/// contributes no branch error.
pub const SOFT_DECISION_PUNCTURED: i8 = i8::MIN;

/// Expected soft decision values for every trellis transition.
///
/// For the transition into state `s` whose predecessor kept a 0 in its oldest position,
/// the full encoder register equals `s` and the expected value of code bit `j` is
/// `expected[j][s]`. The alternate predecessor sets the oldest register bit, and since
/// every generator polynomial taps that bit its expected values are exactly negated.
pub struct BranchTable {
    expected: [[i16; NB_STATES]; CODE_RATE],
}

static BRANCH_TABLE: OnceLock<BranchTable> = OnceLock::new();

impl BranchTable {
    fn new() -> Self {
        let mut expected = [[0i16; NB_STATES]; CODE_RATE];
        for (j, &poly) in CODE_POLYNOMIALS.iter().enumerate() {
            for state in 0..NB_STATES {
                let ones = (state as u8 & poly).count_ones();
                expected[j][state] = if ones % 2 == 1 {
                    i16::from(SOFT_DECISION_HIGH)
                } else {
                    i16::from(SOFT_DECISION_LOW)
                };
            }
        }
        Self { expected }
    }

    /// Returns the process wide table, building it on first use.
    /// Every decoder instance shares the same table.
    pub fn initialize_once() -> &'static BranchTable {
        BRANCH_TABLE.get_or_init(Self::new)
    }

    #[inline(always)]
    pub fn expected_symbol(&self, code_bit: usize, state: usize) -> i16 {
        self.expected[code_bit][state]
    }
}

use log::{debug, error};

use dab_core::dab_parameters::DabParameters;

use crate::fec::additive_scrambler::AdditiveScrambler;
use crate::fec::crc16::validate_trailing_inverted_crc16;
use crate::fec::puncture_codes::{get_puncture_code, PI_X};
use crate::fic::fig_processor::NB_FIB_DATA_BYTES;
use crate::viterbi::viterbi_decoder::ViterbiDecoder;

/// Number of bytes in a fast information block including its CRC word.
pub const NB_FIB_BYTES: usize = 32;

/// Decodes one convolutionally coded FIB group per CIF.
///
/// The group is depunctured and Viterbi decoded in three passes, descrambled, split
/// into 32 byte FIBs and each FIB is validated against its transmitted CRC16. Only the
/// 30 byte payloads of valid FIBs are returned.
pub struct FicDecoder {
    vitdec: ViterbiDecoder,
    scrambler: AdditiveScrambler,
    nb_fibs_per_group: usize,
    nb_pi16_blocks: usize,
    nb_fib_group_bits: usize,
    decoded_bytes: Vec<u8>,
}

impl FicDecoder {
    pub fn new(params: &DabParameters) -> Self {
        // Three FIBs are coded over 21 strongly punctured blocks, the four FIB groups
        // of transmission mode III use 29.
        let nb_pi16_blocks = match params.nb_fibs_per_group {
            3 => 21,
            4 => 29,
            other => panic!("No puncturing scheme for {} FIBs per group", other),
        };
        let nb_decoded_bytes = params.nb_fibs_per_group * NB_FIB_BYTES;
        Self {
            vitdec: ViterbiDecoder::new(),
            scrambler: AdditiveScrambler::new(0xFFFF),
            nb_fibs_per_group: params.nb_fibs_per_group,
            nb_pi16_blocks,
            nb_fib_group_bits: params.nb_fib_group_bits,
            decoded_bytes: vec![0u8; nb_decoded_bytes],
        }
    }

    /// Decodes a FIB group worth of soft decision bits and returns the payloads of the
    /// FIBs that passed their CRC check.
    pub fn process_fib_group(&mut self, soft_bits: &[i8]) -> Vec<[u8; NB_FIB_DATA_BYTES]> {
        assert!(soft_bits.len() == self.nb_fib_group_bits);

        let pi_16 = get_puncture_code(16);
        let pi_15 = get_puncture_code(15);

        self.vitdec.reset(0);
        let mut curr_bit = 0;
        curr_bit += self.vitdec.update(&soft_bits[curr_bit..], pi_16, 128 * self.nb_pi16_blocks);
        curr_bit += self.vitdec.update(&soft_bits[curr_bit..], pi_15, 128 * 3);
        // The tail bites back into state zero.
        curr_bit += self.vitdec.update(&soft_bits[curr_bit..], &PI_X, 24);

        if curr_bit != self.nb_fib_group_bits {
            error!("fib group consumed {}/{} bits, dropping", curr_bit, self.nb_fib_group_bits);
            return Vec::new();
        }

        let path_error = self.vitdec.chainback(&mut self.decoded_bytes, 0);
        debug!("fib group path_error={}", path_error);

        self.scrambler.reset();
        self.scrambler.descramble(&mut self.decoded_bytes);

        let mut payloads = Vec::with_capacity(self.nb_fibs_per_group);
        for fib in self.decoded_bytes.chunks_exact(NB_FIB_BYTES) {
            if !validate_trailing_inverted_crc16(fib) {
                debug!("fib crc16 mismatch");
                continue;
            }
            let mut payload = [0u8; NB_FIB_DATA_BYTES];
            payload.copy_from_slice(&fib[..NB_FIB_DATA_BYTES]);
            payloads.push(payload);
        }
        payloads
    }
}

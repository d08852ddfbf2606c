//! Transmitter side helpers mirroring the decoder conventions, used to fabricate
//! wire accurate test signals.
#![allow(dead_code)]

use dab_radio::fec::additive_scrambler::AdditiveScrambler;
use dab_radio::fec::crc16::calculate_crc16;
use dab_radio::fec::puncture_codes::{get_puncture_code, PI_X};
use dab_radio::msc::cif_deinterleaver::SCATTERING_SEQUENCE;
use dab_radio::msc::protection_tables::PunctureProfile;
use dab_radio::viterbi::branch_table::CODE_POLYNOMIALS;
use dab_radio::viterbi::viterbi_decoder::hard_to_soft_bit;

/// Unpacks bytes into bits, most significant bit first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |i| (byte >> (7 - i)) & 0b1))
        .collect()
}

/// Encodes with the rate 1/4 mother code, appending six flush bits into state zero.
pub fn convolutional_encode(bits: &[u8]) -> Vec<u8> {
    let mut register: u8 = 0;
    let mut out = Vec::with_capacity((bits.len() + 6) * 4);
    for &bit in bits.iter().chain(std::iter::repeat(&0u8).take(6)) {
        register = ((register << 1) | bit) & 0x7F;
        for &poly in CODE_POLYNOMIALS.iter() {
            out.push(((register & poly).count_ones() % 2) as u8);
        }
    }
    out
}

/// Applies puncturing zones to the mother code output. Each zone cycles its vector
/// from the start; the final 24 symbols are punctured with the tail vector.
pub fn puncture(mother: &[u8], zones: &[(usize, usize)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut curr_symbol = 0;
    for &(puncture_index, nb_blocks) in zones {
        let code = get_puncture_code(puncture_index);
        for i in 0..nb_blocks * 128 {
            if code[i % code.len()] == 1 {
                out.push(mother[curr_symbol]);
            }
            curr_symbol += 1;
        }
    }
    for i in 0..24 {
        if PI_X[i] == 1 {
            out.push(mother[curr_symbol]);
        }
        curr_symbol += 1;
    }
    assert_eq!(curr_symbol, mother.len(), "puncturing must cover the whole mother output");
    out
}

/// XORs the energy dispersal sequence over a byte buffer.
pub fn scramble(bytes: &mut [u8]) {
    let mut scrambler = AdditiveScrambler::new(0xFFFF);
    scrambler.descramble(bytes);
}

pub fn to_soft_bits(bits: &[u8]) -> Vec<i8> {
    bits.iter().map(|&bit| hard_to_soft_bit(bit)).collect()
}

/// Appends the transmitted (inverted) CRC word to a FIB payload.
pub fn seal_fib(payload: &[u8; 30]) -> [u8; 32] {
    let mut fib = [0u8; 32];
    fib[..30].copy_from_slice(payload);
    let crc = calculate_crc16(payload) ^ 0xFFFF;
    fib[30..].copy_from_slice(&crc.to_be_bytes());
    fib
}

/// Encodes one FIB group of three blocks into its 2304 transmitted soft bits.
pub fn encode_fib_group(fibs: &[[u8; 32]; 3]) -> Vec<i8> {
    let mut bytes = Vec::with_capacity(96);
    for fib in fibs {
        bytes.extend_from_slice(fib);
    }
    scramble(&mut bytes);
    let mother = convolutional_encode(&bytes_to_bits(&bytes));
    let transmitted = puncture(&mother, &[(16, 21), (15, 3)]);
    assert_eq!(transmitted.len(), 2304);
    to_soft_bits(&transmitted)
}

/// Encodes one sub-channel logical frame into its transmitted bits, zero padded up to
/// the sub-channel capacity.
pub fn encode_subchannel_frame(frame_bytes: &[u8], profile: &PunctureProfile) -> Vec<u8> {
    assert_eq!(frame_bytes.len(), profile.nb_decoded_bytes());
    let mut bytes = frame_bytes.to_vec();
    scramble(&mut bytes);
    let mother = convolutional_encode(&bytes_to_bits(&bytes));

    let zones: Vec<(usize, usize)> = profile
        .zones
        .iter()
        .map(|zone| (usize::from(zone.puncture_index), zone.nb_blocks))
        .collect();
    let mut transmitted = puncture(&mother, &zones);
    transmitted.resize(profile.nb_subchannel_bits(), 0);
    transmitted
}

/// Mirrors the transmitter's 16 frame time interleaver for one sub-channel.
pub struct SubchannelInterleaver {
    frames: Vec<Vec<u8>>,
    nb_frame_bits: usize,
}

impl SubchannelInterleaver {
    pub fn new(nb_frame_bits: usize) -> Self {
        Self { frames: Vec::new(), nb_frame_bits }
    }

    /// Queues the wire bits of the next logical frame.
    pub fn push_frame(&mut self, wire_bits: Vec<u8>) {
        assert_eq!(wire_bits.len(), self.nb_frame_bits);
        self.frames.push(wire_bits);
    }

    /// Produces the interleaved sub-channel slice of CIF `n` as soft bits.
    pub fn cif_slice(&self, n: usize) -> Vec<i8> {
        (0..self.nb_frame_bits)
            .map(|i| {
                let delay = SCATTERING_SEQUENCE[i % 16];
                if n >= delay {
                    match self.frames.get(n - delay) {
                        Some(frame) => hard_to_soft_bit(frame[i]),
                        None => 0,
                    }
                } else {
                    0
                }
            })
            .collect()
    }
}

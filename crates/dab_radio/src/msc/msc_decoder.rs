use log::{debug, error};

use dab_core::dab_parameters::{NB_CAPACITY_UNIT_BITS, NB_CIF_BITS};

use crate::database::entities::Subchannel;
use crate::fec::additive_scrambler::AdditiveScrambler;
use crate::fec::puncture_codes::{get_puncture_code, PI_X};
use crate::msc::cif_deinterleaver::CifDeinterleaver;
use crate::msc::protection_tables::{get_puncture_profile, ProtectionProfileError, PunctureProfile};
use crate::viterbi::viterbi_decoder::ViterbiDecoder;

/// Decodes one sub-channel out of the main service channel.
///
/// Per CIF the sub-channel's capacity units are extracted, time deinterleaved,
/// depunctured and Viterbi decoded according to the protection profile, and finally
/// descrambled into one logical frame of bytes.
pub struct MscDecoder {
    subchannel: Subchannel,
    profile: PunctureProfile,
    deinterleaver: CifDeinterleaver,
    vitdec: ViterbiDecoder,
    scrambler: AdditiveScrambler,
    deinterleaved_bits: Vec<i8>,
}

impl MscDecoder {
    pub fn new(subchannel: &Subchannel) -> Result<Self, ProtectionProfileError> {
        let profile = get_puncture_profile(&subchannel.protection)?;
        let nb_subchannel_bits = profile.nb_subchannel_bits();
        Ok(Self {
            subchannel: *subchannel,
            deinterleaver: CifDeinterleaver::new(nb_subchannel_bits),
            vitdec: ViterbiDecoder::new(),
            scrambler: AdditiveScrambler::new(0xFFFF),
            deinterleaved_bits: vec![0i8; nb_subchannel_bits],
            profile,
        })
    }

    pub fn profile(&self) -> &PunctureProfile {
        &self.profile
    }

    /// Decodes the sub-channel's slice of one CIF. Returns the bytes of one logical
    /// frame, or an empty vector while the deinterleaver is still collecting history.
    pub fn decode_cif(&mut self, cif_bits: &[i8]) -> Vec<u8> {
        if cif_bits.len() != NB_CIF_BITS {
            error!("got incorrect number of CIF bits {}/{}", cif_bits.len(), NB_CIF_BITS);
            return Vec::new();
        }

        let start_bit = usize::from(self.subchannel.start_address) * NB_CAPACITY_UNIT_BITS;
        let nb_subchannel_bits = self.profile.nb_subchannel_bits();
        if start_bit + nb_subchannel_bits > cif_bits.len() {
            error!(
                "subchannel {} span {}..{} overflows the CIF",
                self.subchannel.id,
                start_bit,
                start_bit + nb_subchannel_bits
            );
            return Vec::new();
        }
        let subchannel_bits = &cif_bits[start_bit..start_bit + nb_subchannel_bits];

        if !self.deinterleaver.process(subchannel_bits, &mut self.deinterleaved_bits) {
            return Vec::new();
        }

        self.vitdec.reset(0);
        let mut curr_bit = 0;
        for zone in self.profile.zones.iter() {
            let puncture_code = get_puncture_code(usize::from(zone.puncture_index));
            curr_bit += self.vitdec.update(
                &self.deinterleaved_bits[curr_bit..],
                puncture_code,
                zone.nb_blocks * 128,
            );
        }
        curr_bit += self.vitdec.update(&self.deinterleaved_bits[curr_bit..], &PI_X, 24);

        if curr_bit != self.profile.nb_transmitted_bits() {
            error!(
                "subchannel {} consumed {}/{} transmitted bits, dropping frame",
                self.subchannel.id,
                curr_bit,
                self.profile.nb_transmitted_bits()
            );
            return Vec::new();
        }

        let mut bytes = vec![0u8; self.profile.nb_decoded_bytes()];
        let path_error = self.vitdec.chainback(&mut bytes, 0);
        debug!("subchannel {} path_error={}", self.subchannel.id, path_error);

        self.scrambler.reset();
        self.scrambler.descramble(&mut bytes);
        bytes
    }
}

//! Sub-channel protection profiles.
//!
//! The unequal error protection table indexes the standard's sub-channel size table:
//! each row fixes the sub-channel size in capacity units, the audio bit rate and the
//! four puncturing zones applied across a logical frame. Equal error protection
//! profiles are computed from the option and level fields instead.

use itertools::izip;
use thiserror::Error;

use crate::database::entities::{EepOption, SubchannelProtection};

/// Number of mother code symbols in one puncturing block.
pub const NB_BLOCK_SYMBOLS: usize = 128;

/// Number of mother code symbols produced while flushing the encoder.
pub const NB_TAIL_SYMBOLS: usize = 24;

/// Number of transmitted bits that survive the tail puncturing vector.
pub const NB_TAIL_TRANSMITTED_BITS: usize = 12;

#[derive(Debug, Clone, Copy)]
pub struct UepEntry {
    /// Sub-channel size in capacity units.
    pub size: u16,
    pub bitrate_kbps: u16,
    /// Protection level 1 (strongest) to 5 (weakest).
    pub protection_level: u8,
    /// Lengths of the four puncturing zones in 128 symbol blocks.
    pub nb_blocks: [u16; 4],
    /// Puncturing vector index of each zone. Zero marks an unused zone.
    pub puncture_indexes: [u8; 4],
    /// Padding bits filling the sub-channel after the punctured tail.
    pub nb_padding_bits: u16,
}

/// The sub-channel size table for unequal error protection, indexed by the table index
/// signalled in FIG 0/1.
pub const UEP_TABLE: [UepEntry; 64] = [
    UepEntry { size:  16, bitrate_kbps:  32, protection_level: 5, nb_blocks: [  3,   4,  17,   0], puncture_indexes: [ 5,  3,  2,  0], nb_padding_bits: 0 },
    UepEntry { size:  21, bitrate_kbps:  32, protection_level: 4, nb_blocks: [  3,   3,  18,   0], puncture_indexes: [11,  6,  5,  0], nb_padding_bits: 0 },
    UepEntry { size:  24, bitrate_kbps:  32, protection_level: 3, nb_blocks: [  3,   4,  14,   3], puncture_indexes: [15,  9,  6,  8], nb_padding_bits: 0 },
    UepEntry { size:  29, bitrate_kbps:  32, protection_level: 2, nb_blocks: [  3,   4,  14,   3], puncture_indexes: [22, 13,  8, 13], nb_padding_bits: 0 },
    UepEntry { size:  35, bitrate_kbps:  32, protection_level: 1, nb_blocks: [  3,   5,  13,   3], puncture_indexes: [24, 17, 12, 17], nb_padding_bits: 4 },
    UepEntry { size:  24, bitrate_kbps:  48, protection_level: 5, nb_blocks: [  4,   3,  26,   3], puncture_indexes: [ 5,  4,  2,  3], nb_padding_bits: 0 },
    UepEntry { size:  29, bitrate_kbps:  48, protection_level: 4, nb_blocks: [  3,   4,  26,   3], puncture_indexes: [ 9,  6,  4,  6], nb_padding_bits: 0 },
    UepEntry { size:  35, bitrate_kbps:  48, protection_level: 3, nb_blocks: [  3,   4,  26,   3], puncture_indexes: [15, 10,  6,  9], nb_padding_bits: 4 },
    UepEntry { size:  42, bitrate_kbps:  48, protection_level: 2, nb_blocks: [  3,   4,  26,   3], puncture_indexes: [24, 14,  8, 15], nb_padding_bits: 0 },
    UepEntry { size:  52, bitrate_kbps:  48, protection_level: 1, nb_blocks: [  3,   5,  25,   3], puncture_indexes: [24, 18, 13, 18], nb_padding_bits: 0 },
    UepEntry { size:  29, bitrate_kbps:  56, protection_level: 5, nb_blocks: [  6,  10,  23,   3], puncture_indexes: [ 5,  4,  2,  3], nb_padding_bits: 0 },
    UepEntry { size:  35, bitrate_kbps:  56, protection_level: 4, nb_blocks: [  6,  10,  23,   3], puncture_indexes: [ 9,  6,  4,  5], nb_padding_bits: 0 },
    UepEntry { size:  42, bitrate_kbps:  56, protection_level: 3, nb_blocks: [  6,  12,  21,   3], puncture_indexes: [16,  7,  6,  9], nb_padding_bits: 0 },
    UepEntry { size:  52, bitrate_kbps:  56, protection_level: 2, nb_blocks: [  6,  10,  23,   3], puncture_indexes: [23, 13,  8, 13], nb_padding_bits: 8 },
    UepEntry { size:  32, bitrate_kbps:  64, protection_level: 5, nb_blocks: [  6,   9,  31,   2], puncture_indexes: [ 5,  3,  2,  3], nb_padding_bits: 0 },
    UepEntry { size:  42, bitrate_kbps:  64, protection_level: 4, nb_blocks: [  6,   9,  33,   0], puncture_indexes: [11,  6,  5,  0], nb_padding_bits: 0 },
    UepEntry { size:  48, bitrate_kbps:  64, protection_level: 3, nb_blocks: [  6,  12,  27,   3], puncture_indexes: [16,  8,  6,  9], nb_padding_bits: 0 },
    UepEntry { size:  58, bitrate_kbps:  64, protection_level: 2, nb_blocks: [  6,  10,  29,   3], puncture_indexes: [23, 13,  8, 13], nb_padding_bits: 8 },
    UepEntry { size:  70, bitrate_kbps:  64, protection_level: 1, nb_blocks: [  6,  11,  28,   3], puncture_indexes: [24, 18, 12, 18], nb_padding_bits: 4 },
    UepEntry { size:  40, bitrate_kbps:  80, protection_level: 5, nb_blocks: [  6,  10,  41,   3], puncture_indexes: [ 6,  3,  2,  3], nb_padding_bits: 0 },
    UepEntry { size:  52, bitrate_kbps:  80, protection_level: 4, nb_blocks: [  6,  10,  41,   3], puncture_indexes: [11,  6,  5,  6], nb_padding_bits: 0 },
    UepEntry { size:  58, bitrate_kbps:  80, protection_level: 3, nb_blocks: [  6,  11,  42,   1], puncture_indexes: [16,  8,  6,  9], nb_padding_bits: 0 },
    UepEntry { size:  70, bitrate_kbps:  80, protection_level: 2, nb_blocks: [  6,  10,  41,   3], puncture_indexes: [23, 13,  8, 13], nb_padding_bits: 8 },
    UepEntry { size:  84, bitrate_kbps:  80, protection_level: 1, nb_blocks: [  6,  10,  41,   3], puncture_indexes: [24, 17, 12, 18], nb_padding_bits: 4 },
    UepEntry { size:  48, bitrate_kbps:  96, protection_level: 5, nb_blocks: [  7,   9,  53,   3], puncture_indexes: [ 5,  4,  2,  4], nb_padding_bits: 0 },
    UepEntry { size:  58, bitrate_kbps:  96, protection_level: 4, nb_blocks: [  7,  10,  52,   3], puncture_indexes: [ 9,  6,  4,  6], nb_padding_bits: 0 },
    UepEntry { size:  70, bitrate_kbps:  96, protection_level: 3, nb_blocks: [  6,  12,  51,   3], puncture_indexes: [16,  9,  6, 10], nb_padding_bits: 4 },
    UepEntry { size:  84, bitrate_kbps:  96, protection_level: 2, nb_blocks: [  6,  10,  53,   3], puncture_indexes: [22, 12,  9, 12], nb_padding_bits: 0 },
    UepEntry { size: 104, bitrate_kbps:  96, protection_level: 1, nb_blocks: [  6,  13,  50,   3], puncture_indexes: [24, 18, 13, 19], nb_padding_bits: 0 },
    UepEntry { size:  58, bitrate_kbps: 112, protection_level: 5, nb_blocks: [ 14,  17,  50,   3], puncture_indexes: [ 5,  4,  2,  5], nb_padding_bits: 0 },
    UepEntry { size:  70, bitrate_kbps: 112, protection_level: 4, nb_blocks: [ 11,  21,  49,   3], puncture_indexes: [ 9,  6,  4,  8], nb_padding_bits: 0 },
    UepEntry { size:  84, bitrate_kbps: 112, protection_level: 3, nb_blocks: [ 11,  23,  47,   3], puncture_indexes: [16,  8,  6,  9], nb_padding_bits: 0 },
    UepEntry { size: 104, bitrate_kbps: 112, protection_level: 2, nb_blocks: [ 11,  21,  49,   3], puncture_indexes: [23, 12,  9, 14], nb_padding_bits: 4 },
    UepEntry { size:  64, bitrate_kbps: 128, protection_level: 5, nb_blocks: [ 12,  19,  62,   3], puncture_indexes: [ 5,  3,  2,  4], nb_padding_bits: 0 },
    UepEntry { size:  84, bitrate_kbps: 128, protection_level: 4, nb_blocks: [ 11,  21,  61,   3], puncture_indexes: [11,  6,  5,  7], nb_padding_bits: 0 },
    UepEntry { size:  96, bitrate_kbps: 128, protection_level: 3, nb_blocks: [ 11,  22,  60,   3], puncture_indexes: [16,  9,  6, 10], nb_padding_bits: 4 },
    UepEntry { size: 116, bitrate_kbps: 128, protection_level: 2, nb_blocks: [ 11,  21,  61,   3], puncture_indexes: [22, 12,  9, 14], nb_padding_bits: 0 },
    UepEntry { size: 140, bitrate_kbps: 128, protection_level: 1, nb_blocks: [ 11,  20,  62,   3], puncture_indexes: [24, 17, 13, 19], nb_padding_bits: 8 },
    UepEntry { size:  80, bitrate_kbps: 160, protection_level: 5, nb_blocks: [ 11,  19,  87,   3], puncture_indexes: [ 5,  4,  2,  4], nb_padding_bits: 0 },
    UepEntry { size: 104, bitrate_kbps: 160, protection_level: 4, nb_blocks: [ 11,  23,  83,   3], puncture_indexes: [11,  6,  5,  9], nb_padding_bits: 0 },
    UepEntry { size: 116, bitrate_kbps: 160, protection_level: 3, nb_blocks: [ 11,  24,  82,   3], puncture_indexes: [16,  8,  6, 11], nb_padding_bits: 0 },
    UepEntry { size: 140, bitrate_kbps: 160, protection_level: 2, nb_blocks: [ 11,  21,  85,   3], puncture_indexes: [22, 11,  9, 13], nb_padding_bits: 0 },
    UepEntry { size: 168, bitrate_kbps: 160, protection_level: 1, nb_blocks: [ 11,  22,  84,   3], puncture_indexes: [24, 18, 12, 19], nb_padding_bits: 0 },
    UepEntry { size:  96, bitrate_kbps: 192, protection_level: 5, nb_blocks: [ 11,  20, 110,   3], puncture_indexes: [ 6,  4,  2,  5], nb_padding_bits: 0 },
    UepEntry { size: 116, bitrate_kbps: 192, protection_level: 4, nb_blocks: [ 11,  22, 108,   3], puncture_indexes: [10,  6,  4,  9], nb_padding_bits: 0 },
    UepEntry { size: 140, bitrate_kbps: 192, protection_level: 3, nb_blocks: [ 11,  24, 106,   3], puncture_indexes: [16, 10,  6, 11], nb_padding_bits: 0 },
    UepEntry { size: 168, bitrate_kbps: 192, protection_level: 2, nb_blocks: [ 11,  20, 110,   3], puncture_indexes: [22, 13,  9, 13], nb_padding_bits: 8 },
    UepEntry { size: 208, bitrate_kbps: 192, protection_level: 1, nb_blocks: [ 11,  21, 109,   3], puncture_indexes: [24, 20, 13, 24], nb_padding_bits: 0 },
    UepEntry { size: 116, bitrate_kbps: 224, protection_level: 5, nb_blocks: [ 12,  22, 131,   3], puncture_indexes: [ 8,  6,  2,  6], nb_padding_bits: 4 },
    UepEntry { size: 140, bitrate_kbps: 224, protection_level: 4, nb_blocks: [ 12,  26, 127,   3], puncture_indexes: [12,  8,  4, 11], nb_padding_bits: 0 },
    UepEntry { size: 168, bitrate_kbps: 224, protection_level: 3, nb_blocks: [ 11,  20, 134,   3], puncture_indexes: [16, 10,  7,  9], nb_padding_bits: 0 },
    UepEntry { size: 208, bitrate_kbps: 224, protection_level: 2, nb_blocks: [ 11,  22, 132,   3], puncture_indexes: [24, 16, 10, 15], nb_padding_bits: 0 },
    UepEntry { size: 232, bitrate_kbps: 224, protection_level: 1, nb_blocks: [ 11,  24, 130,   3], puncture_indexes: [24, 20, 12, 20], nb_padding_bits: 4 },
    UepEntry { size: 128, bitrate_kbps: 256, protection_level: 5, nb_blocks: [ 11,  24, 154,   3], puncture_indexes: [ 6,  5,  2,  5], nb_padding_bits: 0 },
    UepEntry { size: 168, bitrate_kbps: 256, protection_level: 4, nb_blocks: [ 11,  24, 154,   3], puncture_indexes: [12,  9,  5, 10], nb_padding_bits: 4 },
    UepEntry { size: 192, bitrate_kbps: 256, protection_level: 3, nb_blocks: [ 11,  27, 151,   3], puncture_indexes: [16, 10,  7, 10], nb_padding_bits: 0 },
    UepEntry { size: 232, bitrate_kbps: 256, protection_level: 2, nb_blocks: [ 11,  22, 156,   3], puncture_indexes: [24, 14, 10, 13], nb_padding_bits: 8 },
    UepEntry { size: 280, bitrate_kbps: 256, protection_level: 1, nb_blocks: [ 11,  26, 152,   3], puncture_indexes: [24, 19, 14, 18], nb_padding_bits: 4 },
    UepEntry { size: 160, bitrate_kbps: 320, protection_level: 5, nb_blocks: [ 11,  26, 200,   3], puncture_indexes: [ 8,  5,  2,  6], nb_padding_bits: 4 },
    UepEntry { size: 208, bitrate_kbps: 320, protection_level: 4, nb_blocks: [ 11,  25, 201,   3], puncture_indexes: [13,  9,  5, 10], nb_padding_bits: 8 },
    UepEntry { size: 280, bitrate_kbps: 320, protection_level: 2, nb_blocks: [ 11,  26, 200,   3], puncture_indexes: [24, 17,  9, 17], nb_padding_bits: 0 },
    UepEntry { size: 192, bitrate_kbps: 384, protection_level: 5, nb_blocks: [ 11,  27, 247,   3], puncture_indexes: [ 8,  6,  2,  7], nb_padding_bits: 0 },
    UepEntry { size: 280, bitrate_kbps: 384, protection_level: 3, nb_blocks: [ 11,  24, 250,   3], puncture_indexes: [16,  9,  7, 10], nb_padding_bits: 4 },
    UepEntry { size: 416, bitrate_kbps: 384, protection_level: 1, nb_blocks: [ 12,  28, 245,   3], puncture_indexes: [24, 20, 14, 23], nb_padding_bits: 8 },
];

/// One depuncturing zone of a logical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunctureZone {
    /// Puncturing vector index 1..=24.
    pub puncture_index: u8,
    /// Zone length in 128 symbol blocks.
    pub nb_blocks: usize,
}

/// Fully resolved depuncturing plan for a sub-channel's logical frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunctureProfile {
    pub zones: Vec<PunctureZone>,
    /// Padding bits after the punctured tail that fill the sub-channel capacity.
    pub nb_padding_bits: usize,
    /// Sub-channel size in capacity units.
    pub nb_capacity_units: usize,
    pub bitrate_kbps: usize,
}

impl PunctureProfile {
    /// Total zone length in 128 symbol blocks.
    pub fn nb_total_blocks(&self) -> usize {
        self.zones.iter().map(|zone| zone.nb_blocks).sum()
    }

    /// Number of mother code symbols the Viterbi decoder must produce per frame,
    /// including the flush tail.
    pub fn nb_mother_symbols(&self) -> usize {
        self.nb_total_blocks() * NB_BLOCK_SYMBOLS + NB_TAIL_SYMBOLS
    }

    /// Number of transmitted bits consumed per frame, excluding padding.
    pub fn nb_transmitted_bits(&self) -> usize {
        let zone_bits: usize = self
            .zones
            .iter()
            .map(|zone| zone.nb_blocks * 4 * (8 + zone.puncture_index as usize))
            .sum();
        zone_bits + NB_TAIL_TRANSMITTED_BITS
    }

    /// Number of soft decision bits of the sub-channel in each CIF.
    pub fn nb_subchannel_bits(&self) -> usize {
        self.nb_capacity_units * 64
    }

    /// Number of decoded bytes per logical frame.
    pub fn nb_decoded_bytes(&self) -> usize {
        self.nb_total_blocks() * 4
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtectionProfileError {
    #[error("UEP table switch {0} is not defined")]
    UnknownUepTableSwitch(u8),
    #[error("UEP table index {0} is outside the 64 entry table")]
    UepIndexOutOfRange(u8),
    #[error("EEP protection level {0} is outside 1..=4")]
    EepLevelOutOfRange(u8),
    #[error("EEP sub-channel size {size} is not a multiple of {multiple} capacity units")]
    EepSizeNotMultiple { size: u16, multiple: u16 },
}

/// Resolves a protection descriptor from FIG 0/1 into a depuncturing plan.
pub fn get_puncture_profile(
    protection: &SubchannelProtection,
) -> Result<PunctureProfile, ProtectionProfileError> {
    match *protection {
        SubchannelProtection::Uep { table_switch, table_index } => {
            if table_switch != 0 {
                return Err(ProtectionProfileError::UnknownUepTableSwitch(table_switch));
            }
            let entry = UEP_TABLE
                .get(usize::from(table_index))
                .ok_or(ProtectionProfileError::UepIndexOutOfRange(table_index))?;
            let zones = izip!(entry.nb_blocks.iter(), entry.puncture_indexes.iter())
                .filter(|(&nb_blocks, &index)| nb_blocks > 0 && index > 0)
                .map(|(&nb_blocks, &index)| PunctureZone {
                    puncture_index: index,
                    nb_blocks: usize::from(nb_blocks),
                })
                .collect();
            Ok(PunctureProfile {
                zones,
                nb_padding_bits: usize::from(entry.nb_padding_bits),
                nb_capacity_units: usize::from(entry.size),
                bitrate_kbps: usize::from(entry.bitrate_kbps),
            })
        }
        SubchannelProtection::Eep { option, level, size } => get_eep_profile(option, level, size),
    }
}

fn get_eep_profile(
    option: EepOption,
    level: u8,
    size: u16,
) -> Result<PunctureProfile, ProtectionProfileError> {
    let multiple = match (option, level) {
        (EepOption::A, 1) => 12,
        (EepOption::A, 2) => 8,
        (EepOption::A, 3) => 6,
        (EepOption::A, 4) => 4,
        (EepOption::B, 1) => 27,
        (EepOption::B, 2) => 21,
        (EepOption::B, 3) => 18,
        (EepOption::B, 4) => 15,
        (_, level) => return Err(ProtectionProfileError::EepLevelOutOfRange(level)),
    };
    if size == 0 || size % multiple != 0 {
        return Err(ProtectionProfileError::EepSizeNotMultiple { size, multiple });
    }
    let n = usize::from(size / multiple);

    let (l1, l2, pi1, pi2) = match (option, level) {
        (EepOption::A, 1) => (6 * n - 3, 3, 24, 23),
        // The lowest rate of set A has a dedicated profile at 8 kbps.
        (EepOption::A, 2) if n == 1 => (5, 1, 13, 12),
        (EepOption::A, 2) => (2 * n - 3, 4 * n + 3, 14, 13),
        (EepOption::A, 3) => (6 * n - 3, 3, 8, 7),
        (EepOption::A, 4) => (4 * n - 3, 2 * n + 3, 3, 2),
        (EepOption::B, 1) => (24 * n - 3, 3, 10, 9),
        (EepOption::B, 2) => (24 * n - 3, 3, 6, 5),
        (EepOption::B, 3) => (24 * n - 3, 3, 4, 3),
        (EepOption::B, 4) => (24 * n - 3, 3, 2, 1),
        (_, level) => return Err(ProtectionProfileError::EepLevelOutOfRange(level)),
    };

    let bitrate_kbps = match option {
        EepOption::A => 8 * n,
        EepOption::B => 32 * n,
    };

    Ok(PunctureProfile {
        zones: vec![
            PunctureZone { puncture_index: pi1 as u8, nb_blocks: l1 },
            PunctureZone { puncture_index: pi2 as u8, nb_blocks: l2 },
        ],
        nb_padding_bits: 0,
        nb_capacity_units: usize::from(size),
        bitrate_kbps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_profile_fills_capacity(profile: &PunctureProfile) {
        assert_eq!(
            profile.nb_transmitted_bits() + profile.nb_padding_bits,
            profile.nb_subchannel_bits(),
            "profile {:?} does not fill its capacity units",
            profile
        );
        // The decoded frame must carry exactly bitrate * 24 ms bits.
        assert_eq!(profile.nb_decoded_bytes() * 8, profile.bitrate_kbps * 24);
    }

    #[test]
    fn every_uep_row_fills_its_capacity() {
        for table_index in 0..64u8 {
            let protection = SubchannelProtection::Uep { table_switch: 0, table_index };
            let profile = get_puncture_profile(&protection).unwrap();
            assert_profile_fills_capacity(&profile);
        }
    }

    #[test]
    fn uep_rows_scale_with_bitrate() {
        for entry in UEP_TABLE.iter() {
            let nb_blocks: u16 = entry.nb_blocks.iter().sum();
            assert_eq!(usize::from(nb_blocks), usize::from(entry.bitrate_kbps) * 3 / 4);
        }
    }

    #[test]
    fn eep_profiles_fill_their_capacity() {
        let sizes_a = [(1u8, 12u16), (2, 8), (3, 6), (4, 4)];
        for (level, multiple) in sizes_a {
            for n in 1..=8u16 {
                let protection = SubchannelProtection::Eep {
                    option: EepOption::A,
                    level,
                    size: multiple * n,
                };
                let profile = get_puncture_profile(&protection).unwrap();
                assert_profile_fills_capacity(&profile);
            }
        }
        let sizes_b = [(1u8, 27u16), (2, 21), (3, 18), (4, 15)];
        for (level, multiple) in sizes_b {
            for n in 1..=6u16 {
                let protection = SubchannelProtection::Eep {
                    option: EepOption::B,
                    level,
                    size: multiple * n,
                };
                let profile = get_puncture_profile(&protection).unwrap();
                assert_profile_fills_capacity(&profile);
            }
        }
    }

    #[test]
    fn impossible_combinations_are_rejected() {
        let protection = SubchannelProtection::Eep { option: EepOption::A, level: 3, size: 7 };
        assert_eq!(
            get_puncture_profile(&protection),
            Err(ProtectionProfileError::EepSizeNotMultiple { size: 7, multiple: 6 })
        );

        let protection = SubchannelProtection::Eep { option: EepOption::A, level: 5, size: 12 };
        assert_eq!(
            get_puncture_profile(&protection),
            Err(ProtectionProfileError::EepLevelOutOfRange(5))
        );

        let protection = SubchannelProtection::Uep { table_switch: 1, table_index: 0 };
        assert_eq!(
            get_puncture_profile(&protection),
            Err(ProtectionProfileError::UnknownUepTableSwitch(1))
        );
    }

    #[test]
    fn known_eep_profile_shapes() {
        // EEP 3-A at 8 kbps: six blocks split 3/3 with vectors 8 and 7.
        let protection = SubchannelProtection::Eep { option: EepOption::A, level: 3, size: 6 };
        let profile = get_puncture_profile(&protection).unwrap();
        assert_eq!(profile.zones, vec![
            PunctureZone { puncture_index: 8, nb_blocks: 3 },
            PunctureZone { puncture_index: 7, nb_blocks: 3 },
        ]);
        assert_eq!(profile.nb_decoded_bytes(), 24);

        // EEP 1-B at 32 kbps.
        let protection = SubchannelProtection::Eep { option: EepOption::B, level: 1, size: 27 };
        let profile = get_puncture_profile(&protection).unwrap();
        assert_eq!(profile.zones, vec![
            PunctureZone { puncture_index: 10, nb_blocks: 21 },
            PunctureZone { puncture_index: 9, nb_blocks: 3 },
        ]);
        assert_eq!(profile.bitrate_kbps, 32);
    }
}

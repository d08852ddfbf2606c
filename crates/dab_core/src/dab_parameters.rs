use crate::dab_transmission_modes::DabTransmissionMode;

/// Parameters describing the logical layer of a digital audio broadcast (DAB) ensemble.
///
/// # Common acronyms
/// | Acronym | Phrase | Description |
/// | ------- | ------ | ----------- |
/// | FIC | Fast Information Channel | Carries metadata about the ensemble's structure including channel descriptions. |
/// | MSC | Main Service Channel | Carries radio data for each channel in the ensemble. |
/// | CIF | Common Interleaved Frame | The main service channel is transmitted as a series of interleaved frames that need to be deinterleaved. |
/// | FIB | Fast Information Block | The fast information channel is transmitted as groups of consecutive blocks. |
///
/// # Diagram of a DAB frame
/// This is a mode I transmission frame as seen by the logical layer.
/// ```text
/// | Frame                   |
/// | FIC         | MSC       |
/// | [FIB*3]*4   | CIF*4     |
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DabParameters {
    /// Number of soft decision bits in each transmission frame.
    pub nb_frame_bits: usize,
    /// Number of soft decision bits for the fast information channel (FIC).
    pub nb_fic_bits: usize,
    /// Number of soft decision bits for the main service channel (MSC).
    pub nb_msc_bits: usize,
    /// Number of common interleaved frames (CIF) in the MSC.
    pub nb_cifs: usize,
    /// Number of soft decision bits per CIF. This is constant across all transmission modes.
    pub nb_cif_bits: usize,
    /// Number of fast information blocks (FIB) in the FIC.
    pub nb_fibs: usize,
    /// Number of FIBs that share one convolutionally coded block. One FIB group is decoded per CIF.
    pub nb_fibs_per_group: usize,
    /// Number of FIB groups in the FIC. This is equal to the number of CIFs.
    pub nb_fib_groups: usize,
    /// Number of soft decision bits per FIB group.
    pub nb_fib_group_bits: usize,
}

/// Number of bits in a CIF. A CIF carries 864 capacity units of 64 bits each.
pub const NB_CIF_BITS: usize = 55296;

/// Number of capacity units (CU) in a CIF.
pub const NB_CIF_CAPACITY_UNITS: usize = 864;

/// Number of bits in a capacity unit.
pub const NB_CAPACITY_UNIT_BITS: usize = 64;

/// Returns the logical layer parameters for a given transmission mode.
pub fn get_dab_parameters(transmission_mode: DabTransmissionMode) -> DabParameters {
    // nb_fib_group_bits is larger in mode III where four FIBs share a coded block.
    let (nb_cifs, nb_fibs, nb_fibs_per_group, nb_fib_group_bits) = match transmission_mode {
        DabTransmissionMode::I   => (4, 12, 3, 2304),
        DabTransmissionMode::II  => (1,  3, 3, 2304),
        DabTransmissionMode::III => (1,  4, 4, 3072),
        DabTransmissionMode::IV  => (2,  6, 3, 2304),
    };

    let nb_fib_groups = nb_fibs/nb_fibs_per_group;
    let nb_fic_bits = nb_fib_groups*nb_fib_group_bits;
    let nb_msc_bits = nb_cifs*NB_CIF_BITS;

    let params = DabParameters {
        nb_frame_bits: nb_fic_bits + nb_msc_bits,
        nb_fic_bits,
        nb_msc_bits,
        nb_cifs,
        nb_cif_bits: NB_CIF_BITS,
        nb_fibs,
        nb_fibs_per_group,
        nb_fib_groups,
        nb_fib_group_bits,
    };

    assert!(params.nb_fibs % params.nb_fibs_per_group == 0, "The number of FIBs must be a multiple of the FIB group size");
    assert!(params.nb_fib_groups == params.nb_cifs, "One FIB group must be decoded for each CIF");
    assert!(params.nb_cif_bits == NB_CIF_CAPACITY_UNITS*NB_CAPACITY_UNIT_BITS, "A CIF must be an integer number of capacity units");

    params
}

use log::{debug, error};

use crate::database::ensemble_database::EnsembleDatabase;
use crate::fic::fig_0_extensions;

/// Number of data bytes in a fast information block after its CRC has been stripped.
pub const NB_FIB_DATA_BYTES: usize = 30;

/// Header fields shared by every FIG type 0 extension.
#[derive(Debug, Clone, Copy)]
pub struct FigHeaderType0 {
    pub cn: bool,
    pub oe: bool,
    pub pd: bool,
}

/// Walks the 30 data bytes of a FIB as a concatenation of fast information groups and
/// dispatches each one. Records from valid FIGs are committed to the database even if a
/// later FIG in the same FIB is malformed.
pub fn process_fig_block(buf: &[u8], database: &mut EnsembleDatabase) {
    assert!(buf.len() == NB_FIB_DATA_BYTES);

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let nb_remain_bytes = buf.len() - curr_byte;

        let header = buf[curr_byte];
        // Delimiter byte, any remaining bytes are padding.
        if header == 0xFF {
            return;
        }

        let fig_type = (header & 0b1110_0000) >> 5;
        let fig_data_length = usize::from(header & 0b0001_1111);
        let fig_length = fig_data_length + 1;

        if fig_length > nb_remain_bytes {
            error!("fig specified length overflows buffer ({}/{})", fig_length, nb_remain_bytes);
            return;
        }

        let fig_buf = &buf[curr_byte + 1..curr_byte + fig_length];
        curr_byte += fig_length;

        match fig_type {
            // Multiplex configuration and part of the service information.
            0 => process_fig_type_0(fig_buf, database),
            // Labels.
            1 => process_fig_type_1(fig_buf),
            // Labels in their extended form.
            2 => process_fig_type_2(fig_buf),
            // Conditional access.
            6 => process_fig_type_6(fig_buf),
            // End marker. Present when the FIB is not completely filled.
            7 => return,
            // 3, 4 and 5 are reserved.
            reserved => {
                error!("invalid fig type ({})", reserved);
                return;
            }
        }
    }
}

fn process_fig_type_0(buf: &[u8], database: &mut EnsembleDatabase) {
    if buf.is_empty() {
        error!("fig 0 missing descriptor byte");
        return;
    }

    let descriptor = buf[0];
    let header = FigHeaderType0 {
        cn: (descriptor & 0b1000_0000) != 0,
        oe: (descriptor & 0b0100_0000) != 0,
        pd: (descriptor & 0b0010_0000) != 0,
    };
    let extension = descriptor & 0b0001_1111;
    let field_buf = &buf[1..];

    match extension {
        // Ensemble information.
        0 => fig_0_extensions::process_ext_0(header, field_buf, database),
        // Sub-channel organisation in stream mode.
        1 => fig_0_extensions::process_ext_1(header, field_buf, database),
        // Service and service component information in stream mode.
        2 => fig_0_extensions::process_ext_2(header, field_buf, database),
        // Service component information in packet mode.
        3 => fig_0_extensions::process_ext_3(header, field_buf, database),
        // Service component information in stream mode with conditional access.
        4 => fig_0_extensions::process_ext_4(header, field_buf, database),
        // Service linking information.
        6 => fig_0_extensions::process_ext_6(header, field_buf, database),
        // Configuration information.
        7 => fig_0_extensions::process_ext_7(header, field_buf, database),
        // Service component global definition.
        8 => fig_0_extensions::process_ext_8(header, field_buf, database),
        // Country, local time offset and international table.
        9 => fig_0_extensions::process_ext_9(header, field_buf, database),
        // Date and time.
        10 => fig_0_extensions::process_ext_10(header, field_buf, database),
        // User application information.
        13 => fig_0_extensions::process_ext_13(header, field_buf, database),
        // FEC scheme for packet mode sub-channels.
        14 => fig_0_extensions::process_ext_14(header, field_buf, database),
        // Programme type.
        17 => fig_0_extensions::process_ext_17(header, field_buf, database),
        // Frequency information.
        21 => fig_0_extensions::process_ext_21(header, field_buf, database),
        // Other ensemble services.
        24 => fig_0_extensions::process_ext_24(header, field_buf, database),
        other => {
            debug!("fig 0/{} not handled L={}", other, field_buf.len());
        }
    }
}

fn process_fig_type_1(buf: &[u8]) {
    if buf.is_empty() {
        error!("fig 1 missing descriptor byte");
        return;
    }
    let descriptor = buf[0];
    let charset = (descriptor & 0b1111_0000) >> 4;
    let extension = descriptor & 0b0000_0111;
    debug!("fig 1/{} charset={} L={}", extension, charset, buf.len());
}

fn process_fig_type_2(buf: &[u8]) {
    if buf.is_empty() {
        error!("fig 2 missing descriptor byte");
        return;
    }
    let descriptor = buf[0];
    let toggle_flag = (descriptor & 0b1000_0000) >> 7;
    let segment_index = (descriptor & 0b0111_0000) >> 4;
    let extension = descriptor & 0b0000_0111;
    debug!(
        "fig 2/{} toggle={} segment_index={} L={}",
        extension, toggle_flag, segment_index, buf.len()
    );
}

fn process_fig_type_6(buf: &[u8]) {
    if buf.is_empty() {
        error!("fig 6 missing descriptor byte");
        return;
    }
    let descriptor = buf[0];
    let cn = (descriptor & 0b0100_0000) >> 6;
    let oe = (descriptor & 0b0010_0000) >> 5;
    let pd = (descriptor & 0b0001_0000) >> 4;
    let lef = (descriptor & 0b0000_1000) >> 3;
    let short_ca_sys_id = descriptor & 0b0000_0111;
    debug!(
        "fig 6 cn={} oe={} pd={} lef={} ca_sys_id={} L={}",
        cn, oe, pd, lef, short_ca_sys_id, buf.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::SubchannelProtection;

    fn block_from(figs: &[&[u8]]) -> [u8; NB_FIB_DATA_BYTES] {
        let mut block = [0xFFu8; NB_FIB_DATA_BYTES];
        let mut index = 0;
        for fig in figs {
            block[index..index + fig.len()].copy_from_slice(fig);
            index += fig.len();
        }
        block
    }

    #[test]
    fn ensemble_information_is_parsed() {
        // FIG 0/0 with the descriptor byte followed by a 4 byte field.
        let fig = [0x05, 0x00, 0x40, 0x12, 0xC0, 0x7B];
        let block = block_from(&[&fig]);
        let mut database = EnsembleDatabase::new();
        process_fig_block(&block, &mut database);

        let ensemble = &database.ensemble;
        assert_eq!(ensemble.id.country_id, 4);
        assert_eq!(ensemble.id.ensemble_reference, 0x012);
        assert_eq!(ensemble.change_flags, 3);
        assert!(!ensemble.alarm_flag);
        assert_eq!(ensemble.cif_counter, 123);
    }

    #[test]
    fn fig_filling_the_block_exactly_is_parsed() {
        // Type 0 extension 1 with nine 3 byte records fills all 30 bytes.
        let mut block = [0u8; NB_FIB_DATA_BYTES];
        block[0] = 0x1C; // type 0, 28 data bytes
        block[1] = 0x01; // extension 1
        for i in 0..9 {
            let record = 2 + i * 3;
            block[record] = ((i as u8) + 1) << 2;
            block[record + 1] = 0x00;
            block[record + 2] = 0x08;
        }
        let mut database = EnsembleDatabase::new();
        process_fig_block(&block, &mut database);
        assert_eq!(database.subchannels.len(), 9);
    }

    #[test]
    fn overflowing_fig_length_is_rejected() {
        // A valid FIG 0/1 followed by a header whose declared length runs past the
        // end of the block. The first FIG's records must survive.
        let mut block = [0u8; NB_FIB_DATA_BYTES];
        let fig = [0x04, 0x01, 0x14, 0x00, 0x08];
        block[..fig.len()].copy_from_slice(&fig);
        block[5] = 0x1D; // type 0, 29 data bytes, but only 25 remain
        let mut database = EnsembleDatabase::new();
        process_fig_block(&block, &mut database);
        assert_eq!(database.subchannels.len(), 1);
    }

    #[test]
    fn reserved_fig_type_aborts_the_walk() {
        let mut database = EnsembleDatabase::new();
        // Type 3 is reserved; the FIG 0/1 after it must not be reached.
        let reserved = [0x61, 0x00];
        let fig01 = [0x04, 0x01, 0x14, 0x00, 0x08];
        let block = block_from(&[&reserved, &fig01]);
        process_fig_block(&block, &mut database);
        assert!(database.subchannels.is_empty());
    }

    #[test]
    fn uep_subchannel_reaches_the_database() {
        // FIG 0/1 short form: subchannel 5, start address 0, table index 8.
        let fig = [0x04, 0x01, 0x14, 0x00, 0x08];
        let block = block_from(&[&fig]);
        let mut database = EnsembleDatabase::new();
        process_fig_block(&block, &mut database);

        let subchannel = database.subchannels.get(&5).expect("subchannel 5 should be present");
        assert_eq!(subchannel.start_address, 0);
        assert_eq!(
            subchannel.protection,
            SubchannelProtection::Uep { table_switch: 0, table_index: 8 }
        );
    }
}

//! Parsers for the FIG type 0 extensions.
//!
//! Every parser validates all length fields before committing anything, so a malformed
//! FIG leaves the database untouched while earlier FIGs from the same FIB remain valid.

use log::{debug, error};

use crate::database::ensemble_database::{EnsembleDatabase, GlobalComponentReference};
use crate::database::entities::*;
use crate::fic::fig_processor::FigHeaderType0;

fn read_service_id(pd: bool, buf: &[u8]) -> Option<(ServiceId, Option<u8>, usize)> {
    if pd {
        if buf.len() < 4 {
            return None;
        }
        let (id, ecc) = ServiceId::from_long_form(&buf[0..4]);
        Some((id, Some(ecc), 4))
    } else {
        if buf.len() < 2 {
            return None;
        }
        Some((ServiceId::from_short_form(&buf[0..2]), None, 2))
    }
}

/// Ensemble information with the CIF counter and change/alarm flags.
pub fn process_ext_0(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    // The occurrence change byte is nominally present when the change flags are set,
    // but live ensembles regularly omit it. Accept both field lengths.
    if buf.len() != 4 && buf.len() != 5 {
        error!("fig 0/0 length doesn't match expectations ({})", buf.len());
        return;
    }

    let id = EnsembleId::from_bytes([buf[0], buf[1]]);
    let change_flags = (buf[2] & 0b1100_0000) >> 6;
    let alarm_flag = (buf[2] & 0b0010_0000) != 0;
    // CIF counter modulo 5000: a modulo 20 upper count and a modulo 250 lower count.
    let cif_upper = buf[2] & 0b0001_1111;
    let cif_lower = buf[3];
    let occurrence_change = if buf.len() == 5 { buf[4] } else { 0x00 };

    let cif_counter = u16::from(cif_upper) * 250 + u16::from(cif_lower);
    debug!(
        "fig 0/0 country_id={} ensemble_ref={} change={} alarm={} cif={}|{}",
        id.country_id, id.ensemble_reference, change_flags, alarm_flag, cif_upper, cif_lower
    );
    database.update_ensemble_information(id, change_flags, alarm_flag, cif_counter, occurrence_change);
}

/// Sub-channel organisation for stream mode.
pub fn process_ext_1(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    let mut subchannels = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let data = &buf[curr_byte..];
        if data.len() < 3 {
            error!("fig 0/1 remaining bytes cannot hold a record ({})", data.len());
            return;
        }

        let subchannel_id = (data[0] & 0b1111_1100) >> 2;
        let start_address = (u16::from(data[0] & 0b0000_0011) << 8) | u16::from(data[1]);

        let is_long_form = (data[2] & 0b1000_0000) != 0;
        let nb_data_bytes = if is_long_form { 4 } else { 3 };
        if nb_data_bytes > data.len() {
            error!("fig 0/1 long form field cannot fit in remaining length");
            return;
        }

        let protection = if !is_long_form {
            let table_switch = (data[2] & 0b0100_0000) >> 6;
            let table_index = data[2] & 0b0011_1111;
            SubchannelProtection::Uep { table_switch, table_index }
        } else {
            let option = (data[2] & 0b0111_0000) >> 4;
            let protection_level = (data[2] & 0b0000_1100) >> 2;
            let size = (u16::from(data[2] & 0b0000_0011) << 8) | u16::from(data[3]);
            let option = match option {
                0b000 => EepOption::A,
                0b001 => EepOption::B,
                other => {
                    error!("fig 0/1 unknown eep option ({})", other);
                    return;
                }
            };
            SubchannelProtection::Eep { option, level: protection_level + 1, size }
        };

        debug!(
            "fig 0/1 subchannel_id={} start_addr={} protection={:?}",
            subchannel_id, start_address, protection
        );
        subchannels.push(Subchannel { id: subchannel_id, start_address, protection, fec_scheme: None });
        curr_byte += nb_data_bytes;
    }

    for subchannel in subchannels {
        database.update_subchannel(subchannel);
    }
}

/// Service to service component mapping for stream mode.
pub fn process_ext_2(header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    let mut services = Vec::new();
    let mut components = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let service_buf = &buf[curr_byte..];
        let Some((service_id, ecc, nb_id_bytes)) = read_service_id(header.pd, service_buf) else {
            error!("fig 0/2 message not long enough for service identifier");
            return;
        };
        if service_buf.len() < nb_id_bytes + 1 {
            error!("fig 0/2 message not long enough for service descriptor");
            return;
        }

        let descriptor = service_buf[nb_id_bytes];
        let conditional_access_id = (descriptor & 0b0111_0000) >> 4;
        let nb_service_components = usize::from(descriptor & 0b0000_1111);

        let nb_header_bytes = nb_id_bytes + 1;
        let nb_length_bytes = nb_header_bytes + 2 * nb_service_components;
        if nb_length_bytes > service_buf.len() {
            error!("fig 0/2 message not long enough for service components");
            return;
        }

        let components_buf = &service_buf[nb_header_bytes..nb_length_bytes];
        for (i, component) in components_buf.chunks_exact(2).enumerate() {
            let b0 = component[0];
            let b1 = component[1];
            let tmid = (b0 & 0b1100_0000) >> 6;
            let is_primary = (b1 & 0b0000_0010) != 0;
            let ca_flag = (b1 & 0b0000_0001) != 0;

            let transport_mode = match tmid {
                0b00 => TransportMode::StreamAudio {
                    subchannel_id: (b1 & 0b1111_1100) >> 2,
                    audio_type: b0 & 0b0011_1111,
                },
                0b01 => TransportMode::StreamData {
                    subchannel_id: (b1 & 0b1111_1100) >> 2,
                    data_type: b0 & 0b0011_1111,
                },
                0b11 => TransportMode::PacketData {
                    scid: (u16::from(b0 & 0b0011_1111) << 6) | (u16::from(b1 & 0b1111_1100) >> 2),
                },
                reserved => {
                    error!("fig 0/2 reserved tmid ({})", reserved);
                    return;
                }
            };

            debug!(
                "fig 0/2 country_id={} service_ref={} i={} transport={:?} primary={} ca={}",
                service_id.country_id, service_id.service_reference, i, transport_mode, is_primary, ca_flag
            );
            components.push(ServiceComponent {
                service_id,
                component_index: i as u8,
                transport_mode,
                is_primary,
                ca_flag,
                scids: None,
            });
        }

        services.push(Service {
            id: service_id,
            extended_country_code: ecc,
            conditional_access_id,
            programme_type: None,
        });
        curr_byte += nb_length_bytes;
    }

    for service in services {
        database.update_service(service);
    }
    for component in components {
        database.update_service_component(component);
    }
}

/// Service components carried in packet mode.
pub fn process_ext_3(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    const NB_COMPONENT_BYTES: usize = 7;
    if buf.len() % NB_COMPONENT_BYTES != 0 {
        error!("fig 0/3 field must be a multiple of {} bytes", NB_COMPONENT_BYTES);
        return;
    }

    let mut components = Vec::new();
    for b in buf.chunks_exact(NB_COMPONENT_BYTES) {
        let scid = (u16::from(b[0]) << 4) | (u16::from(b[1] & 0b1111_0000) >> 4);
        let dg_flag = (b[2] & 0b1000_0000) != 0;
        let data_type = b[2] & 0b0011_1111;
        let subchannel_id = (b[3] & 0b1111_1100) >> 2;
        let packet_address = (u16::from(b[3] & 0b0000_0011) << 8) | u16::from(b[4]);
        let ca_org = u16::from_be_bytes([b[5], b[6]]);

        debug!(
            "fig 0/3 scid={} dg={} data_type={} subchannel_id={} packet_address={}",
            scid, dg_flag, data_type, subchannel_id, packet_address
        );
        components.push(PacketComponent { scid, subchannel_id, packet_address, data_type, dg_flag, ca_org });
    }

    for component in components {
        database.update_packet_component(component);
    }
}

/// Service components in stream mode with conditional access.
pub fn process_ext_4(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    const NB_COMPONENT_BYTES: usize = 3;
    if buf.len() % NB_COMPONENT_BYTES != 0 {
        error!("fig 0/4 field must be a multiple of {} bytes", NB_COMPONENT_BYTES);
        return;
    }

    let mut components = Vec::new();
    for b in buf.chunks_exact(NB_COMPONENT_BYTES) {
        let subchannel_id = b[0] & 0b0011_1111;
        let ca_org = u16::from_be_bytes([b[1], b[2]]);
        debug!("fig 0/4 subchannel_id={} ca_org={}", subchannel_id, ca_org);
        components.push(ConditionalAccessComponent { subchannel_id, ca_org });
    }

    for component in components {
        database.update_ca_component(component);
    }
}

/// Service linking information. The id list takes one of three arrangements depending
/// on the programme/data flag and the international linkage flag.
pub fn process_ext_6(header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    const NB_HEADER_BYTES: usize = 2;
    let mut links = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let b = &buf[curr_byte..];
        if b.len() < NB_HEADER_BYTES {
            error!("fig 0/6 insufficient length for header ({})", b.len());
            return;
        }

        let id_list_flag = (b[0] & 0b1000_0000) != 0;
        let is_active = (b[0] & 0b0100_0000) != 0;
        let is_hard = (b[0] & 0b0010_0000) != 0;
        let is_international = (b[0] & 0b0001_0000) != 0;
        let linkage_set_number = (u16::from(b[0] & 0b0000_1111) << 8) | u16::from(b[1]);

        // The short form signals a change event for an existing linkage set.
        if !id_list_flag {
            debug!(
                "fig 0/6 lsn={} active={} hard={} international={}",
                linkage_set_number, is_active, is_hard, is_international
            );
            curr_byte += NB_HEADER_BYTES;
            continue;
        }

        if b.len() < NB_HEADER_BYTES + 1 {
            error!("fig 0/6 insufficient length for id list header");
            return;
        }
        let id_list_qualifier = (b[2] & 0b0110_0000) >> 5;
        let nb_ids = usize::from(b[2] & 0b0000_1111);
        let list_buf = &b[NB_HEADER_BYTES + 1..];

        let (ids, nb_list_bytes) = if !header.pd && !is_international {
            // Arrangement 1: 16 bit identifiers.
            let nb_list_bytes = 2 * nb_ids;
            if nb_list_bytes > list_buf.len() {
                error!("fig 0/6 insufficient length for type 1 id list");
                return;
            }
            let ids = list_buf[..nb_list_bytes]
                .chunks_exact(2)
                .map(|entry| LinkedServiceId::Id16(u16::from_be_bytes([entry[0], entry[1]])))
                .collect();
            (ids, nb_list_bytes)
        } else if !header.pd && is_international {
            // Arrangement 2: pairs of extended country code and 16 bit identifier.
            let nb_list_bytes = 3 * nb_ids;
            if nb_list_bytes > list_buf.len() {
                error!("fig 0/6 insufficient length for type 2 id list");
                return;
            }
            let ids = list_buf[..nb_list_bytes]
                .chunks_exact(3)
                .map(|entry| LinkedServiceId::EccId16 {
                    ecc: entry[0],
                    id: u16::from_be_bytes([entry[1], entry[2]]),
                })
                .collect();
            (ids, nb_list_bytes)
        } else {
            // Arrangement 3: 32 bit identifiers.
            let nb_list_bytes = 4 * nb_ids;
            if nb_list_bytes > list_buf.len() {
                error!("fig 0/6 insufficient length for type 3 id list");
                return;
            }
            let ids = list_buf[..nb_list_bytes]
                .chunks_exact(4)
                .map(|entry| LinkedServiceId::Id32(u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]])))
                .collect();
            (ids, nb_list_bytes)
        };

        debug!("fig 0/6 lsn={} ids={:?}", linkage_set_number, ids);
        links.push(ServiceLink {
            linkage_set_number,
            is_active,
            is_hard,
            is_international,
            id_list_qualifier,
            ids,
        });
        curr_byte += NB_HEADER_BYTES + 1 + nb_list_bytes;
    }

    for link in links {
        database.update_service_link(link);
    }
}

/// Configuration information. Signals the total service count and the multiplex
/// reconfiguration counter.
pub fn process_ext_7(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    if buf.len() != 2 {
        error!("fig 0/7 length doesn't match expectations ({})", buf.len());
        return;
    }
    let nb_services = (buf[0] & 0b1111_1100) >> 2;
    let reconfiguration_count = (u16::from(buf[0] & 0b0000_0011) << 8) | u16::from(buf[1]);
    debug!("fig 0/7 total_services={} reconfiguration_count={}", nb_services, reconfiguration_count);
    database.update_configuration_information(nb_services, reconfiguration_count);
}

/// Service component global definition.
pub fn process_ext_8(header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    let mut definitions = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let service_buf = &buf[curr_byte..];
        let Some((service_id, _ecc, nb_id_bytes)) = read_service_id(header.pd, service_buf) else {
            error!("fig 0/8 message not long enough for service identifier");
            return;
        };
        if service_buf.len() < nb_id_bytes + 2 {
            error!("fig 0/8 message not long enough for header field");
            return;
        }

        let descriptor = service_buf[nb_id_bytes];
        let ext_flag = (descriptor & 0b1000_0000) != 0;
        let scids = descriptor & 0b0000_1111;

        let data_buf = &service_buf[nb_id_bytes + 1..];
        let ls_flag = (data_buf[0] & 0b1000_0000) != 0;
        let nb_data_bytes = if ls_flag { 2 } else { 1 };
        // An additional rfa byte trails the record when the extension flag is set.
        let nb_rfa_bytes = if ext_flag { 1 } else { 0 };

        let nb_length_bytes = nb_id_bytes + 1 + nb_data_bytes + nb_rfa_bytes;
        if nb_length_bytes > service_buf.len() {
            error!("fig 0/8 message not long enough for tail data ({}/{})", nb_length_bytes, service_buf.len());
            return;
        }

        let reference = if !ls_flag {
            GlobalComponentReference::Subchannel(data_buf[0] & 0b0011_1111)
        } else {
            GlobalComponentReference::PacketScid(
                (u16::from(data_buf[0] & 0b0000_1111) << 8) | u16::from(data_buf[1]),
            )
        };

        debug!(
            "fig 0/8 country_id={} service_ref={} scids={} reference={:?}",
            service_id.country_id, service_id.service_reference, scids, reference
        );
        definitions.push((service_id, scids, reference));
        curr_byte += nb_length_bytes;
    }

    for (service_id, scids, reference) in definitions {
        database.update_service_component_global_id(service_id, scids, reference);
    }
}

/// Country, local time offset and international table, optionally with extended
/// country codes for listed services.
pub fn process_ext_9(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    const NB_HEADER_BYTES: usize = 3;
    if buf.len() < NB_HEADER_BYTES {
        error!("fig 0/9 insufficient length for header ({})", buf.len());
        return;
    }

    let ext_flag = (buf[0] & 0b1000_0000) != 0;
    let ensemble_lto = buf[0] & 0b0011_1111;
    let ensemble_ecc = buf[1];
    let international_table_id = buf[2];

    let extended_buf = &buf[NB_HEADER_BYTES..];
    if ext_flag && extended_buf.is_empty() {
        error!("fig 0/9 insufficient length for extended field");
        return;
    }
    if !ext_flag && !extended_buf.is_empty() {
        error!("fig 0/9 extra bytes unaccounted for without extended field ({})", extended_buf.len());
        return;
    }

    // Subfields each carry a list of 16 bit service identifiers sharing one ECC.
    let mut service_eccs = Vec::new();
    let mut curr_byte = 0;
    while curr_byte < extended_buf.len() {
        let subfield = &extended_buf[curr_byte..];
        if subfield.len() < 2 {
            error!("fig 0/9 insufficient length for subfield header");
            return;
        }
        let nb_services = usize::from((subfield[0] & 0b1100_0000) >> 6);
        let ecc = subfield[1];

        let nb_list_bytes = 2 * nb_services;
        if nb_list_bytes > subfield.len() - 2 {
            error!("fig 0/9 insufficient length for service id list");
            return;
        }
        for b in subfield[2..2 + nb_list_bytes].chunks_exact(2) {
            service_eccs.push((ServiceId::from_short_form(b), ecc));
        }
        curr_byte += 2 + nb_list_bytes;
    }

    debug!(
        "fig 0/9 lto={} ecc={} table_id={} nb_service_eccs={}",
        ensemble_lto, ensemble_ecc, international_table_id, service_eccs.len()
    );
    database.update_country_information(ensemble_lto, ensemble_ecc, international_table_id);
    for (service_id, ecc) in service_eccs {
        database.update_service_ecc(service_id, ecc);
    }
}

/// Date and time. The long form carries seconds and milliseconds.
pub fn process_ext_10(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    if buf.len() < 4 {
        error!("fig 0/10 insufficient length for minimum configuration ({})", buf.len());
        return;
    }

    let modified_julian_date = (u32::from(buf[0] & 0b0111_1111) << 10)
        | (u32::from(buf[1]) << 2)
        | (u32::from(buf[2] & 0b1100_0000) >> 6);
    let leap_second_indicator = (buf[2] & 0b0010_0000) != 0;
    let utc_flag = (buf[2] & 0b0000_1000) != 0;

    let nb_actual_bytes = if utc_flag { 6 } else { 4 };
    if nb_actual_bytes > buf.len() {
        error!("fig 0/10 insufficient length for long form utc ({}/{})", nb_actual_bytes, buf.len());
        return;
    }

    let hours = ((buf[2] & 0b0000_0111) << 2) | ((buf[3] & 0b1100_0000) >> 6);
    let minutes = buf[3] & 0b0011_1111;

    let (seconds, milliseconds) = if utc_flag {
        let seconds = (buf[4] & 0b1111_1100) >> 2;
        let milliseconds = (u16::from(buf[4] & 0b0000_0011) << 8) | u16::from(buf[5]);
        (seconds, milliseconds)
    } else {
        (0, 0)
    };

    debug!(
        "fig 0/10 mjd={} time={:02}:{:02}:{:02}.{:03}",
        modified_julian_date, hours, minutes, seconds, milliseconds
    );
    database.update_datetime(DabDateTime {
        modified_julian_date,
        leap_second_indicator,
        hours,
        minutes,
        seconds,
        milliseconds,
    });
}

/// User application information.
pub fn process_ext_13(header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    let mut applications = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let entity_buf = &buf[curr_byte..];
        let Some((service_id, _ecc, nb_id_bytes)) = read_service_id(header.pd, entity_buf) else {
            error!("fig 0/13 length not long enough for service identifier");
            return;
        };
        if entity_buf.len() < nb_id_bytes + 1 {
            error!("fig 0/13 length not long enough for header data");
            return;
        }

        let descriptor = entity_buf[nb_id_bytes];
        let scids = (descriptor & 0b1111_0000) >> 4;
        let nb_user_apps = usize::from(descriptor & 0b0000_1111);

        let apps_buf = &entity_buf[nb_id_bytes + 1..];
        let mut curr_app_byte = 0;
        for _ in 0..nb_user_apps {
            let app_buf = &apps_buf[curr_app_byte..];
            if app_buf.len() < 2 {
                error!("fig 0/13 length not long enough for app header data");
                return;
            }
            let app_type = (u16::from(app_buf[0]) << 3) | (u16::from(app_buf[1] & 0b1110_0000) >> 5);
            let nb_app_data_bytes = usize::from(app_buf[1] & 0b0001_1111);
            if 2 + nb_app_data_bytes > app_buf.len() {
                error!("fig 0/13 length not long enough for app data");
                return;
            }

            debug!(
                "fig 0/13 country_id={} service_ref={} scids={} app_type={} L={}",
                service_id.country_id, service_id.service_reference, scids, app_type, nb_app_data_bytes
            );
            applications.push(UserApplication {
                service_id,
                scids,
                app_type,
                data: app_buf[2..2 + nb_app_data_bytes].to_vec(),
            });
            curr_app_byte += 2 + nb_app_data_bytes;
        }

        curr_byte += nb_id_bytes + 1 + curr_app_byte;
    }

    for app in applications {
        database.update_user_application(app);
    }
}

/// FEC scheme for packet mode sub-channels.
pub fn process_ext_14(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    for &value in buf {
        let subchannel_id = (value & 0b1111_1100) >> 2;
        let fec_scheme = value & 0b0000_0011;
        debug!("fig 0/14 subchannel_id={} fec={}", subchannel_id, fec_scheme);
        database.update_subchannel_fec_scheme(subchannel_id, fec_scheme);
    }
}

/// Programme type, with optional language and closed caption bytes extending the
/// record.
pub fn process_ext_17(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    let mut programme_types = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let b = &buf[curr_byte..];
        if b.len() < 4 {
            error!("fig 0/17 remaining buffer doesn't have minimum bytes ({})", b.len());
            return;
        }

        let service_id = ServiceId::from_short_form(&b[0..2]);
        let is_static = (b[2] & 0b1000_0000) != 0;
        let language_flag = (b[2] & 0b0010_0000) != 0;
        let cc_flag = (b[2] & 0b0001_0000) != 0;

        let nb_bytes = 4 + usize::from(language_flag) + usize::from(cc_flag);
        if b.len() < nb_bytes {
            error!("fig 0/17 insufficient bytes for language and caption fields ({}/{})", nb_bytes, b.len());
            return;
        }

        let mut data_index = 3;
        let language = language_flag.then(|| {
            let value = b[data_index];
            data_index += 1;
            value
        });
        let closed_caption = cc_flag.then(|| {
            let value = b[data_index];
            data_index += 1;
            value
        });
        let international_code = b[data_index] & 0b0001_1111;

        debug!(
            "fig 0/17 country_id={} service_ref={} code={} language={:?} cc={:?}",
            service_id.country_id, service_id.service_reference, international_code, language, closed_caption
        );
        programme_types.push((
            service_id,
            ProgrammeType { international_code, is_static, language, closed_caption },
        ));
        curr_byte += nb_bytes;
    }

    for (service_id, programme_type) in programme_types {
        database.update_service_programme_type(service_id, programme_type);
    }
}

/// Frequency information. Blocks nest lists of frequency entries whose format depends
/// on the range and modulation field.
pub fn process_ext_21(_header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    const NB_BLOCK_HEADER_BYTES: usize = 2;
    const NB_FI_LIST_HEADER_BYTES: usize = 3;
    let mut lists = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let block_buf = &buf[curr_byte..];
        if block_buf.len() < NB_BLOCK_HEADER_BYTES {
            error!("fig 0/21 insufficient length for block header ({})", block_buf.len());
            return;
        }

        let nb_fi_list_bytes = usize::from(block_buf[1] & 0b0001_1111);
        if NB_BLOCK_HEADER_BYTES + nb_fi_list_bytes > block_buf.len() {
            error!("fig 0/21 insufficient length for fi lists ({})", nb_fi_list_bytes);
            return;
        }
        let fi_lists_buf = &block_buf[NB_BLOCK_HEADER_BYTES..NB_BLOCK_HEADER_BYTES + nb_fi_list_bytes];

        let mut curr_fi_byte = 0;
        while curr_fi_byte < fi_lists_buf.len() {
            let fi_list_buf = &fi_lists_buf[curr_fi_byte..];
            if fi_list_buf.len() < NB_FI_LIST_HEADER_BYTES {
                error!("fig 0/21 insufficient length for fi list header ({})", fi_list_buf.len());
                return;
            }

            let id = u16::from_be_bytes([fi_list_buf[0], fi_list_buf[1]]);
            let range_modulation = (fi_list_buf[2] & 0b1111_0000) >> 4;
            let is_continuous = (fi_list_buf[2] & 0b0000_1000) != 0;
            let nb_freq_list_bytes = usize::from(fi_list_buf[2] & 0b0000_0111);

            if NB_FI_LIST_HEADER_BYTES + nb_freq_list_bytes > fi_list_buf.len() {
                error!("fig 0/21 insufficient length for frequency list ({})", nb_freq_list_bytes);
                return;
            }
            let freq_list_buf = &fi_list_buf[NB_FI_LIST_HEADER_BYTES..NB_FI_LIST_HEADER_BYTES + nb_freq_list_bytes];

            let entries: Vec<FrequencyEntry> = match range_modulation {
                // DAB ensemble frequencies in 16 kHz steps.
                0b0000 => {
                    if freq_list_buf.len() % 3 != 0 {
                        error!("fig 0/21 rm=0 frequency list length is not a multiple of 3");
                        return;
                    }
                    freq_list_buf
                        .chunks_exact(3)
                        .map(|b| {
                            let control_field = (b[0] & 0b1111_1000) >> 3;
                            let raw = (u32::from(b[0] & 0b0000_0111) << 16)
                                | (u32::from(b[1]) << 8)
                                | u32::from(b[2]);
                            FrequencyEntry::DabEnsemble {
                                id: EnsembleId::from_u16(id),
                                control_field,
                                frequency_hz: raw * 16_000,
                            }
                        })
                        .collect()
                }
                // AM or FM alternatives for a DRM service, 100 kHz steps above 87.5 MHz.
                0b1000 => freq_list_buf
                    .iter()
                    .map(|&raw| FrequencyEntry::AmFmService {
                        id,
                        frequency_hz: 87_500_000 + u32::from(raw) * 100_000,
                    })
                    .collect(),
                // RDS identified services.
                0b0110 | 0b1110 => {
                    if freq_list_buf.len() % 3 != 0 {
                        error!("fig 0/21 rds frequency list length is not a multiple of 3");
                        return;
                    }
                    freq_list_buf
                        .chunks_exact(3)
                        .map(|b| FrequencyEntry::Rds {
                            id,
                            id2: b[0],
                            frequency: u16::from_be_bytes([b[1], b[2]]),
                        })
                        .collect()
                }
                unknown => {
                    error!("fig 0/21 unknown rm value ({})", unknown);
                    return;
                }
            };

            debug!("fig 0/21 id={} rm={} entries={}", id, range_modulation, entries.len());
            lists.push(FrequencyList { id, range_modulation, is_continuous, entries });
            curr_fi_byte += NB_FI_LIST_HEADER_BYTES + nb_freq_list_bytes;
        }

        curr_byte += NB_BLOCK_HEADER_BYTES + nb_fi_list_bytes;
    }

    for list in lists {
        database.update_frequency_list(list);
    }
}

/// Services carried in other ensembles.
pub fn process_ext_24(header: FigHeaderType0, buf: &[u8], database: &mut EnsembleDatabase) {
    let mut oe_services = Vec::new();

    let mut curr_byte = 0;
    while curr_byte < buf.len() {
        let b = &buf[curr_byte..];
        let Some((service_id, _ecc, nb_id_bytes)) = read_service_id(header.pd, b) else {
            error!("fig 0/24 insufficient length for service identifier");
            return;
        };
        if b.len() < nb_id_bytes + 1 {
            error!("fig 0/24 insufficient length for header bytes");
            return;
        }

        let descriptor = b[nb_id_bytes];
        let conditional_access_id = (descriptor & 0b0111_0000) >> 4;
        let nb_ensemble_ids = usize::from(descriptor & 0b0000_1111);

        let nb_list_bytes = 2 * nb_ensemble_ids;
        if nb_id_bytes + 1 + nb_list_bytes > b.len() {
            error!("fig 0/24 insufficient length for ensemble id list");
            return;
        }

        let ensembles = b[nb_id_bytes + 1..nb_id_bytes + 1 + nb_list_bytes]
            .chunks_exact(2)
            .map(|entry| EnsembleId::from_bytes([entry[0], entry[1]]))
            .collect();

        debug!(
            "fig 0/24 country_id={} service_ref={} nb_ensembles={}",
            service_id.country_id, service_id.service_reference, nb_ensemble_ids
        );
        oe_services.push(OeService { service_id, conditional_access_id, ensembles });
        curr_byte += nb_id_bytes + 1 + nb_list_bytes;
    }

    for oe_service in oe_services {
        database.update_oe_service(oe_service);
    }
}

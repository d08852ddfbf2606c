//! Entities aggregated from the fast information channel signalling.

pub type SubchannelId = u8;

/// Identifies an ensemble. Packed on the wire as 4 bits of country id and a 12 bit
/// reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnsembleId {
    pub country_id: u8,
    pub ensemble_reference: u16,
}

impl EnsembleId {
    pub fn from_bytes(buf: [u8; 2]) -> Self {
        Self::from_u16(u16::from_be_bytes(buf))
    }

    pub fn from_u16(data: u16) -> Self {
        Self {
            country_id: ((data & 0xF000) >> 12) as u8,
            ensemble_reference: data & 0x0FFF,
        }
    }
}

/// Identifies a service. The extended country code travels separately since only the
/// long form identifier carries it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId {
    pub country_id: u8,
    pub service_reference: u32,
}

impl ServiceId {
    /// 2 byte form used when the programme/data flag indicates programme services.
    pub fn from_short_form(buf: &[u8]) -> Self {
        Self {
            country_id: (buf[0] & 0b1111_0000) >> 4,
            service_reference: (u32::from(buf[0] & 0b0000_1111) << 8) | u32::from(buf[1]),
        }
    }

    /// 4 byte form carrying an extended country code in its first byte.
    pub fn from_long_form(buf: &[u8]) -> (Self, u8) {
        let ecc = buf[0];
        let id = Self {
            country_id: (buf[1] & 0b1111_0000) >> 4,
            service_reference: (u32::from(buf[1] & 0b0000_1111) << 16)
                | (u32::from(buf[2]) << 8)
                | u32::from(buf[3]),
        };
        (id, ecc)
    }
}

/// Equal error protection profile set selected by the option field of FIG 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepOption {
    A,
    B,
}

/// Protection descriptor of a sub-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubchannelProtection {
    /// Unequal error protection referencing the standard's sub-channel size table.
    Uep { table_switch: u8, table_index: u8 },
    /// Equal error protection with an explicit sub-channel size in capacity units.
    /// `level` is the human numbering 1..=4 (1-A, 2-A, .. or 1-B, ..).
    Eep { option: EepOption, level: u8, size: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subchannel {
    pub id: SubchannelId,
    pub start_address: u16,
    pub protection: SubchannelProtection,
    /// FEC scheme for packet mode sub-channels from FIG 0/14.
    pub fec_scheme: Option<u8>,
}

/// Transport mechanism of a service component from FIG 0/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    StreamAudio { subchannel_id: SubchannelId, audio_type: u8 },
    StreamData { subchannel_id: SubchannelId, data_type: u8 },
    PacketData { scid: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceComponent {
    pub service_id: ServiceId,
    /// Position of the component in the service's FIG 0/2 list.
    pub component_index: u8,
    pub transport_mode: TransportMode,
    pub is_primary: bool,
    pub ca_flag: bool,
    /// Service component identifier within the service from FIG 0/8.
    pub scids: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgrammeType {
    pub international_code: u8,
    pub is_static: bool,
    pub language: Option<u8>,
    pub closed_caption: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Service {
    pub id: ServiceId,
    pub extended_country_code: Option<u8>,
    pub conditional_access_id: u8,
    pub programme_type: Option<ProgrammeType>,
}

/// Ensemble wide information accumulated from FIGs 0/0, 0/7 and 0/9.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ensemble {
    pub id: EnsembleId,
    pub change_flags: u8,
    pub alarm_flag: bool,
    /// CIF counter modulo 5000, reassembled as upper*250 + lower.
    pub cif_counter: u16,
    pub occurrence_change: u8,
    pub local_time_offset: Option<u8>,
    pub extended_country_code: Option<u8>,
    pub international_table_id: Option<u8>,
    pub nb_services: Option<u8>,
    pub reconfiguration_count: Option<u16>,
}

/// Conditional access components from FIG 0/4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalAccessComponent {
    pub subchannel_id: SubchannelId,
    pub ca_org: u16,
}

/// Packet mode components from FIG 0/3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketComponent {
    pub scid: u16,
    pub subchannel_id: SubchannelId,
    pub packet_address: u16,
    pub data_type: u8,
    pub dg_flag: bool,
    pub ca_org: u16,
}

/// One identifier inside a linkage set. The list arrangement of FIG 0/6 decides which
/// form is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedServiceId {
    Id16(u16),
    EccId16 { ecc: u8, id: u16 },
    Id32(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLink {
    pub linkage_set_number: u16,
    pub is_active: bool,
    pub is_hard: bool,
    pub is_international: bool,
    pub id_list_qualifier: u8,
    pub ids: Vec<LinkedServiceId>,
}

/// One alternative frequency entry from FIG 0/21. The range modulation field selects
/// the entry format and the frequency formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyEntry {
    DabEnsemble { id: EnsembleId, control_field: u8, frequency_hz: u32 },
    AmFmService { id: u16, frequency_hz: u32 },
    Rds { id: u16, id2: u8, frequency: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyList {
    pub id: u16,
    pub range_modulation: u8,
    pub is_continuous: bool,
    pub entries: Vec<FrequencyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserApplication {
    pub service_id: ServiceId,
    pub scids: u8,
    pub app_type: u16,
    pub data: Vec<u8>,
}

/// Other ensemble carriage of a service from FIG 0/24.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OeService {
    pub service_id: ServiceId,
    pub conditional_access_id: u8,
    pub ensembles: Vec<EnsembleId>,
}

/// Ensemble time from FIG 0/10.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DabDateTime {
    pub modified_julian_date: u32,
    pub leap_second_indicator: bool,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub milliseconds: u16,
}

impl DabDateTime {
    /// Converts the modified julian date to a calendar date using the algorithm from
    /// the standard's annex.
    pub fn to_calendar_date(&self) -> (u32, u8, u8) {
        let mjd = f64::from(self.modified_julian_date);
        let year_part = ((mjd - 15078.2) / 365.25).floor();
        let month_part = ((mjd - 14956.1 - (year_part * 365.25).floor()) / 30.6001).floor();
        let day = mjd - 14956.0 - (year_part * 365.25).floor() - (month_part * 30.6001).floor();
        let adjust = if month_part == 14.0 || month_part == 15.0 { 1.0 } else { 0.0 };
        let year = 1900.0 + year_part + adjust;
        let month = month_part - 1.0 - adjust * 12.0;
        (year as u32, month as u8, day as u8)
    }
}

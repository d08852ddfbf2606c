use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::info;

use crate::database::entities::*;

/// Queryable directory of everything signalled about the ensemble.
///
/// All updates are idempotent upserts keyed by identifier, so the repetition of FIGs on
/// air never produces duplicate entries. The revision counter only advances when an
/// update actually changed something, which lets the radio decide when to notify
/// listeners. Readers take a snapshot by cloning, keeping the writer lock short.
#[derive(Debug, Clone, Default)]
pub struct EnsembleDatabase {
    pub ensemble: Ensemble,
    pub services: BTreeMap<ServiceId, Service>,
    pub service_components: BTreeMap<(ServiceId, u8), ServiceComponent>,
    pub subchannels: BTreeMap<SubchannelId, Subchannel>,
    pub packet_components: BTreeMap<u16, PacketComponent>,
    pub ca_components: BTreeMap<SubchannelId, ConditionalAccessComponent>,
    pub links: BTreeMap<u16, ServiceLink>,
    pub frequency_lists: BTreeMap<(u16, u8), FrequencyList>,
    pub user_applications: BTreeMap<(ServiceId, u8, u16), UserApplication>,
    pub oe_services: BTreeMap<ServiceId, OeService>,
    pub datetime: Option<DabDateTime>,
    revision: u64,
}

/// Component reference used by the FIG 0/8 global definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalComponentReference {
    Subchannel(SubchannelId),
    PacketScid(u16),
}

fn upsert<K: Ord + Copy, V: PartialEq>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    merge: impl FnOnce(&V, V) -> V,
) -> bool {
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
        Entry::Occupied(mut slot) => {
            let entry = slot.get_mut();
            let merged = merge(entry, value);
            if *entry != merged {
                *entry = merged;
                true
            } else {
                false
            }
        }
    }
}

fn replace<K: Ord + Copy, V: PartialEq>(map: &mut BTreeMap<K, V>, key: K, value: V) -> bool {
    upsert(map, key, value, |_, value| value)
}

impl EnsembleDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic counter that advances whenever an update changed the directory.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn update_ensemble_information(
        &mut self,
        id: EnsembleId,
        change_flags: u8,
        alarm_flag: bool,
        cif_counter: u16,
        occurrence_change: u8,
    ) {
        let ensemble = &mut self.ensemble;
        let changed = ensemble.id != id
            || ensemble.change_flags != change_flags
            || ensemble.alarm_flag != alarm_flag
            || ensemble.occurrence_change != occurrence_change;
        ensemble.id = id;
        ensemble.change_flags = change_flags;
        ensemble.alarm_flag = alarm_flag;
        // The CIF counter advances every frame and is not a directory change.
        ensemble.cif_counter = cif_counter;
        ensemble.occurrence_change = occurrence_change;
        if changed {
            self.revision += 1;
        }
    }

    /// Applies FIG 0/7. A changed reconfiguration count invalidates every entry of the
    /// previous multiplex configuration.
    pub fn update_configuration_information(&mut self, nb_services: u8, reconfiguration_count: u16) {
        if let Some(previous) = self.ensemble.reconfiguration_count {
            if previous != reconfiguration_count {
                info!(
                    "multiplex reconfiguration {} -> {}, flushing configuration entries",
                    previous, reconfiguration_count
                );
                self.flush_configuration();
            }
        }
        let changed = self.ensemble.nb_services != Some(nb_services)
            || self.ensemble.reconfiguration_count != Some(reconfiguration_count);
        self.ensemble.nb_services = Some(nb_services);
        self.ensemble.reconfiguration_count = Some(reconfiguration_count);
        if changed {
            self.revision += 1;
        }
    }

    fn flush_configuration(&mut self) {
        self.services.clear();
        self.service_components.clear();
        self.subchannels.clear();
        self.packet_components.clear();
        self.ca_components.clear();
        self.user_applications.clear();
        self.links.clear();
        self.revision += 1;
    }

    pub fn update_country_information(
        &mut self,
        local_time_offset: u8,
        extended_country_code: u8,
        international_table_id: u8,
    ) {
        let changed = self.ensemble.local_time_offset != Some(local_time_offset)
            || self.ensemble.extended_country_code != Some(extended_country_code)
            || self.ensemble.international_table_id != Some(international_table_id);
        self.ensemble.local_time_offset = Some(local_time_offset);
        self.ensemble.extended_country_code = Some(extended_country_code);
        self.ensemble.international_table_id = Some(international_table_id);
        if changed {
            self.revision += 1;
        }
    }

    pub fn update_subchannel(&mut self, subchannel: Subchannel) {
        let changed = upsert(&mut self.subchannels, subchannel.id, subchannel, |entry, new| {
            // FIG 0/14 information is merged separately, keep it across 0/1 repeats.
            Subchannel { fec_scheme: new.fec_scheme.or(entry.fec_scheme), ..new }
        });
        if changed {
            self.revision += 1;
        }
    }

    pub fn update_subchannel_fec_scheme(&mut self, subchannel_id: SubchannelId, fec_scheme: u8) {
        if let Some(entry) = self.subchannels.get_mut(&subchannel_id) {
            if entry.fec_scheme != Some(fec_scheme) {
                entry.fec_scheme = Some(fec_scheme);
                self.revision += 1;
            }
        }
    }

    pub fn update_service(&mut self, service: Service) {
        let changed = upsert(&mut self.services, service.id, service, |entry, new| Service {
            extended_country_code: new.extended_country_code.or(entry.extended_country_code),
            programme_type: new.programme_type.or(entry.programme_type),
            ..new
        });
        if changed {
            self.revision += 1;
        }
    }

    pub fn update_service_ecc(&mut self, service_id: ServiceId, extended_country_code: u8) {
        let service = self.services.entry(service_id).or_insert_with(|| Service {
            id: service_id,
            ..Default::default()
        });
        if service.extended_country_code != Some(extended_country_code) {
            service.extended_country_code = Some(extended_country_code);
            self.revision += 1;
        }
    }

    pub fn update_service_programme_type(&mut self, service_id: ServiceId, programme_type: ProgrammeType) {
        let service = self.services.entry(service_id).or_insert_with(|| Service {
            id: service_id,
            ..Default::default()
        });
        if service.programme_type != Some(programme_type) {
            service.programme_type = Some(programme_type);
            self.revision += 1;
        }
    }

    pub fn update_service_component(&mut self, component: ServiceComponent) {
        let key = (component.service_id, component.component_index);
        let changed = upsert(&mut self.service_components, key, component, |entry, new| {
            ServiceComponent { scids: new.scids.or(entry.scids), ..new }
        });
        if changed {
            self.revision += 1;
        }
    }

    /// Applies the global definition of FIG 0/8 to the matching component.
    pub fn update_service_component_global_id(
        &mut self,
        service_id: ServiceId,
        scids: u8,
        transport: GlobalComponentReference,
    ) {
        let component = self
            .service_components
            .range_mut((service_id, 0)..=(service_id, u8::MAX))
            .map(|(_, component)| component)
            .find(|component| match (&transport, &component.transport_mode) {
                (GlobalComponentReference::Subchannel(id), TransportMode::StreamAudio { subchannel_id, .. }) => id == subchannel_id,
                (GlobalComponentReference::Subchannel(id), TransportMode::StreamData { subchannel_id, .. }) => id == subchannel_id,
                (GlobalComponentReference::PacketScid(id), TransportMode::PacketData { scid }) => id == scid,
                _ => false,
            });
        if let Some(component) = component {
            if component.scids != Some(scids) {
                component.scids = Some(scids);
                self.revision += 1;
            }
        }
    }

    pub fn update_packet_component(&mut self, component: PacketComponent) {
        if replace(&mut self.packet_components, component.scid, component) {
            self.revision += 1;
        }
    }

    pub fn update_ca_component(&mut self, component: ConditionalAccessComponent) {
        if replace(&mut self.ca_components, component.subchannel_id, component) {
            self.revision += 1;
        }
    }

    pub fn update_service_link(&mut self, link: ServiceLink) {
        if replace(&mut self.links, link.linkage_set_number, link) {
            self.revision += 1;
        }
    }

    pub fn update_frequency_list(&mut self, list: FrequencyList) {
        let key = (list.id, list.range_modulation);
        if replace(&mut self.frequency_lists, key, list) {
            self.revision += 1;
        }
    }

    pub fn update_user_application(&mut self, app: UserApplication) {
        let key = (app.service_id, app.scids, app.app_type);
        if replace(&mut self.user_applications, key, app) {
            self.revision += 1;
        }
    }

    pub fn update_oe_service(&mut self, oe_service: OeService) {
        if replace(&mut self.oe_services, oe_service.service_id, oe_service) {
            self.revision += 1;
        }
    }

    pub fn update_datetime(&mut self, datetime: DabDateTime) {
        // Time ticks every frame, it is not a directory change.
        self.datetime = Some(datetime);
    }

    /// Audio stream components with a known sub-channel description, in service order.
    pub fn audio_components(&self) -> impl Iterator<Item = (&ServiceComponent, &Subchannel)> {
        self.service_components.values().filter_map(|component| {
            let subchannel_id = match component.transport_mode {
                TransportMode::StreamAudio { subchannel_id, .. } => subchannel_id,
                _ => return None,
            };
            let subchannel = self.subchannels.get(&subchannel_id)?;
            Some((component, subchannel))
        })
    }
}

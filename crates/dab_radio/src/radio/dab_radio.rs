use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, error, info};

use dab_core::dab_parameters::DabParameters;

use crate::database::ensemble_database::EnsembleDatabase;
use crate::database::entities::SubchannelId;
use crate::fic::fic_decoder::FicDecoder;
use crate::fic::fig_processor::process_fig_block;
use crate::msc::protection_tables::get_puncture_profile;
use crate::radio::channel_controls::ChannelControls;
use crate::radio::channel_worker::ChannelWorker;
use crate::radio::dab_plus_channel::DabPlusChannel;

type DirectoryChangeCallback = Box<dyn FnMut() + Send + Sync + 'static>;

struct ChannelHandle {
    channel: Arc<Mutex<DabPlusChannel>>,
    controls: Arc<ChannelControls>,
    worker: ChannelWorker,
}

/// The transmission frame dispatcher.
///
/// One worker thread decodes the fast information channel, one worker thread decodes
/// every sub-channel described in the ensemble database. Per input frame the FIC and
/// MSC bit spans are fanned out to the workers, all workers are joined, and only then
/// is the next frame accepted. The database is the only shared mutable state and its
/// lock is released before any listener runs.
pub struct DabRadio {
    params: DabParameters,
    database: Arc<Mutex<EnsembleDatabase>>,
    fic_worker: ChannelWorker,
    channels: HashMap<SubchannelId, ChannelHandle>,
    directory_callbacks: Vec<DirectoryChangeCallback>,
    last_notified_revision: u64,
}

impl DabRadio {
    pub fn new(params: &DabParameters) -> Self {
        let database = Arc::new(Mutex::new(EnsembleDatabase::new()));

        let fic_worker = ChannelWorker::new({
            let database = database.clone();
            let params = *params;
            let mut fic_decoder = FicDecoder::new(&params);
            move |fic_bits: &[i8]| {
                for group_bits in fic_bits.chunks_exact(params.nb_fib_group_bits) {
                    let payloads = fic_decoder.process_fib_group(group_bits);
                    for payload in payloads.iter() {
                        // The lock spans one FIB and is released before any
                        // listener is notified by the dispatcher.
                        let mut database = database.lock().unwrap();
                        process_fig_block(payload, &mut database);
                    }
                }
            }
        });

        Self {
            params: *params,
            database,
            fic_worker,
            channels: HashMap::new(),
            directory_callbacks: Vec::new(),
            last_notified_revision: 0,
        }
    }

    /// Consumes the soft decision bits of one transmission frame.
    pub fn process(&mut self, frame_bits: &[i8]) {
        if frame_bits.len() != self.params.nb_frame_bits {
            error!(
                "got incorrect number of frame bits {}/{}",
                frame_bits.len(),
                self.params.nb_frame_bits
            );
            return;
        }
        let (fic_bits, msc_bits) = frame_bits.split_at(self.params.nb_fic_bits);

        self.fic_worker.start(fic_bits);
        for handle in self.channels.values() {
            handle.worker.start(msc_bits);
        }

        self.fic_worker.join();
        for handle in self.channels.values() {
            handle.worker.join();
        }

        self.update_channels_from_database();
        self.notify_directory_changes();
    }

    /// Stops every worker. In flight frames complete before the threads join.
    pub fn stop(&mut self) {
        self.fic_worker.stop();
        for handle in self.channels.values_mut() {
            handle.worker.stop();
        }
    }

    pub fn parameters(&self) -> &DabParameters {
        &self.params
    }

    /// Consistent copy of the service directory for concurrent readers.
    pub fn database_snapshot(&self) -> EnsembleDatabase {
        self.database.lock().unwrap().clone()
    }

    pub fn subchannel_ids(&self) -> Vec<SubchannelId> {
        let mut ids: Vec<SubchannelId> = self.channels.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn channel(&self, subchannel_id: SubchannelId) -> Option<Arc<Mutex<DabPlusChannel>>> {
        self.channels.get(&subchannel_id).map(|handle| handle.channel.clone())
    }

    pub fn channel_controls(&self, subchannel_id: SubchannelId) -> Option<Arc<ChannelControls>> {
        self.channels.get(&subchannel_id).map(|handle| handle.controls.clone())
    }

    pub fn subscribe_service_directory_change(&mut self, callback: impl FnMut() + Send + Sync + 'static) {
        self.directory_callbacks.push(Box::new(callback));
    }

    fn update_channels_from_database(&mut self) {
        let subchannels: Vec<_> = {
            let database = self.database.lock().unwrap();
            database.subchannels.values().copied().collect()
        };

        // Drop workers whose sub-channel disappeared in a reconfiguration.
        let known_ids: Vec<SubchannelId> = self.channels.keys().copied().collect();
        for id in known_ids {
            if !subchannels.iter().any(|subchannel| subchannel.id == id) {
                info!("removing sub-channel {} after reconfiguration", id);
                if let Some(mut handle) = self.channels.remove(&id) {
                    handle.worker.stop();
                }
            }
        }

        for subchannel in subchannels {
            if self.channels.contains_key(&subchannel.id) {
                continue;
            }
            // Only spawn a worker once the protection descriptor resolves.
            if let Err(err) = get_puncture_profile(&subchannel.protection) {
                debug!("sub-channel {} not startable yet: {}", subchannel.id, err);
                continue;
            }
            let channel = match DabPlusChannel::new(&self.params, &subchannel) {
                Ok(channel) => channel,
                Err(err) => {
                    error!("sub-channel {} rejected: {}", subchannel.id, err);
                    continue;
                }
            };
            let controls = channel.controls();
            let channel = Arc::new(Mutex::new(channel));
            let worker = ChannelWorker::new({
                let channel = channel.clone();
                move |msc_bits: &[i8]| {
                    channel.lock().unwrap().process(msc_bits);
                }
            });
            info!("created decoder for sub-channel {}", subchannel.id);
            self.channels.insert(subchannel.id, ChannelHandle { channel, controls, worker });
        }
    }

    fn notify_directory_changes(&mut self) {
        let revision = self.database.lock().unwrap().revision();
        if revision == self.last_notified_revision {
            return;
        }
        self.last_notified_revision = revision;
        for callback in self.directory_callbacks.iter_mut() {
            callback();
        }
    }
}

impl Drop for DabRadio {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dab_core::dab_parameters::get_dab_parameters;
    use dab_core::dab_transmission_modes::DabTransmissionMode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn wrong_frame_length_is_dropped() {
        let params = get_dab_parameters(DabTransmissionMode::II);
        let mut radio = DabRadio::new(&params);
        let notified = Arc::new(AtomicUsize::new(0));
        radio.subscribe_service_directory_change({
            let notified = notified.clone();
            move || {
                notified.fetch_add(1, Ordering::SeqCst);
            }
        });

        radio.process(&vec![0i8; params.nb_frame_bits - 1]);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert!(radio.subchannel_ids().is_empty());
    }

    #[test]
    fn noise_frames_produce_no_directory_entries() {
        let params = get_dab_parameters(DabTransmissionMode::II);
        let mut radio = DabRadio::new(&params);
        // All zero soft bits carry no confidence; the FIB CRC check rejects them.
        radio.process(&vec![0i8; params.nb_frame_bits]);
        let snapshot = radio.database_snapshot();
        assert!(snapshot.subchannels.is_empty());
        assert!(snapshot.services.is_empty());
        radio.stop();
    }
}

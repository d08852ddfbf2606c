use std::collections::HashSet;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clap::Parser;
use log::info;

use dab_core::dab_parameters::get_dab_parameters;
use dab_core::dab_transmission_modes::DabTransmissionMode;
use dab_radio::database::entities::TransportMode;
use dab_radio::radio::dab_radio::DabRadio;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppArguments {
    /// DAB transmission mode. Valid modes are \[1,2,3,4\]
    #[arg(short, long, default_value_t = 1)]
    mode: u32,
    /// Input filepath with raw 8bit soft decision bits. If not provided uses stdin.
    #[arg(short, long)]
    input_filepath: Option<String>,
    /// Sub-channel to decode. If not provided every discovered sub-channel stays idle.
    #[arg(short, long)]
    subchannel: Option<u8>,
    /// Output filepath for the selected sub-channel's access unit stream.
    /// If not provided uses stdout.
    #[arg(short, long)]
    output_filepath: Option<String>,
    /// Directory to store completed slideshow images in.
    #[arg(long)]
    slideshow_dir: Option<PathBuf>,
}

fn main() -> Result<(), String> {
    env_logger::init();
    let args = AppArguments::parse();

    let transmission_mode = match args.mode {
        1 => DabTransmissionMode::I,
        2 => DabTransmissionMode::II,
        3 => DabTransmissionMode::III,
        4 => DabTransmissionMode::IV,
        mode => return Err(format!("Invalid transmission mode index {}", mode)),
    };
    let mut input_file: Box<dyn Read + Send + Sync> = match &args.input_filepath {
        None => Box::new(std::io::stdin()),
        Some(filepath) => match std::fs::File::open(filepath) {
            Ok(file) => Box::new(file),
            Err(err) => return Err(format!("Failed to open input file {}: {}", filepath, err)),
        },
    };
    let output_file: Arc<Mutex<Box<dyn Write + Send>>> = match &args.output_filepath {
        None => Arc::new(Mutex::new(Box::new(BufWriter::new(std::io::stdout())))),
        Some(filepath) => match std::fs::File::create(filepath) {
            Ok(file) => Arc::new(Mutex::new(Box::new(BufWriter::new(file)))),
            Err(err) => return Err(format!("Failed to open file {}: {}", filepath, err)),
        },
    };
    if let Some(directory) = &args.slideshow_dir {
        if let Err(err) = std::fs::create_dir_all(directory) {
            return Err(format!("Failed to create slideshow directory: {}", err));
        }
    }

    let params = get_dab_parameters(transmission_mode);
    let mut radio = DabRadio::new(&params);

    let is_directory_changed = Arc::new(AtomicBool::new(false));
    radio.subscribe_service_directory_change({
        let is_directory_changed = is_directory_changed.clone();
        move || {
            is_directory_changed.store(true, Ordering::SeqCst);
        }
    });

    let mut configured_subchannels: HashSet<u8> = HashSet::new();
    let mut frame_bytes = vec![0u8; params.nb_frame_bits];
    let mut frame_bits = vec![0i8; params.nb_frame_bits];

    loop {
        match input_file.read_exact(&mut frame_bytes) {
            Ok(()) => {}
            Err(err) => {
                info!("finished reading frames: {}", err);
                break;
            }
        }
        for (bit, &byte) in frame_bits.iter_mut().zip(frame_bytes.iter()) {
            *bit = byte as i8;
        }
        radio.process(&frame_bits);

        if is_directory_changed.swap(false, Ordering::SeqCst) {
            print_service_directory(&radio);
        }
        configure_new_subchannels(&args, &mut configured_subchannels, &radio, &output_file);
    }

    radio.stop();
    Ok(())
}

fn print_service_directory(radio: &DabRadio) {
    let snapshot = radio.database_snapshot();
    let ensemble = &snapshot.ensemble;
    eprintln!(
        "ensemble country_id={} reference={} services={:?}",
        ensemble.id.country_id, ensemble.id.ensemble_reference, ensemble.nb_services
    );
    for service in snapshot.services.values() {
        eprintln!(
            "  service country_id={} reference={}",
            service.id.country_id, service.id.service_reference
        );
    }
    for component in snapshot.service_components.values() {
        match component.transport_mode {
            TransportMode::StreamAudio { subchannel_id, audio_type } => {
                eprintln!("    audio component subchannel={} type={}", subchannel_id, audio_type);
            }
            TransportMode::StreamData { subchannel_id, data_type } => {
                eprintln!("    data component subchannel={} type={}", subchannel_id, data_type);
            }
            TransportMode::PacketData { scid } => {
                eprintln!("    packet component scid={}", scid);
            }
        }
    }
    for subchannel in snapshot.subchannels.values() {
        eprintln!(
            "  subchannel id={} start={} protection={:?}",
            subchannel.id, subchannel.start_address, subchannel.protection
        );
    }
}

fn configure_new_subchannels(
    args: &AppArguments,
    configured: &mut HashSet<u8>,
    radio: &DabRadio,
    output_file: &Arc<Mutex<Box<dyn Write + Send>>>,
) {
    let Some(selected) = args.subchannel else {
        return;
    };
    for subchannel_id in radio.subchannel_ids() {
        if subchannel_id != selected || configured.contains(&subchannel_id) {
            continue;
        }
        let Some(channel) = radio.channel(subchannel_id) else {
            continue;
        };
        let mut channel = channel.lock().unwrap();

        channel.subscribe_access_unit({
            let output_file = output_file.clone();
            move |_au_index, _nb_aus, buf| {
                let mut output_file = output_file.lock().unwrap();
                let _ = output_file.write_all(buf);
            }
        });
        channel.subscribe_dynamic_label(|label, charset| {
            eprintln!("dynamic_label[charset={}]={}", charset, label);
        });
        if let Some(directory) = args.slideshow_dir.clone() {
            channel.subscribe_slideshow(move |slideshow| {
                let name = if slideshow.name.is_empty() {
                    format!("slideshow-{}", slideshow.transport_id)
                } else {
                    slideshow.name.clone()
                };
                let path = directory.join(name);
                match std::fs::write(&path, &slideshow.image_data) {
                    Ok(()) => info!("saved slideshow {}", path.display()),
                    Err(err) => log::error!("failed to save slideshow: {}", err),
                }
            });
        }

        let controls = channel.controls();
        controls.set_decode_audio(true);
        controls.set_decode_data(true);
        configured.insert(subchannel_id);
        info!("enabled decoding for sub-channel {}", subchannel_id);
    }
}

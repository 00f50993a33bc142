use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};

use cmrr_rig::acquire::epics::{self, EpicsGateway, SystemId};
use cmrr_rig::acquire::raw::RawStreamAdapter;
use cmrr_rig::acquire::AcquisitionAdapter;
use cmrr_rig::config::{AcquisitionMode, RunConfig};
use cmrr_rig::engine::{MeasurementLoop, ResultAggregator};
use cmrr_rig::report;
use cmrr_rig::ui::ConsoleOperator;
use cmrr_rig::utils::consts::{CHANNELS_PER_MODULE, REPORT_FILE};
use cmrr_rig::utils::logging::init_logging;

#[derive(Parser)]
#[command(author, version, about = "Per-channel CMRR test for a multi-module acquisition carrier", long_about = None)]
struct Cli {
    /// Site configuration file (JSON); bench defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full run: every channel of every module, in both configurations
    Run {
        /// Carrier (UUT) host name
        carrier: String,
        /// Number of 16-channel modules in the carrier
        #[arg(short, long, default_value_t = 3)]
        modules: u32,
        /// Stream raw samples and compute spectra locally
        #[arg(long)]
        raw: bool,
        /// Dump per-channel frequency/amplitude waveforms
        #[arg(long)]
        save_waveforms: bool,
        /// Archive the per-carrier directory here after the run
        #[arg(long)]
        archive: Option<PathBuf>,
    },
    /// Re-measure one channel and report it in isolation
    Retest {
        /// Carrier (UUT) host name
        carrier: String,
        /// Run-wide channel index, 1..=16*modules
        channel: usize,
        /// Number of 16-channel modules in the carrier
        #[arg(short, long, default_value_t = 3)]
        modules: u32,
        /// Stream raw samples and compute spectra locally
        #[arg(long)]
        raw: bool,
    },
}

fn main() {
    init_logging();
    ctrlc::set_handler(|| {
        warn!("interrupted; accumulated measurements are discarded");
        std::process::exit(130);
    })
    .unwrap();

    if let Err(e) = dispatch(Cli::parse()) {
        eprintln!("test aborted: {e}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Run { carrier, modules, raw, save_waveforms, archive } => {
            let mut config = load_config(cli.config.as_deref(), &carrier, modules)?;
            config.save_waveforms |= save_waveforms;
            if raw {
                config.acquisition = AcquisitionMode::RawLocalFft;
            }
            if let Some(root) = archive {
                config.final_data_root = Some(root);
            }
            config.validate()?;
            run_full(&config)
        }
        Commands::Retest { carrier, channel, modules, raw } => {
            let mut config = load_config(cli.config.as_deref(), &carrier, modules)?;
            if raw {
                config.acquisition = AcquisitionMode::RawLocalFft;
            }
            config.validate()?;
            let max = (config.modules * CHANNELS_PER_MODULE) as usize;
            if channel == 0 || channel > max {
                return Err(format!("channel {channel} out of range 1..={max}").into());
            }
            run_retest(&config, channel)
        }
    }
}

fn load_config(
    path: Option<&std::path::Path>,
    carrier: &str,
    modules: u32,
) -> Result<RunConfig, Box<dyn Error>> {
    let config = match path {
        Some(path) => {
            info!("loading site configuration from {}", path.display());
            let mut config = RunConfig::from_file(path)?;
            // The command line always names the unit under test.
            config.carrier = carrier.to_string();
            config.modules = modules;
            config
        }
        None => RunConfig::defaults(carrier, modules),
    };
    Ok(config)
}

fn prepare(config: &RunConfig) -> Result<(EpicsGateway, SystemId), Box<dyn Error>> {
    let gateway = EpicsGateway::new();
    epics::configure_instrument(
        &gateway,
        &config.carrier,
        config.sites(),
        config.smoothing,
        config.acquisition == AcquisitionMode::RawLocalFft,
    )?;
    let id = SystemId::fetch(&gateway, &config.carrier, config.sites());
    Ok((gateway, id))
}

fn make_adapter(config: &RunConfig, gateway: EpicsGateway) -> Box<dyn AcquisitionAdapter> {
    match config.acquisition {
        AcquisitionMode::PvSpectrum => {
            Box::new(epics::PvSpectrumAdapter::new(gateway, &config.carrier))
        }
        AcquisitionMode::RawLocalFft => {
            Box::new(RawStreamAdapter::new(&config.carrier, config.nyquist_hz()))
        }
    }
}

fn run_full(config: &RunConfig) -> Result<(), Box<dyn Error>> {
    let (gateway, id) = prepare(config)?;
    let mut adapter = make_adapter(config, gateway);
    let mut operator = ConsoleOperator::new();

    let carrier_dir = config.carrier_dir();
    let store = report::WaveformStore::new(&carrier_dir);
    let waveforms = config.save_waveforms.then_some(&store);

    let aggregator =
        MeasurementLoop::new(&mut adapter, &mut operator, config, waveforms).run()?;

    finish(config, &id, &aggregator, REPORT_FILE)?;
    if let Some(final_root) = &config.final_data_root {
        report::archive_run(&carrier_dir, final_root)?;
    }
    Ok(())
}

fn run_retest(config: &RunConfig, channel: usize) -> Result<(), Box<dyn Error>> {
    let (gateway, id) = prepare(config)?;
    let mut adapter = make_adapter(config, gateway);
    let mut operator = ConsoleOperator::new();

    let aggregator = MeasurementLoop::new(&mut adapter, &mut operator, config, None)
        .retest(channel)?;

    // A retest report sits beside the full-run results without touching
    // them or any archived copy.
    finish(config, &id, &aggregator, &format!("results_retest_ch{channel:02}"))
}

fn finish(
    config: &RunConfig,
    id: &SystemId,
    aggregator: &ResultAggregator,
    file_name: &str,
) -> Result<(), Box<dyn Error>> {
    let results = aggregator.channel_results();
    println!("{}", report::render_table(&results));
    report::write_report(&config.carrier_dir(), id, &results, file_name)?;
    Ok(())
}

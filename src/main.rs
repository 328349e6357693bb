mod colormap;
mod config;
mod demo_signal;
mod display;
mod frame_decoder;
mod handoff;
mod plot;
mod serial_stream;
mod spectrum_plot;
mod utils;
mod waterfall;

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering}
};
use std::time::Duration;
use eframe::NativeOptions;
use log::{info, error, warn};
use config::{default_config_path, ViewerConfig};
use frame_decoder::FrameDecoder;
use handoff::FrameHandoff;
use serial_stream::{list_ports, start_reader_thread, FrameReader, InputSource, ReaderStats};

/// Live spectrum and waterfall viewer for FFT frames sent over a serial line.
#[derive(Parser, Debug)]
#[command(name = "fft_waterfall", version)]
struct Args {
    /// Serial port to read from (defaults to the first port found)
    #[arg(long, conflicts_with_all = ["replay", "demo"])]
    port: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(long)]
    baud: Option<u32>,

    /// Replay a captured text file instead of a serial port
    #[arg(long, conflicts_with = "demo")]
    replay: Option<PathBuf>,

    /// Run on a built-in synthetic signal
    #[arg(long)]
    demo: bool,

    /// Delay between frames for --replay and --demo
    #[arg(long, default_value_t = 50)]
    frame_interval_ms: u64,

    /// Print the available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Path of the YAML config file (created with defaults if missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable logging (respects RUST_LOG)
    #[arg(long)]
    enable_logs: bool,
}

fn main() {
    let args = Args::parse();

    // Set up proper logging filters
    if args.enable_logs {
        // Don't override RUST_LOG if it's already set
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG",
                "fft_waterfall=info,\
                 fft_waterfall::frame_decoder=info,\
                 fft_waterfall::serial_stream=info");
        }
        env_logger::init();
    }

    let enable_logs = args.enable_logs;
    if let Err(e) = run(args) {
        if enable_logs {
            error!("Application encountered an error: {:?}", e);
        } else {
            eprintln!("Error: {:?}", e);
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.list_ports {
        let ports = list_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        } else {
            println!("Available serial ports:");
            for (i, port) in ports.iter().enumerate() {
                println!("  [{}] - {}", i, port);
            }
        }
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = ViewerConfig::load_or_create(&config_path)?;
    info!(
        "Config: {} bins, {} Hz, waterfall depth {}",
        config.bin_count(),
        config.sample_rate,
        config.waterfall_depth
    );

    let source = select_source(&args, &config)?;
    let source_label = describe_source(&source);
    info!("Input: {}", source_label);

    let handoff = FrameHandoff::new();
    let stats = Arc::new(ReaderStats::default());
    let shutdown_flag = Arc::new(AtomicBool::new(false));

    let reader = FrameReader::new(
        FrameDecoder::new(config.bin_count(), config.framing.clone()),
        handoff.clone(),
        Arc::clone(&stats),
    );

    info!("Starting reader thread...");
    let reader_thread = start_reader_thread(source, reader, Arc::clone(&shutdown_flag))?;

    // Start GUI
    info!("Starting GUI...");
    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_title("FFT Spectrum & Waterfall"),
        vsync: true,
        ..Default::default()
    };

    let app = plot::ViewerApp::new(config, handoff, stats, source_label);
    if let Err(e) = eframe::run_native(
        "FFT Spectrum & Waterfall",
        native_options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Box::new(app)
        }),
    ) {
        error!("GUI error: {}", e);
    }

    // Set shutdown flag to stop the reader
    info!("Setting shutdown flag...");
    shutdown_flag.store(true, Ordering::SeqCst);

    if let Ok(_) = reader_thread.join() {
        info!("Reader thread terminated successfully");
    } else {
        warn!("Reader thread may not have terminated cleanly");
    }

    Ok(())
}

fn select_source(args: &Args, config: &ViewerConfig) -> Result<InputSource> {
    let frame_interval = Duration::from_millis(args.frame_interval_ms);

    if args.demo {
        return Ok(InputSource::Demo { frame_interval });
    }
    if let Some(path) = &args.replay {
        return Ok(InputSource::Replay { path: path.clone(), frame_interval });
    }

    let baud_rate = args.baud.unwrap_or(config.baud_rate);
    let port = match &args.port {
        Some(port) => port.clone(),
        None => {
            let ports = list_ports()?;
            let first = ports.into_iter().next().ok_or_else(|| {
                anyhow!("No serial ports found. Use --port, --replay or --demo.")
            })?;
            warn!("No port given, using the first one found: {}", first);
            first
        }
    };

    Ok(InputSource::Serial { port, baud_rate })
}

fn describe_source(source: &InputSource) -> String {
    match source {
        InputSource::Serial { port, baud_rate } => format!("{} @ {} baud", port, baud_rate),
        InputSource::Replay { path, .. } => format!("replay {}", path.display()),
        InputSource::Demo { .. } => "demo signal".to_string(),
    }
}

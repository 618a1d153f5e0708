use anyhow::{bail, Context, Result};
use crabreel::recording::H264Encoder;
use crabreel::testing::try_synthetic_frame;
use crabreel::{RecorderConfig, RecordingController};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    crabreel::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabreel-cli <record|config|version> [args]");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "record" => cmd_record(&args),
        "config" => cmd_config(&args),
        "version" => {
            let info = crabreel::get_info();
            println!("{} {} - {}", info.name, info.version, info.description);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_record(args: &[String]) -> Result<()> {
    // record [--frames <n>] [--fps <f>] [--width <w>] [--height <h>]
    //        [--out <dir>] [--config <file>] [--json]
    let mut config_path = None;
    let mut frames = None;
    let mut fps = None;
    let mut out_dir = None;
    let mut width = 640u32;
    let mut height = 480u32;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" => frames = Some(value(args, &mut i)?.parse::<u32>()?),
            "--fps" => fps = Some(value(args, &mut i)?.parse::<f64>()?),
            "--width" => width = value(args, &mut i)?.parse()?,
            "--height" => height = value(args, &mut i)?.parse()?,
            "--out" => out_dir = Some(PathBuf::from(value(args, &mut i)?)),
            "--config" => config_path = Some(PathBuf::from(value(args, &mut i)?)),
            "--json" => json = true,
            other => bail!("Unknown option: {}", other),
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => RecorderConfig::load_from_file(path)?,
        None => RecorderConfig::load_or_default(),
    };
    if let Some(n) = frames {
        config.frame_budget = n;
    }
    if let Some(f) = fps {
        config.fps = f;
    }
    if let Some(dir) = out_dir {
        config.output_directory = dir;
    }
    config.validate()?;
    if let Err(e) = H264Encoder::check_dimensions(width, height) {
        bail!("Invalid --width/--height: {}", e);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || stop_handler.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    let tick = Duration::from_secs_f64(1.0 / config.fps);
    let mut controller = RecordingController::new(config);
    let path = controller.start()?;
    if !json {
        println!("Recording to {}", path.display());
    }

    let mut frame_number = 0u64;
    while controller.wants_frame() && !stop.load(Ordering::SeqCst) {
        controller.on_tick();
        controller.on_frame_captured(try_synthetic_frame(frame_number, width, height)?);
        frame_number += 1;
        std::thread::sleep(tick);
    }

    let session = controller.stop().context("Recording was not running")?;
    let report = session.join()?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!(
            "Recorded {} frames ({} failed) in {:.2}s, {} bytes, {:.0} bps ({:?})",
            report.frames_encoded,
            report.frames_failed,
            report.duration_secs,
            report.bytes_written,
            report.avg_bitrate(),
            report.finish_reason
        );
        if let Some(err) = &report.finalize_error {
            eprintln!("Finalization failed: {}", err);
        }
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> Result<()> {
    // config [--write <file>]
    if args.get(2).map(String::as_str) == Some("--write") {
        let path = args.get(3).context("Usage: crabreel-cli config --write <file>")?;
        RecorderConfig::default().save_to_file(path)?;
        println!("Wrote default configuration to {}", path);
    } else {
        let config = RecorderConfig::load_or_default();
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(v) => Ok(v.as_str()),
        None => bail!("Missing value for {}", args[*i - 1]),
    }
}

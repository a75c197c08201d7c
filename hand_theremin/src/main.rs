//! hand_theremin — interactive entry point.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use hand_theremin::app::{run, run_headless, AppConfig, Tracking};
use hand_theremin::config::Config;
use hand_theremin::error::ThereminError;
use hand_theremin::source::{spawn_frame_source, ReplaySource};
use hand_theremin::voice::AudioBackend;
use note_scale::{NoteName, NoteScale, Scale};

const USAGE: &str = "\
usage: hand_theremin [options]

  --replay <path|->      play back detector results (JSON lines) instead of the mouse
  --headless             no window; print one line per note change (needs --replay)
  --backend <name>       synth | midi | null
  --config <path>        read this config file instead of the user one
  --configure            pick scale and backend interactively
  --leap                 track a LeapMotion controller (build with --features leap)
  -v, --verbose          debug logging
  -h, --help             this text";

#[derive(Default)]
struct Args {
    replay:    Option<String>,
    headless:  bool,
    backend:   Option<String>,
    config:    Option<PathBuf>,
    configure: bool,
    leap:      bool,
    verbose:   bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--replay"      => args.replay  = Some(it.next().ok_or("--replay needs a path")?),
            "--backend"     => args.backend = Some(it.next().ok_or("--backend needs a name")?),
            "--config"      => args.config  = Some(it.next().ok_or("--config needs a path")?.into()),
            "--headless"    => args.headless  = true,
            "--configure"   => args.configure = true,
            "--leap"        => args.leap      = true,
            "-v" | "--verbose" => args.verbose = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument `{}`", other)),
        }
    }
    if args.headless && args.replay.is_none() {
        return Err("--headless needs --replay".to_string());
    }
    if args.leap && args.replay.is_some() {
        return Err("--leap and --replay are exclusive".to_string());
    }
    Ok(args)
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    // stdout carries headless output, so logs go to stderr
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("warning: logging disabled: {}", e);
    }
}

fn main() {
    let args = match parse_args() {
        Ok(a)  => a,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    init_logging(args.verbose);

    if let Err(e) = start(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn start(args: Args) -> Result<(), ThereminError> {
    let mut cfg = Config::load(args.config.as_deref())?.app_config()?;

    if let Some(name) = &args.backend {
        cfg.audio.backend = name.parse::<AudioBackend>().map_err(|message| {
            ThereminError::ConfigValue { key: "--backend", message }
        })?;
    }
    if args.configure {
        configure_interactively(&mut cfg)?;
    }

    log::info!(
        target: "main",
        "scale: {}",
        cfg.scale.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
    );

    if let Some(path) = &args.replay {
        let reader = open_replay(path)?;
        if args.headless {
            let frames = spawn_frame_source(ReplaySource::new(reader));
            let stdout = io::stdout();
            let mut out = stdout.lock();
            return run_headless(cfg, frames, &mut out);
        }
        let fps = cfg.replay_fps;
        let frames = spawn_frame_source(ReplaySource::new(reader).paced(fps));
        return run(cfg, Tracking::Source(frames));
    }

    if args.leap {
        return run_leap(cfg);
    }

    println!();
    println!("  Hand Theremin: hold the left mouse button in the window and move up/down.");
    println!("  Q or Escape quits.");
    println!();
    run(cfg, Tracking::Pointer)
}

#[cfg(feature = "leap")]
fn run_leap(cfg: AppConfig) -> Result<(), ThereminError> {
    let frames = spawn_frame_source(hand_theremin::source::LeapSource);
    run(cfg, Tracking::Source(frames))
}

#[cfg(not(feature = "leap"))]
fn run_leap(_cfg: AppConfig) -> Result<(), ThereminError> {
    Err(ThereminError::SourceUnavailable(
        "built without LeapMotion support (rebuild with --features leap)".to_string(),
    ))
}

fn open_replay(path: &str) -> Result<Box<dyn BufRead + Send>, ThereminError> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).map_err(|e| {
        ThereminError::SourceUnavailable(format!("cannot open replay {}: {}", path, e))
    })?;
    Ok(Box::new(BufReader::new(file)))
}

// ────────────────────────────────────────────────────────────────────────────
// --configure
// ────────────────────────────────────────────────────────────────────────────

fn configure_interactively(cfg: &mut AppConfig) -> Result<(), ThereminError> {
    println!("  Configure the note scale (top of the frame first):");
    let root: NoteName = loop {
        let text = read_line("    Lowest note (default C4): ");
        let text = match text.trim() {
            "" => "C4",
            t  => t,
        };
        match text.parse::<NoteName>() {
            Ok(n)  => break n,
            Err(e) => println!("    ⚠  {}", e),
        }
    };

    println!("    1.Major  2.Minor  3.PentaMaj  4.PentaMin  5.Dorian  6.Blues  7.WholeTone  8.Chromatic");
    let mode = match read_line("    Choice (1–8, default 1): ").trim() {
        "2" => Scale::minor(),
        "3" => Scale::pentatonic_major(),
        "4" => Scale::pentatonic_minor(),
        "5" => Scale::dorian(),
        "6" => Scale::blues(),
        "7" => Scale::whole_tone(),
        "8" => Scale::chromatic(),
        _   => Scale::major(),
    };
    let count: usize = read_line("    Number of notes 1–24 (default 8): ")
        .trim().parse::<usize>().unwrap_or(8).clamp(1, 24);
    cfg.scale = NoteScale::descending(root.midi(), &mode, count)?;

    println!("  Audio: 1=Synth  2=MIDI  3=Silent");
    cfg.audio.backend = match read_line("  Choice (default 1): ").trim() {
        "2" => AudioBackend::Midi,
        "3" => AudioBackend::Null,
        _   => AudioBackend::Synth,
    };
    if cfg.audio.backend == AudioBackend::Midi {
        println!("  Instrument (GM program 0–127):");
        println!("    0=Grand Piano  11=Vibraphone  40=Violin  73=Flute  79=Ocarina  80=Lead Square");
        cfg.audio.program = read_line("  Program (default 79): ")
            .trim().parse::<u8>().unwrap_or(79).min(127);
    }
    Ok(())
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}

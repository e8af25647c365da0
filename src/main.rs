//! readaloud main entry point
//!
//! Wires the full coordination pipeline around a single pseudo-tab backed
//! by a text file (or stdin): background actor, message bus, on-demand
//! provisioning of the content context, native speech synthesis, and the
//! pushed lifecycle events flowing back.

use log::{debug, error, info};
use readaloud::actors::{Background, ContentInjector};
use readaloud::bus::{Message, MessageBus, TabId};
use readaloud::extract::PlainTextSource;
use readaloud::settings::SettingsStore;
use readaloud::speech::{create_synth, INTERRUPTED};
use readaloud::Result;
use std::io::Read;
use std::process;
use std::time::Duration;

/// The single pseudo-tab the CLI reads from
const CLI_TAB: TabId = 1;

fn main() {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let debug_mode = args.iter().any(|arg| arg == "--debug" || arg == "-d");

    // Initialize logger
    if debug_mode {
        // Debug mode: write to readaloud.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("readaloud.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to open readaloud.log for debug logging: {}",
                    e
                );
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "readaloud version {} starting (debug mode, logging to readaloud.log)",
            readaloud::VERSION
        );
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    if let Err(e) = run() {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    debug!("Initializing readaloud");

    // Positional argument (if any) is the file to read; otherwise stdin
    let file = std::env::args()
        .skip(1)
        .find(|arg| arg != "--debug" && arg != "-d");

    let text = match &file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    info!(
        "Read {} chars from {}",
        text.len(),
        file.as_deref().unwrap_or("stdin")
    );

    let bus = MessageBus::new();

    // The injector provisions a content context on demand: a platform
    // synthesizer plus a text source standing in for the page DOM
    let injector = ContentInjector::new(
        bus.clone(),
        Box::new(create_synth),
        Box::new(move |_tab| {
            Box::new(PlainTextSource::new(text.clone())) as Box<dyn readaloud::extract::TextSource>
        }),
    );

    let store = SettingsStore::new();
    info!("Settings file: {:?}", store.path());
    let mut background = Background::new(bus, store, Box::new(injector));

    // Equivalent of the context menu click: no content context exists yet,
    // so this exercises probe -> inject -> resend
    background.read_tab(CLI_TAB)?;

    // Ride the pushed lifecycle events until playback finishes
    loop {
        match background.pump(Duration::from_millis(100))? {
            Some(Message::SpeechStarted) => info!("Playback started"),
            Some(Message::SpeechEnded) | Some(Message::SpeechStopped) => {
                info!("Playback finished");
                break;
            }
            Some(Message::SpeechError { reason }) if reason != INTERRUPTED => {
                if let Some(status) = background.status() {
                    eprintln!("{}", status);
                }
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

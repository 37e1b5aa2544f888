//! stomp-pipe - run the effects chain over raw PCM
//!
//! Reads signed 16-bit little-endian mono samples from stdin and writes the
//! processed stream to stdout. Logs go to stderr.
//!
//! ```text
//! stomp-pipe [--config PATH] [--commands PATH] < in.raw > out.raw
//! ```
//!
//! `--commands` names a file (or FIFO) of JSON commands, one per line,
//! e.g. `"Loop"` or `{"ScaleAmplification":"Up"}`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{select, Receiver};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use stomp_core::{Command, Controls, Engine, EngineConfig, EngineError, EngineResult, Event};

const READ_CHUNK: usize = 4096;

struct Args {
    config: Option<PathBuf>,
    commands: Option<PathBuf>,
}

fn parse_args() -> EngineResult<Args> {
    let mut args = Args {
        config: None,
        commands: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let slot = match flag.as_str() {
            "--config" => &mut args.config,
            "--commands" => &mut args.commands,
            other => {
                return Err(EngineError::ConfigError(format!("Unknown argument: {}", other)));
            }
        };
        let value = iter
            .next()
            .ok_or_else(|| EngineError::ConfigError(format!("{} needs a path", flag)))?;
        *slot = Some(PathBuf::from(value));
    }
    Ok(args)
}

fn run_commands(controls: Controls, path: PathBuf) -> EngineResult<()> {
    let reader = BufReader::new(File::open(&path)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Command>(&line) {
            Ok(command) => match controls.execute(command) {
                Ok(event) => debug!("{:?}", event),
                Err(e) => warn!("Command failed: {}", e),
            },
            Err(e) => warn!("Ignoring malformed command {:?}: {}", line, e),
        }
    }
    info!("Command stream from {:?} ended", path);
    Ok(())
}

fn log_event(event: Event) {
    match event {
        Event::Error { message } => warn!("{}", message),
        other => debug!("{:?}", other),
    }
}

/// Write processed audio to stdout, logging events as they arrive, until
/// the processing thread hangs up
fn write_output(output: Receiver<Vec<u8>>, events: Receiver<Event>) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    loop {
        select! {
            recv(output) -> bytes => match bytes {
                Ok(bytes) => stdout.write_all(&bytes)?,
                Err(_) => break,
            },
            recv(events) -> event => {
                if let Ok(event) = event {
                    log_event(event);
                }
            }
        }
    }
    events.try_iter().for_each(log_event);
    stdout.flush()
}

fn main() -> EngineResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stomp_core=info,stomp_dsp=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load(),
    };

    info!("Starting stomp-pipe at {} Hz", config.sample_rate);
    let mut engine = Engine::with_config(config)?;

    if let Some(path) = args.commands {
        let controls = engine.controls().clone();
        thread::Builder::new()
            .name("stomp-commands".into())
            .spawn(move || {
                if let Err(e) = run_commands(controls, path) {
                    error!("Command reader failed: {}", e);
                }
            })
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;
    }

    let output = engine.output().clone();
    let events = engine.events().clone();
    let writer = thread::Builder::new()
        .name("stomp-writer".into())
        .spawn(move || write_output(output, events))
        .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

    let mut stdin = io::stdin().lock();
    let mut buffer = vec![0u8; READ_CHUNK];
    // A read can split a sample; hold the odd byte for the next batch
    let mut carry: Option<u8> = None;
    loop {
        let read = stdin.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        let mut batch = Vec::with_capacity(read + 1);
        batch.extend(carry.take());
        batch.extend_from_slice(&buffer[..read]);
        if batch.len() % 2 == 1 {
            carry = batch.pop();
        }
        if !batch.is_empty() {
            engine.submit(batch)?;
        }
    }
    if carry.is_some() {
        warn!("Dropping trailing odd byte");
    }

    engine.shutdown()?;
    match writer.join() {
        Ok(result) => result?,
        Err(_) => return Err(EngineError::ThreadPanicked),
    }
    info!("Processed {} batches", engine.processed_batches());
    Ok(())
}

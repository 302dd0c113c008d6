use std::fs::OpenOptions;
use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aprs_wire::aprs_is::{AprsIsClient, AprsIsConfig, DEFAULT_PORT, DEFAULT_SERVER};
use aprs_wire::{ax25, Address, Frame};

#[derive(Parser)]
#[command(name = "aprs-wire", about = "APRS codec and APRS-IS client tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the APRS-IS login passcode for a callsign
    Callpass {
        call: String,
    },
    /// Decode text frames from stdin, one per line
    Decode {
        /// Emit one JSON object per frame instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Stream frames from an APRS-IS server
    Stream {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value = "N0CALL")]
        callsign: String,
        /// Login passcode; omit for read-only access
        #[arg(long)]
        passcode: Option<i16>,
        /// Server-side filter expression, e.g. "r/37.4/-121.9/100"
        #[arg(long)]
        filter: Option<String>,
        /// Append every raw line to this file
        #[arg(long)]
        raw_log: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Decode AX.25 frames from a KISS capture file
    KissDump {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(serde::Serialize)]
struct FrameReport<'a> {
    frame: &'a Frame,
    position: Option<aprs_wire::Position>,
    message: Option<aprs_wire::Message>,
}

fn report(frame: &Frame, json: bool) {
    if json {
        let report = FrameReport {
            frame,
            position: frame.body.position().ok(),
            message: Some(frame.message()).filter(|m| m.parsed),
        };
        match serde_json::to_string(&report) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("JSON encoding failed: {e}"),
        }
        return;
    }

    match frame.body.position() {
        Ok(pos) => println!(
            "{} sent a ``{}'' to {}:  ``{}'' at {}",
            frame.source,
            frame.body.packet_type(),
            frame.dest,
            frame.body,
            pos
        ),
        Err(_) => println!(
            "{} sent a ``{}'' to {}:  ``{}''",
            frame.source,
            frame.body.packet_type(),
            frame.dest,
            frame.body
        ),
    }
}

async fn stream(
    config: AprsIsConfig,
    raw_log: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut client = AprsIsClient::connect(&config).await?;
    if let Some(path) = raw_log {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening raw log {}", path.display()))?;
        client.set_raw_log(Box::new(file));
    }
    client.set_info_handler(Box::new(|line| info!("server: {line}")));

    loop {
        tokio::select! {
            frame = client.next() => report(&frame?, json),
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

fn kiss_dump(file: &PathBuf, json: bool) -> Result<()> {
    let input = std::fs::File::open(file)
        .with_context(|| format!("opening capture {}", file.display()))?;
    let mut decoder = ax25::Decoder::new(input);
    loop {
        match decoder.next_frame() {
            Ok(frame) => report(&frame, json),
            Err(ax25::Ax25Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(());
            }
            Err(ax25::Ax25Error::Io(e)) => return Err(e).context("reading capture"),
            Err(e) => warn!("Skipping frame: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Callpass { call } => {
            println!("{}", Address::parse(&call).call_pass());
        }
        Command::Decode { json } => {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("reading stdin")?;
                let frame = Frame::parse(line.trim_end());
                if frame.is_valid() {
                    report(&frame, json);
                } else if !line.trim().is_empty() {
                    warn!("Unparseable line: {line}");
                }
            }
        }
        Command::Stream {
            server,
            port,
            callsign,
            passcode,
            filter,
            raw_log,
            json,
        } => {
            let config = AprsIsConfig {
                server,
                port,
                callsign,
                passcode,
                filter,
                ..AprsIsConfig::default()
            };
            stream(config, raw_log, json).await?;
        }
        Command::KissDump { file, json } => kiss_dump(&file, json)?,
    }
    Ok(())
}

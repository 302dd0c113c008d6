//! Async APRS-IS client: TCP login, line streaming and frame submission,
//! with a reconnect loop for long-running consumers.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::frame::Frame;

/// Well-known public rotation for filtered read-write access.
pub const DEFAULT_SERVER: &str = "rotate.aprs2.net";
pub const DEFAULT_PORT: u16 = 14580;

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for an APRS-IS session.
#[derive(Debug, Clone)]
pub struct AprsIsConfig {
    pub server: String,
    pub port: u16,
    /// Callsign used in the login line.
    pub callsign: String,
    /// Login passcode; `None` logs in read-only with `-1`.
    pub passcode: Option<i16>,
    /// Optional server-side filter expression.
    pub filter: Option<String>,
    /// Initial reconnect delay in seconds; doubles up to the cap below.
    pub retry_delay_secs: u64,
    pub max_retry_delay_secs: u64,
}

impl Default for AprsIsConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            callsign: "N0CALL".to_string(),
            passcode: None,
            filter: None,
            retry_delay_secs: 1,
            max_retry_delay_secs: 60,
        }
    }
}

impl AprsIsConfig {
    /// The login line sent after connecting:
    /// `user <call> pass <passcode> vers <app> <version>[ filter <filter>]`.
    pub fn login_line(&self) -> String {
        let mut line = format!(
            "user {} pass {} vers {} {}",
            self.callsign,
            self.passcode.map_or_else(|| "-1".to_string(), |p| p.to_string()),
            APP_NAME,
            APP_VERSION,
        );
        if let Some(filter) = &self.filter {
            line.push_str(" filter ");
            line.push_str(filter);
        }
        line
    }
}

/// A live APRS-IS connection.
pub struct AprsIsClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    raw_log: Option<Box<dyn Write + Send>>,
    info_handler: Option<Box<dyn FnMut(&str) + Send>>,
}

impl AprsIsClient {
    /// Connect and authenticate.
    pub async fn connect(config: &AprsIsConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.server, config.port);
        info!("Connecting to APRS-IS server {addr}");
        let stream = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("connecting to {addr}"))?;
        let (reader, writer) = stream.into_split();

        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
            raw_log: None,
            info_handler: None,
        };
        let login = config.login_line();
        debug!("Sending login: {login}");
        client.send_line(&login).await.context("sending login")?;
        Ok(client)
    }

    /// Forward every received raw line to `sink` (e.g. an append-only log
    /// file).
    pub fn set_raw_log(&mut self, sink: Box<dyn Write + Send>) {
        self.raw_log = Some(sink);
    }

    /// Receive server informational lines (the `#`-prefixed banners and
    /// keepalives).
    pub fn set_info_handler(&mut self, handler: Box<dyn FnMut(&str) + Send>) {
        self.info_handler = Some(handler);
    }

    /// Read the next parseable frame.
    ///
    /// Empty lines, server info lines and unparseable traffic are consumed
    /// and skipped; the error path is reserved for the connection itself
    /// going away.
    pub async fn next(&mut self) -> Result<Frame> {
        loop {
            let mut line = String::new();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .context("reading from APRS-IS")?;
            if n == 0 {
                anyhow::bail!("connection closed by server");
            }
            let line = line.trim_end_matches(['\r', '\n']);

            if let Some(log) = &mut self.raw_log {
                // A failing raw log should not take down the stream
                if let Err(e) = writeln!(log, "{line}") {
                    warn!("Raw log write failed: {e}");
                }
            }

            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                debug!("Server info: {line}");
                if let Some(handler) = &mut self.info_handler {
                    handler(line);
                }
                continue;
            }

            let frame = Frame::parse(line);
            if frame.is_valid() {
                return Ok(frame);
            }
            debug!("Skipping unparseable line: {line}");
        }
    }

    /// Submit a frame upstream.
    pub async fn send(&mut self, frame: &Frame) -> Result<()> {
        self.send_line(&frame.to_string()).await
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Connect-and-consume loop with exponential backoff, running until the
    /// surrounding task is cancelled. Each frame is handed to `on_frame`.
    pub async fn run<F>(config: AprsIsConfig, mut on_frame: F) -> Result<()>
    where
        F: FnMut(Frame),
    {
        let mut delay = config.retry_delay_secs.max(1);
        loop {
            match Self::connect(&config).await {
                Ok(mut client) => {
                    delay = config.retry_delay_secs.max(1);
                    loop {
                        match client.next().await {
                            Ok(frame) => on_frame(frame),
                            Err(e) => {
                                warn!("APRS-IS stream ended: {e:#}");
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!("APRS-IS connection failed: {e:#}"),
            }

            info!("Reconnecting in {delay}s");
            tokio::time::sleep(Duration::from_secs(delay)).await;
            delay = (delay * 2).min(config.max_retry_delay_secs.max(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_line_read_only() {
        let config = AprsIsConfig::default();
        assert_eq!(
            config.login_line(),
            format!("user N0CALL pass -1 vers {APP_NAME} {APP_VERSION}")
        );
    }

    #[test]
    fn login_line_with_passcode_and_filter() {
        let config = AprsIsConfig {
            callsign: "KG6HWF".to_string(),
            passcode: Some(22955),
            filter: Some("r/37.4/-121.9/100".to_string()),
            ..AprsIsConfig::default()
        };
        assert_eq!(
            config.login_line(),
            format!("user KG6HWF pass 22955 vers {APP_NAME} {APP_VERSION} filter r/37.4/-121.9/100")
        );
    }
}

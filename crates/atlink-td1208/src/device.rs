//! TD1208 driver: typed operations over the command runner.

use std::time::Duration;

use atlink_core::{AtPort, Result};
use atlink_runner::frame::validate_hex_frame;
use atlink_runner::{CommandRunner, DEFAULT_TIMEOUT};

use crate::commands::{self, Td1208Information};

/// Driver for Telecom Design TD1208 Sigfox modules.
///
/// Sigfox uplinks are slow (several seconds of radio time) and downlink
/// windows slower still, so send operations carry their own timeouts.
///
/// # Example
///
/// ```no_run
/// use atlink_td1208::Td1208;
/// use atlink_transport::SerialAtPort;
///
/// # async fn example() -> atlink_core::Result<()> {
/// let mut device = Td1208::new(SerialAtPort::new("/dev/ttyUSB0", 9600));
/// device.send_data("aabbcc").await?;
/// let reply = device.send_data_and_wait("aabbcc").await?;
/// # Ok(())
/// # }
/// ```
pub struct Td1208 {
    runner: CommandRunner,
    command_timeout: Duration,
    send_timeout: Duration,
    downlink_timeout: Duration,
}

impl Td1208 {
    pub fn new(port: impl AtPort + 'static) -> Self {
        Td1208 {
            runner: CommandRunner::new(Box::new(port)),
            command_timeout: DEFAULT_TIMEOUT,
            send_timeout: Duration::from_secs(30),
            downlink_timeout: Duration::from_secs(45),
        }
    }

    /// Override the per-command timeout (default 5 s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the uplink timeout (default 30 s).
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Override the downlink window timeout (default 45 s).
    pub fn downlink_timeout(mut self, timeout: Duration) -> Self {
        self.downlink_timeout = timeout;
        self
    }

    /// Firmware version, e.g. `M10+2015`.
    pub async fn get_version(&mut self) -> Result<String> {
        let command = commands::version().timeout(self.command_timeout);
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    let result = r.execute(&command).await?;
                    commands::parse_version(&result.lines)
                })
            })
            .await
    }

    /// Device identity from the `AT&V` dump.
    pub async fn get_information(&mut self) -> Result<Td1208Information> {
        let command = commands::information().timeout(self.command_timeout);
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    let result = r.execute(&command).await?;
                    commands::parse_information(&result.lines)
                })
            })
            .await
    }

    /// Send a hex-encoded Sigfox frame.
    ///
    /// The frame is validated before the port is touched; an invalid
    /// payload never costs a radio round trip.
    pub async fn send_data(&mut self, frame: &str) -> Result<()> {
        validate_hex_frame(frame)?;
        let command = commands::send(frame).timeout(self.send_timeout);
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    r.execute(&command).await?;
                    Ok(())
                })
            })
            .await
    }

    /// Send a frame and wait for the downlink window to close, returning
    /// the received payload (empty when the window carried no data).
    pub async fn send_data_and_wait(&mut self, frame: &str) -> Result<Vec<u8>> {
        validate_hex_frame(frame)?;
        let command = commands::send_and_wait(frame).timeout(self.downlink_timeout);
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    let result = r.execute(&command).await?;
                    commands::parse_downlink(&result.lines)
                })
            })
            .await
    }
}

use std::time::Duration;

use atlink_core::{AtPort, Result};
use atlink_runner::frame::validate_hex_frame;
use atlink_runner::{Command, CommandRunner};

use crate::commands;
use crate::commands::EricInformation;

/// The ERIC radio takes its time: identity probes routinely run for
/// tens of seconds before the single answer line lands.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Driver for the ERIC Sigfox module.
///
/// ```no_run
/// use atlink_eric::Eric;
/// use atlink_transport::SerialAtPort;
///
/// # async fn demo() -> atlink_core::Result<()> {
/// let port = SerialAtPort::new("/dev/ttyUSB0", 9600);
/// let mut device = Eric::new(port);
/// let version = device.get_version().await?;
/// # Ok(())
/// # }
/// ```
pub struct Eric {
    runner: CommandRunner,
    command_timeout: Duration,
}

impl Eric {
    pub fn new(port: impl AtPort + 'static) -> Self {
        Self {
            runner: CommandRunner::new(Box::new(port)),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Firmware version assembled from the three identity fragments.
    pub async fn get_version(&mut self) -> Result<String> {
        let probes = with_timeout(commands::version_probes(), self.command_timeout);
        let results = self.runner.run_commands(&probes).await?;
        commands::parse_version(&results)
    }

    /// Device identity and radio region.
    pub async fn get_information(&mut self) -> Result<EricInformation> {
        let probes = with_timeout(commands::information_probes(), self.command_timeout);
        let results = self.runner.run_commands(&probes).await?;
        commands::parse_information(&results)
    }

    /// Transmit an uplink frame without waiting for a downlink window.
    pub async fn send_data(&mut self, frame: &str) -> Result<()> {
        validate_hex_frame(frame)?;
        let command = commands::send(frame).timeout(self.command_timeout);
        self.runner
            .run_command(|runner| {
                Box::pin(async move {
                    runner.execute(&command).await?;
                    Ok(())
                })
            })
            .await
    }

    /// Transmit an uplink frame and wait for the downlink that follows
    /// the receive window. Returns the payload bytes, empty when the
    /// window closed without data.
    pub async fn send_data_and_wait(&mut self, frame: &str) -> Result<Vec<u8>> {
        validate_hex_frame(frame)?;
        let command = commands::send_and_wait(frame).timeout(self.command_timeout);
        self.runner
            .run_command(|runner| {
                Box::pin(async move {
                    let result = runner.execute(&command).await?;
                    commands::parse_downlink(&result.lines)
                })
            })
            .await
    }
}

fn with_timeout(commands: Vec<Command>, timeout: Duration) -> Vec<Command> {
    commands
        .into_iter()
        .map(|command| command.timeout(timeout))
        .collect()
}

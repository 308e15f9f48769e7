//! RAK811 driver: typed operations over the command runner.

use std::time::Duration;

use atlink_core::{AtPort, Downlink, Error, Result};
use atlink_runner::{Command, CommandRunner, DEFAULT_TIMEOUT};
use tracing::{debug, warn};

use crate::commands::{self, Rak811Information};

/// Join confirmation poll after a best-effort restart.
const JOIN_POLL_RETRIES: usize = 3;
const JOIN_POLL_DELAY: Duration = Duration::from_millis(200);

/// Driver for RAK811 modules running the v3 AT firmware.
///
/// Every public operation owns one full open/close scope on the port, so
/// a driver can sit idle without holding the serial device.
///
/// # Example
///
/// ```no_run
/// use atlink_rak811::Rak811;
/// use atlink_transport::SerialAtPort;
///
/// # async fn example() -> atlink_core::Result<()> {
/// let mut device = Rak811::new(SerialAtPort::new("/dev/ttyUSB0", 115200));
/// let version = device.get_version().await?;
/// device.join().await?;
/// device.send_unconfirmed_data(1, &[0x01, 0x02]).await?;
/// # Ok(())
/// # }
/// ```
pub struct Rak811 {
    runner: CommandRunner,
    command_timeout: Duration,
    join_timeout: Duration,
    downlink_timeout: Duration,
}

impl Rak811 {
    pub fn new(port: impl AtPort + 'static) -> Self {
        Rak811 {
            runner: CommandRunner::new(Box::new(port)),
            command_timeout: DEFAULT_TIMEOUT,
            join_timeout: Duration::from_secs(10),
            downlink_timeout: Duration::from_secs(30),
        }
    }

    /// Override the per-command timeout (default 5 s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the join timeout (default 10 s).
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Override the downlink wait timeout (default 30 s).
    pub fn downlink_timeout(mut self, timeout: Duration) -> Self {
        self.downlink_timeout = timeout;
        self
    }

    /// Firmware version, e.g. `V3.0.0.14.H`.
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

    /// Current LoRa configuration from the 25-line status dump.
    pub async fn get_information(&mut self) -> Result<Rak811Information> {
        let timeout = self.command_timeout;
        self.runner
            .run_command(move |r| Box::pin(async move { fetch_information(r, timeout).await }))
            .await
    }

    pub async fn set_device_eui(&mut self, dev_eui: &str) -> Result<()> {
        let command = commands::set_config("dev_eui", dev_eui).timeout(self.command_timeout);
        self.run_set(command).await
    }

    pub async fn set_app_eui(&mut self, app_eui: &str) -> Result<()> {
        let command = commands::set_config("app_eui", app_eui).timeout(self.command_timeout);
        self.run_set(command).await
    }

    pub async fn set_app_key(&mut self, app_key: &str) -> Result<()> {
        let command = commands::set_config("app_key", app_key).timeout(self.command_timeout);
        self.run_set(command).await
    }

    /// Switch between confirmed and unconfirmed uplinks.
    pub async fn set_confirm(&mut self, confirmed: bool) -> Result<()> {
        let command = commands::set_config("confirm", if confirmed { "1" } else { "0" })
            .timeout(self.command_timeout);
        self.run_set(command).await
    }

    /// Join the LoRa network via OTAA.
    ///
    /// Short-circuits when the status dump already reports joined. A
    /// failed join triggers a best-effort restart followed by a bounded
    /// poll of the joined flag; only if that poll also fails does the
    /// original join error surface.
    pub async fn join(&mut self) -> Result<()> {
        let (command_timeout, join_timeout) = (self.command_timeout, self.join_timeout);
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    let info = fetch_information(r, command_timeout).await?;
                    if info.is_joined {
                        debug!("already joined, skipping join command");
                        return Ok(());
                    }
                    join_network(r, command_timeout, join_timeout).await
                })
            })
            .await
    }

    /// Detach from the network.
    ///
    /// The v3 firmware has no leave command; the driver restarts the
    /// module and polls until the status dump reports not joined.
    pub async fn leave(&mut self) -> Result<()> {
        let command_timeout = self.command_timeout;
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    let info = fetch_information(r, command_timeout).await?;
                    if !info.is_joined {
                        return Ok(());
                    }
                    best_effort_restart(r, command_timeout).await;
                    if poll_joined(r, command_timeout, false).await {
                        Ok(())
                    } else {
                        Err(Error::Parse(
                            "cannot leave network: device still joined".to_string(),
                        ))
                    }
                })
            })
            .await
    }

    pub async fn send_unconfirmed_data(&mut self, fport: u8, data: &[u8]) -> Result<()> {
        self.send(fport, hex::encode(data), false).await
    }

    pub async fn send_confirmed_data(&mut self, fport: u8, data: &[u8]) -> Result<()> {
        self.send(fport, hex::encode(data), true).await
    }

    /// Send an unconfirmed uplink and wait for the downlink reply.
    pub async fn send_unconfirmed_data_and_wait(
        &mut self,
        fport: u8,
        data: &[u8],
    ) -> Result<Downlink> {
        self.send_and_wait(fport, hex::encode(data), false).await
    }

    /// Send a confirmed uplink and wait for the downlink reply.
    pub async fn send_confirmed_data_and_wait(
        &mut self,
        fport: u8,
        data: &[u8],
    ) -> Result<Downlink> {
        self.send_and_wait(fport, hex::encode(data), true).await
    }

    async fn run_set(&mut self, command: Command) -> Result<()> {
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    r.execute(&command).await?;
                    Ok(())
                })
            })
            .await
    }

    async fn send(&mut self, fport: u8, frame: String, confirmed: bool) -> Result<()> {
        let (command_timeout, join_timeout) = (self.command_timeout, self.join_timeout);
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    prepare_session(r, command_timeout, join_timeout, confirmed).await?;
                    r.execute(&commands::send(fport, &frame).timeout(command_timeout))
                        .await?;
                    Ok(())
                })
            })
            .await
    }

    async fn send_and_wait(
        &mut self,
        fport: u8,
        frame: String,
        confirmed: bool,
    ) -> Result<Downlink> {
        let (command_timeout, join_timeout) = (self.command_timeout, self.join_timeout);
        let downlink_timeout = self.downlink_timeout;
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    prepare_session(r, command_timeout, join_timeout, confirmed).await?;
                    let result = r
                        .execute(&commands::send_and_wait(fport, &frame).timeout(downlink_timeout))
                        .await?;
                    commands::parse_downlink(&result.lines)
                })
            })
            .await
    }
}

async fn fetch_information(
    r: &mut CommandRunner,
    timeout: Duration,
) -> Result<Rak811Information> {
    let result = r.execute(&commands::information().timeout(timeout)).await?;
    commands::parse_information(&result.lines)
}

/// Align the confirm flag with the requested mode and join if needed,
/// all within the caller's open scope.
async fn prepare_session(
    r: &mut CommandRunner,
    command_timeout: Duration,
    join_timeout: Duration,
    confirmed: bool,
) -> Result<()> {
    let info = fetch_information(r, command_timeout).await?;
    if info.is_confirm != confirmed {
        let value = if confirmed { "1" } else { "0" };
        r.execute(&commands::set_config("confirm", value).timeout(command_timeout))
            .await?;
    }
    if !info.is_joined {
        join_network(r, command_timeout, join_timeout).await?;
    }
    Ok(())
}

async fn join_network(
    r: &mut CommandRunner,
    command_timeout: Duration,
    join_timeout: Duration,
) -> Result<()> {
    match r.execute(&commands::join().timeout(join_timeout)).await {
        Ok(_) => Ok(()),
        Err(join_err) => {
            best_effort_restart(r, command_timeout).await;
            if poll_joined(r, command_timeout, true).await {
                Ok(())
            } else {
                Err(join_err)
            }
        }
    }
}

/// Restart failures are ignored; the caller verifies the outcome with a
/// status poll.
async fn best_effort_restart(r: &mut CommandRunner, timeout: Duration) {
    if let Err(err) = r.execute(&commands::restart().timeout(timeout)).await {
        warn!(error = %err, "restart did not complete cleanly");
    }
}

async fn poll_joined(r: &mut CommandRunner, timeout: Duration, want_joined: bool) -> bool {
    for _ in 0..JOIN_POLL_RETRIES {
        tokio::time::sleep(JOIN_POLL_DELAY).await;
        match fetch_information(r, timeout).await {
            Ok(info) if info.is_joined == want_joined => return true,
            _ => {}
        }
    }
    false
}

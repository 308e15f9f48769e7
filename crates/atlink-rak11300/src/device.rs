//! RAK11300 driver: typed operations over the command runner.

use std::time::Duration;

use atlink_core::{AtPort, Downlink, Error, Result};
use atlink_runner::{Command, CommandRunner, DEFAULT_TIMEOUT};
use tracing::{debug, warn};

use crate::commands::{self, Rak11300Information};

const JOIN_POLL_RETRIES: usize = 3;
const JOIN_POLL_DELAY: Duration = Duration::from_millis(200);

/// Grace period for `ATZ`; the device reboots without replying.
const RESET_GRACE: Duration = Duration::from_secs(1);

/// Driver for RAK11300 modules running the RUI AT firmware.
///
/// Every public operation owns one full open/close scope on the port.
///
/// # Example
///
/// ```no_run
/// use atlink_rak11300::Rak11300;
/// use atlink_transport::SerialAtPort;
///
/// # async fn example() -> atlink_core::Result<()> {
/// let mut device = Rak11300::new(SerialAtPort::new("/dev/ttyUSB0", 115200));
/// device.set_device_eui("E660CCC14B738A30").await?;
/// device.join().await?;
/// let downlink = device.send_confirmed_data_and_wait(2, &[0x01]).await?;
/// # Ok(())
/// # }
/// ```
pub struct Rak11300 {
    runner: CommandRunner,
    command_timeout: Duration,
    join_timeout: Duration,
    downlink_timeout: Duration,
}

impl Rak11300 {
    pub fn new(port: impl AtPort + 'static) -> Self {
        Rak11300 {
            runner: CommandRunner::new(Box::new(port)),
            command_timeout: DEFAULT_TIMEOUT,
            join_timeout: Duration::from_secs(30),
            downlink_timeout: Duration::from_secs(45),
        }
    }

    /// Override the per-command timeout (default 5 s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the join timeout (default 30 s).
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Override the downlink wait timeout (default 45 s).
    pub fn downlink_timeout(mut self, timeout: Duration) -> Self {
        self.downlink_timeout = timeout;
        self
    }

    /// Firmware version, e.g. `1.0.0`.
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

    /// Current configuration from the `AT+STATUS=?` block.
    pub async fn get_information(&mut self) -> Result<Rak11300Information> {
        let timeout = self.command_timeout;
        self.runner
            .run_command(move |r| Box::pin(async move { fetch_information(r, timeout).await }))
            .await
    }

    pub async fn set_device_eui(&mut self, dev_eui: &str) -> Result<()> {
        let command = commands::set_field("DEVEUI", dev_eui).timeout(self.command_timeout);
        self.run_set(command).await
    }

    pub async fn set_app_eui(&mut self, app_eui: &str) -> Result<()> {
        let command = commands::set_field("APPEUI", app_eui).timeout(self.command_timeout);
        self.run_set(command).await
    }

    pub async fn set_app_key(&mut self, app_key: &str) -> Result<()> {
        let command = commands::set_field("APPKEY", app_key).timeout(self.command_timeout);
        self.run_set(command).await
    }

    pub async fn set_apps_key(&mut self, apps_key: &str) -> Result<()> {
        let command = commands::set_field("APPSKEY", apps_key).timeout(self.command_timeout);
        self.run_set(command).await
    }

    pub async fn set_nwks_key(&mut self, nwks_key: &str) -> Result<()> {
        let command = commands::set_field("NWKSKEY", nwks_key).timeout(self.command_timeout);
        self.run_set(command).await
    }

    pub async fn set_dev_address(&mut self, dev_address: &str) -> Result<()> {
        let command = commands::set_field("DEVADDR", dev_address).timeout(self.command_timeout);
        self.run_set(command).await
    }

    /// Switch between confirmed and unconfirmed uplinks.
    pub async fn set_confirm(&mut self, confirmed: bool) -> Result<()> {
        let command = commands::set_field("CFM", if confirmed { "1" } else { "0" })
            .timeout(self.command_timeout);
        self.run_set(command).await
    }

    /// Enable or disable joining automatically on power-up.
    pub async fn set_auto_join(&mut self, enabled: bool) -> Result<()> {
        let command = commands::set_auto_join(enabled).timeout(self.command_timeout);
        self.run_set(command).await
    }

    /// Reboot the module. Best-effort: the firmware restarts without
    /// acknowledging, so a quiet port counts as success.
    pub async fn reset(&mut self) -> Result<()> {
        let command = commands::reset().timeout(RESET_GRACE);
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    match r.execute(&command).await {
                        Ok(_) | Err(Error::Timeout { .. }) => Ok(()),
                        Err(err) => Err(err),
                    }
                })
            })
            .await
    }

    /// Join the LoRa network via OTAA, waiting for the `+EVT:JOINED`
    /// event.
    ///
    /// Short-circuits when the status block already reports joined. A
    /// failed join triggers a best-effort reset followed by a bounded
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

    /// Leave the network: stop the join state machine, reset, and poll
    /// until the status block reports not joined.
    pub async fn leave(&mut self) -> Result<()> {
        let command_timeout = self.command_timeout;
        self.runner
            .run_command(move |r| {
                Box::pin(async move {
                    let info = fetch_information(r, command_timeout).await?;
                    if !info.is_joined {
                        return Ok(());
                    }
                    r.execute(&commands::leave().timeout(command_timeout)).await?;
                    best_effort_reset(r).await;
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

    /// Send an unconfirmed uplink and wait for the downlink event.
    pub async fn send_unconfirmed_data_and_wait(
        &mut self,
        fport: u8,
        data: &[u8],
    ) -> Result<Downlink> {
        self.send_and_wait(fport, hex::encode(data), false).await
    }

    /// Send a confirmed uplink and wait for the downlink event.
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
) -> Result<Rak11300Information> {
    let result = r.execute(&commands::information().timeout(timeout)).await?;
    commands::parse_information(&result.lines)
}

async fn prepare_session(
    r: &mut CommandRunner,
    command_timeout: Duration,
    join_timeout: Duration,
    confirmed: bool,
) -> Result<()> {
    let info = fetch_information(r, command_timeout).await?;
    if info.is_confirm != confirmed {
        let value = if confirmed { "1" } else { "0" };
        r.execute(&commands::set_field("CFM", value).timeout(command_timeout))
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
            best_effort_reset(r).await;
            if poll_joined(r, command_timeout, true).await {
                Ok(())
            } else {
                Err(join_err)
            }
        }
    }
}

/// Reset failures are ignored; the caller verifies the outcome with a
/// status poll.
async fn best_effort_reset(r: &mut CommandRunner) {
    match r.execute(&commands::reset().timeout(RESET_GRACE)).await {
        Ok(_) | Err(Error::Timeout { .. }) => {}
        Err(err) => warn!(error = %err, "reset did not complete cleanly"),
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

#[cfg(test)]
mod tests {
    use atlink_core::Error;
    use atlink_test_harness::MockPort;

    use super::*;

    fn status_lines(joined: bool, confirmed: bool) -> Vec<String> {
        vec![
            "Device status:".to_string(),
            "   Auto join enabled".to_string(),
            "   LPWAN status:".to_string(),
            "   Dev EUI E660CCC14B738A30".to_string(),
            "   App EUI 308A734BC1CC60E6".to_string(),
            "   App Key E660CCC14B738A30308A734BC1CC60E6".to_string(),
            "   OTAA enabled".to_string(),
            "   Region: EU868".to_string(),
            format!(
                "   Network {}",
                if joined { "joined" } else { "not joined" }
            ),
            format!(
                "   {} Message",
                if confirmed { "Confirmed" } else { "Unconfirmed" }
            ),
            "OK".to_string(),
        ]
    }

    fn queue_status(port: &mut MockPort, joined: bool, confirmed: bool) {
        let lines = status_lines(joined, confirmed);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        port.queue_lines_once(&refs);
    }

    #[tokio::test]
    async fn get_version_parses_banner() {
        let mut port = MockPort::new();
        let log = port.sent_log();
        port.queue_lines_once(&["AT+VER=?", "AT+VER:1.0.0 Apr 23 2021 00:27:18", "OK"]);
        let mut device = Rak11300::new(port);

        let version = device.get_version().await.unwrap();
        assert_eq!(version, "1.0.0");
        assert_eq!(log.commands(), vec!["AT+VER=?"]);
    }

    #[tokio::test]
    async fn invalid_device_eui_maps_to_device_error() {
        let mut port = MockPort::new();
        let log = port.sent_log();
        port.queue_lines_once(&["+CME ERROR:5"]);
        let mut device = Rak11300::new(port);

        let err = device.set_device_eui("invalid").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "RAK11300 error code 5: Invalid parameter in the AT command"
        );
        assert_eq!(log.commands(), vec!["AT+DEVEUI=invalid"]);
    }

    #[tokio::test]
    async fn get_information_rejects_schema_drift() {
        let mut port = MockPort::new();
        port.queue_lines_once(&["something unexpected", "OK"]);
        let mut device = Rak11300::new(port);

        let err = device.get_information().await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn join_short_circuits_when_already_joined() {
        let mut port = MockPort::new();
        let log = port.sent_log();
        queue_status(&mut port, true, false);
        let mut device = Rak11300::new(port);

        device.join().await.unwrap();
        assert_eq!(log.commands(), vec!["AT+STATUS=?"]);
    }

    #[tokio::test]
    async fn join_waits_for_joined_event() {
        let mut port = MockPort::new();
        let log = port.sent_log();
        queue_status(&mut port, false, false);
        port.queue_lines_once(&["OK", "+EVT:JOINED"]);
        let mut device = Rak11300::new(port);

        device.join().await.unwrap();
        assert_eq!(log.commands(), vec!["AT+STATUS=?", "AT+JOIN=1:0:7:8"]);
    }

    #[tokio::test]
    async fn leave_resets_and_polls_for_not_joined() {
        let mut port = MockPort::new();
        let log = port.sent_log();
        queue_status(&mut port, true, false);
        port.queue_lines_once(&["OK"]);
        port.queue_lines_once(&["OK"]);
        queue_status(&mut port, false, false);
        let mut device = Rak11300::new(port);

        device.leave().await.unwrap();
        assert_eq!(
            log.commands(),
            vec!["AT+STATUS=?", "AT+JOIN=0:0:7:8", "ATZ", "AT+STATUS=?"]
        );
    }

    #[tokio::test]
    async fn reset_tolerates_a_silent_reboot() {
        let port = MockPort::new();
        let mut device = Rak11300::new(port);
        // No lines queued: the ATZ read window expires quietly.
        device.reset().await.unwrap();
    }

    #[tokio::test]
    async fn send_aligns_confirm_flag_before_uplink() {
        let mut port = MockPort::new();
        let log = port.sent_log();
        queue_status(&mut port, true, true);
        port.queue_lines_once(&["OK"]);
        port.queue_lines_once(&["OK"]);
        let mut device = Rak11300::new(port);

        device.send_unconfirmed_data(1, &[0x01, 0x02]).await.unwrap();
        assert_eq!(
            log.commands(),
            vec!["AT+STATUS=?", "AT+CFM=0", "AT+SEND=1:0102"]
        );
    }

    #[tokio::test]
    async fn send_and_wait_parses_downlink_event() {
        let mut port = MockPort::new();
        queue_status(&mut port, true, true);
        port.queue_lines_once(&["OK", "+EVT:RX_1:-50:7:UNICAST:2:0304"]);
        let mut device = Rak11300::new(port);

        let downlink = device
            .send_confirmed_data_and_wait(2, &[0x03, 0x04])
            .await
            .unwrap();
        assert_eq!(downlink.fport, 2);
        assert_eq!(downlink.rssi, -50);
        assert_eq!(downlink.data, vec![0x03, 0x04]);
    }
}

use std::time::Duration;

use atlink_core::{AtPort, Result};
use atlink_runner::{Command, CommandResult, CommandRunner, DEFAULT_TIMEOUT};

use crate::commands;

/// Driver for the SIM800 GSM modem.
///
/// Besides the version probe, the driver offers a network diagnostics
/// sweep: a fixed battery of registration, signal, and GPRS probes whose
/// raw answers are returned for inspection rather than parsed.
///
/// ```no_run
/// use atlink_sim800::Sim800;
/// use atlink_transport::SerialAtPort;
///
/// # async fn demo() -> atlink_core::Result<()> {
/// let port = SerialAtPort::new("/dev/ttyUSB0", 115200);
/// let mut device = Sim800::new(port);
/// for result in device.probe_network().await? {
///     println!("{}: {:?}", result.command, result.lines);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Sim800 {
    runner: CommandRunner,
    command_timeout: Duration,
}

impl Sim800 {
    pub fn new(port: impl AtPort + 'static) -> Self {
        Self {
            runner: CommandRunner::new(Box::new(port)),
            command_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Product identification string from `ATI`.
    pub async fn get_version(&mut self) -> Result<String> {
        let command = commands::version().timeout(self.command_timeout);
        self.runner
            .run_command(|runner| {
                Box::pin(async move {
                    let result = runner.execute(&command).await?;
                    commands::parse_version(&result.lines)
                })
            })
            .await
    }

    /// Walk the diagnostics battery and return every raw answer, one
    /// [`CommandResult`] per probe in probe order. A probe the network
    /// rejects with `ERROR` is recorded, not raised.
    pub async fn probe_network(&mut self) -> Result<Vec<CommandResult>> {
        let probes: Vec<Command> = commands::network_probes()
            .into_iter()
            .map(|command| command.timeout(self.command_timeout))
            .collect();
        self.runner.run_commands(&probes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlink_test_harness::MockPort;

    #[tokio::test]
    async fn version_reads_product_identification() {
        let mut port = MockPort::new();
        port.queue_lines_once(&["ATI", "SIM800 R14.18", "OK"]);
        let log = port.sent_log();

        let mut device = Sim800::new(port).command_timeout(Duration::from_millis(10));
        let version = device.get_version().await.unwrap();

        assert_eq!(version, "SIM800 R14.18");
        assert_eq!(log.commands(), vec!["ATI"]);
    }

    #[tokio::test]
    async fn probe_network_walks_the_full_battery() {
        let mut port = MockPort::new();
        port.queue_lines(&["OK"]);
        let log = port.sent_log();

        let mut device = Sim800::new(port).command_timeout(Duration::from_millis(10));
        let results = device.probe_network().await.unwrap();

        assert_eq!(results.len(), 10);
        assert_eq!(
            log.commands(),
            vec![
                "AT+CPIN?",
                "AT+CGREG=1",
                "AT+CGREG?",
                "AT+COPS?",
                "AT+CSQ",
                "AT+CGDCONT?",
                "AT+CGATT=1",
                "AT+CGATT?",
                "AT+CGPADDR=1",
                "AT+CIPPING=\"142.250.200.142\"",
            ]
        );
    }

    #[tokio::test]
    async fn probe_network_records_rejections_and_continues() {
        let mut port = MockPort::new();
        port.queue_lines_once(&["+CPIN: READY", "OK"]);
        port.queue_lines_once(&["ERROR"]);
        port.queue_lines(&["OK"]);

        let mut device = Sim800::new(port).command_timeout(Duration::from_millis(10));
        let results = device.probe_network().await.unwrap();

        assert_eq!(results.len(), 10);
        assert_eq!(results[0].lines, vec!["+CPIN: READY", "OK"]);
        assert_eq!(results[1].lines, vec!["ERROR"]);
    }
}

//! The SGOS session driver.

use std::time::Duration;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use super::directive::Directive;
use super::response::Response;
use crate::channel::{Matched, PtyChannel};
use crate::error::{DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::{SshConfig, SshTransport, Transport};

/// Session driver for one SGOS appliance.
///
/// One driver owns one connection. Every operation takes `&mut self`, so a
/// session only ever has one directive in flight. Manage several devices by
/// running one driver per device.
///
/// Configuration mode is never cached here: it is probed from the channel's
/// latest prompt every time it matters.
#[derive(Debug)]
pub struct SgosDriver<T: Transport = SshTransport> {
    /// SSH configuration, when this driver opens its own connection.
    ssh_config: Option<SshConfig>,

    /// Platform definition.
    pub(crate) platform: PlatformDefinition,

    /// Channel (None when disconnected).
    pub(crate) channel: Option<PtyChannel<T>>,

    /// Secret for `enable`, if the login lands at `>`.
    enable_secret: Option<SecretString>,

    /// Default timeout for each read.
    pub(crate) timeout: Duration,

    /// Log full response text instead of just its size.
    pub(crate) response_logging: bool,
}

impl SgosDriver<SshTransport> {
    /// Create a driver that connects over SSH on [`open`](Self::open).
    pub fn new(ssh_config: SshConfig, platform: PlatformDefinition) -> Self {
        let timeout = ssh_config.timeout;
        let mut driver = Self::detached(platform);
        driver.ssh_config = Some(ssh_config);
        driver.timeout = timeout;
        driver
    }

    /// Connect and prepare the session.
    pub async fn open(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let config = self.ssh_config.as_ref().ok_or_else(|| DriverError::InvalidConfig {
            message: "no SSH configuration; use attach() with a transport".to_string(),
        })?;

        let transport = SshTransport::connect(config).await?;
        self.attach(transport).await
    }
}

impl<T: Transport> SgosDriver<T> {
    /// Create a driver with no connection yet; see [`attach`](Self::attach).
    pub fn detached(platform: PlatformDefinition) -> Self {
        Self {
            ssh_config: None,
            platform,
            channel: None,
            enable_secret: None,
            timeout: Duration::from_secs(30),
            response_logging: false,
        }
    }

    /// Create a driver over an already-open transport.
    pub async fn with_transport(platform: PlatformDefinition, transport: T) -> Result<Self> {
        let mut driver = Self::detached(platform);
        driver.attach(transport).await?;
        Ok(driver)
    }

    /// Take over an open transport: wait for the first prompt, escalate with
    /// `enable` if needed, then run the platform's on-open commands.
    pub async fn attach(&mut self, transport: T) -> Result<()> {
        if self.channel.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let mut channel = PtyChannel::new(
            transport,
            self.platform.prompt_pattern.clone(),
            self.platform.search_depth,
        );
        channel.read_until_prompt(self.timeout).await?;
        debug!(
            "session ready at prompt {:?}",
            String::from_utf8_lossy(channel.current_prompt())
        );
        self.channel = Some(channel);

        self.acquire_enable().await?;

        for command in self.platform.on_open_commands.clone() {
            let response = self.send(&Directive::new(command)).await?;
            if let Some(message) = &response.failure_message {
                warn!("on-open command {:?} failed: {}", response.command, message);
            }
        }

        Ok(())
    }

    /// Close the connection.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            channel.close().await?;
        }
        Ok(())
    }

    /// Check if the driver is connected.
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Set the secret used to `enable` from the `>` prompt.
    pub fn set_enable_secret(&mut self, secret: SecretString) {
        self.enable_secret = Some(secret);
    }

    /// Set the default timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Log full response text at debug level.
    pub fn enable_response_logging(&mut self) {
        self.response_logging = true;
    }

    /// Log only response sizes.
    pub fn disable_response_logging(&mut self) {
        self.response_logging = false;
    }

    /// Whether full responses are being logged.
    pub fn response_logging(&self) -> bool {
        self.response_logging
    }

    /// The latest prompt, as text.
    pub fn current_prompt(&self) -> Result<String> {
        let channel = self.channel.as_ref().ok_or(DriverError::NotConnected)?;
        Ok(String::from_utf8_lossy(channel.current_prompt()).to_string())
    }

    /// Single-shot command: leave configuration mode, then send.
    ///
    /// A command the device rejects is an error here, since there is no
    /// result set to record it in.
    pub async fn run_command(&mut self, directive: &Directive) -> Result<Response> {
        self.exit_config_mode().await?;

        let response = self.send(directive).await?;
        match response.failure_message {
            Some(message) => Err(DriverError::CommandRejected {
                command: response.command,
                message,
            }
            .into()),
            None => Ok(response),
        }
    }

    /// Run several single-shot commands in order.
    pub async fn run_commands(&mut self, directives: &[Directive]) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(directives.len());
        for directive in directives {
            responses.push(self.run_command(directive).await?);
        }
        Ok(responses)
    }

    /// Escalate from `>` to `#` when a secret is configured.
    async fn acquire_enable(&mut self) -> Result<()> {
        let timeout = self.timeout;
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        if !self.platform.is_unprivileged_prompt(channel.current_prompt()) {
            return Ok(());
        }
        let Some(secret) = self.enable_secret.as_ref() else {
            warn!("logged in unprivileged and no enable secret is set");
            return Ok(());
        };

        debug!("escalating with {:?}", self.platform.enable_command);
        channel.send_line(&self.platform.enable_command, true).await?;
        let read = channel
            .read_until_any(&[&self.platform.enable_prompt], timeout)
            .await?;

        if read.matched == Matched::Pattern(0) {
            channel.send_line(secret.expose_secret(), true).await?;
            channel.read_until_prompt(timeout).await?;
        }

        if self.platform.is_unprivileged_prompt(channel.current_prompt()) {
            return Err(DriverError::PrivilegeAcquisitionFailed {
                target: "enable".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::sgos;
    use crate::transport::mock::{Reply, ScriptedTransport};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[tokio::test]
    async fn test_attach_reads_initial_prompt() {
        init_logging();
        let driver = SgosDriver::with_transport(sgos::platform(), ScriptedTransport::new("proxy"))
            .await
            .unwrap();
        assert!(driver.is_open());
        assert_eq!(driver.current_prompt().unwrap(), "proxy#");
    }

    #[tokio::test]
    async fn test_attach_twice_fails() {
        let mut driver =
            SgosDriver::with_transport(sgos::platform(), ScriptedTransport::new("proxy"))
                .await
                .unwrap();
        let err = driver
            .attach(ScriptedTransport::new("proxy"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Driver(DriverError::AlreadyConnected)
        ));
    }

    #[tokio::test]
    async fn test_enable_escalation() {
        let transport = ScriptedTransport::new("proxy").unprivileged("s3cret");
        let writes = transport.writes();

        let mut driver = SgosDriver::detached(sgos::platform());
        driver.set_enable_secret(SecretString::from("s3cret".to_string()));
        driver.attach(transport).await.unwrap();

        assert_eq!(driver.current_prompt().unwrap(), "proxy#");
        assert_eq!(*writes.lock().unwrap(), vec!["enable\n", "s3cret\n"]);
    }

    #[tokio::test]
    async fn test_enable_with_wrong_secret_fails() {
        let transport = ScriptedTransport::new("proxy").unprivileged("s3cret");

        let mut driver = SgosDriver::detached(sgos::platform());
        driver.set_enable_secret(SecretString::from("nope".to_string()));
        let err = driver.attach(transport).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Driver(DriverError::PrivilegeAcquisitionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_on_open_commands_run() {
        let transport = ScriptedTransport::new("proxy");
        let writes = transport.writes();
        let platform = sgos::platform().with_on_open_command("show clock");

        SgosDriver::with_transport(platform, transport).await.unwrap();
        assert_eq!(*writes.lock().unwrap(), vec!["show clock\n"]);
    }

    #[tokio::test]
    async fn test_run_command_returns_output() {
        let transport = ScriptedTransport::new("proxy")
            .on("show version", Reply::output("Version: SGOS 6.7.4.144 Proxy Edition"));
        let mut driver = SgosDriver::with_transport(sgos::platform(), transport)
            .await
            .unwrap();

        let response = driver
            .run_command(&Directive::new("show version"))
            .await
            .unwrap();
        assert_eq!(response.result, "Version: SGOS 6.7.4.144 Proxy Edition");
        assert_eq!(response.prompt, "proxy#");
    }

    #[tokio::test]
    async fn test_run_command_drains_config_mode_first() {
        let transport = ScriptedTransport::new("proxy").in_config(2);
        let writes = transport.writes();
        let mut driver = SgosDriver::with_transport(sgos::platform(), transport)
            .await
            .unwrap();

        driver.run_command(&Directive::new("show clock")).await.unwrap();
        assert_eq!(
            *writes.lock().unwrap(),
            vec!["exit\n", "exit\n", "show clock\n"]
        );
    }

    #[tokio::test]
    async fn test_run_command_rejected() {
        let transport = ScriptedTransport::new("proxy")
            .on("show bogus", Reply::output("% Invalid input detected"));
        let mut driver = SgosDriver::with_transport(sgos::platform(), transport)
            .await
            .unwrap();

        let err = driver
            .run_command(&Directive::new("show bogus"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Driver(DriverError::CommandRejected { .. })
        ));
        assert!(!err.is_connection_failure());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut driver: SgosDriver<ScriptedTransport> = SgosDriver::detached(sgos::platform());
        let err = driver
            .run_command(&Directive::new("show clock"))
            .await
            .unwrap_err();
        assert!(err.is_connection_failure());
    }
}

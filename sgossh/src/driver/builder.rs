//! Builder for creating SGOS drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::sgos::SgosDriver;
use crate::error::{DriverError, Result};
use crate::platform::{PlatformDefinition, sgos};
use crate::transport::config::{AuthMethod, HostKeyVerification, SshConfig};

/// Builder for constructing an [`SgosDriver`].
///
/// # Example
///
/// ```rust,no_run
/// use sgossh::driver::DriverBuilder;
///
/// # async fn example() -> Result<(), sgossh::Error> {
/// let mut driver = DriverBuilder::new("10.0.0.5")
///     .username("admin")
///     .password("secret")
///     .enable_secret("enable-secret")
///     .build()?;
/// driver.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    enable_secret: Option<SecretString>,
    platform: Option<PlatformDefinition>,
    timeout: Duration,
    terminal_size: Option<(u32, u32)>,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    response_logging: bool,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            enable_secret: None,
            platform: None,
            timeout: Duration::from_secs(30),
            terminal_size: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            response_logging: false,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Secret sent to `enable` when the login lands at `>`.
    pub fn enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Use a custom platform definition instead of the built-in SGOS one.
    pub fn custom_platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the connection and read timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set terminal dimensions, overriding the platform's.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_size = Some((width, height));
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Skip host key checks entirely.
    pub fn danger_disable_host_key_verification(self) -> Self {
        self.host_key_verification(HostKeyVerification::Disabled)
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Log full response text at debug level.
    pub fn response_logging(mut self, enabled: bool) -> Self {
        self.response_logging = enabled;
        self
    }

    /// Build the driver.
    ///
    /// This creates the driver but does not connect. Call `open()` on the
    /// returned driver to establish the connection.
    pub fn build(self) -> Result<SgosDriver> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "username is required".to_string(),
        })?;

        if self.host.trim().is_empty() {
            return Err(DriverError::InvalidConfig {
                message: "host is required".to_string(),
            }
            .into());
        }

        if self.timeout.is_zero() {
            return Err(DriverError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }

        let platform = self.platform.unwrap_or_else(sgos::platform);
        let (terminal_width, terminal_height) = self
            .terminal_size
            .unwrap_or((platform.terminal_width, platform.terminal_height));

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            terminal_width,
            terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        let mut driver = SgosDriver::new(ssh_config, platform);
        if let Some(secret) = self.enable_secret {
            driver.set_enable_secret(secret);
        }
        if self.response_logging {
            driver.enable_response_logging();
        }
        Ok(driver)
    }
}

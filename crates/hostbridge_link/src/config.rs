//! Connection settings for the bridge.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default port of the command channel.
pub const DEFAULT_PUSH_PORT: u16 = 14128;

/// Default port of the response channel.
pub const DEFAULT_PULL_PORT: u16 = 14129;

/// How a client reaches the host and how long it waits for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    /// Host address.
    pub host: IpAddr,
    /// Port of the client-to-host command channel.
    pub push_port: u16,
    /// Port of the host-to-client response channel.
    pub pull_port: u16,
    /// Deadline for one command, in minutes.
    pub max_minutes_to_wait: f64,
    /// Deadline for the connection probe sent before each command.
    pub probe_timeout: Duration,
}

impl ConnectionSettings {
    /// Creates settings with default ports and deadlines on localhost.
    pub fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            push_port: DEFAULT_PUSH_PORT,
            pull_port: DEFAULT_PULL_PORT,
            max_minutes_to_wait: 10.0,
            probe_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the host address.
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the command channel port.
    pub fn with_push_port(mut self, port: u16) -> Self {
        self.push_port = port;
        self
    }

    /// Sets the response channel port.
    pub fn with_pull_port(mut self, port: u16) -> Self {
        self.pull_port = port;
        self
    }

    /// Sets the command deadline in minutes.
    pub fn with_max_minutes_to_wait(mut self, minutes: f64) -> Self {
        self.max_minutes_to_wait = minutes;
        self
    }

    /// Sets the connection probe deadline.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Command deadline as a duration. Negative or non-finite values
    /// collapse to zero.
    pub fn command_timeout(&self) -> Duration {
        let secs = self.max_minutes_to_wait * 60.0;
        if secs.is_finite() && secs > 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    /// Address of the command channel.
    pub fn push_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.push_port)
    }

    /// Address of the response channel.
    pub fn pull_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.pull_port)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::new()
    }
}

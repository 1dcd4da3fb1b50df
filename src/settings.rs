//! Process settings for the `huly-bridge` binary.
//!
//! Every flag can also be supplied through the environment variable named
//! next to it; the command line wins when both are present.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

/// Backend endpoint used when neither flag nor environment names one.
pub const DEFAULT_HULY_WS_URL: &str = "wss://api.huly.io";

#[derive(Debug, Clone, Parser)]
#[command(name = "huly-bridge", version, about = "Huly RPC bridge and plugin manifest server")]
pub struct Settings {
    /// HTTP port for the manifest server
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address the manifest server binds to
    #[arg(long, env = "HULY_BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// WebSocket endpoint of the Huly backend
    #[arg(long, env = "HULY_WS_URL", default_value = DEFAULT_HULY_WS_URL)]
    pub huly_ws_url: String,

    /// Seconds to wait for each backend response
    #[arg(long, env = "HULY_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Socket address the manifest server listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Per-request backend timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        // ---
        let settings = Settings::try_parse_from([
            "huly-bridge",
            "--port",
            "8080",
            "--bind",
            "127.0.0.1",
            "--huly-ws-url",
            "ws://localhost:9000",
            "--request-timeout-secs",
            "5",
        ])
        .unwrap();

        assert_eq!(settings.listen_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(settings.huly_ws_url, "ws://localhost:9000");
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_port() {
        // ---
        assert!(Settings::try_parse_from(["huly-bridge", "--port", "not-a-port"]).is_err());
    }

    #[test]
    fn test_command_definition_is_valid() {
        // ---
        use clap::CommandFactory;
        Settings::command().debug_assert();
    }
}

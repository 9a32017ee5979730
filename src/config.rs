//! Server configuration from command line flags and environment variables.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "database";

#[derive(Debug, Clone, Parser)]
#[command(name = "campus-hub", version, about = "Student resource sharing server")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "CAMPUS_HUB_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "CAMPUS_HUB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding the JSON documents
    #[arg(long, env = "CAMPUS_HUB_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_development() {
        let config = ServerConfig::try_parse_from(["campus-hub"]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.data_dir, PathBuf::from("database"));
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "campus-hub",
            "--host",
            "0.0.0.0",
            "-p",
            "8080",
            "--data-dir",
            "/var/lib/campus",
        ])
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/campus"));
    }
}

//! `[serve]`: where the preview server listens and whether sources are watched.

use super::defaults;
use super::error::ConfigError;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// ```toml
/// [serve]
/// interface = "0.0.0.0"
/// port = 3000
/// watch = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// IP address to listen on. Only loopback by default.
    #[serde(default = "defaults::serve::interface")]
    #[educe(Default = defaults::serve::interface())]
    pub interface: String,

    /// First port tried; the server walks upward while it is taken.
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,

    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub watch: bool,
}

impl ServeConfig {
    /// `interface` as an address. Host names are not resolved.
    pub fn listen_ip(&self) -> Result<IpAddr, ConfigError> {
        self.interface.trim().parse().map_err(|_| {
            ConfigError::Validation(format!(
                "[serve.interface] is not an IP address: `{}`",
                self.interface
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_all_fields_read() {
        let config: SiteConfig = toml::from_str(
            "[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nwatch = false\n",
        )
        .unwrap();

        assert_eq!(config.serve.listen_ip().unwrap(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.watch);
    }

    #[test]
    fn test_missing_section_uses_loopback_and_watches() {
        let config: SiteConfig = toml::from_str("[build]\nstrict = true\n").unwrap();

        assert_eq!(config.serve.listen_ip().unwrap(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.serve.port, 5000);
        assert!(config.serve.watch);
    }

    #[test]
    fn test_ipv6_interface() {
        let serve = ServeConfig {
            interface: "::1".into(),
            ..ServeConfig::default()
        };
        assert!(serve.listen_ip().unwrap().is_ipv6());
    }

    #[test]
    fn test_host_name_interface_rejected() {
        let serve = ServeConfig {
            interface: "localhost".into(),
            ..ServeConfig::default()
        };
        let err = serve.listen_ip().unwrap_err();
        assert!(err.to_string().contains("[serve.interface]"));
    }

    #[test]
    fn test_misspelled_key_rejected() {
        assert!(toml::from_str::<SiteConfig>("[serve]\nwatched = true\n").is_err());
    }
}

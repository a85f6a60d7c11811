use std::time::Duration;

use tracing::debug;

use crate::error::{ClientError, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 16000;
pub const DEFAULT_ADDRESS: &str = "localhost:16000";
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(2000);

/// Key for the server address, `[host][:port]`.
pub const ADDRESS_KEY: &str = "DL_ADDRESS";
/// Key for the network I/O timeout in milliseconds.
pub const IO_TIMEOUT_KEY: &str = "DL_IOTIMEOUT";

pub const MAX_CLIENT_ID_LEN: usize = 200;

/// Configuration for [`DataLinkClient`](crate::DataLinkClient) connections.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server address as `host:port`. Default: `localhost:16000`.
    pub address: String,
    /// Timeout for connecting and for each socket read. Default: 2 seconds.
    pub io_timeout: Duration,
    /// Identification sent with the ID command.
    pub client_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_owned(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            client_id: client_id("datalink-rs"),
        }
    }
}

impl ClientConfig {
    /// Build a config from key/value pairs, starting from the defaults.
    ///
    /// Recognizes [`ADDRESS_KEY`] and [`IO_TIMEOUT_KEY`]; other keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                ADDRESS_KEY => {
                    config.address = normalize_address(value)?;
                    debug!(address = %config.address, "address configured");
                }
                IO_TIMEOUT_KEY => {
                    config.io_timeout = parse_io_timeout(value)?;
                    debug!(timeout = ?config.io_timeout, "I/O timeout configured");
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Build a config from the `DL_ADDRESS` and `DL_IOTIMEOUT` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_pairs(std::env::vars())
    }
}

/// Normalize `[host][:port]` to `host:port`.
///
/// An omitted host becomes `localhost` and an omitted port becomes 16000.
pub fn normalize_address(value: &str) -> Result<String> {
    let value = value.trim();
    let (host, port) = match value.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port.parse().map_err(|_| {
                ClientError::InvalidArgument(format!("{ADDRESS_KEY}: invalid port in {value:?}"))
            })?;
            (host, port)
        }
        None => (value, DEFAULT_PORT),
    };
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    Ok(format!("{host}:{port}"))
}

fn parse_io_timeout(value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ClientError::InvalidArgument(format!(
            "{IO_TIMEOUT_KEY}: expected a positive number of milliseconds, got {value:?}"
        ))),
    }
}

/// Generate a client id: `program:user:os-arch:rust`.
///
/// Whitespace and non-ASCII characters become `_` so the id is always valid
/// header text; the result is capped at [`MAX_CLIENT_ID_LEN`] bytes.
pub fn client_id(program: &str) -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();

    let mut id = format!(
        "{}:{}:{}-{}:rust",
        sanitize(program),
        sanitize(&user),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    id.truncate(MAX_CLIENT_ID_LEN);
    id
}

fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(if c.is_ascii() { c } else { '_' });
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address, "localhost:16000");
        assert_eq!(config.io_timeout, Duration::from_millis(2000));
        assert!(config.client_id.starts_with("datalink-rs:"));
        assert!(config.client_id.ends_with(":rust"));
    }

    #[test]
    fn address_forms() {
        assert_eq!(normalize_address("example.org:18000").unwrap(), "example.org:18000");
        assert_eq!(normalize_address("example.org").unwrap(), "example.org:16000");
        assert_eq!(normalize_address(":18000").unwrap(), "localhost:18000");
        assert_eq!(normalize_address("").unwrap(), "localhost:16000");
    }

    #[test]
    fn address_invalid_port() {
        assert!(matches!(
            normalize_address("example.org:http").unwrap_err(),
            ClientError::InvalidArgument(_)
        ));
        assert!(normalize_address("example.org:70000").is_err());
    }

    #[test]
    fn from_pairs_overrides() {
        let config =
            ClientConfig::from_pairs([("DL_ADDRESS", "ring.example.org"), ("DL_IOTIMEOUT", "500")])
                .unwrap();
        assert_eq!(config.address, "ring.example.org:16000");
        assert_eq!(config.io_timeout, Duration::from_millis(500));
    }

    #[test]
    fn from_pairs_ignores_unknown_keys() {
        let config = ClientConfig::from_pairs([("HOME", "/root")]).unwrap();
        assert_eq!(config.address, DEFAULT_ADDRESS);
    }

    #[test]
    fn from_pairs_rejects_bad_timeout() {
        assert!(ClientConfig::from_pairs([("DL_IOTIMEOUT", "soon")]).is_err());
        assert!(ClientConfig::from_pairs([("DL_IOTIMEOUT", "0")]).is_err());
    }

    #[test]
    fn client_id_is_header_safe() {
        let id = client_id("my  data\tlogger é");
        assert!(id.starts_with("my_data_logger__:"));
        assert!(id.is_ascii());
        assert!(!id.contains(char::is_whitespace));
    }

    #[test]
    fn client_id_is_capped() {
        let id = client_id(&"p".repeat(500));
        assert_eq!(id.len(), MAX_CLIENT_ID_LEN);
    }
}

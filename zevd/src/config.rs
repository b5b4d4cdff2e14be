use anyhow::Result;
use dotenv::dotenv;
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    time::Duration,
};
use url::Url;

/// Device-list poll band. The audit runs against a polled snapshot; anything
/// faster than 5s hammers the admin API for no gain, anything slower than 30s
/// widens the race window on identifier allocation.
const MIN_POLL: Duration = Duration::from_secs(5);
const MAX_POLL: Duration = Duration::from_secs(30);
const FULL_RELOAD: Duration = Duration::from_secs(900);

#[derive(Clone, Debug, PartialEq)]
pub enum DirectoryKind {
    InMem,
}

impl FromStr for DirectoryKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inmem" => Ok(DirectoryKind::InMem),
            _ => Err(()),
        }
    }
}

impl DirectoryKind {
    fn as_str(&self) -> &'static str {
        match self {
            DirectoryKind::InMem => "inmem",
        }
    }
}

impl Display for DirectoryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub directory: DirectoryKind,
    pub device_poll: Duration,
    pub full_reload: Duration,
    pub broker: BrokerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: DirectoryKind::InMem,
            device_poll: MAX_POLL,
            full_reload: FULL_RELOAD,
            broker: BrokerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let mut c = Self::default();
        if let Ok(s) = std::env::var("ZEV_DIRECTORY") {
            c.directory = DirectoryKind::from_str(&s)
                .map_err(|_| anyhow::anyhow!("unknown directory kind: {s}"))?;
        }
        if let Ok(s) = std::env::var("ZEV_DEVICE_POLL_SECS") {
            c.device_poll = Duration::from_secs(s.parse()?).clamp(MIN_POLL, MAX_POLL);
        }
        if let Ok(s) = std::env::var("ZEV_FULL_RELOAD_SECS") {
            c.full_reload = Duration::from_secs(s.parse()?);
        }
        if let Ok(conn) = std::env::var("ZEV_MQTT_URL") {
            c.broker = BrokerConfig::from_connection_string(&conn)?;
        }
        if let Ok(s) = std::env::var("ZEV_MQTT_HOST") {
            c.broker.host = s;
        }
        if let Ok(s) = std::env::var("ZEV_MQTT_PORT") {
            c.broker.port = s.parse()?;
        }
        Ok(c)
    }
}

/// Default broker coordinates pre-filled into new MQTT device payloads.
#[derive(Clone, Debug, PartialEq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 1883 }
    }
}

impl BrokerConfig {
    fn from_connection_string(conn: &str) -> Result<Self> {
        let url = Url::parse(conn)?;
        if url.scheme() != "mqtt" {
            anyhow::bail!("unsupported mqtt url scheme: {}", url.scheme());
        }

        let host =
            url.host_str().ok_or_else(|| anyhow::anyhow!("mqtt url missing host"))?.to_string();
        let port = url.port().unwrap_or(1883);
        Ok(Self { host, port })
    }
}

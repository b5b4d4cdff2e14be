use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::DeviceKind;
use crate::preset::DevicePreset;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    LoxoneApi,
    ModbusTcp,
    Udp,
    Mqtt,
    Http,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoxoneApi => "loxone_api",
            Self::ModbusTcp => "modbus_tcp",
            Self::Udp => "udp",
            Self::Mqtt => "mqtt",
            Self::Http => "http",
        }
    }
}

/// Raw device-reported values for the four symbolic charge-point states.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateMap {
    #[serde(rename = "state_cable_locked")]
    pub cable_locked: String,
    #[serde(rename = "state_waiting_auth")]
    pub waiting_auth: String,
    #[serde(rename = "state_charging")]
    pub charging: String,
    #[serde(rename = "state_idle")]
    pub idle: String,
}

/// Raw device-reported values for the two charging modes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeMap {
    #[serde(rename = "mode_normal")]
    pub normal: String,
    #[serde(rename = "mode_priority")]
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoxoneConfig {
    pub loxone_host: String,
    pub loxone_username: String,
    pub loxone_password: String,
    /// Remote point for the power signal; the only signal a meter has.
    pub loxone_power_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loxone_state_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loxone_user_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loxone_mode_uuid: Option<String>,
    #[serde(flatten)]
    pub states: StateMap,
    #[serde(flatten)]
    pub modes: ModeMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModbusTcpConfig {
    pub ip_address: String,
    pub port: u16,
    pub unit_id: u8,
    pub register_count: u16,
    pub power_register: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_register: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id_register: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_register: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UdpConfig {
    /// Shared across many devices; disambiguation happens through the keys.
    pub listen_port: u16,
    #[serde(alias = "data_key")]
    pub power_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_key: Option<String>,
    #[serde(flatten)]
    pub states: StateMap,
    #[serde(flatten)]
    pub modes: ModeMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MqttConfig {
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_password: Option<String>,
    pub mqtt_qos: u8,
    pub mqtt_topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    pub power_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_endpoint: Option<String>,
}

/// Protocol-specific configuration payload. The tag keeps the persisted JSON a
/// flat object carrying exactly the keys of its own transport, so a field from
/// one protocol cannot survive into another's payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "connection_type", rename_all = "snake_case")]
pub enum ConnectionConfig {
    LoxoneApi(LoxoneConfig),
    ModbusTcp(ModbusTcpConfig),
    Udp(UdpConfig),
    Mqtt(MqttConfig),
    Http(HttpConfig),
}

fn charger_field(kind: DeviceKind) -> Option<String> {
    match kind {
        DeviceKind::Charger => Some(String::new()),
        DeviceKind::Meter => None,
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() { Err(ConfigError::MissingField { field }) } else { Ok(()) }
}

fn require_opt(value: &Option<String>, field: &'static str) -> Result<(), ConfigError> {
    match value {
        Some(v) => require(v, field),
        None => Err(ConfigError::MissingField { field }),
    }
}

fn require_port(port: u16, field: &'static str) -> Result<(), ConfigError> {
    if port == 0 { Err(ConfigError::MissingField { field }) } else { Ok(()) }
}

impl StateMap {
    fn validate(&self) -> Result<(), ConfigError> {
        require(&self.cable_locked, "state_cable_locked")?;
        require(&self.waiting_auth, "state_waiting_auth")?;
        require(&self.charging, "state_charging")?;
        require(&self.idle, "state_idle")
    }
}

impl ModeMap {
    fn validate(&self) -> Result<(), ConfigError> {
        require(&self.normal, "mode_normal")?;
        require(&self.priority, "mode_priority")
    }
}

impl ConnectionConfig {
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            Self::LoxoneApi(_) => ConnectionType::LoxoneApi,
            Self::ModbusTcp(_) => ConnectionType::ModbusTcp,
            Self::Udp(_) => ConnectionType::Udp,
            Self::Mqtt(_) => ConnectionType::Mqtt,
            Self::Http(_) => ConnectionType::Http,
        }
    }

    /// Initial payload for a freshly created device: wiring fields empty or
    /// zeroed, state/mode mappings taken from the preset. Charger-only signal
    /// fields are present-but-empty for chargers and absent for meters.
    pub fn initial(ty: ConnectionType, kind: DeviceKind, preset: &DevicePreset) -> Self {
        match ty {
            ConnectionType::LoxoneApi => Self::LoxoneApi(LoxoneConfig {
                loxone_host: String::new(),
                loxone_username: String::new(),
                loxone_password: String::new(),
                loxone_power_uuid: String::new(),
                loxone_state_uuid: charger_field(kind),
                loxone_user_uuid: charger_field(kind),
                loxone_mode_uuid: charger_field(kind),
                states: preset.state_map(),
                modes: preset.mode_map(),
            }),
            ConnectionType::ModbusTcp => Self::ModbusTcp(ModbusTcpConfig {
                ip_address: String::new(),
                port: 0,
                unit_id: 0,
                register_count: 1,
                power_register: 0,
                state_register: charger_field(kind).map(|_| 0),
                user_id_register: charger_field(kind).map(|_| 0),
                mode_register: charger_field(kind).map(|_| 0),
            }),
            ConnectionType::Udp => Self::Udp(UdpConfig {
                listen_port: 0,
                power_key: String::new(),
                state_key: charger_field(kind),
                user_id_key: charger_field(kind),
                mode_key: charger_field(kind),
                states: preset.state_map(),
                modes: preset.mode_map(),
            }),
            ConnectionType::Mqtt => Self::Mqtt(MqttConfig {
                mqtt_broker: String::new(),
                mqtt_port: 0,
                mqtt_username: None,
                mqtt_password: None,
                mqtt_qos: 0,
                mqtt_topic: String::new(),
            }),
            ConnectionType::Http => Self::Http(HttpConfig {
                power_endpoint: String::new(),
                state_endpoint: charger_field(kind),
                user_id_endpoint: charger_field(kind),
                mode_endpoint: charger_field(kind),
            }),
        }
    }

    /// Transport change. Same type is an identity; a different type yields a
    /// fresh payload of the new variant, so nothing from the old transport can
    /// leak into the persisted object.
    pub fn switch_type(&self, ty: ConnectionType, kind: DeviceKind, preset: &DevicePreset) -> Self {
        if self.connection_type() == ty { self.clone() } else { Self::initial(ty, kind, preset) }
    }

    /// Preset change on an existing payload: only the state/mode mapping
    /// fields are overwritten. A preset swap means "this is actually a Brand X
    /// device" and must not destroy wiring the operator already entered.
    pub fn apply_preset(&mut self, preset: &DevicePreset) {
        match self {
            Self::LoxoneApi(c) => {
                c.states = preset.state_map();
                c.modes = preset.mode_map();
            }
            Self::Udp(c) => {
                c.states = preset.state_map();
                c.modes = preset.mode_map();
            }
            // The remaining transports carry no mapping fields.
            Self::ModbusTcp(_) | Self::Mqtt(_) | Self::Http(_) => {}
        }
    }

    /// Pre-submission check: every field the active transport requires must be
    /// filled in. Reports the first missing field rather than silently passing.
    pub fn validate(&self, kind: DeviceKind) -> Result<(), ConfigError> {
        let charger = kind == DeviceKind::Charger;
        match self {
            Self::LoxoneApi(c) => {
                require(&c.loxone_host, "loxone_host")?;
                require(&c.loxone_username, "loxone_username")?;
                require(&c.loxone_password, "loxone_password")?;
                require(&c.loxone_power_uuid, "loxone_power_uuid")?;
                if charger {
                    require_opt(&c.loxone_state_uuid, "loxone_state_uuid")?;
                    require_opt(&c.loxone_user_uuid, "loxone_user_uuid")?;
                    require_opt(&c.loxone_mode_uuid, "loxone_mode_uuid")?;
                    c.states.validate()?;
                    c.modes.validate()?;
                }
                Ok(())
            }
            Self::ModbusTcp(c) => {
                require(&c.ip_address, "ip_address")?;
                require_port(c.port, "port")?;
                if c.register_count == 0 {
                    return Err(ConfigError::MissingField { field: "register_count" });
                }
                if charger {
                    if c.state_register.is_none() {
                        return Err(ConfigError::MissingField { field: "state_register" });
                    }
                    if c.user_id_register.is_none() {
                        return Err(ConfigError::MissingField { field: "user_id_register" });
                    }
                    if c.mode_register.is_none() {
                        return Err(ConfigError::MissingField { field: "mode_register" });
                    }
                }
                Ok(())
            }
            Self::Udp(c) => {
                require_port(c.listen_port, "listen_port")?;
                require(&c.power_key, "power_key")?;
                if charger {
                    require_opt(&c.state_key, "state_key")?;
                    require_opt(&c.user_id_key, "user_id_key")?;
                    require_opt(&c.mode_key, "mode_key")?;
                    c.states.validate()?;
                    c.modes.validate()?;
                }
                Ok(())
            }
            Self::Mqtt(c) => {
                require(&c.mqtt_broker, "mqtt_broker")?;
                require_port(c.mqtt_port, "mqtt_port")?;
                require(&c.mqtt_topic, "mqtt_topic")?;
                if c.mqtt_qos > 2 {
                    return Err(ConfigError::MissingField { field: "mqtt_qos" });
                }
                Ok(())
            }
            Self::Http(c) => {
                require(&c.power_endpoint, "power_endpoint")?;
                if charger {
                    require_opt(&c.state_endpoint, "state_endpoint")?;
                    require_opt(&c.user_id_endpoint, "user_id_endpoint")?;
                    require_opt(&c.mode_endpoint, "mode_endpoint")?;
                }
                Ok(())
            }
        }
    }

    /// The datagram key strings this device claims on its shared UDP listen
    /// port. Empty for every other transport; a new key candidate must not
    /// equal any of these, fleet-wide.
    pub fn telemetry_keys(&self) -> Vec<&str> {
        match self {
            Self::Udp(c) => [
                Some(c.power_key.as_str()),
                c.state_key.as_deref(),
                c.user_id_key.as_deref(),
                c.mode_key.as_deref(),
            ]
            .into_iter()
            .flatten()
            .filter(|k| !k.is_empty())
            .collect(),
            _ => Vec::new(),
        }
    }

    /// The MQTT topic this device claims, if it uses that transport.
    pub fn mqtt_topic(&self) -> Option<&str> {
        match self {
            Self::Mqtt(c) if !c.mqtt_topic.is_empty() => Some(&c.mqtt_topic),
            _ => None,
        }
    }
}

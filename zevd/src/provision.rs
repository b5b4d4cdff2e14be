use zev_core::allocator;
use zev_core::connection::{ConnectionConfig, MqttConfig};
use zev_core::model::Device;

use crate::config::BrokerConfig;

/// Payload for a new MQTT device at creation time: the topic comes from the
/// allocator (checked against the current fleet snapshot), the broker
/// coordinates from the daemon defaults. Credentials stay empty for the
/// operator to fill in before submission.
pub fn mqtt_payload(
    broker: &BrokerConfig,
    devices: &[Device],
    building: Option<&str>,
    unit: Option<&str>,
    device_name: &str,
) -> ConnectionConfig {
    ConnectionConfig::Mqtt(MqttConfig {
        mqtt_broker: broker.host.clone(),
        mqtt_port: broker.port,
        mqtt_username: None,
        mqtt_password: None,
        mqtt_qos: 0,
        mqtt_topic: allocator::mqtt_topic(devices, building, unit, device_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zev_core::model::{BuildingId, DeviceId, DeviceKind};

    fn broker() -> BrokerConfig {
        BrokerConfig { host: "broker.zev.local".into(), port: 8883 }
    }

    fn existing(topic: &str) -> Device {
        Device {
            id: DeviceId::new(),
            name: "Meter".into(),
            building_id: BuildingId::new(),
            user_id: None,
            kind: DeviceKind::Meter,
            connection: mqtt_payload(&broker(), &[], None, None, topic),
        }
    }

    #[test]
    fn payload_carries_broker_defaults_and_validates() {
        let cfg = mqtt_payload(&broker(), &[], Some("Seestrasse 12"), None, "Main Meter");
        let ConnectionConfig::Mqtt(mqtt) = &cfg else { panic!("expected mqtt variant") };

        assert_eq!(mqtt.mqtt_broker, "broker.zev.local");
        assert_eq!(mqtt.mqtt_port, 8883);
        assert_eq!(mqtt.mqtt_topic, "meters/seestrasse_12/main_meter");
        assert!(mqtt.mqtt_username.is_none());
        assert_eq!(cfg.validate(DeviceKind::Meter), Ok(()));
    }

    #[test]
    fn payload_topic_dodges_the_existing_fleet() {
        let fleet = vec![existing("Main Meter")];
        let cfg = mqtt_payload(&broker(), &fleet, None, None, "Main Meter");
        let ConnectionConfig::Mqtt(mqtt) = &cfg else { panic!("expected mqtt variant") };
        assert_eq!(mqtt.mqtt_topic, "meters/main_meter_1");
    }
}

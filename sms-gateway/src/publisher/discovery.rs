//! Home Assistant discovery descriptors.

use super::topics::Topics;
use serde_json::{json, Map, Value};

/// Device identifier shared by every entity.
pub const DEVICE_ID: &str = "sms_keenetic_gateway";

/// Options that change which entities are announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Announce the total cost sensor.
    pub cost_enabled: bool,
    /// Unit for the cost sensor.
    pub currency: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            cost_enabled: false,
            currency: "USD".to_string(),
        }
    }
}

/// One retained discovery message.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// `sensor`, `button` or `text`.
    pub component: &'static str,
    /// Stable entity id.
    pub unique_id: String,
    /// Descriptor body.
    pub config: Value,
}

fn entity(
    topics: &Topics,
    component: &'static str,
    key: &str,
    name: &str,
    icon: &str,
    fields: Value,
) -> Descriptor {
    let unique_id = format!("{DEVICE_ID}_{key}");
    let mut config = Map::new();
    config.insert("name".into(), json!(name));
    config.insert("unique_id".into(), json!(unique_id));
    config.insert("icon".into(), json!(icon));
    if let Value::Object(fields) = fields {
        config.extend(fields);
    }
    config.insert(
        "device".into(),
        json!({
            "identifiers": [DEVICE_ID],
            "name": "SMS Gateway",
            "model": "Keenetic Router",
            "manufacturer": "Keenetic Gateway",
        }),
    );
    config.insert("availability_topic".into(), json!(topics.availability()));
    config.insert("payload_available".into(), json!("online"));
    config.insert("payload_not_available".into(), json!("offline"));

    Descriptor {
        component,
        unique_id,
        config: Value::Object(config),
    }
}

/// Every descriptor to publish, in a fixed order.
pub fn descriptors(topics: &Topics, options: &DiscoveryOptions) -> Vec<Descriptor> {
    let mut all = vec![
        entity(
            topics,
            "sensor",
            "signal",
            "GSM Signal Strength",
            "mdi:signal-cellular-3",
            json!({
                "state_topic": topics.signal(),
                "value_template": "{{ value_json.SignalPercent }}",
                "unit_of_measurement": "%",
            }),
        ),
        entity(
            topics,
            "sensor",
            "network",
            "GSM Network",
            "mdi:network",
            json!({
                "state_topic": topics.network(),
                "value_template": "{{ value_json.NetworkName }}",
            }),
        ),
        entity(
            topics,
            "sensor",
            "last_sms",
            "Last SMS Received",
            "mdi:message-text",
            json!({
                "state_topic": topics.last_sms(),
                "value_template": "{{ value_json.Text }}",
                "json_attributes_topic": topics.last_sms(),
            }),
        ),
        entity(
            topics,
            "sensor",
            "send_status",
            "SMS Send Status",
            "mdi:send",
            json!({
                "state_topic": topics.send_status(),
                "value_template": "{{ value_json.status }}",
                "json_attributes_topic": topics.send_status(),
            }),
        ),
        entity(
            topics,
            "sensor",
            "delete_status",
            "SMS Delete Status",
            "mdi:delete-sweep",
            json!({
                "state_topic": topics.delete_status(),
                "value_template": "{{ value_json.status }}",
                "json_attributes_topic": topics.delete_status(),
            }),
        ),
        entity(
            topics,
            "sensor",
            "modem_status",
            "Modem Status",
            "mdi:connection",
            json!({
                "state_topic": topics.device_status(),
                "value_template": "{{ value_json.status }}",
                "json_attributes_topic": topics.device_status(),
            }),
        ),
        entity(
            topics,
            "sensor",
            "sent_count",
            "SMS Sent Count",
            "mdi:counter",
            json!({
                "state_topic": topics.counters(),
                "value_template": "{{ value_json.count }}",
                "state_class": "total_increasing",
            }),
        ),
        entity(
            topics,
            "sensor",
            "modem_imei",
            "Modem IMEI",
            "mdi:identifier",
            json!({
                "state_topic": topics.modem_info(),
                "value_template": "{{ value_json.IMEI }}",
            }),
        ),
        entity(
            topics,
            "sensor",
            "modem_model",
            "Modem Model",
            "mdi:cellphone",
            json!({
                "state_topic": topics.modem_info(),
                "value_template": "{{ value_json.Manufacturer }} {{ value_json.Model }}",
            }),
        ),
        entity(
            topics,
            "sensor",
            "sim_imsi",
            "SIM IMSI",
            "mdi:sim",
            json!({
                "state_topic": topics.sim_info(),
                "value_template": "{{ value_json.IMSI }}",
            }),
        ),
        entity(
            topics,
            "sensor",
            "sms_capacity",
            "SMS Storage Used",
            "mdi:email-multiple",
            json!({
                "state_topic": topics.capacity(),
                "value_template": "{{ value_json.SIMUsed }}",
                "unit_of_measurement": "messages",
            }),
        ),
        entity(
            topics,
            "button",
            "send_button",
            "Send SMS",
            "mdi:message-plus",
            json!({
                "command_topic": topics.send_button(),
                "payload_press": "PRESS",
            }),
        ),
        entity(
            topics,
            "button",
            "reset_counter",
            "Reset SMS Counter",
            "mdi:restart",
            json!({
                "command_topic": topics.reset_counter_button(),
                "payload_press": "PRESS",
            }),
        ),
        entity(
            topics,
            "button",
            "delete_all_sms",
            "Delete All SMS",
            "mdi:delete-sweep",
            json!({
                "command_topic": topics.delete_all_button(),
                "payload_press": "PRESS",
            }),
        ),
        entity(
            topics,
            "text",
            "phone_number",
            "Phone Number",
            "mdi:phone",
            json!({
                "command_topic": topics.phone_number_set(),
                "state_topic": topics.phone_number_state(),
                "mode": "text",
                "pattern": r"^\+?[\d\s\-\(\),]*$",
            }),
        ),
        entity(
            topics,
            "text",
            "message_text",
            "Message Text",
            "mdi:message-text",
            json!({
                "command_topic": topics.message_text_set(),
                "state_topic": topics.message_text_state(),
                "mode": "text",
                "max": sms_types::MAX_TEXT_CHARS,
            }),
        ),
    ];

    if options.cost_enabled {
        all.push(entity(
            topics,
            "sensor",
            "total_cost",
            "SMS Total Cost",
            "mdi:cash",
            json!({
                "state_topic": topics.counters(),
                "value_template": "{{ value_json.cost }}",
                "unit_of_measurement": options.currency,
                "state_class": "total",
            }),
        ));
    }

    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn topics() -> Topics {
        Topics::new("homeassistant/sensor/sms_keenetic_gateway", "homeassistant")
    }

    #[test]
    fn announces_every_entity_once() {
        let all = descriptors(&topics(), &DiscoveryOptions::default());
        assert_eq!(all.len(), 16);

        let ids: HashSet<_> = all.iter().map(|d| d.unique_id.clone()).collect();
        assert_eq!(ids.len(), all.len());
        assert!(ids.contains("sms_keenetic_gateway_signal"));
        assert!(ids.contains("sms_keenetic_gateway_delete_all_sms"));
        assert!(!ids.contains("sms_keenetic_gateway_total_cost"));
    }

    #[test]
    fn cost_sensor_only_when_priced() {
        let options = DiscoveryOptions {
            cost_enabled: true,
            currency: "CZK".into(),
        };
        let all = descriptors(&topics(), &options);
        let cost = all
            .iter()
            .find(|d| d.unique_id == "sms_keenetic_gateway_total_cost")
            .unwrap();
        assert_eq!(cost.config["unit_of_measurement"], "CZK");
        assert_eq!(cost.config["state_class"], "total");
    }

    #[test]
    fn descriptors_carry_device_and_availability() {
        let topics = topics();
        for descriptor in descriptors(&topics, &DiscoveryOptions::default()) {
            assert_eq!(descriptor.config["device"]["identifiers"][0], DEVICE_ID);
            assert_eq!(
                descriptor.config["availability_topic"],
                topics.availability().as_str()
            );
            assert_eq!(descriptor.config["unique_id"], descriptor.unique_id.as_str());
        }
    }

    #[test]
    fn descriptors_are_stable() {
        let first = descriptors(&topics(), &DiscoveryOptions::default());
        let second = descriptors(&topics(), &DiscoveryOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn message_text_is_limited() {
        let all = descriptors(&topics(), &DiscoveryOptions::default());
        let text = all
            .iter()
            .find(|d| d.unique_id == "sms_keenetic_gateway_message_text")
            .unwrap();
        assert_eq!(text.component, "text");
        assert_eq!(text.config["max"], 255);
    }
}

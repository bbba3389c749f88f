//! Topic layout under the configured prefixes.

/// Every topic the gateway publishes to or listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
    discovery_prefix: String,
}

impl Topics {
    /// Topics under `prefix`, discovery under `discovery_prefix`.
    pub fn new(prefix: impl Into<String>, discovery_prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            discovery_prefix: discovery_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    fn under(&self, suffix: &str) -> String {
        format!("{}/{}", self.prefix, suffix)
    }

    /// Discovery descriptor topic for one entity.
    pub fn discovery(&self, component: &str, unique_id: &str) -> String {
        format!("{}/{}/{}/config", self.discovery_prefix, component, unique_id)
    }

    /// `online` / `offline`.
    pub fn availability(&self) -> String {
        self.under("availability")
    }

    /// Signal quality state.
    pub fn signal(&self) -> String {
        self.under("signal/state")
    }

    /// Network registration state.
    pub fn network(&self) -> String {
        self.under("network/state")
    }

    /// Last received message.
    pub fn last_sms(&self) -> String {
        self.under("sms/state")
    }

    /// Outcome of the last send.
    pub fn send_status(&self) -> String {
        self.under("send_status")
    }

    /// Outcome of the last bulk delete.
    pub fn delete_status(&self) -> String {
        self.under("delete_sms_status")
    }

    /// Router connectivity.
    pub fn device_status(&self) -> String {
        self.under("device_status/state")
    }

    /// Sent count and cost.
    pub fn counters(&self) -> String {
        self.under("sms_counter/state")
    }

    /// Modem hardware details.
    pub fn modem_info(&self) -> String {
        self.under("modem_info/state")
    }

    /// SIM details.
    pub fn sim_info(&self) -> String {
        self.under("sim_info/state")
    }

    /// SMS storage usage.
    pub fn capacity(&self) -> String {
        self.under("sms_capacity/state")
    }

    /// JSON send command.
    pub fn send(&self) -> String {
        self.under("send")
    }

    /// Send button.
    pub fn send_button(&self) -> String {
        self.under("send_button")
    }

    /// Reset counter button.
    pub fn reset_counter_button(&self) -> String {
        self.under("reset_counter_button")
    }

    /// Delete all button.
    pub fn delete_all_button(&self) -> String {
        self.under("delete_all_sms_button")
    }

    /// Phone number input, command side.
    pub fn phone_number_set(&self) -> String {
        self.under("phone_number/set")
    }

    /// Phone number input, state side.
    pub fn phone_number_state(&self) -> String {
        self.under("phone_number/state")
    }

    /// Message text input, command side.
    pub fn message_text_set(&self) -> String {
        self.under("message_text/set")
    }

    /// Message text input, state side.
    pub fn message_text_state(&self) -> String {
        self.under("message_text/state")
    }

    /// Topics subscribed after every (re)connection.
    ///
    /// The input state topics are included so retained values restore the
    /// inputs after a restart.
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            self.send(),
            self.send_button(),
            self.reset_counter_button(),
            self.delete_all_button(),
            self.phone_number_set(),
            self.message_text_set(),
            self.phone_number_state(),
            self.message_text_state(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_hang_off_prefix() {
        let topics = Topics::new("homeassistant/sensor/sms_keenetic_gateway/", "homeassistant");
        assert_eq!(
            topics.signal(),
            "homeassistant/sensor/sms_keenetic_gateway/signal/state"
        );
        assert_eq!(
            topics.delete_status(),
            "homeassistant/sensor/sms_keenetic_gateway/delete_sms_status"
        );
        assert_eq!(
            topics.discovery("button", "sms_keenetic_gateway_send_button"),
            "homeassistant/button/sms_keenetic_gateway_send_button/config"
        );
    }

    #[test]
    fn subscriptions_cover_commands_and_input_states() {
        let topics = Topics::new("gw", "ha");
        let subs = topics.subscriptions();
        assert_eq!(subs.len(), 8);
        assert!(subs.contains(&"gw/send".to_string()));
        assert!(subs.contains(&"gw/message_text/state".to_string()));
        assert!(!subs.contains(&topics.availability()));
    }
}

//! Modem, network and SIM status snapshots.

use serde::{Deserialize, Serialize};

/// Signal quality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalInfo {
    /// RSSI in dBm (0 when unknown).
    #[serde(rename = "SignalStrength")]
    pub rssi: i32,
    /// Signal strength percentage, 0–100.
    #[serde(rename = "SignalPercent")]
    pub percent: u8,
    /// Bit error rate (the RCI API does not report one).
    #[serde(rename = "BitErrorRate")]
    pub bit_error_rate: u32,
}

/// Network operator and registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Operator name.
    #[serde(rename = "NetworkName")]
    pub name: String,
    /// Registration state.
    #[serde(rename = "State")]
    pub state: String,
    /// MCC + MNC.
    #[serde(rename = "NetworkCode")]
    pub code: String,
    /// Cell ID.
    #[serde(rename = "CID")]
    pub cell_id: String,
    /// Location area code.
    #[serde(rename = "LAC")]
    pub lac: String,
}

/// Modem hardware details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModemInfo {
    /// Modem IMEI.
    #[serde(rename = "IMEI")]
    pub imei: String,
    /// Manufacturer.
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    /// Model.
    #[serde(rename = "Model")]
    pub model: String,
    /// Firmware version.
    #[serde(rename = "Firmware")]
    pub firmware: String,
}

/// SIM details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimInfo {
    /// SIM IMSI.
    #[serde(rename = "IMSI")]
    pub imsi: String,
}

/// SMS storage usage. Only the SIM count is known over RCI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsCapacity {
    /// Messages currently stored.
    #[serde(rename = "SIMUsed")]
    pub sim_used: u32,
    /// SIM capacity (unknown, 0).
    #[serde(rename = "SIMSize")]
    pub sim_size: u32,
    /// Phone memory usage (unused, 0).
    #[serde(rename = "PhoneUsed")]
    pub phone_used: u32,
    /// Phone memory size (unused, 0).
    #[serde(rename = "PhoneSize")]
    pub phone_size: u32,
    /// Templates used (unused, 0).
    #[serde(rename = "TemplatesUsed")]
    pub templates_used: u32,
}

impl SmsCapacity {
    /// Capacity with only the used count known.
    pub fn used(sim_used: u32) -> Self {
        Self {
            sim_used,
            ..Self::default()
        }
    }
}

/// Last-known-good device snapshot.
///
/// A failed refresh keeps the previous values and only lowers `online`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModemStatus {
    /// Whether the last refresh succeeded.
    pub online: bool,
    /// Signal quality.
    pub signal: SignalInfo,
    /// Network registration.
    pub network: NetworkInfo,
    /// Modem hardware.
    pub modem: ModemInfo,
    /// SIM details.
    pub sim: SimInfo,
    /// Storage usage from the last listing.
    pub capacity: SmsCapacity,
    /// Unix time of the last successful refresh.
    pub refreshed_at: Option<u64>,
}

impl ModemStatus {
    /// Replace the snapshot with freshly fetched values.
    pub fn refresh(
        &mut self,
        signal: SignalInfo,
        network: NetworkInfo,
        modem: ModemInfo,
        sim: SimInfo,
        now: u64,
    ) {
        self.online = true;
        self.signal = signal;
        self.network = network;
        self.modem = modem;
        self.sim = sim;
        self.refreshed_at = Some(now);
    }

    /// Record a failed refresh, keeping the previous values.
    pub fn mark_offline(&mut self) {
        self.online = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(percent: u8) -> SignalInfo {
        SignalInfo {
            rssi: -75,
            percent,
            bit_error_rate: 0,
        }
    }

    #[test]
    fn mark_offline_keeps_last_snapshot() {
        let mut status = ModemStatus::default();
        status.refresh(
            signal(61),
            NetworkInfo {
                name: "T-Mobile".into(),
                ..NetworkInfo::default()
            },
            ModemInfo::default(),
            SimInfo::default(),
            1_700_000_000,
        );

        status.mark_offline();

        assert!(!status.online);
        assert_eq!(status.signal.percent, 61);
        assert_eq!(status.network.name, "T-Mobile");
        assert_eq!(status.refreshed_at, Some(1_700_000_000));
    }

    #[test]
    fn zero_signal_is_still_online() {
        let mut status = ModemStatus::default();
        status.refresh(
            signal(0),
            NetworkInfo::default(),
            ModemInfo::default(),
            SimInfo::default(),
            1,
        );
        assert!(status.online);
        assert_eq!(status.signal.percent, 0);
    }

    #[test]
    fn signal_serializes_with_surface_names() {
        let json = serde_json::to_value(signal(65)).unwrap();
        assert_eq!(json["SignalPercent"], 65);
        assert_eq!(json["SignalStrength"], -75);
    }

    #[test]
    fn capacity_used_zeroes_unknowns() {
        let cap = SmsCapacity::used(5);
        assert_eq!(cap.sim_used, 5);
        assert_eq!(cap.sim_size, 0);
    }
}

//! Signal strength mapping.

/// RSSI at or above which the signal is reported as 100%.
pub const RSSI_MAX_DBM: i32 = -51;

/// RSSI at or below which the signal is reported as 0%.
pub const RSSI_MIN_DBM: i32 = -113;

/// Map an RSSI reading (dBm) linearly onto 0–100%.
///
/// A reading of 0 means the modem did not report one.
pub fn rssi_to_percent(rssi: i32) -> u8 {
    if rssi == 0 || rssi <= RSSI_MIN_DBM {
        return 0;
    }
    if rssi >= RSSI_MAX_DBM {
        return 100;
    }
    ((rssi - RSSI_MIN_DBM) * 100 / (RSSI_MAX_DBM - RSSI_MIN_DBM)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert_eq!(rssi_to_percent(-51), 100);
        assert_eq!(rssi_to_percent(-40), 100);
        assert_eq!(rssi_to_percent(-113), 0);
        assert_eq!(rssi_to_percent(-120), 0);
    }

    #[test]
    fn missing_reading_is_zero() {
        assert_eq!(rssi_to_percent(0), 0);
    }

    #[test]
    fn linear_between_bounds() {
        assert_eq!(rssi_to_percent(-75), 61);
        assert_eq!(rssi_to_percent(-82), 50);
    }
}

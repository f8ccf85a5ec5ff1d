//! Assigned numbers and value layouts for the profiles the emulator exposes.
//!
//! See <https://www.bluetooth.com/specifications/assigned-numbers/>.

use uuid::Uuid;

use crate::api::bleuuid::uuid_from_u16;

pub const HEART_RATE_SERVICE: Uuid = uuid_from_u16(0x180D);
pub const HEART_RATE_MEASUREMENT: Uuid = uuid_from_u16(0x2A37);
pub const DEVICE_INFORMATION_SERVICE: Uuid = uuid_from_u16(0x180A);
pub const MANUFACTURER_NAME_STRING: Uuid = uuid_from_u16(0x2A29);

/// Heart Rate Measurement flags: 8-bit heart rate value, no sensor contact, energy expended or
/// RR-interval fields.
const FLAGS_UINT8_FORMAT: u8 = 0x00;

/// A Heart Rate Measurement characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateMeasurement {
    pub bpm: u8,
}

impl HeartRateMeasurement {
    /// Builds a measurement from a simulated heart rate, keeping only its low 8 bits.
    pub fn from_heart_rate(heart_rate: i32) -> Self {
        HeartRateMeasurement {
            bpm: heart_rate as u8,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        vec![FLAGS_UINT8_FORMAT, self.bpm]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_flags_then_bpm() {
        assert_eq!(
            HeartRateMeasurement::from_heart_rate(85).to_bytes(),
            vec![0x00, 85]
        );
    }

    #[test]
    fn truncates_to_eight_bits() {
        assert_eq!(HeartRateMeasurement::from_heart_rate(300).bpm, 44);
    }
}

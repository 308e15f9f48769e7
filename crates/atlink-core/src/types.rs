//! Shared plain types used across the atlink drivers.

/// A downlink frame received from the network after an uplink send.
///
/// Both LoRa dialects report downlinks as a single receive-marker line
/// carrying port, signal quality, and a hex payload; drivers decode that
/// line into this record. `data` holds the decoded payload bytes, so a
/// payload of `"030405"` on the wire becomes `[0x03, 0x04, 0x05]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downlink {
    /// Application port the downlink arrived on.
    pub fport: u8,
    /// Received signal strength indication, in dBm.
    pub rssi: i32,
    /// Signal-to-noise ratio, in dB.
    pub snr: i32,
    /// Payload length in bytes, as reported by the device.
    pub data_size: usize,
    /// Decoded payload bytes.
    pub data: Vec<u8>,
}

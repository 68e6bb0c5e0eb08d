use std::net::Ipv4Addr;

use serde::{Serialize, Serializer};

/// One captured link-layer frame, as handed out by a frame source
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub ts_sec: i64,
    pub ts_usec: i64,
    pub captured_len: u32, // bytes actually stored in the capture
    pub wire_len: u32,     // length of the frame on the wire
    pub data: Vec<u8>,
}

impl RawFrame {
    pub fn new(ts_sec: i64, ts_usec: i64, wire_len: u32, data: Vec<u8>) -> Self {
        Self {
            ts_sec,
            ts_usec,
            captured_len: data.len() as u32,
            wire_len,
            data,
        }
    }

    /// Capture timestamp in seconds since the epoch
    pub fn timestamp(&self) -> f64 {
        self.ts_sec as f64 + self.ts_usec as f64 / 1_000_000.0
    }
}

/// Fields read out of a frame's IPv4 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Fields {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: u8,
    pub frame_length: u32,
}

/// One CSV row: `timestamp,src_ip,dst_ip,protocol,length`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    #[serde(serialize_with = "six_decimals")]
    pub timestamp: f64,
    #[serde(rename = "src_ip")]
    pub source: Ipv4Addr,
    #[serde(rename = "dst_ip")]
    pub destination: Ipv4Addr,
    pub protocol: &'static str,
    pub length: u32,
}

impl OutputRecord {
    pub fn new(frame: &RawFrame, fields: &Ipv4Fields, protocol: &'static str) -> Self {
        Self {
            timestamp: frame.timestamp(),
            source: fields.source,
            destination: fields.destination,
            protocol,
            length: fields.frame_length,
        }
    }
}

fn six_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{:.6}", value))
}

use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ipv4::Ipv4Packet;

use crate::error::{ExtractError, Result};
use crate::packet::{Ipv4Fields, RawFrame};

/// Ethernet II header, no VLAN tags
pub const ETHERNET_HEADER_LEN: usize = 14;
/// IPv4 header without options
pub const MIN_IPV4_HEADER_LEN: usize = 20;

/// Read the IPv4 addresses and protocol out of an Ethernet frame.
///
/// The IPv4 header is expected right after a 14-byte Ethernet header. Frames
/// too short for both headers are rejected with `MalformedFrame`, frames
/// carrying anything other than IPv4 with `NotIpv4`.
pub fn extract(frame: &RawFrame) -> Result<Ipv4Fields> {
    let needed = ETHERNET_HEADER_LEN + MIN_IPV4_HEADER_LEN;
    if frame.data.len() < needed {
        return Err(ExtractError::MalformedFrame {
            needed,
            actual: frame.data.len(),
        });
    }

    let ethernet = EthernetPacket::new(&frame.data).ok_or(ExtractError::MalformedFrame {
        needed,
        actual: frame.data.len(),
    })?;

    let ethertype = ethernet.get_ethertype();
    if ethertype != EtherTypes::Ipv4 {
        return Err(ExtractError::NotIpv4 {
            ethertype: ethertype.0,
        });
    }

    let ipv4 = Ipv4Packet::new(ethernet.payload()).ok_or(ExtractError::MalformedFrame {
        needed,
        actual: frame.data.len(),
    })?;

    if ipv4.get_version() != 4 {
        return Err(ExtractError::NotIpv4 {
            ethertype: ethertype.0,
        });
    }

    Ok(Ipv4Fields {
        source: ipv4.get_source(),
        destination: ipv4.get_destination(),
        protocol: ipv4.get_next_level_protocol().0,
        frame_length: frame.wire_len,
    })
}

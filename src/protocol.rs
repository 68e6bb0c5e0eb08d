/// Transport protocols named in the CSV output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProtocol {
    Icmp,
    Tcp,
    Udp,
    Other(u8),
}

impl From<u8> for TransportProtocol {
    fn from(number: u8) -> Self {
        match number {
            1 => TransportProtocol::Icmp,
            6 => TransportProtocol::Tcp,
            17 => TransportProtocol::Udp,
            other => TransportProtocol::Other(other),
        }
    }
}

impl TransportProtocol {
    pub fn name(self) -> &'static str {
        match self {
            TransportProtocol::Icmp => "ICMP",
            TransportProtocol::Tcp => "TCP",
            TransportProtocol::Udp => "UDP",
            TransportProtocol::Other(_) => "OUTRO",
        }
    }
}

/// Canonical short name for an IPv4 protocol number; never fails.
pub fn protocol_name(number: u8) -> &'static str {
    TransportProtocol::from(number).name()
}

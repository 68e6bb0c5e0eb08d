//! Run-wide counters shared by all workers.

use dashmap::DashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::packet::Ipv4Fields;
use crate::protocol::TransportProtocol;

pub struct RunStats {
    records: AtomicU64,
    tcp: AtomicU64,
    udp: AtomicU64,
    icmp: AtomicU64,
    other: AtomicU64,
    total_bytes: AtomicU64,
    sum_of_squares: AtomicU64,
    min_length: AtomicU64,
    max_length: AtomicU64,
    sources: DashMap<Ipv4Addr, u64>,
    destinations: DashMap<Ipv4Addr, u64>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            records: AtomicU64::new(0),
            tcp: AtomicU64::new(0),
            udp: AtomicU64::new(0),
            icmp: AtomicU64::new(0),
            other: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            sum_of_squares: AtomicU64::new(0),
            min_length: AtomicU64::new(u64::MAX),
            max_length: AtomicU64::new(0),
            sources: DashMap::new(),
            destinations: DashMap::new(),
        }
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one record written to the sink
    pub fn record(&self, fields: &Ipv4Fields) {
        self.records.fetch_add(1, Ordering::Relaxed);

        let counter = match TransportProtocol::from(fields.protocol) {
            TransportProtocol::Tcp => &self.tcp,
            TransportProtocol::Udp => &self.udp,
            TransportProtocol::Icmp => &self.icmp,
            TransportProtocol::Other(_) => &self.other,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let length = fields.frame_length as u64;
        self.total_bytes.fetch_add(length, Ordering::Relaxed);
        self.sum_of_squares.fetch_add(length * length, Ordering::Relaxed);
        self.min_length.fetch_min(length, Ordering::Relaxed);
        self.max_length.fetch_max(length, Ordering::Relaxed);

        *self.sources.entry(fields.source).or_insert(0) += 1;
        *self.destinations.entry(fields.destination).or_insert(0) += 1;
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, top_n: usize) -> StatsSnapshot {
        let records = self.records();
        let total_bytes = self.total_bytes.load(Ordering::Relaxed);

        let (min_length, max_length, mean_length) = if records > 0 {
            (
                Some(self.min_length.load(Ordering::Relaxed)),
                Some(self.max_length.load(Ordering::Relaxed)),
                Some(total_bytes as f64 / records as f64),
            )
        } else {
            (None, None, None)
        };

        // sample standard deviation, like pandas' Series.std()
        let std_dev_length = if records > 1 {
            let n = records as f64;
            let sum = total_bytes as f64;
            let sum_of_squares = self.sum_of_squares.load(Ordering::Relaxed) as f64;
            let variance = (sum_of_squares - sum * sum / n) / (n - 1.0);
            Some(variance.max(0.0).sqrt())
        } else {
            None
        };

        StatsSnapshot {
            records,
            tcp: self.tcp.load(Ordering::Relaxed),
            udp: self.udp.load(Ordering::Relaxed),
            icmp: self.icmp.load(Ordering::Relaxed),
            other: self.other.load(Ordering::Relaxed),
            total_bytes,
            min_length,
            max_length,
            mean_length,
            std_dev_length,
            top_sources: top_talkers(&self.sources, top_n),
            top_destinations: top_talkers(&self.destinations, top_n),
        }
    }
}

/// Highest counts first, ties broken by address
fn top_talkers(map: &DashMap<Ipv4Addr, u64>, n: usize) -> Vec<(Ipv4Addr, u64)> {
    let mut talkers: Vec<(Ipv4Addr, u64)> = map
        .iter()
        .map(|entry| (*entry.key(), *entry.value()))
        .collect();
    talkers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    talkers.truncate(n);
    talkers
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub records: u64,
    pub tcp: u64,
    pub udp: u64,
    pub icmp: u64,
    pub other: u64,
    pub total_bytes: u64,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub mean_length: Option<f64>,
    pub std_dev_length: Option<f64>,
    pub top_sources: Vec<(Ipv4Addr, u64)>,
    pub top_destinations: Vec<(Ipv4Addr, u64)>,
}

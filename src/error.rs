//! Error types for the extractor.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// No capture files were given on the command line
    #[error("no capture files given")]
    Usage,

    /// A capture file could not be opened
    #[error("failed to open capture {}: {source}", path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: pcap::Error,
    },

    /// A capture file failed part way through
    #[error("failed reading capture {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: pcap::Error,
    },

    /// The CSV destination could not be created
    #[error("failed to create output {}: {source}", path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Frame too short to hold an Ethernet and a minimal IPv4 header
    #[error("malformed frame: need {needed} bytes, have {actual}")]
    MalformedFrame { needed: usize, actual: usize },

    /// Frame does not carry IPv4
    #[error("not an IPv4 frame (ethertype 0x{ethertype:04x})")]
    NotIpv4 { ethertype: u16 },

    /// The sink rejected a record
    #[error("failed to write record: {0}")]
    WriteFailure(#[from] csv::Error),

    #[error("failed to start worker for {}: {source}", path.display())]
    WorkerSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker for {} panicked", path.display())]
    WorkerPanicked { path: PathBuf },
}

impl ExtractError {
    /// Frame-level errors are skipped by workers instead of ending them.
    pub fn is_frame_error(&self) -> bool {
        matches!(self, Self::MalformedFrame { .. } | Self::NotIpv4 { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

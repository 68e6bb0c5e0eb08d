use pcap::{Capture, Error as PcapError, Offline};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::packet::RawFrame;

/// Anything that hands out captured frames in capture order
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<RawFrame>>;
}

/// Offline libpcap reader over one capture file
pub struct PcapReader {
    capture: Capture<Offline>,
    sequence: u64,
    file_path: PathBuf,
}

impl PcapReader {
    pub fn open(file_path: &Path) -> Result<Self> {
        debug!("Opening PCAP file with libpcap: {}", file_path.display());

        let capture = Capture::from_file(file_path).map_err(|source| ExtractError::SourceOpen {
            path: file_path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            capture,
            sequence: 0,
            file_path: file_path.to_path_buf(),
        })
    }
}

impl FrameSource for PcapReader {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let packet = match self.capture.next_packet() {
            Ok(packet) => packet,
            Err(PcapError::NoMorePackets) => return Ok(None),
            Err(source) => {
                return Err(ExtractError::SourceRead {
                    path: self.file_path.clone(),
                    source,
                });
            }
        };

        self.sequence += 1;

        let frame = RawFrame::new(
            packet.header.ts.tv_sec as i64,
            packet.header.ts.tv_usec as i64,
            packet.header.len,
            packet.data.to_vec(),
        );

        debug!(
            "Read frame {} from {}: {} of {} bytes, timestamp={:.6}",
            self.sequence,
            self.file_path.display(),
            frame.captured_len,
            frame.wire_len,
            frame.timestamp()
        );

        Ok(Some(frame))
    }
}

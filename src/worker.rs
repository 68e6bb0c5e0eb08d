use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::extract::extract;
use crate::packet::OutputRecord;
use crate::pcap_reader::{FrameSource, PcapReader};
use crate::protocol::{TransportProtocol, protocol_name};
use crate::sink::RecordSink;
use crate::stats::RunStats;

/// What one worker did with its capture file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub path: PathBuf,
    pub frames_read: u64,
    pub records_written: u64,
    pub frames_skipped: u64,
}

/// Processes one capture file end to end
pub struct Worker<W: Write> {
    id: usize,
    path: PathBuf,
    sink: Arc<RecordSink<W>>,
    stats: Arc<RunStats>,
}

impl<W: Write> Worker<W> {
    pub fn new(
        id: usize,
        path: PathBuf,
        sink: Arc<RecordSink<W>>,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            id,
            path,
            sink,
            stats,
        }
    }

    pub fn run(self) -> Result<WorkerReport> {
        let reader = PcapReader::open(&self.path)?;
        debug!("Worker {} opened {}", self.id, self.path.display());
        self.drain(reader)
    }

    /// Pull every frame out of `source` and append the IPv4 ones to the sink.
    ///
    /// Frames that are too short or not IPv4 are skipped; source read errors
    /// and sink write errors end the worker.
    pub fn drain<S: FrameSource>(self, mut source: S) -> Result<WorkerReport> {
        let mut report = WorkerReport {
            path: self.path.clone(),
            ..Default::default()
        };

        while let Some(frame) = source.next_frame()? {
            report.frames_read += 1;

            let fields = match extract(&frame) {
                Ok(fields) => fields,
                Err(e) if e.is_frame_error() => {
                    debug!(
                        "Worker {} skipping frame {} of {}: {}",
                        self.id,
                        report.frames_read,
                        self.path.display(),
                        e
                    );
                    report.frames_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let TransportProtocol::Other(number) = TransportProtocol::from(fields.protocol) {
                debug!(
                    "Worker {} frame {}: protocol {} written as OUTRO",
                    self.id, report.frames_read, number
                );
            }

            let record = OutputRecord::new(&frame, &fields, protocol_name(fields.protocol));
            self.sink.append(&record)?;
            self.stats.record(&fields);
            report.records_written += 1;
        }

        info!(
            "Worker {} finished {}: {} frames, {} records, {} skipped",
            self.id,
            self.path.display(),
            report.frames_read,
            report.records_written,
            report.frames_skipped
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::extract::tests::build_ipv4_frame;
    use crate::packet::RawFrame;
    use crate::sink::tests::{FullDisk, HEADER_LINE};
    use std::collections::VecDeque;

    /// In-memory frames, optionally failing once they run out
    struct ScriptedSource {
        frames: VecDeque<RawFrame>,
        fail_at_end: bool,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Vec<u8>>) -> Self {
            Self {
                frames: frames
                    .into_iter()
                    .enumerate()
                    .map(|(i, data)| RawFrame::new(1_000 + i as i64, 0, data.len() as u32, data))
                    .collect(),
                fail_at_end: false,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<RawFrame>> {
            match self.frames.pop_front() {
                Some(frame) => Ok(Some(frame)),
                None if self.fail_at_end => Err(ExtractError::SourceRead {
                    path: PathBuf::from("scripted.pcap"),
                    source: pcap::Error::PcapError("truncated dump file".to_string()),
                }),
                None => Ok(None),
            }
        }
    }

    fn worker() -> (Worker<Vec<u8>>, Arc<RecordSink<Vec<u8>>>, Arc<RunStats>) {
        let sink = Arc::new(RecordSink::from_writer(Vec::new()).unwrap());
        let stats = Arc::new(RunStats::new());
        let worker = Worker::new(0, PathBuf::from("scripted.pcap"), sink.clone(), stats.clone());
        (worker, sink, stats)
    }

    fn output(sink: Arc<RecordSink<Vec<u8>>>) -> String {
        let sink = Arc::try_unwrap(sink).ok().unwrap();
        String::from_utf8(sink.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_writes_records_in_frame_order() {
        let (worker, sink, stats) = worker();
        let source = ScriptedSource::new(vec![
            build_ipv4_frame([10, 0, 0, 1], [10, 0, 0, 2], 6),
            build_ipv4_frame([10, 0, 0, 3], [10, 0, 0, 4], 17),
            build_ipv4_frame([10, 0, 0, 5], [10, 0, 0, 6], 1),
        ]);

        let report = worker.drain(source).unwrap();
        assert_eq!(report.frames_read, 3);
        assert_eq!(report.records_written, 3);
        assert_eq!(report.frames_skipped, 0);
        assert_eq!(stats.records(), 3);

        let out = output(sink);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp,src_ip,dst_ip,protocol,length",
                "1000.000000,10.0.0.1,10.0.0.2,TCP,42",
                "1001.000000,10.0.0.3,10.0.0.4,UDP,42",
                "1002.000000,10.0.0.5,10.0.0.6,ICMP,42",
            ]
        );
    }

    #[test]
    fn test_skips_short_and_non_ipv4_frames() {
        let (worker, sink, _stats) = worker();
        let mut arp = build_ipv4_frame([1, 1, 1, 1], [2, 2, 2, 2], 6);
        arp[12] = 0x08;
        arp[13] = 0x06;

        let source = ScriptedSource::new(vec![
            vec![0xff; 20],
            arp,
            build_ipv4_frame([10, 0, 0, 1], [10, 0, 0, 2], 89),
        ]);

        let report = worker.drain(source).unwrap();
        assert_eq!(report.frames_read, 3);
        assert_eq!(report.frames_skipped, 2);
        assert_eq!(report.records_written, 1);

        let out = output(sink);
        assert_eq!(out.lines().nth(1), Some("1002.000000,10.0.0.1,10.0.0.2,OUTRO,42"));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_read_error_ends_worker() {
        let (worker, sink, _stats) = worker();
        let mut source =
            ScriptedSource::new(vec![build_ipv4_frame([1, 1, 1, 1], [2, 2, 2, 2], 6)]);
        source.fail_at_end = true;

        assert!(matches!(
            worker.drain(source),
            Err(ExtractError::SourceRead { .. })
        ));
        // the frame read before the failure is kept
        assert_eq!(output(sink).lines().count(), 2);
    }

    #[test]
    fn test_write_failure_ends_worker() {
        let first_row = "1000.000000,10.0.0.1,10.0.0.2,TCP,42\n";
        let disk = FullDisk::after(HEADER_LINE.len() + first_row.len());
        let sink = Arc::new(RecordSink::from_writer(disk).unwrap());
        let stats = Arc::new(RunStats::new());
        let worker = Worker::new(3, PathBuf::from("full.pcap"), sink.clone(), stats.clone());

        let source = ScriptedSource::new(vec![
            build_ipv4_frame([10, 0, 0, 1], [10, 0, 0, 2], 6),
            build_ipv4_frame([10, 0, 0, 3], [10, 0, 0, 4], 6),
            build_ipv4_frame([10, 0, 0, 5], [10, 0, 0, 6], 6),
        ]);

        assert!(matches!(
            worker.drain(source),
            Err(ExtractError::WriteFailure(_))
        ));
        // only the row that reached the disk is counted
        assert_eq!(stats.records(), 1);

        let sink = Arc::try_unwrap(sink).ok().unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap().written).unwrap();
        assert_eq!(out, format!("{}{}", HEADER_LINE, first_row));
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let (worker, _sink, stats) = worker();
        assert!(matches!(worker.run(), Err(ExtractError::SourceOpen { .. })));
        assert_eq!(stats.records(), 0);
    }
}

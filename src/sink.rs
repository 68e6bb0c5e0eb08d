use csv::{Terminator, Writer, WriterBuilder};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::packet::OutputRecord;

pub const HEADER: [&str; 5] = ["timestamp", "src_ip", "dst_ip", "protocol", "length"];

/// The single CSV destination every worker appends to.
///
/// The mutex covers formatting and writing together, and every record is
/// flushed before the lock is released, so each one lands as a whole line
/// and a failed write is reported to the worker that made it.
pub struct RecordSink<W: Write> {
    state: Mutex<SinkState<W>>,
}

struct SinkState<W> {
    out: W,
    // set after the first failed write; the stream may end in a partial line
    broken: bool,
}

impl RecordSink<BufWriter<File>> {
    /// Create (or truncate) `path` and write the header row
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| ExtractError::SinkOpen {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Created output file {}", path.display());
        Self::from_writer(BufWriter::new(file))
    }
}

impl<W: Write> RecordSink<W> {
    pub fn from_writer(out: W) -> Result<Self> {
        let mut line = row_writer();
        line.write_record(HEADER)?;

        let sink = Self {
            state: Mutex::new(SinkState { out, broken: false }),
        };
        // Runs before any worker exists, but goes through the same path.
        sink.write_line(&finish_line(line)?)?;
        Ok(sink)
    }

    pub fn append(&self, record: &OutputRecord) -> Result<()> {
        let mut line = row_writer();
        line.serialize(record)?;
        self.write_line(&finish_line(line)?)
    }

    fn write_line(&self, line: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if state.broken {
            return Err(ExtractError::WriteFailure(csv::Error::from(io::Error::other(
                "output stream failed on an earlier write",
            ))));
        }

        let written = match state.out.write_all(line) {
            Ok(()) => state.out.flush(),
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            state.broken = true;
            return Err(ExtractError::WriteFailure(csv::Error::from(e)));
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.state.lock().out.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        let mut state = self.state.into_inner();
        state.out.flush().map_err(csv::Error::from)?;
        Ok(state.out)
    }
}

fn row_writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(64))
}

fn finish_line(writer: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|err| ExtractError::WriteFailure(csv::Error::from(err.into_error())))
}

use std::{
    fs::File,
    io::BufWriter,
    path::Path,
    sync::mpsc::Receiver,
};

use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_jsonlines::JsonLinesWriter;

use crate::{HudError, telemetry::TelemetryState};

/// One recorded telemetry snapshot, written as a single JSON line.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TelemetryFrame {
    pub timestamp_ms: u64,
    pub program_id: String,
    pub state: TelemetryState,
}

/// Drains `frames` into `file` until every sender hangs up.
pub fn write_telemetry(file: &Path, frames: Receiver<TelemetryFrame>) -> Result<(), HudError> {
    let telemetry_file = File::create(file).map_err(|e| HudError::WriterError { source: e })?;
    let mut writer = JsonLinesWriter::new(BufWriter::new(telemetry_file));
    let mut written = 0usize;
    for frame in &frames {
        // a single bad frame should not end the recording
        match writer.write(&frame) {
            Ok(()) => written += 1,
            Err(e) => error!("Error while writing telemetry frame to output file: {}", e),
        }
    }
    writer
        .flush()
        .map_err(|e| HudError::WriterError { source: e })?;
    info!("Wrote {} telemetry frames to {}", written, file.display());
    Ok(())
}

pub fn load_telemetry(file: &Path) -> Result<Vec<TelemetryFrame>, HudError> {
    serde_jsonlines::json_lines(file)
        .map_err(|e| HudError::TelemetryLoaderError { source: e })?
        .collect::<Result<Vec<TelemetryFrame>, std::io::Error>>()
        .map_err(|e| HudError::TelemetryLoaderError { source: e })
}

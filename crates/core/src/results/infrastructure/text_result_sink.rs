use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::results::domain::result_record::ResultRecord;
use crate::results::domain::result_sink::{ResultSink, SinkWriteError};
use crate::shared::constants::RESULTS_FILE_NAME;

/// Line layout of the result file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordFormat {
    /// `frame,id,x,y,w,h,-1,-1,-1,-1` with 1-based frames.
    #[default]
    Mot,
    /// KITTI tracking labels with 0-based frames and corner coordinates.
    Kitti,
}

impl FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mot" => Ok(Self::Mot),
            "kitti" => Ok(Self::Kitti),
            other => Err(format!("unknown record format '{other}' (expected mot or kitti)")),
        }
    }
}

/// Writes tracking records as a plain text file, one line per observation.
///
/// The whole file is rewritten on each call: the text goes to a sibling
/// `.tmp` file, is flushed to disk, and is then renamed over the destination.
pub struct TextResultSink {
    path: PathBuf,
    format: RecordFormat,
}

impl TextResultSink {
    pub fn new(path: PathBuf, format: RecordFormat) -> Self {
        Self { path, format }
    }

    /// Sink writing `results.txt` inside `dir`.
    pub fn in_dir(dir: &Path, format: RecordFormat) -> Self {
        Self::new(dir.join(RESULTS_FILE_NAME), format)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomically(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)
    }
}

impl ResultSink for TextResultSink {
    fn persist(&mut self, records: &[ResultRecord]) -> Result<(), SinkWriteError> {
        let text = render(records, self.format);
        self.write_atomically(&text).map_err(|source| SinkWriteError {
            path: self.path.clone(),
            source,
        })
    }
}

/// Renders records in order, observations in tracker order within each.
pub fn render(records: &[ResultRecord], format: RecordFormat) -> String {
    let mut out = String::new();
    for record in records {
        for obs in &record.observations {
            let b = obs.bbox;
            let line = match format {
                RecordFormat::Mot => format!(
                    "{},{},{},{},{},{},-1,-1,-1,-1\n",
                    record.frame_index, obs.identity, b.x, b.y, b.width, b.height
                ),
                RecordFormat::Kitti => format!(
                    "{} {} pedestrian 0 0 -10 {} {} {} {} -10 -10 -10 -1000 -1000 -1000 -10\n",
                    record.frame_index.saturating_sub(1),
                    obs.identity,
                    b.x,
                    b.y,
                    b.right(),
                    b.bottom()
                ),
            };
            out.push_str(&line);
        }
    }
    out
}

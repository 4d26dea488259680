//! Time-ordered angle series and the frame-by-frame builder that produces
//! them.
//!
//! An [`AngleSeries`] is the hand-off between tracking and analysis; on disk
//! it is a data file of `time angle` rows (see [`crate::data_file`]).

mod builder;
mod source;

use std::io::{BufRead, Write};
use std::path::Path;

pub use builder::{SeriesBuilder, SeriesConfig, SeriesError, SeriesReport};
pub use source::{FrameSource, ImageSequenceSource, MemorySource};

use crate::data_file::{read_numbered_points, DataFileError, DataPoint};

/// One angle reading.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AngleSample {
    /// Seconds.
    pub time: f64,
    /// Radians from the downward vertical.
    pub angle: f64,
}

/// Unit of the time column of a raw series file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Seconds,
    /// Frame index at a known frame rate.
    Frames,
}

/// Unit of the angle column of a raw series file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

/// Samples with non-decreasing time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AngleSeries {
    samples: Vec<AngleSample>,
}

impl AngleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from samples, rejecting the first one that goes back in time.
    pub fn from_samples(samples: Vec<AngleSample>) -> Result<Self, usize> {
        if let Some(i) = samples.windows(2).position(|w| w[1].time < w[0].time) {
            return Err(i + 1);
        }
        Ok(Self { samples })
    }

    /// Append a sample; returns `false` (and drops it) when it would break
    /// time ordering.
    pub fn push(&mut self, time: f64, angle: f64) -> bool {
        if let Some(last) = self.samples.last() {
            if time < last.time {
                return false;
            }
        }
        self.samples.push(AngleSample { time, angle });
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[AngleSample] {
        &self.samples
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn angles(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.angle).collect()
    }

    /// Shift time so the first sample is at zero.
    pub fn rebased(&self) -> Self {
        let Some(t0) = self.samples.first().map(|s| s.time) else {
            return Self::default();
        };
        Self {
            samples: self
                .samples
                .iter()
                .map(|s| AngleSample {
                    time: s.time - t0,
                    angle: s.angle,
                })
                .collect(),
        }
    }

    /// Convert to seconds and radians. `fps` is used only for frame times.
    pub fn converted(&self, time: TimeUnit, angle: AngleUnit, fps: f64) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .map(|s| AngleSample {
                    time: match time {
                        TimeUnit::Seconds => s.time,
                        TimeUnit::Frames => s.time / fps,
                    },
                    angle: match angle {
                        AngleUnit::Radians => s.angle,
                        AngleUnit::Degrees => s.angle.to_radians(),
                    },
                })
                .collect(),
        }
    }

    /// Keep only the first `n` samples.
    pub fn truncated(&self, n: usize) -> Self {
        Self {
            samples: self.samples.iter().take(n).copied().collect(),
        }
    }

    /// Parse a series from a `time angle` data stream.
    ///
    /// Extra uncertainty columns are accepted and ignored.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, DataFileError> {
        let rows = read_numbered_points(reader, None)?;
        let mut series = Self::new();
        for (line, p) in rows {
            if !series.push(p.x, p.y) {
                return Err(DataFileError::MalformedLine {
                    line,
                    reason: format!("time {} goes backwards", p.x),
                });
            }
        }
        Ok(series)
    }

    pub fn load(path: &Path) -> Result<Self, DataFileError> {
        let file = std::fs::File::open(path)?;
        Self::read_from(std::io::BufReader::new(file))
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for s in &self.samples {
            writeln!(writer, "{} {}", s.time, s.angle)?;
        }
        writer.flush()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))
    }

    /// View the series as `(time, angle)` data points.
    pub fn to_points(&self) -> Vec<DataPoint> {
        self.samples
            .iter()
            .map(|s| DataPoint::new(s.time, s.angle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn push_rejects_time_going_backwards() {
        let mut s = AngleSeries::new();
        assert!(s.push(0.1, 0.0));
        assert!(s.push(0.1, 0.2));
        assert!(!s.push(0.05, 0.3));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn from_samples_reports_offending_index() {
        let samples = vec![
            AngleSample { time: 0.0, angle: 0.0 },
            AngleSample { time: 1.0, angle: 0.0 },
            AngleSample { time: 0.5, angle: 0.0 },
        ];
        assert_eq!(AngleSeries::from_samples(samples), Err(2));
    }

    #[test]
    fn rebase_and_truncate() {
        let mut s = AngleSeries::new();
        for i in 0..5 {
            s.push(10.0 + i as f64, i as f64);
        }
        let r = s.rebased().truncated(3);
        assert_eq!(r.times(), vec![0.0, 1.0, 2.0]);
        assert_eq!(r.angles(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn frames_and_degrees_convert_to_seconds_and_radians() {
        let mut s = AngleSeries::new();
        s.push(30.0, 90.0);
        s.push(45.0, -180.0);
        let c = s.converted(TimeUnit::Frames, AngleUnit::Degrees, 30.0);
        assert_eq!(c.times(), vec![1.0, 1.5]);
        let angles = c.angles();
        assert_relative_eq!(angles[0], std::f64::consts::FRAC_PI_2, epsilon = 1e-15);
        assert_relative_eq!(angles[1], -std::f64::consts::PI, epsilon = 1e-15);
        assert_eq!(s.converted(TimeUnit::Seconds, AngleUnit::Radians, 0.0), s);
    }

    #[test]
    fn file_round_trip_with_comments() {
        let text = "# time angle\n0.1 0.25\n\n0.2 -0.5 0.01 0.02\n";
        let s = AngleSeries::read_from(text.as_bytes()).expect("parse");
        assert_eq!(s.times(), vec![0.1, 0.2]);
        let mut buf = Vec::new();
        s.write_to(&mut buf).expect("write");
        assert_eq!(String::from_utf8(buf).unwrap(), "0.1 0.25\n0.2 -0.5\n");
    }

    #[test]
    fn backwards_time_in_file_is_malformed() {
        let text = "1.0 0.0\n0.5 0.0\n";
        match AngleSeries::read_from(text.as_bytes()) {
            Err(DataFileError::MalformedLine { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

//! Aggregator event log.
//!
//! Each classified report becomes an [`EventRecord`]. Records are rendered
//! as human-readable blocks into the log file (default `base_station.log`),
//! mirrored to `tracing`, and optionally retained in memory for callers
//! that want to inspect them after the run.

use chrono::{Local, TimeZone};
use gridwatch_core::{
    Classification, Corroborators, GridPosition, GridTopology, Report, RunSummary,
    StopReason,
};
use gridwatch_env::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default log file name, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "base_station.log";

const RULE: &str = "--------------------";

/// One classified report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Aggregator round in which the report was drained
    pub aggregator_round: u32,
    
    /// Worker round the report was produced in
    pub report_round: u32,
    
    /// Wall time when the aggregator logged it (seconds since epoch)
    pub logged_wall: i64,
    
    /// Wall time carried by the report
    pub reported_wall: i64,
    
    pub classification: Classification,
    pub origin: NodeId,
    pub origin_position: GridPosition,
    pub origin_reading: i32,
    pub corroborators: Corroborators,
    
    /// Aggregator receive time minus report logical time (seconds)
    pub latency_secs: f64,
}

impl EventRecord {
    pub fn new(
        aggregator_round: u32,
        logged_wall: i64,
        received_at: f64,
        report: &Report,
        classification: Classification,
    ) -> Self {
        Self {
            aggregator_round,
            report_round: report.round,
            logged_wall,
            reported_wall: report.wall_time,
            classification,
            origin: report.origin,
            origin_position: report.position,
            origin_reading: report.reading,
            corroborators: report.corroborators,
            latency_secs: received_at - report.logical_time,
        }
    }
    
    /// Multi-line block written to the log file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.render_into(&mut out);
        out
    }
    
    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{}", RULE)?;
        writeln!(out, "Round: {}", self.report_round)?;
        writeln!(out, "Logged time: {}", format_wall(self.logged_wall))?;
        writeln!(out, "Reported time: {}", format_wall(self.reported_wall))?;
        writeln!(out, "Alert type: {}", alert_label(&self.classification))?;
        writeln!(out)?;
        
        writeln!(out, "{:<26} {:<10} {:<10}", "Reporting node", "Coords", "Reading")?;
        writeln!(
            out,
            "{:<26} {:<10} {:<10}",
            self.origin,
            self.origin_position.to_string(),
            self.origin_reading
        )?;
        writeln!(out)?;
        
        writeln!(out, "{:<26} {:<10} {:<10}", "Matching adjacent nodes", "Coords", "Reading")?;
        for corroborator in self.corroborators.iter() {
            writeln!(
                out,
                "{:<26} {:<10} {:<10}",
                corroborator.id,
                corroborator.position.to_string(),
                corroborator.reading
            )?;
        }
        writeln!(out)?;
        
        if let Some(sample) = self.classification.sample() {
            writeln!(out, "Reference reporting time: {}", format_wall(sample.wall_time))?;
            writeln!(out, "Reference reading: {}", sample.reading)?;
            writeln!(out, "Reference reading coords: {}", sample.position)?;
        }
        writeln!(out, "Communication time (seconds): {:.5}", self.latency_secs)?;
        writeln!(out, "{}", RULE)
    }
}

fn alert_label(classification: &Classification) -> &'static str {
    match classification {
        Classification::Confirmed(_) => "Confirmed",
        Classification::Unconfirmed => "Unconfirmed",
    }
}

/// Renders seconds since the Unix epoch in the local time zone.
pub fn format_wall(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(time) => time.format("%c").to_string(),
        None => secs.to_string(),
    }
}

/// Where event blocks and the summary go.
pub struct EventLog {
    file: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    retained: Option<Vec<EventRecord>>,
}

impl EventLog {
    /// Log that writes nothing and keeps nothing.
    pub fn disabled() -> Self {
        Self {
            file: None,
            path: None,
            retained: None,
        }
    }
    
    /// Creates (truncating) the log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            file: Some(BufWriter::new(file)),
            path: Some(path),
            retained: None,
        })
    }
    
    /// Also keeps every record in memory.
    pub fn retaining(mut self) -> Self {
        self.retained.get_or_insert_with(Vec::new);
        self
    }
    
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
    
    /// Start time and grid size.
    pub fn banner(&mut self, started_wall: i64, topology: &GridTopology) -> std::io::Result<()> {
        let started = format_wall(started_wall);
        info!("Start time: {}", started);
        info!("Grid size: {} rows, {} columns", topology.rows(), topology.cols());
        
        self.write_text(&format!(
            "Start time: {}\nGrid size: {} rows, {} columns\n\n",
            started,
            topology.rows(),
            topology.cols()
        ))
    }
    
    pub fn append(&mut self, record: EventRecord) -> std::io::Result<()> {
        info!(
            round = record.aggregator_round,
            origin = %record.origin,
            position = %record.origin_position,
            reading = record.origin_reading,
            matches = record.corroborators.len(),
            latency = record.latency_secs,
            "{} event",
            record.classification
        );
        
        self.write_text(&record.render())?;
        if let Some(retained) = self.retained.as_mut() {
            retained.push(record);
        }
        Ok(())
    }
    
    /// End line and summary; flushes the file.
    pub fn finish(&mut self, reason: StopReason, summary: &RunSummary) -> std::io::Result<()> {
        info!("{}, terminating", reason);
        info!(
            "Simulation time {:.5}s, confirmed {}, unconfirmed {}",
            summary.elapsed_secs, summary.confirmed, summary.unconfirmed
        );
        
        self.write_text(&format!("\n{}, terminating\n{}\n", reason, summary))?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
    
    /// Retained records (empty unless `retaining` was used).
    pub fn into_records(self) -> Vec<EventRecord> {
        self.retained.unwrap_or_default()
    }
    
    fn write_text(&mut self, text: &str) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(text.as_bytes()),
            None => Ok(()),
        }
    }
}

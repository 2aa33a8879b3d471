use std::{
    fs,
    io::{self, BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use crate::{
    cache::{Geometry, Stats},
    error::{Error, Result},
};

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub name: String,
    pub geometry: Geometry,
    #[serde(flatten)]
    pub stats: Stats,
    pub miss_rate: f64,
}

impl RunReport {
    pub fn new(name: impl Into<String>, geometry: Geometry, stats: Stats) -> Self {
        RunReport {
            name: name.into(),
            geometry,
            stats,
            miss_rate: stats.miss_rate(),
        }
    }
}

pub fn summary_line(stats: &Stats) -> String {
    format!(
        "hits:{} misses:{} evictions:{}",
        stats.hits, stats.misses, stats.evictions
    )
}

/// Path reported when writing to stdout fails, e.g. on a closed pipe.
pub const STDOUT: &str = "<stdout>";

pub fn print_summary(out: &mut impl Write, stats: &Stats) -> Result<()> {
    writeln!(out, "{}", summary_line(stats)).map_err(|e| Error::io(STDOUT, e))
}

/// The `"%d %d %d\n"` line graders read back.
pub fn results_line(stats: &Stats) -> String {
    format!("{} {} {}\n", stats.hits, stats.misses, stats.evictions)
}

pub fn write_results(path: &Path, stats: &Stats) -> Result<()> {
    fs::write(path, results_line(stats)).map_err(|e| Error::io(path, e))
}

pub fn write_json(path: &Path, reports: &[RunReport]) -> Result<()> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut out, reports)?;
        out.write_all(b"\n")?;
        out.flush()
    };
    write().map_err(|e| Error::io(path, e))
}

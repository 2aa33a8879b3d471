use std::{ffi::OsString, fs, path::PathBuf, str::FromStr};

use pico_args::Arguments;
use serde::Deserialize;

use crate::{
    cache::Geometry,
    error::{ConfigError, Error, Result},
};

pub const DEFAULT_RESULTS_PATH: &str = ".csim_results";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GeometryConfig {
    name: String,
    s: u32,
    b: u32,
    #[serde(rename = "E")]
    e: usize,
}

/// Geometry sweep, e.g.
/// `{"geometries": [{"name": "dm", "s": 4, "b": 4, "E": 1}]}`
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    geometries: Vec<GeometryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedGeometry {
    pub name: String,
    pub geometry: Geometry,
}

impl SweepConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_geometries(self) -> Result<Vec<NamedGeometry>, ConfigError> {
        if self.geometries.is_empty() {
            return Err(ConfigError::EmptySweep);
        }
        self.geometries
            .into_iter()
            .map(|gc| match Geometry::new(gc.s, gc.b, gc.e) {
                Ok(geometry) => Ok(NamedGeometry {
                    name: gc.name,
                    geometry,
                }),
                Err(err) => Err(ConfigError::InvalidGeometry {
                    name: gc.name,
                    source: Box::new(err),
                }),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Single(Geometry),
    Sweep(Vec<NamedGeometry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub verbose: bool,
    pub trace_path: PathBuf,
    pub mode: Mode,
    pub json_path: Option<PathBuf>,
    pub results_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Run(Options),
}

fn opt_positive<T>(args: &mut Arguments, flag: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq,
{
    let raw: Option<String> = args.opt_value_from_str(flag)?;
    raw.map(|raw| match raw.trim().parse::<T>() {
        Ok(v) if v != T::default() => Ok(v),
        _ => Err(ConfigError::NotPositive { flag }),
    })
    .transpose()
}

pub fn parse_args(mut args: Arguments) -> Result<Command> {
    if args.contains("-h") {
        return Ok(Command::Help);
    }
    let verbose = args.contains("-v");

    let set_bits: Option<u32> = opt_positive(&mut args, "-s")?;
    let ways: Option<usize> = opt_positive(&mut args, "-E")?;
    let block_bits: Option<u32> = opt_positive(&mut args, "-b")?;
    let trace_path: Option<PathBuf> = args.opt_value_from_str("-t").map_err(ConfigError::from)?;
    let json_path: Option<PathBuf> = args
        .opt_value_from_str("--json")
        .map_err(ConfigError::from)?;
    let results_path: PathBuf = args
        .opt_value_from_str("--results")
        .map_err(ConfigError::from)?
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_PATH));

    let inline_config: Option<String> = args
        .opt_value_from_str("--config")
        .map_err(ConfigError::from)?;
    let config_path: Option<PathBuf> = args.opt_value_from_str("-p").map_err(ConfigError::from)?;

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(ConfigError::Unexpected(join_lossy(&rest)).into());
    }

    let trace_path = trace_path.ok_or(ConfigError::MissingArgument)?;

    let sweep_json = match (inline_config, config_path) {
        (Some(json), _) => Some(json),
        (None, Some(path)) => Some(fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?),
        (None, None) => None,
    };

    let mode = match sweep_json {
        Some(json) => Mode::Sweep(SweepConfig::from_json(&json)?.to_geometries()?),
        None => match (set_bits, ways, block_bits) {
            (Some(s), Some(e), Some(b)) => Mode::Single(Geometry::new(s, b, e)?),
            _ => return Err(ConfigError::MissingArgument.into()),
        },
    };

    Ok(Command::Run(Options {
        verbose,
        trace_path,
        mode,
        json_path,
        results_path,
    }))
}

fn join_lossy(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn usage(program: &str) -> String {
    format!(
        "\
Usage: {program} [-hv] -s <num> -E <num> -b <num> -t <file>
Options:
  -h         Print this help message.
  -v         Optional verbose flag.
  -s <num>   Number of set index bits.
  -E <num>   Number of lines per set.
  -b <num>   Number of block offset bits.
  -t <file>  Trace file.
  --json <path>      Also write statistics as JSON.
  --results <path>   Results file (default {DEFAULT_RESULTS_PATH}).
  -p <path>          Sweep the geometries listed in a JSON config.
  --config <json>    Same as -p, with the config given inline.

Examples:
  linux>  {program} -s 4 -E 1 -b 4 -t traces/yi.trace
  linux>  {program} -v -s 8 -E 2 -b 4 -t traces/yi.trace
"
    )
}

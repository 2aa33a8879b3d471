use std::{
    fmt, fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    str,
};

use tracing::debug;
use xz2::read::XzDecoder;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Instruction,
    Load,
    Store,
    Modify,
}

impl AccessKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "I" => Some(AccessKind::Instruction),
            "L" => Some(AccessKind::Load),
            "S" => Some(AccessKind::Store),
            "M" => Some(AccessKind::Modify),
            _ => None,
        }
    }

    fn tag(self) -> char {
        match self {
            AccessKind::Instruction => 'I',
            AccessKind::Load => 'L',
            AccessKind::Store => 'S',
            AccessKind::Modify => 'M',
        }
    }
}

/// One decoded trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub kind: AccessKind,
    pub addr: u64,
    pub len: u32,
}

impl Access {
    /// Decodes a line of the form `" L 7ff000398,8"`. Returns `None` for
    /// anything that is not a well-formed I/L/S/M record.
    pub fn parse(line: &str) -> Option<Access> {
        let (tag, rest) = line.trim().split_once(char::is_whitespace)?;
        let kind = AccessKind::from_tag(tag)?;
        let (addr, len) = rest.trim_start().split_once(',')?;
        let addr = addr.trim();
        let addr = addr
            .strip_prefix("0x")
            .or_else(|| addr.strip_prefix("0X"))
            .unwrap_or(addr);
        let addr = u64::from_str_radix(addr, 16).ok()?;
        let len = len.trim().parse().ok()?;
        Some(Access { kind, addr, len })
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.kind.tag(), self.addr, self.len)
    }
}

/// Lazily decoded trace file. Plain text, or xz-compressed when the path
/// ends in `.xz`.
pub struct Trace {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    line_no: usize,
}

impl Trace {
    pub fn open(path: impl Into<PathBuf>) -> Result<Trace> {
        let path = path.into();
        let stream = fs::File::open(&path).map_err(|e| Error::io(&path, e))?;
        let reader: Box<dyn BufRead> = if is_xz(&path) {
            Box::new(BufReader::new(XzDecoder::new(stream)))
        } else {
            Box::new(BufReader::new(stream))
        };
        Ok(Trace::from_reader(path, reader))
    }

    pub fn from_reader(path: impl Into<PathBuf>, reader: Box<dyn BufRead>) -> Trace {
        Trace {
            path: path.into(),
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_xz(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "xz")
}

impl Iterator for Trace {
    type Item = Result<Access>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => return Some(Err(Error::io(&self.path, err))),
            }
            self.line_no += 1;

            // not UTF-8, so not a record either
            let Ok(line) = str::from_utf8(&self.buf) else {
                debug!(line = self.line_no, "skipping non-UTF-8 trace line");
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match Access::parse(line) {
                Some(access) => return Some(Ok(access)),
                None => debug!(
                    line = self.line_no,
                    text = %line.trim_end(),
                    "skipping malformed trace line"
                ),
            }
        }
    }
}

/// Reads a whole trace into memory, for running it more than once.
pub fn read_all(trace: Trace) -> Result<Vec<Access>> {
    trace.collect()
}

//! Fixture execution against the runtime.
//!
//! Each call renders the function's result as a string so fixtures can
//! compare with plain equality. Runtime-backed functions run on a fresh
//! [`Runtime`] over a [`SimHost`] and report the final `errno`.

use std::collections::HashMap;

use serde_json::Value;

use sandlibc_core::errno::EOVERFLOW;
use sandlibc_core::malloc::HeapLimits;
use sandlibc_core::stdio::{BUFSIZ, BufMode, EOF, SEEK_SET, StreamId};
use sandlibc_core::string::{self, TokenCursor};
use sandlibc_core::time::{self, Calendar};
use sandlibc_core::{Runtime, RuntimeConfig};
use sandlibc_membrane::{ConsoleTap, Host, SimHost};

use crate::error::HarnessError;

/// Functions [`execute`] understands.
pub const FUNCTIONS: &[&str] = &[
    "strftime",
    "gmtime",
    "mktime",
    "asctime",
    "strlen",
    "strcmp",
    "strstr",
    "strtok",
    "memmove",
    "malloc_sequence",
    "stdio_write",
    "fetch_read",
];

/// Outcome of one fixture call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub output: String,
    pub errno: i32,
}

impl Execution {
    fn pure(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            errno: 0,
        }
    }
}

/// Runs `function` with `inputs`.
pub fn execute(function: &str, inputs: &Value) -> Result<Execution, HarnessError> {
    let args = Args { function, inputs };
    match function {
        "strftime" => run_strftime(&args),
        "gmtime" => run_gmtime(&args),
        "mktime" => Ok(Execution::pure(
            time::from_calendar(&args.calendar()?).to_string(),
        )),
        "asctime" => Ok(Execution::pure(time::asctime(&args.calendar()?))),
        "strlen" => Ok(Execution::pure(string::strlen(&args.cstring("s")?).to_string())),
        "strcmp" => {
            let order = string::strcmp(&args.cstring("a")?, &args.cstring("b")?);
            Ok(Execution::pure(order.signum().to_string()))
        }
        "strstr" => {
            let found = string::strstr(&args.cstring("haystack")?, &args.cstring("needle")?);
            Ok(Execution::pure(
                found.map_or_else(|| "null".to_owned(), |i| i.to_string()),
            ))
        }
        "strtok" => run_strtok(&args),
        "memmove" => run_memmove(&args),
        "malloc_sequence" => run_malloc_sequence(&args),
        "stdio_write" => run_stdio_write(&args),
        "fetch_read" => run_fetch_read(&args),
        other => Err(HarnessError::UnknownFunction(other.to_owned())),
    }
}

// ---------------------------------------------------------------------------
// Input access
// ---------------------------------------------------------------------------

struct Args<'a> {
    function: &'a str,
    inputs: &'a Value,
}

impl Args<'_> {
    fn bad(&self, message: impl Into<String>) -> HarnessError {
        HarnessError::bad_input(self.function, message)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.inputs.get(key).filter(|v| !v.is_null())
    }

    fn int(&self, key: &str) -> Result<i64, HarnessError> {
        self.get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.bad(format!("'{key}' must be an integer")))
    }

    fn int_or(&self, key: &str, default: i64) -> Result<i64, HarnessError> {
        match self.get(key) {
            None => Ok(default),
            Some(_) => self.int(key),
        }
    }

    fn i32_or(&self, key: &str, default: i32) -> Result<i32, HarnessError> {
        let value = self.int_or(key, i64::from(default))?;
        i32::try_from(value).map_err(|_| self.bad(format!("'{key}' out of range")))
    }

    fn usize_or(&self, key: &str, default: usize) -> Result<usize, HarnessError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| self.bad(format!("'{key}' must be a non-negative integer"))),
        }
    }

    fn text(&self, key: &str) -> Result<String, HarnessError> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| self.bad(format!("'{key}' must be a string")))
    }

    fn text_or(&self, key: &str, default: &str) -> Result<String, HarnessError> {
        match self.get(key) {
            None => Ok(default.to_owned()),
            Some(_) => self.text(key),
        }
    }

    /// A string becomes its bytes; an array of numbers is taken verbatim.
    fn raw(&self, key: &str) -> Result<Vec<u8>, HarnessError> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(s.as_bytes().to_vec()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| self.bad(format!("'{key}' holds a non-byte")))
                })
                .collect(),
            _ => Err(self.bad(format!("'{key}' must be a string or byte array"))),
        }
    }

    /// Like [`Self::raw`], with a NUL appended to strings.
    fn cstring(&self, key: &str) -> Result<Vec<u8>, HarnessError> {
        let mut bytes = self.raw(key)?;
        if matches!(self.get(key), Some(Value::String(_))) {
            bytes.push(0);
        }
        Ok(bytes)
    }

    /// `year` is the full year; `mon` counts from 0 like `tm_mon`.
    fn calendar(&self) -> Result<Calendar, HarnessError> {
        let year = self.int("year")?;
        let tm_year = i32::try_from(year - 1900).map_err(|_| self.bad("'year' out of range"))?;
        Ok(Calendar {
            tm_year,
            tm_mon: self.i32_or("mon", 0)?,
            tm_mday: self.i32_or("mday", 1)?,
            tm_hour: self.i32_or("hour", 0)?,
            tm_min: self.i32_or("min", 0)?,
            tm_sec: self.i32_or("sec", 0)?,
            tm_wday: self.i32_or("wday", 0)?,
            tm_yday: self.i32_or("yday", 0)?,
            tm_isdst: self.i32_or("isdst", 0)?,
        })
    }

    fn array(&self, key: &str) -> Result<&[Value], HarnessError> {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| self.bad(format!("'{key}' must be an array")))
    }
}

fn sim_runtime(heap: HeapLimits) -> (Runtime<SimHost>, ConsoleTap) {
    let tap = ConsoleTap::new();
    let host = SimHost::builder()
        .console(tap.clone())
        .deliver_immediately(true)
        .build();
    let config = RuntimeConfig {
        heap,
        ..RuntimeConfig::default()
    };
    (Runtime::with_config(host, config), tap)
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// `YYYY-MM-DD hh:mm:ss wday=W yday=Y isdst=D`, month counted from 1.
#[must_use]
pub fn format_calendar(cal: &Calendar) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} wday={} yday={} isdst={}",
        cal.full_year(),
        cal.tm_mon + 1,
        cal.tm_mday,
        cal.tm_hour,
        cal.tm_min,
        cal.tm_sec,
        cal.tm_wday,
        cal.tm_yday,
        cal.tm_isdst
    )
}

fn overflow() -> Execution {
    Execution {
        output: "overflow".to_owned(),
        errno: EOVERFLOW,
    }
}

fn run_strftime(args: &Args<'_>) -> Result<Execution, HarnessError> {
    let epoch = args.int("epoch")?;
    let offset = args.i32_or("offset_minutes", 0)?;
    let size = args.usize_or("size", 256)?;
    let mut format = args.text("format")?.into_bytes();
    format.push(0);

    let Some(cal) = time::to_calendar(epoch, offset) else {
        return Ok(overflow());
    };
    let mut out = vec![0u8; size];
    let n = time::strftime(&mut out, &format, &cal, offset);
    Ok(Execution::pure(String::from_utf8_lossy(&out[..n])))
}

fn run_gmtime(args: &Args<'_>) -> Result<Execution, HarnessError> {
    let epoch = args.int("epoch")?;
    let offset = args.i32_or("offset_minutes", 0)?;
    Ok(time::to_calendar(epoch, offset).map_or_else(overflow, |cal| {
        Execution::pure(format_calendar(&cal))
    }))
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

fn run_strtok(args: &Args<'_>) -> Result<Execution, HarnessError> {
    let mut buf = args.cstring("s")?;
    let delims = args.cstring("delims")?;
    let mut cursor = TokenCursor::new();
    let mut tokens = Vec::new();
    while let Some(range) = string::strtok(&mut buf, &delims, &mut cursor) {
        tokens.push(String::from_utf8_lossy(&buf[range]).into_owned());
    }
    Ok(Execution::pure(tokens.join("|")))
}

/// Output is `<moved>:<buffer>`.
fn run_memmove(args: &Args<'_>) -> Result<Execution, HarnessError> {
    let mut buf = args.raw("buffer")?;
    let dest = args.usize_or("dest", 0)?;
    let src = args.usize_or("src", 0)?;
    let n = args.usize_or("n", 0)?;
    let moved = string::memmove(&mut buf, dest, src, n);
    Ok(Execution::pure(format!(
        "{moved}:{}",
        String::from_utf8_lossy(&buf)
    )))
}

// ---------------------------------------------------------------------------
// Heap
// ---------------------------------------------------------------------------

/// Runs `ops`, each `{"op": "malloc"|"calloc"|"realloc"|"free", "tag", ...}`.
///
/// Fresh grants are filled with a byte derived from their tag and checked
/// after every realloc. Output is
/// `live=<n> failed=<n> corrupt=<n> diagnostics=<n>`.
fn run_malloc_sequence(args: &Args<'_>) -> Result<Execution, HarnessError> {
    let defaults = HeapLimits::default();
    let heap = HeapLimits {
        max_pages: args.usize_or("max_pages", defaults.max_pages)?,
        ..defaults
    };
    let (mut rt, _tap) = sim_runtime(heap);
    let mut tags: HashMap<String, (usize, usize)> = HashMap::new();
    let mut failed = 0usize;
    let mut corrupt = 0usize;

    for op in args.array("ops")? {
        let step = Args {
            function: args.function,
            inputs: op,
        };
        let tag = step.text("tag")?;
        let fill = tag.bytes().next().unwrap_or(b'?');
        let op_name = step.text("op")?;
        match op_name.as_str() {
            "malloc" | "calloc" => {
                let size = step.usize_or("size", 0)?;
                let grant = if op_name == "calloc" {
                    rt.calloc(step.usize_or("count", 1)?, size)
                } else {
                    rt.malloc(size)
                };
                match grant {
                    Some(grant) => {
                        rt.bytes_mut(grant)[..size].fill(fill);
                        tags.insert(tag, (grant.addr(), size));
                    }
                    None => failed += 1,
                }
            }
            "realloc" => {
                let size = step.usize_or("size", 0)?;
                let (addr, old) = tags.get(&tag).copied().unwrap_or((0, 0));
                let moved = rt.realloc_address(addr, size);
                if moved == 0 {
                    failed += 1;
                    continue;
                }
                let kept = old.min(size);
                if rt.host().memory()[moved..moved + kept]
                    .iter()
                    .any(|&b| b != fill)
                {
                    corrupt += 1;
                }
                rt.host_mut().memory_mut()[moved + kept..moved + size].fill(fill);
                tags.insert(tag, (moved, size));
            }
            "free" => {
                let addr = tags.get(&tag).map_or(0, |&(addr, _)| addr);
                rt.free_address(addr);
            }
            other => return Err(step.bad(format!("unknown op '{other}'"))),
        }
    }

    Ok(Execution {
        output: format!(
            "live={} failed={failed} corrupt={corrupt} diagnostics={}",
            rt.heap().live_count(),
            rt.diagnostic_counts().total
        ),
        errno: rt.errno(),
    })
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

fn stream_arg(args: &Args<'_>) -> Result<StreamId, HarnessError> {
    match args.text_or("stream", "stdout")?.as_str() {
        "stdout" => Ok(StreamId::STDOUT),
        "stderr" => Ok(StreamId::STDERR),
        other => Err(args.bad(format!("unknown stream '{other}'"))),
    }
}

/// Writes `writes` to a standard stream. Output is every console chunk,
/// joined with `|`.
fn run_stdio_write(args: &Args<'_>) -> Result<Execution, HarnessError> {
    let (mut rt, tap) = sim_runtime(HeapLimits::default());
    let id = stream_arg(args)?;
    if let Some(mode) = args.get("mode").and_then(Value::as_str) {
        let mode = match mode {
            "full" => BufMode::Full,
            "line" => BufMode::Line,
            "none" => BufMode::None,
            other => return Err(args.bad(format!("unknown buffer mode '{other}'"))),
        };
        rt.setvbuf(id, mode.to_posix(), args.usize_or("size", BUFSIZ)?);
    }
    for write in args.array("writes")? {
        let text = write
            .as_str()
            .ok_or_else(|| args.bad("'writes' must hold strings"))?;
        rt.fwrite(text.as_bytes(), id);
    }
    if args.get("flush").and_then(Value::as_bool).unwrap_or(false) {
        rt.fflush(Some(id));
    }
    let chunks: Vec<String> = tap
        .chunks()
        .iter()
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();
    Ok(Execution {
        output: chunks.join("|"),
        errno: rt.errno(),
    })
}

/// Opens `name`, optionally backed by `content`, polls once, seeks to
/// `offset` and reads to the end with `fgetc`.
///
/// Output is the text read, or `open_failed` / `fetch_failed`.
fn run_fetch_read(args: &Args<'_>) -> Result<Execution, HarnessError> {
    let (mut rt, _tap) = sim_runtime(HeapLimits::default());
    let name = args.text("name")?;
    if let Some(content) = args.get("content") {
        let bytes = content
            .as_str()
            .ok_or_else(|| args.bad("'content' must be a string"))?;
        rt.host_mut().add_resource(name.as_str(), bytes.as_bytes());
    }
    let mode = args.text_or("mode", "rb")?;
    let Some(id) = rt.fopen(&name, &mode) else {
        return Ok(Execution {
            output: "open_failed".to_owned(),
            errno: rt.errno(),
        });
    };
    if !rt.poll_resources().failed.is_empty() {
        return Ok(Execution {
            output: "fetch_failed".to_owned(),
            errno: rt.errno(),
        });
    }
    if let Some(offset) = args.get("offset").and_then(Value::as_i64) {
        rt.fseek(id, offset, SEEK_SET);
    }
    let mut read = Vec::new();
    loop {
        let c = rt.fgetc(id);
        if c == EOF {
            break;
        }
        read.push(u8::try_from(c).unwrap_or(b'?'));
    }
    Ok(Execution {
        output: String::from_utf8_lossy(&read).into_owned(),
        errno: rt.errno(),
    })
}

//! Replay Demo: render an NDJSON event stream in the terminal.
//!
//! Pipe a recorded agent stream into it:
//!
//! ```text
//! claude -p "..." --output-format stream-json | cargo run --example replay -- --verbosity verbose
//! ```
//!
//! With nothing piped in, a built-in sample is streamed at roughly 100 tokens/s.
//!
//! Flags: `--verbosity <level>`, `--filter <preset>`, `--include <kinds>`,
//! `--exclude <kinds>`. Logs go to stderr, controlled by `RUST_LOG`.

use crossterm::tty::IsTty;
use ralph_stream::{
    ConfigError, DisplayConfig, FilterConfig, FilterPreset, PerformanceConfig, RenderContext,
    Session, SessionConfig, Verbosity,
};
use std::io::{self, Read};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SAMPLE_TEXT: &str = r"## Plan

I'll look at how the **buffer** coalesces deltas, then check the repaint path.

1. Read `stream.rs`
2. Trace a flush deadline
3. Confirm only the *tail* is rewritten

```rust
let k = common_prefix(&previous, &next);
```

> Unchanged lines are never retransmitted.
";

/// Command line options.
struct Options {
    verbosity: Verbosity,
    preset: Option<FilterPreset>,
    include: Option<String>,
    exclude: Option<String>,
}

fn parse_args() -> Result<Options, ConfigError> {
    let mut options = Options {
        verbosity: Verbosity::default(),
        preset: None,
        include: None,
        exclude: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let value = args.next().unwrap_or_default();
        match flag.as_str() {
            "--verbosity" | "-v" => options.verbosity = value.parse()?,
            "--filter" | "-f" => options.preset = Some(value.parse()?),
            "--include" => options.include = Some(value),
            "--exclude" => options.exclude = Some(value),
            other => eprintln!("ignoring unknown flag {other}"),
        }
    }
    Ok(options)
}

fn build_config(options: &Options) -> Result<SessionConfig, ConfigError> {
    let include = options.include.as_deref().map(FilterConfig::parse_kinds).transpose()?;
    let exclude = options.exclude.as_deref().map(FilterConfig::parse_kinds).transpose()?;
    let filter = FilterConfig::new(options.preset, include, exclude)?;

    Ok(SessionConfig {
        display: DisplayConfig {
            performance: PerformanceConfig::from_env()?,
            filter,
            context: RenderContext::for_stdout(options.verbosity),
        },
        ..SessionConfig::default()
    })
}

/// Sample events served one line per read, like a live producer.
struct Paced {
    data: Vec<u8>,
    pos: usize,
}

impl Paced {
    fn sample() -> Self {
        let mut lines = vec![
            r#"{"type":"system","subtype":"init","model":"demo-model","cwd":"/work","tools":["Read","Grep"],"mcp_servers":[]}"#.to_string(),
        ];
        for token in SAMPLE_TEXT.split_inclusive(' ') {
            let event = serde_json::json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": {"type": "text_delta", "text": token},
            });
            lines.push(event.to_string());
        }
        lines.push(r#"{"type":"tool_use","name":"Read","input":{"path":"src/buffer/stream.rs"}}"#.to_string());
        lines.push(r#"{"type":"tool_result","tool_use_id":"toolu_01demo","tool_result":"pub struct StreamBuffer { ... }","is_error":false}"#.to_string());
        lines.push(r#"{"type":"error","error":{"type":"rate_limit_error","message":"Rate limited","retry_after":30}}"#.to_string());
        lines.push(r#"{"type":"result","subtype":"success","duration_ms":4200,"num_turns":2,"total_cost_usd":0.0042,"result":"Done."}"#.to_string());

        let mut data = lines.join("\n").into_bytes();
        data.push(b'\n');
        Self { data, pos: 0 }
    }
}

impl Read for Paced {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        std::thread::sleep(Duration::from_millis(10));
        // One line per read
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').map_or(rest.len(), |i| i + 1);
        let n = end.min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = parse_args()
        .and_then(|options| build_config(&options))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut session = Session::new(io::stdout(), config);
    let stats = if io::stdin().is_tty() {
        session.run(Paced::sample())?
    } else {
        session.run(io::stdin())?
    };

    if let Some(reason) = stats.read_error {
        eprintln!("input ended early: {reason}");
    }
    Ok(())
}

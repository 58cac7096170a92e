//! Probe Layer
//!
//! Runs the external reachability probe and turns its textual report into
//! structured latency statistics.
//!
//! # Architecture
//!
//! - [`ProbeInvoker`]: Capability trait for running a probe against a [`ProbeTarget`]
//! - [`PingInvoker`]: Subprocess implementation (`ping -c <count> -W <pause> <host>`)
//! - [`parse_summary`]: Extracts `min/avg/max/mdev` from the probe's summary line
//!
//! # Example
//!
//! ```rust,no_run
//! use pingwatch::probe::{PingInvoker, ProbeInvoker, ProbeTarget, parse_summary};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let target = ProbeTarget::new("8.8.8.8").with_count(8).with_pause(1);
//! let output = PingInvoker::default().invoke(&target).await?;
//! let stats = parse_summary(&output)?;
//! println!("avg {:.3} ms", stats.avg_ms);
//! # Ok(())
//! # }
//! ```

mod invoker;
mod parser;

pub use invoker::{
    DEFAULT_COUNT, DEFAULT_PAUSE_SECS, DEFAULT_PROBE_BINARY, PingInvoker, ProbeError, ProbeInvoker,
    ProbeTarget,
};
pub use parser::{LatencyStats, ParseError, parse_summary};
pub(crate) use parser::parse_latency;

//! W3C trace context (`traceparent` / `tracestate`).

use rand::RngCore;

const VERSION: &str = "00";
const SAMPLED: &str = "01";

/// Trace position of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: String,
    span_id: String,
    flags: String,
    tracestate: Option<String>,
}

impl TraceContext {
    /// Starts a new sampled trace with random identifiers.
    pub fn new_root() -> Self {
        Self {
            trace_id: random_hex::<16>(),
            span_id: random_hex::<8>(),
            flags: SAMPLED.to_string(),
            tracestate: None,
        }
    }

    /// Parses an inbound `traceparent`, returning `None` when it is malformed.
    pub fn parse(traceparent: &str, tracestate: Option<&str>) -> Option<Self> {
        let mut parts = traceparent.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some() && version == VERSION {
            return None;
        }

        if !is_hex(version, 2) || version == "ff" {
            return None;
        }
        if !is_hex(trace_id, 32) || is_zero(trace_id) {
            return None;
        }
        if !is_hex(span_id, 16) || is_zero(span_id) {
            return None;
        }
        if !is_hex(flags, 2) {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            flags: flags.to_string(),
            tracestate: tracestate
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    /// Same trace, fresh span id. Used for each outbound hop.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: random_hex::<8>(),
            flags: self.flags.clone(),
            tracestate: self.tracestate.clone(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn traceparent(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            VERSION, self.trace_id, self.span_id, self.flags
        )
    }

    pub fn tracestate(&self) -> Option<&str> {
        self.tracestate.as_deref()
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new_root()
    }
}

fn random_hex<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    loop {
        rand::thread_rng().fill_bytes(&mut bytes);
        if bytes.iter().any(|b| *b != 0) {
            return hex::encode(bytes);
        }
    }
}

fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn is_zero(value: &str) -> bool {
    value.bytes().all(|b| b == b'0')
}

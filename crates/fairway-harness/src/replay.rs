#![forbid(unsafe_code)]

//! Headless replay of scripted sessions.
//!
//! A script is JSONL. Each line is one step:
//!
//! ```text
//! {"at_ms": 0,    "frame": {"type": "snapshot", "state": {...}}}
//! {"at_ms": 400,  "local": {"type": "draw", "source": "deck"}}
//! {"at_ms": 420,  "frame": {"type": "action-confirmed", "card": {...}}}
//! {"at_ms": 900,  "channel": "lost"}
//! {"at_ms": 1500, "channel": "restored"}
//! {"at_ms": 1600, "resize": {"width": 100, "height": 32}}
//! {"type": "snapshot", "state": {...}}
//! ```
//!
//! A bare inbound frame (last line) happens at the time of the step before
//! it. `local` takes any outbound action shape, plus
//! `{"type": "select-initial-flip", "position": n}`; a `flip-initial` there
//! selects each listed position in turn.
//!
//! [`replay`] feeds the steps through a [`Session`] at a fixed frame step
//! and writes one `{"t_ms": .., "view": {..}}` line per frame whose view
//! changed.

use std::fmt;
use std::io::{self, Write};

use fairway_core::geometry::Rect;
use fairway_core::snapshot::{HandPosition, PlayerId};
use fairway_core::wire::ActionMessage;
use fairway_layout::TableView;
use fairway_runtime::config::ChoreographyConfig;
use fairway_runtime::controller::LocalAction;
use fairway_runtime::counters::ChoreographyCounters;
use fairway_runtime::session::Session;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use web_time::Duration;

use crate::simulation::to_local;
use crate::transport::RecordingTransport;

/// A script line that could not be understood.
#[derive(Debug)]
pub struct ScriptError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// What a step does.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// An inbound text frame.
    Frame(String),
    Local(Vec<LocalAction>),
    ChannelLost,
    ChannelRestored,
    Resize { width: u16, height: u16 },
}

/// One timed script step.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub at: Duration,
    pub kind: StepKind,
}

/// Parse a JSONL script. Steps come back ordered by time; steps at the same
/// time keep their script order.
pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();
    let mut at = Duration::ZERO;
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let error = |message: String| ScriptError {
            line: index + 1,
            message,
        };
        let value: Value = serde_json::from_str(line).map_err(|e| error(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| error("step is not an object".into()))?;

        if obj.contains_key("type") {
            steps.push(ScriptStep {
                at,
                kind: StepKind::Frame(line.to_string()),
            });
            continue;
        }
        if let Some(ms) = obj.get("at_ms") {
            let ms = ms
                .as_u64()
                .ok_or_else(|| error("at_ms must be a non-negative integer".into()))?;
            at = Duration::from_millis(ms);
        }
        let kind = if let Some(frame) = obj.get("frame") {
            StepKind::Frame(frame.to_string())
        } else if let Some(local) = obj.get("local") {
            StepKind::Local(parse_local(local).map_err(error)?)
        } else if let Some(channel) = obj.get("channel") {
            match channel.as_str() {
                Some("lost") => StepKind::ChannelLost,
                Some("restored") => StepKind::ChannelRestored,
                _ => return Err(error(format!("unknown channel event {channel}"))),
            }
        } else if let Some(size) = obj.get("resize") {
            let dim = |key: &str| {
                size.get(key)
                    .and_then(Value::as_u64)
                    .and_then(|v| u16::try_from(v).ok())
                    .ok_or_else(|| error(format!("resize needs a u16 {key}")))
            };
            StepKind::Resize {
                width: dim("width")?,
                height: dim("height")?,
            }
        } else {
            return Err(error("step has no frame, local, channel, or resize".into()));
        };
        steps.push(ScriptStep { at, kind });
    }
    steps.sort_by_key(|s| s.at);
    Ok(steps)
}

fn parse_local(value: &Value) -> Result<Vec<LocalAction>, String> {
    if value.get("type").and_then(Value::as_str) == Some("select-initial-flip") {
        let position = value
            .get("position")
            .and_then(Value::as_u64)
            .and_then(|p| usize::try_from(p).ok())
            .and_then(HandPosition::new)
            .ok_or("select-initial-flip needs a position in 0..6")?;
        return Ok(vec![LocalAction::SelectInitialFlip(position)]);
    }
    let message: ActionMessage =
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    Ok(to_local(message))
}

/// How to run a replay.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub frame: Duration,
    pub local: Option<PlayerId>,
    pub viewport: Rect,
    /// Longest time to keep stepping after the last step while effects play.
    pub tail: Duration,
    /// Write every frame, not only those whose view changed.
    pub every_frame: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            frame: Duration::from_millis(16),
            local: None,
            viewport: Rect::new(0, 0, 120, 40),
            tail: Duration::from_secs(10),
            every_frame: false,
        }
    }
}

/// What a replay did.
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub frames_written: u64,
    pub steps_applied: u64,
    pub frames_rejected: u64,
    pub actions_refused: u64,
    pub actions_sent: u64,
    pub elapsed: Duration,
    pub counters: ChoreographyCounters,
}

impl ReplaySummary {
    /// Format as a JSONL line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"replay-summary-v1","frames_written":{},"steps_applied":{},"frames_rejected":{},"actions_refused":{},"actions_sent":{},"elapsed_ms":{},"counters":{}}}"#,
            self.frames_written,
            self.steps_applied,
            self.frames_rejected,
            self.actions_refused,
            self.actions_sent,
            self.elapsed.as_millis(),
            self.counters.to_jsonl(),
        )
    }
}

/// Writes views as JSONL, skipping unchanged ones unless told otherwise.
#[derive(Debug)]
pub struct ViewWriter<W: Write> {
    out: W,
    last: Option<TableView>,
    every_frame: bool,
    written: u64,
}

impl<W: Write> ViewWriter<W> {
    pub fn new(out: W, every_frame: bool) -> Self {
        Self {
            out,
            last: None,
            every_frame,
            written: 0,
        }
    }

    /// Write `view` at time `t`. Returns whether a line was written.
    pub fn write(&mut self, t: Duration, view: TableView) -> io::Result<bool> {
        if !self.every_frame && self.last.as_ref() == Some(&view) {
            return Ok(false);
        }
        let line = json!({ "t_ms": t.as_millis() as u64, "view": view });
        serde_json::to_writer(&mut self.out, &line).map_err(io::Error::other)?;
        self.out.write_all(b"\n")?;
        self.last = Some(view);
        self.written += 1;
        Ok(true)
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Run `steps` through a fresh session, writing views to `out`.
pub fn replay<W: Write>(
    steps: &[ScriptStep],
    config: ChoreographyConfig,
    options: &ReplayOptions,
    out: W,
) -> io::Result<ReplaySummary> {
    let mut session = Session::new(
        config,
        options.local.clone(),
        options.viewport,
        RecordingTransport::new(),
    );
    let mut writer = ViewWriter::new(out, options.every_frame);
    let mut summary = ReplaySummary::default();
    let frame = if options.frame.is_zero() {
        Duration::from_millis(1)
    } else {
        options.frame
    };
    let last_at = steps.last().map_or(Duration::ZERO, |s| s.at);
    let deadline = last_at + options.tail;
    let mut next = 0;
    let mut t = Duration::ZERO;

    loop {
        while let Some(step) = steps.get(next).filter(|s| s.at <= t) {
            apply_step(&mut session, step, &mut summary);
            next += 1;
        }
        session.tick(frame);
        t += frame;
        writer.write(t, session.view())?;

        let done = next == steps.len();
        let settled = session.controller().scheduler().is_idle()
            && !session.controller().transient().has_pending();
        if done && (settled || t >= deadline) {
            break;
        }
    }

    summary.frames_written = writer.written();
    summary.actions_sent = session.transport().sent().len() as u64;
    summary.elapsed = t;
    summary.counters = *session.counters();
    info!(
        target: "fairway.harness",
        frames = summary.frames_written,
        steps = summary.steps_applied,
        elapsed_ms = t.as_millis() as u64,
        "replay finished"
    );
    Ok(summary)
}

fn apply_step(
    session: &mut Session<RecordingTransport>,
    step: &ScriptStep,
    summary: &mut ReplaySummary,
) {
    summary.steps_applied += 1;
    match &step.kind {
        StepKind::Frame(text) => {
            if let Err(error) = session.handle_frame(text) {
                warn!(
                    target: "fairway.harness",
                    at_ms = step.at.as_millis() as u64,
                    %error,
                    "scripted frame rejected"
                );
                summary.frames_rejected += 1;
            }
        }
        StepKind::Local(actions) => {
            for action in actions {
                if let Err(refused) = session.perform(*action) {
                    debug!(target: "fairway.harness", action = action.name(), %refused, "scripted action refused");
                    summary.actions_refused += 1;
                }
            }
        }
        StepKind::ChannelLost => {
            session.transport_mut().close();
            session.channel_lost();
        }
        StepKind::ChannelRestored => {
            session.transport_mut().reopen();
            session.channel_restored();
        }
        StepKind::Resize { width, height } => {
            session.resize(Rect::new(0, 0, *width, *height));
        }
    }
}

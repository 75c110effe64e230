//! JSONL recording sink.
//!
//! Writes the run's event streams to a directory in the layout analysis
//! tooling expects:
//!
//! - `run.json` — run metadata (seed + config + agents)
//! - `steps.jsonl` — one line per tick
//! - `trades.jsonl` — one line per trade
//! - `agent_{id}.jsonl` — one line per agent event, per registered agent
//!
//! Writes are buffered; call [`JsonlSink::finish`] to flush. A failed write
//! marks the sink failed and is logged once rather than panicking the run.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;
use types::{AgentId, Trade};

use crate::events::{AgentRecord, EventSink, RunMeta, StepRecord};

struct JsonlState {
    steps: BufWriter<File>,
    trades: BufWriter<File>,
    agents: HashMap<AgentId, BufWriter<File>>,
    root: PathBuf,
    failed: bool,
}

/// Event sink writing JSON lines under a run directory.
pub struct JsonlSink {
    state: Mutex<JsonlState>,
}

impl JsonlSink {
    /// Create the run directory and its log files.
    ///
    /// One `agent_{id}.jsonl` file is created per entry in `agents`;
    /// events for unregistered agents are dropped with a warning.
    pub fn create(root: impl AsRef<Path>, agents: &[AgentId]) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let steps = BufWriter::new(File::create(root.join("steps.jsonl"))?);
        let trades = BufWriter::new(File::create(root.join("trades.jsonl"))?);
        let mut agent_files = HashMap::new();
        for &agent in agents {
            let path = root.join(format!("agent_{}.jsonl", agent.0));
            agent_files.insert(agent, BufWriter::new(File::create(path)?));
        }

        Ok(Self {
            state: Mutex::new(JsonlState {
                steps,
                trades,
                agents: agent_files,
                root,
                failed: false,
            }),
        })
    }

    /// Flush all buffered writers.
    pub fn finish(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.steps.flush()?;
        state.trades.flush()?;
        for writer in state.agents.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn write_record<T: Serialize>(state: &mut JsonlState, stream: Stream, value: &T) {
        if state.failed {
            return;
        }
        let line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to encode event record");
                return;
            }
        };
        let result = match stream {
            Stream::Steps => writeln!(state.steps, "{line}"),
            Stream::Trades => writeln!(state.trades, "{line}"),
            Stream::Agent(agent) => match state.agents.get_mut(&agent) {
                Some(writer) => writeln!(writer, "{line}"),
                None => {
                    warn!(agent = agent.0, "dropping event for unregistered agent");
                    Ok(())
                }
            },
        };
        if let Err(err) = result {
            warn!(error = %err, root = %state.root.display(), "event log write failed; disabling sink");
            state.failed = true;
        }
    }
}

enum Stream {
    Steps,
    Trades,
    Agent(AgentId),
}

impl EventSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn on_run_start(&self, meta: &RunMeta) {
        let state = self.state.lock();
        let path = state.root.join("run.json");
        drop(state);
        let result = File::create(&path).and_then(|file| {
            serde_json::to_writer_pretty(BufWriter::new(file), meta).map_err(io::Error::other)
        });
        if let Err(err) = result {
            warn!(error = %err, "failed to write run metadata");
            self.state.lock().failed = true;
        }
    }

    fn on_step(&self, record: &StepRecord) {
        Self::write_record(&mut self.state.lock(), Stream::Steps, record);
    }

    fn on_agent_event(&self, record: &AgentRecord) {
        Self::write_record(&mut self.state.lock(), Stream::Agent(record.agent), record);
    }

    fn on_trade(&self, trade: &Trade) {
        Self::write_record(&mut self.state.lock(), Stream::Trades, trade);
    }

    fn on_run_end(&self) {
        if let Err(err) = self.finish() {
            warn!(error = %err, "failed to flush event logs");
        }
    }
}

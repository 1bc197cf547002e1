//! InkPath gesture replay.
//!
//! Loads a document, feeds a recorded script of pointer events through the
//! editor and prints (or writes) the resulting document.
//!
//! ```text
//! inkpath-replay <document.json> <script.json> [--out <path>]
//! ```
//!
//! A script is JSON:
//! ```json
//! {
//!   "config": { "grid": { "snap_to_grid": true, "size": 10 } },
//!   "steps": [
//!     { "type": "pointer", "event": { "Down": { "position": { "x": 10, "y": 10 } } } },
//!     { "type": "pointer", "event": { "Move": { "position": { "x": 40, "y": 10 } } }, "after_ms": 16 },
//!     { "type": "pointer", "event": { "Up": { "position": { "x": 40, "y": 10 } } } },
//!     { "type": "reorder", "direction": "front" },
//!     { "type": "undo" }
//!   ]
//! }
//! ```

use inkpath_core::schedule::Instant;
use inkpath_core::zorder::ZOrder;
use inkpath_core::{Document, Editor, EditorConfig, Modifiers, PointerEvent};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Core(#[from] inkpath_core::Error),
    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),
    #[error("Usage: inkpath-replay <document.json> <script.json> [--out <path>]")]
    Usage,
}

#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    config: Option<EditorConfig>,
    steps: Vec<ReplayStep>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayStep {
    Pointer {
        event: PointerEvent,
        /// Modifier state held for this event.
        #[serde(default)]
        modifiers: Modifiers,
        /// Simulated time since the previous step.
        #[serde(default)]
        after_ms: u64,
    },
    Cancel,
    Undo,
    Redo,
    Reorder {
        direction: ZOrder,
    },
}

struct Args {
    document: PathBuf,
    script: PathBuf,
    out: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, ReplayError> {
    let mut positional = Vec::new();
    let mut out = None;
    while let Some(arg) = args.next() {
        if arg == "--out" {
            out = Some(PathBuf::from(args.next().ok_or(ReplayError::Usage)?));
        } else {
            positional.push(PathBuf::from(arg));
        }
    }
    let [document, script]: [PathBuf; 2] = positional.try_into().map_err(|_| ReplayError::Usage)?;
    Ok(Args {
        document,
        script,
        out,
    })
}

/// Run every step of `script` against `document` and return the result.
fn replay(document: Document, script: ReplayScript) -> Result<Document, ReplayError> {
    let config = script.config.unwrap_or_default();
    let mut editor = Editor::new(document, config)?;
    let start = Instant::now();
    let mut elapsed = Duration::ZERO;

    for (index, step) in script.steps.into_iter().enumerate() {
        let consumed = match step {
            ReplayStep::Pointer {
                event,
                modifiers,
                after_ms,
            } => {
                elapsed += Duration::from_millis(after_ms);
                log::trace!("Step {index}: pointer at {:?}", event.position());
                editor.set_modifiers(modifiers);
                editor.handle_pointer_event(event, start + elapsed)
            }
            ReplayStep::Cancel => editor.cancel_gesture(),
            ReplayStep::Undo => editor.undo(),
            ReplayStep::Redo => editor.redo(),
            ReplayStep::Reorder { direction } => editor.reorder(direction),
        };
        log::debug!("Step {index}: consumed = {consumed}");
    }

    if editor.is_busy() {
        log::warn!("Script ended mid-gesture; cancelling");
        editor.cancel_gesture();
    }
    Ok(editor.document)
}

fn run() -> Result<(), ReplayError> {
    let args = parse_args(std::env::args().skip(1))?;
    let document = Document::from_json(&std::fs::read_to_string(&args.document)?)?;
    let script: ReplayScript = serde_json::from_str(&std::fs::read_to_string(&args.script)?)?;
    log::info!(
        "Replaying {} step(s) on {}",
        script.steps.len(),
        args.document.display()
    );

    let result = replay(document, script)?.to_json()?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, result)?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{result}"),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("Replay failed: {e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

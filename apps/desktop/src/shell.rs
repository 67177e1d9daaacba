//! Interactive line shell over the backend worker.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    thread,
};

use anyhow::{anyhow, bail, Result};
use client_core::{RequestPhase, SessionEvent};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::{ColorCorrection, ImageSlot, Mode, Strength};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::{events::UiEvent, orchestration::dispatch_backend_command},
    picker, preview,
};

pub const HELP: &str = "\
commands:
  mode extract|swap        switch the active mode
  source <path>            select the source image
  target <path>            select the target image
  pick source|target       select an image with the file dialog
  strength auto|<value>    color correction, e.g. 0.7 or 70%
  nudge <delta>            adjust color correction, e.g. +0.1 or -5%
  run                      run the active mode
  clear [extract|swap]     discard results
  export                   write the active mode's results to disk
  status                   show the session
  help                     show this text
  quit                     exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Backend(BackendCommand),
    Pick(ImageSlot),
    Help,
    Quit,
}

/// Parses one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "mode" => ShellCommand::Backend(BackendCommand::SetMode(parse_mode(rest)?)),
        "source" | "target" => {
            let slot = parse_slot(word)?;
            if rest.is_empty() {
                bail!("usage: {slot} <path>");
            }
            ShellCommand::Backend(BackendCommand::SelectImage {
                slot,
                path: Some(PathBuf::from(unquote(rest))),
            })
        }
        "pick" => ShellCommand::Pick(parse_slot(rest)?),
        "strength" => {
            let color_correction = if rest.eq_ignore_ascii_case("auto") {
                ColorCorrection::Auto
            } else {
                ColorCorrection::Manual(Strength::new(parse_fraction(rest)?)?)
            };
            ShellCommand::Backend(BackendCommand::SetColorCorrection(color_correction))
        }
        "nudge" => ShellCommand::Backend(BackendCommand::NudgeColorCorrection {
            delta: parse_fraction(rest)?,
        }),
        "run" => ShellCommand::Backend(BackendCommand::Submit),
        "clear" => {
            let mode = if rest.is_empty() {
                None
            } else {
                Some(parse_mode(rest)?)
            };
            ShellCommand::Backend(BackendCommand::ClearResults(mode))
        }
        "export" => ShellCommand::Backend(BackendCommand::Export),
        "status" => ShellCommand::Backend(BackendCommand::Status),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => bail!("unknown command '{other}'; type 'help'"),
    };
    Ok(Some(command))
}

fn parse_mode(text: &str) -> Result<Mode> {
    match text.to_ascii_lowercase().as_str() {
        "extract" => Ok(Mode::Extract),
        "swap" => Ok(Mode::Swap),
        other => Err(anyhow!("invalid mode '{other}'; expected extract or swap")),
    }
}

fn parse_slot(text: &str) -> Result<ImageSlot> {
    match text.to_ascii_lowercase().as_str() {
        "source" => Ok(ImageSlot::Source),
        "target" => Ok(ImageSlot::Target),
        other => Err(anyhow!("invalid slot '{other}'; expected source or target")),
    }
}

/// Accepts `0.7`, `+0.1`, or percentages such as `70%` and `-5%`.
fn parse_fraction(text: &str) -> Result<f64> {
    let (number, scale) = match text.strip_suffix('%') {
        Some(number) => (number, 100.0),
        None => (text, 1.0),
    };
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid number '{text}'"))?;
    if !value.is_finite() {
        bail!("invalid number '{text}'");
    }
    Ok(value / scale)
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

/// Text for one backend event, or `None` when the event needs no output.
pub fn render_event(event: UiEvent) -> Option<String> {
    let text = match event {
        UiEvent::Info(message) => message,
        UiEvent::Error(err) => err.display_line(),
        UiEvent::Session(event) => return render_session_event(event),
        UiEvent::ExtractFinished { lines } if lines.is_empty() => {
            "extract finished: no faces found".to_string()
        }
        UiEvent::ExtractFinished { lines } => {
            let mut text = format!("extract finished: {} face(s)", lines.len());
            for line in lines {
                text.push_str("\n  ");
                text.push_str(&line);
            }
            text
        }
        UiEvent::SwapFinished {
            summary,
            strength_label,
        } => format!("swap finished: {summary}, color correction {strength_label}"),
        UiEvent::Exported(paths) => {
            let mut text = format!("exported {} file(s)", paths.len());
            for path in paths {
                text.push_str(&format!("\n  {}", path.display()));
            }
            text
        }
        UiEvent::Status(lines) => lines.join("\n"),
    };
    Some(text)
}

fn render_session_event(event: SessionEvent) -> Option<String> {
    match event {
        SessionEvent::ModeChanged(mode) => Some(format!("mode: {mode}")),
        SessionEvent::ImageSelected { slot, image } => Some(format!("{slot}: {image}")),
        SessionEvent::PhaseChanged {
            mode,
            phase: RequestPhase::Pending,
        } => Some(format!("{mode}: {}", preview::phase_label(RequestPhase::Pending))),
        SessionEvent::PhaseChanged { .. } => None,
        SessionEvent::StrengthDisplayChanged(display) => {
            Some(format!("color correction: {}", display.label()))
        }
        // The request task reports the failure with its category.
        SessionEvent::RequestFailed { .. } => None,
        SessionEvent::ResultsCleared(mode) => Some(format!("{mode}: results cleared")),
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub fn run(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Result<()> {
    let printer = thread::spawn(move || {
        while let Ok(event) = ui_rx.recv() {
            if let Some(text) = render_event(event) {
                println!("{text}");
            }
        }
    });

    println!("{HELP}");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let command = match parse_line(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        let backend_command = match command {
            ShellCommand::Backend(cmd) => cmd,
            ShellCommand::Pick(slot) => BackendCommand::SelectImage {
                slot,
                path: picker::pick_image(slot),
            },
            ShellCommand::Help => {
                println!("{HELP}");
                continue;
            }
            ShellCommand::Quit => break,
        };

        let mut status = String::new();
        dispatch_backend_command(&cmd_tx, backend_command, &mut status);
        if !status.is_empty() {
            eprintln!("{status}");
        }
    }

    drop(cmd_tx);
    if printer.join().is_err() {
        tracing::warn!("shell printer thread panicked");
    }
    Ok(())
}

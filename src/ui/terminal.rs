//! Terminal front end
//!
//! Maps keys onto the controller's three actions and redraws the status
//! screen on every event and tick.

use super::terminal_guard::TerminalGuard;
use crate::recorder::{
    ControlSurface, RecordingController, RecordingEvent, SessionOutcome, SharedStatus,
};
use crossterm::{
    cursor::{Hide, MoveTo},
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::Print,
    terminal::{enable_raw_mode, Clear, ClearType, EnterAlternateScreen},
};
use futures::StreamExt;
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

/// Redraw and session polling interval
const TICK: Duration = Duration::from_millis(100);

/// Front-end actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    ToggleRecord,
    Advance,
    Exit,
}

/// Space toggles recording, Enter advances, Escape exits
pub fn action_for_key(key: &KeyEvent) -> Option<ControlAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => Some(ControlAction::ToggleRecord),
        KeyCode::Enter => Some(ControlAction::Advance),
        KeyCode::Esc => Some(ControlAction::Exit),
        _ => None,
    }
}

pub fn dispatch(surface: &mut dyn ControlSurface, action: ControlAction) {
    tracing::debug!("Action: {:?}", action);
    match action {
        ControlAction::ToggleRecord => surface.on_toggle_record(),
        ControlAction::Advance => surface.on_advance(),
        ControlAction::Exit => surface.on_exit(),
    }
}

/// One-line summary of an event for the footer
pub fn describe_event(event: &RecordingEvent) -> Option<String> {
    match event {
        RecordingEvent::Started { name } => Some(format!("Recording {}", name)),
        RecordingEvent::Stopped { name } => Some(format!("Stopping {}", name)),
        RecordingEvent::SessionEnded(report) => Some(match &report.outcome {
            SessionOutcome::Stopped => format!(
                "Saved {} ({} frames)",
                report.output_path.display(),
                report.frames_written
            ),
            SessionOutcome::DeviceEnded(reason) => format!(
                "Saved {} ({} frames, camera stopped: {})",
                report.output_path.display(),
                report.frames_written,
                reason
            ),
            SessionOutcome::WriterFailed(reason) => {
                format!("Failed {}: {}", report.output_path.display(), reason)
            }
        }),
        RecordingEvent::Error(message) => Some(message.clone()),
        RecordingEvent::Advanced(_) | RecordingEvent::Completed => None,
    }
}

/// Screen contents, top to bottom
pub fn view_lines(controller: &RecordingController, status: &str, last_event: &str) -> Vec<String> {
    let cursor = controller.cursor();
    let progress = format!(
        "Subject {}/{}",
        (cursor.active_subject_index() + 1).min(cursor.subject_count()),
        cursor.subject_count()
    );
    let record_label = if controller.is_recording() { "Stop" } else { "Record" };

    let recording_line = match (controller.active_clip(), controller.preview()) {
        (Some(name), Some((resolution, index))) => format!(
            "● REC {}  {}x{}  frame {}",
            name, resolution.width, resolution.height, index
        ),
        (Some(name), None) => format!("● REC {}  waiting for frames", name),
        (None, _) => String::new(),
    };

    vec![
        "Sign Recorder".to_string(),
        progress,
        String::new(),
        status.to_string(),
        String::new(),
        format!("[Space] {}   [Enter] Next   [Esc] Exit", record_label),
        recording_line,
        last_event.to_string(),
    ]
}

fn draw(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for (row, line) in lines.iter().enumerate() {
        queue!(
            out,
            MoveTo(0, row as u16),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
    }
    out.flush()
}

/// Run the front end until the exit action is triggered
pub async fn run(controller: &mut RecordingController, status: SharedStatus) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
    let mut guard = TerminalGuard::new();

    let mut events = EventStream::new();
    let mut recording_events = controller.subscribe();
    let mut ticker = tokio::time::interval(TICK);
    let mut last_event = String::new();

    while !controller.exit_requested() {
        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if let Some(action) = action_for_key(&key) {
                            dispatch(&mut *controller, action);
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => {
                        execute!(stdout, Clear(ClearType::All))?;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
            _ = ticker.tick() => {
                controller.poll();
            }
        }

        loop {
            match recording_events.try_recv() {
                Ok(event) => {
                    if let Some(text) = describe_event(&event) {
                        last_event = text;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Front end skipped {} recording events", skipped);
                }
                Err(_) => break,
            }
        }

        draw(&mut stdout, &view_lines(controller, &status.text(), &last_event))?;
    }

    guard.cleanup()
}

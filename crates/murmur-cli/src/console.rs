//! Line editing for the chat loop.
//!
//! rustyline blocks, so the editor lives on its own thread and hands lines to
//! the async side over a channel. Output printed while a prompt is showing goes
//! through rustyline's external printer so the prompt is redrawn below it.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::thread;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, ExternalPrinter, Helper};
use tokio::sync::{mpsc, oneshot};

pub const COMMANDS: [&str; 7] = [
    "/discuss ",
    "/model",
    "/model reset",
    "/model recommended",
    "/clear",
    "/help",
    "/quit",
];

/// Completion and hints for slash commands.
#[derive(Clone)]
struct CliHelper;

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, Vec::new()));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.trim_end().to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .map(|cmd| cmd.trim_end())
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for CliHelper {}

/// What the user did at the prompt.
#[derive(Debug)]
pub enum Input {
    Line(String),
    /// Ctrl-C
    Interrupt,
    /// Ctrl-D, `/quit` or a read error
    Quit,
}

type Printer = Box<dyn ExternalPrinter + Send>;

/// The user's side of the chat.
pub struct Console {
    inputs: mpsc::Receiver<Input>,
    printer: Option<Printer>,
}

impl Console {
    /// Starts the editor thread.
    pub async fn start() -> Result<Self> {
        let (input_tx, inputs) = mpsc::channel(16);
        let (printer_tx, printer_rx) = oneshot::channel();

        thread::Builder::new()
            .name("murmur-readline".to_string())
            .spawn(move || read_loop(input_tx, printer_tx))?;

        // No printer when stdin is not a terminal; plain println is fine then.
        let printer = printer_rx.await.ok().flatten();
        Ok(Self { inputs, printer })
    }

    pub async fn next(&mut self) -> Input {
        self.inputs.recv().await.unwrap_or(Input::Quit)
    }

    pub fn print(&mut self, line: String) {
        if let Some(printer) = self.printer.as_mut() {
            if printer.print(line.clone()).is_ok() {
                return;
            }
            self.printer = None;
        }
        println!("{line}");
    }
}

fn read_loop(inputs: mpsc::Sender<Input>, printer: oneshot::Sender<Option<Printer>>) {
    let mut editor = match Editor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}", format!("Cannot open the terminal: {e}").red());
            let _ = printer.send(None);
            let _ = inputs.blocking_send(Input::Quit);
            return;
        }
    };
    editor.set_helper(Some(CliHelper));

    let external = editor
        .create_external_printer()
        .ok()
        .map(|p| Box::new(p) as Printer);
    let _ = printer.send(external);

    loop {
        let input = match editor.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                if trimmed == "/quit" {
                    Input::Quit
                } else {
                    Input::Line(trimmed.to_string())
                }
            }
            Err(ReadlineError::Interrupted) => Input::Interrupt,
            Err(ReadlineError::Eof) => Input::Quit,
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                Input::Quit
            }
        };

        let quit = matches!(input, Input::Quit);
        if inputs.blocking_send(input).is_err() || quit {
            break;
        }
    }
}

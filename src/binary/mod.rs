//! Contains the binary logic of pipesh.
mod readln;

use pipesh::{shell::install_handler, Flow, Shell, Status};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::{io::BufRead, path::PathBuf};
use xdg::BaseDirectories;

pub const WELCOME: &str = "Welcome to pipesh! To escape type \"exit\".";
pub const PROMPT: &str = "> ";

/// What ends a session, and with which status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    Exit(Status),
}

pub struct InteractiveShell {
    shell: Shell,
}

impl InteractiveShell {
    const HISTORY_FILE_NAME: &'static str = "history";

    pub fn new(shell: Shell) -> Self { InteractiveShell { shell } }

    /// Runs one line and reports its error, if any, on the session's error stream.
    fn on_line(&mut self, line: &str) -> Outcome {
        match self.shell.execute_command(line) {
            Ok(Flow::Exit(status)) => Outcome::Exit(status),
            Ok(Flow::Proceed(_)) => Outcome::Continue,
            Err(why) => {
                self.shell.report(&why);
                Outcome::Continue
            }
        }
    }

    /// Reads and runs lines until the end of `reader` or an `exit`.
    pub fn execute_script<R: BufRead>(mut self, reader: R) -> Status {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(why) => {
                    self.shell.report(&format!("could not read line: {}", why));
                    return Status::FALSE;
                }
            };
            if let Outcome::Exit(status) = self.on_line(&line) {
                return status;
            }
        }
        self.shell.previous_status()
    }

    /// Creates an interactive session that reads from a prompt provided by rustyline.
    pub fn execute_interactive(mut self) -> Status {
        if let Err(why) = install_handler(self.shell.interrupt()) {
            self.shell.report(&format!("could not install the interrupt handler: {}", why));
        }

        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(why) => {
                self.shell.report(&format!("could not start the line editor: {}", why));
                return Status::FALSE;
            }
        };

        let history = self.history_file();
        if let Some(ref path) = history {
            // a missing file only means there is no history yet
            let _ = editor.load_history(path);
        }

        println!("{}", WELCOME);
        let status = loop {
            match self.readln(&mut editor) {
                Ok(Some(line)) => {
                    if let Outcome::Exit(status) = self.on_line(&line) {
                        break status;
                    }
                }
                Ok(None) => continue,
                Err(ReadlineError::Eof) => break self.shell.previous_status(),
                Err(why) => {
                    self.shell.report(&format!("line editor: {}", why));
                    break Status::FALSE;
                }
            }
        };

        if let Some(ref path) = history {
            if let Err(why) = editor.save_history(path) {
                self.shell.report(&format!("could not save history to file: {}", why));
            }
        }
        status
    }

    fn history_file(&mut self) -> Option<PathBuf> {
        let placed = BaseDirectories::with_prefix("pipesh")
            .map_err(|why| why.to_string())
            .and_then(|dirs| {
                dirs.place_data_file(Self::HISTORY_FILE_NAME).map_err(|why| why.to_string())
            });
        match placed {
            Ok(path) => Some(path),
            Err(why) => {
                self.shell.report(&format!("unable to get the history file: {}", why));
                None
            }
        }
    }
}

pub(crate) mod context;
mod job;
/// Running pipelines
pub mod pipe_exec;
mod signals;
/// Variables for the shell
pub mod variables;

pub use self::{
    context::Context,
    pipe_exec::{streams::Streams, PipelineError, PipelineStatus},
    signals::{install_handler, Interrupt},
    variables::Variables,
};
use crate::{
    builtins::{BuiltinMap, Status},
    expansion::expand_string,
    parser::{self, pipelines::Pipeline, Statement},
};
use std::{
    fmt,
    io::{self, Write},
};
use thiserror::Error;

/// Errors from execution
#[derive(Debug, Error)]
pub enum ShellError {
    /// Parsing failed
    #[error("{0}")]
    Parse(#[from] parser::Error),
    /// Failed to run a pipeline
    #[error("pipeline execution error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// How the stages of a pipeline are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Every stage is started before any is waited on, so stages stream into each other
    Concurrent,
    /// Each stage runs to completion before the next one starts. A stage that writes more
    /// than a pipe can buffer blocks forever.
    Sequential,
}

impl Default for ExecutionMode {
    fn default() -> Self { ExecutionMode::Concurrent }
}

/// Options for the shell
#[derive(Debug, Clone, Default, Hash)]
pub struct Options {
    /// Print commands that are to be executed.
    pub print_comms: bool,
    /// Do not execute any commands given to the shell.
    pub no_exec: bool,
    /// How the stages of a pipeline are scheduled.
    pub mode: ExecutionMode,
}

/// What the session should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading lines; carries the status of the line
    Proceed(Status),
    /// End the session with this status
    Exit(Status),
}

/// The shell structure manages the state of a session: the builtins it knows, its
/// environment, its outer streams and options. It lives as long as the session does.
#[derive(Debug)]
pub struct Shell {
    /// Contains a list of built-in commands that were created when the program
    /// started.
    builtins: BuiltinMap,
    /// The session environment, changed only by assignment stages.
    variables: Variables,
    /// Where the first stage reads, the last stage writes, and diagnostics go.
    streams: Streams,
    /// Contains all the options relative to the shell
    opts: Options,
    /// Raised to cancel the running pipeline.
    interrupt: Interrupt,
    /// When a command is executed, the final result of that command is stored
    /// here.
    previous_status: Status,
}

impl Shell {
    /// Create a new shell on duplicates of the process's standard streams, with the process
    /// environment and the default builtins
    pub fn new() -> io::Result<Self> { Streams::duplicate().map(Self::with_streams) }

    /// Create a shell on the given outer streams
    pub fn with_streams(streams: Streams) -> Self {
        Shell {
            builtins: BuiltinMap::default(),
            variables: Variables::from_env(),
            streams,
            opts: Options::default(),
            interrupt: Interrupt::new(),
            previous_status: Status::SUCCESS,
        }
    }

    /// Expands, parses and runs one line.
    ///
    /// Errors have not been reported yet; see [`Shell::report`].
    pub fn execute_command(&mut self, line: &str) -> Result<Flow, ShellError> {
        let line = expand_string(line, &self.variables);
        match parser::parse(&line, &self.builtins, &self.variables) {
            Ok(Statement::Default) => Ok(Flow::Proceed(self.previous_status)),
            Ok(Statement::Exit) => Ok(Flow::Exit(Status::SUCCESS)),
            Ok(Statement::Pipeline(pipeline)) => {
                let result = self.run_pipeline(&pipeline)?;
                Ok(match result.exit_requested() {
                    Some(code) => Flow::Exit(Status::from_exit_code(code)),
                    None => Flow::Proceed(result.status()),
                })
            }
            Err(why) => {
                self.previous_status = Status::NO_SUCH_COMMAND;
                Err(why.into())
            }
        }
    }

    /// Executes a pipeline and returns the status of each stage.
    pub fn run_pipeline(&mut self, pipeline: &Pipeline) -> Result<PipelineStatus, ShellError> {
        if self.opts.print_comms {
            let _ = writeln!(self.streams.stderr, "> {}", pipeline);
        }

        // Don't execute commands when the `-n` flag is passed.
        if self.opts.no_exec {
            return Ok(PipelineStatus::default());
        }

        match self.execute_pipeline(pipeline) {
            Ok(result) => {
                self.previous_status = result.status();
                Ok(result)
            }
            Err(why) => {
                self.previous_status = Status::FALSE;
                Err(why.into())
            }
        }
    }

    /// Writes `err` as a single diagnostic line on the session's error stream.
    pub fn report(&mut self, err: &dyn fmt::Display) {
        let _ = writeln!(self.streams.stderr, "pipesh: {}", err);
    }

    /// Get access to the builtins
    pub const fn builtins(&self) -> &BuiltinMap { &self.builtins }

    /// Get a mutable access to the builtins
    pub fn builtins_mut(&mut self) -> &mut BuiltinMap { &mut self.builtins }

    /// Access to the shell options
    pub const fn opts(&self) -> &Options { &self.opts }

    /// Mutable access to the shell options
    pub fn opts_mut(&mut self) -> &mut Options { &mut self.opts }

    /// Access to the variables
    pub const fn variables(&self) -> &Variables { &self.variables }

    /// Mutable access to the variables
    pub fn variables_mut(&mut self) -> &mut Variables { &mut self.variables }

    /// The outer streams of the session
    pub const fn streams(&self) -> &Streams { &self.streams }

    /// The token that cancels the running pipeline
    pub const fn interrupt(&self) -> &Interrupt { &self.interrupt }

    /// Get the last command's return code and/or the code for the error
    pub const fn previous_status(&self) -> Status { self.previous_status }
}

#![allow(unknown_lints)]

#[macro_use]
pub mod types;
pub mod builtins;
pub mod expansion;
pub mod parser;
pub mod shell;

pub use crate::{
    builtins::{BuiltinFunction, BuiltinMap, Status},
    shell::{
        pipe_exec::{PipelineError, PipelineStatus},
        Context, ExecutionMode, Flow, Interrupt, Options, Shell, ShellError, Streams, Variables,
    },
};

/// Version, target triple and git revision of this build.
pub fn version() -> &'static str { include!(concat!(env!("OUT_DIR"), "/version_string")) }

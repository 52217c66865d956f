/// helpers for creating help
pub mod man_pages;

mod cat;
mod echo;
mod grep;
mod helpers;
mod wc;

pub use self::{
    cat::builtin_cat, echo::builtin_echo, grep::builtin_grep, helpers::Status, wc::builtin_wc,
};

use crate as pipesh;
use crate::{shell::Context, types};
use builtins_proc::builtin;
use std::{collections::BTreeMap, fmt, io::Write};

pub(crate) use self::helpers::{for_each_line, for_each_raw_line, open_input};

/// The type for builtin functions. Builtins get the stage's arguments, without
/// the command name, and the stage's context. They never end the process:
/// `exit` only asks for it through its status.
pub type BuiltinFunction = fn(&[types::Str], &mut Context<'_>) -> Status;

/// A container for builtins and their respective help text
///
/// Note: To reduce allocations, function are provided as pointer rather than boxed closures
/// ```
/// use pipesh::builtins::BuiltinMap;
///
/// let mut builtins = BuiltinMap::new();
/// assert!(builtins.get("echo").is_none());
/// builtins.with_basic();
/// assert!(builtins.contains("echo"));
/// ```
#[derive(Clone)]
pub struct BuiltinMap {
    fcts: BTreeMap<&'static str, BuiltinFunction>,
    help: BTreeMap<&'static str, &'static str>,
}

impl fmt::Debug for BuiltinMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

impl Default for BuiltinMap {
    fn default() -> Self {
        let mut builtins = Self::new();
        builtins.with_basic();
        builtins
    }
}

impl BuiltinMap {
    /// Create a new, blank builtin map
    ///
    /// Simple function to create an empty builtin map
    pub fn new() -> Self { BuiltinMap { fcts: BTreeMap::new(), help: BTreeMap::new() } }

    /// Check if the given builtin exists
    pub fn contains(&self, func: &str) -> bool { self.fcts.contains_key(func) }

    /// Get the list of builtins included, in name order
    pub fn keys(&self) -> impl Iterator<Item = &str> { self.fcts.keys().copied() }

    /// Get the provided help for a given builtin
    pub fn get_help(&self, func: &str) -> Option<&str> { self.help.get(func).copied() }

    /// Get the function of a given builtin
    pub fn get(&self, func: &str) -> Option<BuiltinFunction> { self.fcts.get(func).copied() }

    /// Add a new builtin, replacing one registered under the same name
    pub fn add(
        &mut self,
        name: &'static str,
        func: BuiltinFunction,
        help: &'static str,
    ) -> &mut Self {
        self.fcts.insert(name, func);
        self.help.insert(name, help);
        self
    }

    /// Utilities that most users will want: text output, filters and session control
    ///
    /// Contains `cat`, `echo`, `exit`, `false`, `grep`, `pwd`, `true` and `wc`
    pub fn with_basic(&mut self) -> &mut Self {
        self.add("cat", builtin_cat, "Concatenate files and print them on the standard output")
            .add("echo", builtin_echo, "Display a line of text")
            .add("exit", builtin_exit, "Exits the current session")
            .add("false", builtin__false, "Do nothing, unsuccessfully")
            .add("grep", builtin_grep, "Print lines that match a regular expression")
            .add("pwd", builtin_pwd, "Print the working directory")
            .add("true", builtin__true, "Do nothing, successfully")
            .add("wc", builtin_wc, "Print line, word and byte counts")
    }
}

#[builtin(
    desc = "exits the current session",
    man = "
SYNOPSIS
    exit [CODE]

DESCRIPTION
    Ends the interactive session with status CODE, or 0 when no code is given.
    Inside a pipeline the other stages still run to completion."
)]
pub fn exit(args: &[types::Str], ctx: &mut Context<'_>) -> Status {
    match args.first() {
        None => Status::exit_requested(0),
        Some(code) => match code.parse::<i32>() {
            Ok(code) => Status::exit_requested(code),
            Err(_) => Status::bad_argument(
                &mut ctx.stderr,
                format!("exit: {}: numeric argument required", code),
            ),
        },
    }
}

#[builtin(
    desc = "print the working directory",
    man = "
SYNOPSIS
    pwd

DESCRIPTION
    Prints the working directory of the stage, followed by a newline."
)]
pub fn pwd(args: &[types::Str], ctx: &mut Context<'_>) -> Status {
    if !args.is_empty() {
        return Status::bad_argument(&mut ctx.stderr, "pwd: too many arguments");
    }
    let result = writeln!(ctx.stdout, "{}", ctx.cwd.display());
    Status::from_io(&mut ctx.stderr, "pwd", result)
}

#[builtin(
    names = "true",
    desc = "does nothing successfully",
    man = "
SYNOPSIS
    true

DESCRIPTION
    Sets the exit status to 0."
)]
pub fn _true(args: &[types::Str], ctx: &mut Context<'_>) -> Status { Status::TRUE }

#[builtin(
    names = "false",
    desc = "does nothing unsuccessfully",
    man = "
SYNOPSIS
    false

DESCRIPTION
    Sets the exit status to 1."
)]
pub fn _false(args: &[types::Str], ctx: &mut Context<'_>) -> Status { Status::FALSE }

//! Turns an expanded line into a [`Statement`].

pub mod assignments;
pub mod pipelines;

use self::pipelines::{Job, Pipeline};
use crate::{builtins::BuiltinMap, shell::Variables, types};
use std::{
    env,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors that can arise while parsing a line
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A command is neither a builtin, an assignment nor an executable on the `PATH`
    #[error("command not found: {0}")]
    CommandNotFound(types::Str),
}

/// What a line asks the session to do.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement {
    /// Nothing: the line was blank
    Default,
    /// The line was `exit`: end the session without running anything
    Exit,
    Pipeline(Pipeline),
}

/// Parses one line, already expanded.
///
/// The line is split on `|` into commands and each command on whitespace into a name and its
/// arguments. Empty commands are skipped. Every name must be a builtin, an assignment or an
/// executable that `PATH` in `vars` leads to; otherwise nothing of the line runs.
///
/// ```
/// use pipesh::{parser::{parse, Statement}, BuiltinMap, Variables};
///
/// let builtins = BuiltinMap::default();
/// let vars = Variables::default();
/// assert_eq!(parse("  exit ", &builtins, &vars), Ok(Statement::Exit));
/// match parse("echo hi | wc -c", &builtins, &vars) {
///     Ok(Statement::Pipeline(pipeline)) => assert_eq!(pipeline.len(), 2),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
pub fn parse(line: &str, builtins: &BuiltinMap, vars: &Variables) -> Result<Statement, Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Statement::Default);
    }
    if trimmed == "exit" {
        return Ok(Statement::Exit);
    }

    let pipeline = line
        .split('|')
        .filter_map(Job::from_words)
        .map(|job| {
            if builtins.contains(&job.name)
                || assignments::split_assignment(&job.name).is_some()
                || lookup(&job.name, vars).is_some()
            {
                Ok(job)
            } else {
                Err(Error::CommandNotFound(job.name))
            }
        })
        .collect::<Result<Pipeline, Error>>()?;
    Ok(Statement::Pipeline(pipeline))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Finds the executable that `name` refers to. Names with a `/` are taken as paths, any other
/// name is searched for in the directories of `PATH` in `vars`.
pub fn lookup(name: &str, vars: &Variables) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return if is_executable(&path) { Some(path) } else { None };
    }
    let paths = vars.get("PATH")?;
    env::split_paths(paths).map(|dir| dir.join(name)).find(|path| is_executable(path))
}

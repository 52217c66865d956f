use crate::types::{self, Args};
use itertools::Itertools;
use std::{fmt, iter::FromIterator};

/// One command of a pipeline: a name and the words that follow it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Job {
    pub name: types::Str,
    pub args: Args,
}

impl Job {
    pub fn new<S: Into<types::Str>>(name: S, args: Args) -> Self { Job { name: name.into(), args } }

    /// Splits a command on whitespace. `None` for a blank command.
    pub fn from_words(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace();
        let name = words.next()?;
        Some(Job::new(name, words.map(types::Str::from).collect()))
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// The commands of a line, in the order their output flows.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Pipeline {
    pub jobs: Vec<Job>,
}

impl Pipeline {
    pub fn new() -> Self { Pipeline { jobs: Vec::new() } }

    pub fn len(&self) -> usize { self.jobs.len() }

    pub fn is_empty(&self) -> bool { self.jobs.is_empty() }

    /// Whether running the pipeline needs OS pipes between its stages.
    pub fn requires_piping(&self) -> bool { self.jobs.len() > 1 }
}

impl FromIterator<Job> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        Pipeline { jobs: iter.into_iter().collect() }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.jobs.iter().format(" | "))
    }
}

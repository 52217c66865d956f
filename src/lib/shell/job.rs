use crate::{
    builtins::{BuiltinFunction, BuiltinMap},
    parser::{assignments::split_assignment, pipelines::Job},
    types,
};
use std::fmt;

/// A stage of a pipeline, classified for execution.
///
/// Precedence: an assignment word wins over everything, then a registered builtin, then an
/// external program. Arguments that follow an assignment are ignored.
pub(crate) enum RefinedJob<'a> {
    /// `NAME=VALUE`: updates the session environment and writes nothing
    Assignment { name: &'a str, value: &'a str },
    /// A procedure embedded into the shell
    Builtin { name: &'a str, main: BuiltinFunction, args: &'a [types::Str] },
    /// An external program that is executed by this shell
    External { name: &'a str, args: &'a [types::Str] },
}

impl<'a> RefinedJob<'a> {
    pub(crate) fn classify(job: &'a Job, builtins: &BuiltinMap) -> Self {
        if let Some((name, value)) = split_assignment(&job.name) {
            RefinedJob::Assignment { name, value }
        } else if let Some(main) = builtins.get(&job.name) {
            RefinedJob::Builtin { name: &job.name, main, args: &job.args }
        } else {
            RefinedJob::External { name: &job.name, args: &job.args }
        }
    }

    /// The command name, as shown in diagnostics
    pub(crate) fn name(&self) -> &'a str {
        match *self {
            RefinedJob::Assignment { name, .. }
            | RefinedJob::Builtin { name, .. }
            | RefinedJob::External { name, .. } => name,
        }
    }
}

impl<'a> fmt::Debug for RefinedJob<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefinedJob::Assignment { name, value } => write!(f, "Assignment({}={})", name, value),
            RefinedJob::Builtin { name, args, .. } => write!(f, "Builtin({} {:?})", name, args),
            RefinedJob::External { name, args } => write!(f, "External({} {:?})", name, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn assignments_come_first() {
        let builtins = BuiltinMap::default();
        let job = Job::new("echo=1", args!["ignored"]);
        match RefinedJob::classify(&job, &builtins) {
            RefinedJob::Assignment { name, value } => assert_eq!((name, value), ("echo", "1")),
            other => panic!("classified as {:?}", other),
        }
    }

    #[test]
    fn builtins_before_externals() {
        let builtins = BuiltinMap::default();
        let echo = Job::new("echo", args!["hi"]);
        let refined = RefinedJob::classify(&echo, &builtins);
        assert!(matches!(refined, RefinedJob::Builtin { args: [_], .. }));
        assert_eq!(refined.name(), "echo");

        let ls = Job::new("ls", args!["-l"]);
        assert!(matches!(
            RefinedJob::classify(&ls, &builtins),
            RefinedJob::External { name: "ls", .. }
        ));
        assert!(matches!(
            RefinedJob::classify(&echo, &BuiltinMap::new()),
            RefinedJob::External { name: "echo", .. }
        ));
    }
}

use super::{
    pipe_exec::streams::{self, Streams},
    Interrupt, Variables,
};
use std::{env, fs::File, io::Write, path::PathBuf};

/// Everything one stage of a pipeline runs with.
///
/// Builtins and externals see the same contract: they read `stdin`, write `stdout` and
/// `stderr`, look variables up in `env` and resolve relative paths against `cwd`. A context
/// belongs to its stage until the stage is done; then the executor closes it.
#[derive(Debug)]
pub struct Context<'a> {
    pub stdin:     File,
    pub stdout:    File,
    pub stderr:    File,
    pub env:       &'a Variables,
    pub cwd:       PathBuf,
    pub interrupt: Interrupt,
}

impl<'a> Context<'a> {
    /// Snapshots the working directory of the process, or `.` when it cannot be read.
    pub fn new(streams: Streams, env: &'a Variables, interrupt: Interrupt) -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let Streams { stdin, stdout, stderr } = streams;
        Context { stdin, stdout, stderr, env, cwd, interrupt }
    }

    pub fn is_interrupted(&self) -> bool { self.interrupt.is_raised() }

    /// Closes the three streams. Failures to close input or output are written to the
    /// error stream before it is closed itself.
    pub(crate) fn close(self) {
        let Context { stdin, stdout, mut stderr, .. } = self;
        for (side, file) in [("input", stdin), ("output", stdout)] {
            if let Err(why) = streams::close(file) {
                let _ = writeln!(stderr, "pipesh: failed to close stage {}: {}", side, why);
            }
        }
        let _ = streams::close(stderr);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::builtins::{BuiltinFunction, Status};
    use std::{
        io::{Read, Seek, SeekFrom},
        path::Path,
    };
    use tempfile::TempDir;

    /// Runs builtins against captured streams, in a scratch working directory.
    pub(crate) struct Fixture {
        _dir:    TempDir,
        stdin:   String,
        pub cwd: PathBuf,
        pub env: Variables,
    }

    fn contents(mut file: File) -> String {
        let mut out = String::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_string(&mut out).unwrap();
        out
    }

    impl Fixture {
        pub(crate) fn new(stdin: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let cwd = dir.path().to_path_buf();
            Fixture { _dir: dir, stdin: stdin.into(), cwd, env: Variables::default() }
        }

        pub(crate) fn dir(&self) -> &Path { &self.cwd }

        /// Returns the status of `builtin` and everything it wrote to stdout and stderr.
        pub(crate) fn run(&self, builtin: BuiltinFunction, args: &[&str]) -> (Status, String, String) {
            let mut stdin = tempfile::tempfile().unwrap();
            stdin.write_all(self.stdin.as_bytes()).unwrap();
            stdin.seek(SeekFrom::Start(0)).unwrap();
            let stdout = tempfile::tempfile().unwrap();
            let stderr = tempfile::tempfile().unwrap();

            let streams =
                Streams::new(stdin, stdout.try_clone().unwrap(), stderr.try_clone().unwrap());
            let mut ctx = Context::new(streams, &self.env, Interrupt::new());
            ctx.cwd = self.cwd.clone();

            let args: Vec<String> = args.iter().map(|&arg| arg.to_owned()).collect();
            let status = builtin(&args, &mut ctx);
            ctx.close();
            (status, contents(stdout), contents(stderr))
        }
    }

    #[test]
    fn snapshots_the_working_directory() {
        let env = Variables::default();
        let streams = Streams::new(
            tempfile::tempfile().unwrap(),
            tempfile::tempfile().unwrap(),
            tempfile::tempfile().unwrap(),
        );
        let ctx = Context::new(streams, &env, Interrupt::new());
        assert_eq!(ctx.cwd, env::current_dir().unwrap());
        assert!(!ctx.is_interrupted());
        ctx.close();
    }

    #[test]
    fn fixture_captures_both_streams() {
        fn noisy(_: &[String], ctx: &mut Context<'_>) -> Status {
            let _ = write!(ctx.stdout, "out");
            Status::error(&mut ctx.stderr, "err")
        }
        let fixture = Fixture::new("");
        assert!(fixture.dir().exists());
        let (status, stdout, stderr) = fixture.run(noisy, &[]);
        assert_eq!(status, Status::FALSE);
        assert_eq!(stdout, "out");
        assert_eq!(stderr, "err\n");
    }
}

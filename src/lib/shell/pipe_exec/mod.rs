//! The purpose of the pipeline execution module is to run the stages of a parsed pipeline:
//! wiring adjacent stages together with OS pipes, running builtins in-process and spawning
//! externals, waiting for all of them, and releasing every pipe endpoint on every path.

pub(crate) mod pipes;
pub mod streams;

use self::{pipes::Wiring, streams::Streams};
use super::{job::RefinedJob, Context, ExecutionMode, Interrupt, Shell};
use crate::{builtins::Status, parser::pipelines::Pipeline, types};
use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use std::{
    fs::File,
    io::{self, Write},
    process::{Child, Command, Stdio},
    thread::{self, ScopedJoinHandle},
    time::{Duration, Instant},
};
use thiserror::Error;

/// An error that occurred while setting up a pipeline. No stage has run when one is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Could not create the pipes between stages
    #[error("could not create pipe: {0}")]
    CreatePipe(#[source] nix::Error),
    /// Could not duplicate the session streams for a stage
    #[error("could not duplicate stream: {0}")]
    Duplicate(#[source] io::Error),
}

/// What a pipeline run left behind: the status of every stage, in stage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStatus {
    stages: Vec<(types::Str, Status)>,
    pipes:  usize,
}

impl PipelineStatus {
    /// The status of the pipeline, which is the status of its last stage
    pub fn status(&self) -> Status { self.stages.last().map_or(Status::SUCCESS, |&(_, s)| s) }

    /// The last stage that failed, if any did
    pub fn last_failure(&self) -> Option<(&str, Status)> {
        self.stages
            .iter()
            .rev()
            .find(|(_, status)| status.is_failure())
            .map(|(name, status)| (name.as_str(), *status))
    }

    /// The exit code requested by the last stage that asked to end the session
    pub fn exit_requested(&self) -> Option<i32> {
        self.stages.iter().rev().find(|(_, s)| s.is_exit()).map(|(_, s)| s.as_os_code())
    }

    /// The name and status of each stage
    pub fn stages(&self) -> &[(types::Str, Status)] { &self.stages }

    /// How many pipe pairs the run allocated
    pub fn pipes(&self) -> usize { self.pipes }
}

/// A stage that has been started but maybe not finished.
enum Launched<'scope> {
    Finished(Status),
    Thread(ScopedJoinHandle<'scope, Status>),
    Process(Child),
}

const MAX_POLL_DELAY: Duration = Duration::from_millis(32);
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Starts an external program on the streams of `ctx`, with its working directory and
/// exactly its environment. Failures are reported on the stage's error stream.
fn spawn(name: &str, args: &[types::Str], ctx: &Context<'_>) -> Result<Child, Status> {
    let stdio = |file: &File| file.try_clone().map(Stdio::from);
    let result = (|| {
        Command::new(name)
            .args(args)
            .stdin(stdio(&ctx.stdin)?)
            .stdout(stdio(&ctx.stdout)?)
            .stderr(stdio(&ctx.stderr)?)
            .current_dir(&ctx.cwd)
            .env_clear()
            .envs(ctx.env)
            .spawn()
    })();

    result.map_err(|why| {
        let mut stderr = &ctx.stderr;
        if why.kind() == io::ErrorKind::NotFound {
            let _ = writeln!(stderr, "pipesh: command not found: {}", name);
            Status::NO_SUCH_COMMAND
        } else {
            let _ = writeln!(stderr, "pipesh: {}: {}", name, why);
            Status::COULD_NOT_EXEC
        }
    })
}

/// Sends `signal` to a running child.
fn terminate(child: &Child, signal: Signal) -> nix::Result<()> {
    signal::kill(Pid::from_raw(child.id() as i32), signal)
}

/// Waits for `child`, terminating it once `interrupt` is raised. A child still
/// running `KILL_GRACE` after `SIGTERM` gets `SIGKILL`.
fn supervise(mut child: Child, name: &str, interrupt: &Interrupt, mut stderr: &File) -> Status {
    let mut delay = Duration::from_millis(1);
    let mut terminated: Option<Instant> = None;
    let mut killed = false;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Status::from(status),
            Ok(None) => (),
            Err(why) => {
                let _ = writeln!(stderr, "pipesh: {}: could not wait for process: {}", name, why);
                return Status::FALSE;
            }
        }
        let next = match terminated {
            None if interrupt.is_raised() => Some(Signal::SIGTERM),
            Some(since) if !killed && since.elapsed() >= KILL_GRACE => Some(Signal::SIGKILL),
            _ => None,
        };
        if let Some(signal) = next {
            if let Err(why) = terminate(&child, signal) {
                let _ = writeln!(stderr, "pipesh: {}: could not terminate process: {}", name, why);
            }
            match signal {
                Signal::SIGKILL => killed = true,
                _ => terminated = Some(Instant::now()),
            }
        }
        thread::sleep(delay);
        delay = (delay * 2).min(MAX_POLL_DELAY);
    }
}

impl Shell {
    /// Binds each stage to its ends of the wiring, or to the outer streams at the edges of the
    /// pipeline. Every stage shares the outer error stream.
    fn stage_streams(&self, wiring: &mut Wiring, stages: usize) -> io::Result<Vec<Streams>> {
        (0..stages)
            .map(|index| {
                let (input, output) = wiring.stage_ends(index);
                let stdin = match input {
                    Some(reader) => reader,
                    None => self.streams.stdin.try_clone()?,
                };
                let stdout = match output {
                    Some(writer) => writer,
                    None => self.streams.stdout.try_clone()?,
                };
                Ok(Streams::new(stdin, stdout, self.streams.stderr.try_clone()?))
            })
            .collect()
    }

    /// Runs the stages one after the other. Assignments take effect immediately, so later
    /// stages see them.
    fn run_sequential(&mut self, jobs: &[RefinedJob<'_>], streams: Vec<Streams>) -> Vec<Status> {
        let mut statuses = Vec::with_capacity(jobs.len());
        for (job, streams) in jobs.iter().zip(streams) {
            let mut ctx = Context::new(streams, &self.variables, self.interrupt.clone());
            let status = match *job {
                RefinedJob::Assignment { name, value } => {
                    ctx.close();
                    self.variables.set(name, value);
                    Status::SUCCESS
                }
                RefinedJob::Builtin { main, args, .. } => {
                    let status = main(args, &mut ctx);
                    ctx.close();
                    status
                }
                RefinedJob::External { name, args } => {
                    let spawned = spawn(name, args, &ctx);
                    ctx.close();
                    match spawned {
                        Ok(child) => supervise(child, name, &self.interrupt, &self.streams.stderr),
                        Err(status) => status,
                    }
                }
            };
            statuses.push(status);
        }
        statuses
    }

    /// Launches every stage before waiting on any. Builtins run on their own threads and
    /// externals as child processes; a stage's streams are closed as soon as it is done with
    /// them. Assignments are applied, in stage order, once every stage has finished.
    fn run_concurrent(&mut self, jobs: &[RefinedJob<'_>], streams: Vec<Streams>) -> Vec<Status> {
        let env = &self.variables;
        let interrupt = &self.interrupt;
        let stderr = &self.streams.stderr;
        let mut assignments = Vec::new();

        let statuses = thread::scope(|scope| {
            let launched: Vec<Launched<'_>> = jobs
                .iter()
                .zip(streams)
                .map(|(job, streams)| {
                    let mut ctx = Context::new(streams, env, interrupt.clone());
                    match *job {
                        RefinedJob::Assignment { name, value } => {
                            ctx.close();
                            assignments.push((name, value));
                            Launched::Finished(Status::SUCCESS)
                        }
                        RefinedJob::Builtin { name, main, args } => {
                            let spawned = thread::Builder::new()
                                .name(format!("pipesh: {}", name))
                                .spawn_scoped(scope, move || {
                                    let status = main(args, &mut ctx);
                                    ctx.close();
                                    status
                                });
                            match spawned {
                                Ok(handle) => Launched::Thread(handle),
                                Err(why) => {
                                    let _ = writeln!(
                                        &mut &*stderr,
                                        "pipesh: {}: could not start thread: {}",
                                        name, why
                                    );
                                    Launched::Finished(Status::COULD_NOT_EXEC)
                                }
                            }
                        }
                        RefinedJob::External { name, args } => {
                            let spawned = spawn(name, args, &ctx);
                            ctx.close();
                            match spawned {
                                Ok(child) => Launched::Process(child),
                                Err(status) => Launched::Finished(status),
                            }
                        }
                    }
                })
                .collect();

            launched
                .into_iter()
                .zip(jobs)
                .map(|(stage, job)| match stage {
                    Launched::Finished(status) => status,
                    Launched::Thread(handle) => handle.join().unwrap_or_else(|_| {
                        let _ = writeln!(&mut &*stderr, "pipesh: {}: builtin panicked", job.name());
                        Status::FALSE
                    }),
                    Launched::Process(child) => supervise(child, job.name(), interrupt, stderr),
                })
                .collect::<Vec<_>>()
        });

        for (name, value) in assignments {
            self.variables.set(name, value);
        }
        statuses
    }

    /// Executes a pipeline and returns the status of each of its stages.
    ///
    /// A failing stage never stops its siblings. The only errors are failures to set the
    /// pipeline up, in which case nothing ran.
    pub(crate) fn execute_pipeline(
        &mut self,
        pipeline: &Pipeline,
    ) -> Result<PipelineStatus, PipelineError> {
        self.interrupt.clear();
        if pipeline.is_empty() {
            return Ok(PipelineStatus::default());
        }

        let mut wiring = Wiring::allocate(pipeline.len()).map_err(PipelineError::CreatePipe)?;
        let streams =
            self.stage_streams(&mut wiring, pipeline.len()).map_err(PipelineError::Duplicate)?;
        let jobs: Vec<RefinedJob<'_>> =
            pipeline.jobs.iter().map(|job| RefinedJob::classify(job, &self.builtins)).collect();

        let statuses = if self.opts.mode == ExecutionMode::Sequential || !pipeline.requires_piping()
        {
            self.run_sequential(&jobs, streams)
        } else {
            self.run_concurrent(&jobs, streams)
        };

        let pipes = wiring.pairs();
        wiring.close_all(&mut &self.streams.stderr);
        let stages = jobs.iter().map(|job| types::Str::from(job.name())).zip(statuses).collect();
        Ok(PipelineStatus { stages, pipes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, parser::pipelines::Job, shell::Options};
    use std::{
        io::{Read, Seek, SeekFrom},
        os::unix::io::FromRawFd,
    };

    struct Session {
        shell:  Shell,
        stdout: File,
        stderr: File,
    }

    fn read(file: &File) -> String {
        let mut file = file.try_clone().unwrap();
        let mut out = String::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_string(&mut out).unwrap();
        out
    }

    impl Session {
        fn new(mode: ExecutionMode) -> Self { Self::with_stdin(mode, tempfile::tempfile().unwrap()) }

        fn with_stdin(mode: ExecutionMode, stdin: File) -> Self {
            let stdout = tempfile::tempfile().unwrap();
            let stderr = tempfile::tempfile().unwrap();
            let streams =
                Streams::new(stdin, stdout.try_clone().unwrap(), stderr.try_clone().unwrap());
            let mut shell = Shell::with_streams(streams);
            *shell.variables_mut() = vec![("PATH", "/usr/bin:/bin")].into_iter().collect();
            *shell.opts_mut() = Options { mode, ..Options::default() };
            Session { shell, stdout, stderr }
        }

        fn run(&mut self, jobs: Vec<Job>) -> PipelineStatus {
            self.shell.execute_pipeline(&jobs.into_iter().collect()).unwrap()
        }
    }

    const MODES: [ExecutionMode; 2] = [ExecutionMode::Sequential, ExecutionMode::Concurrent];

    #[test]
    fn empty_pipeline_runs_nothing() {
        let mut session = Session::new(ExecutionMode::Concurrent);
        let result = session.run(vec![]);
        assert_eq!(result, PipelineStatus::default());
        assert_eq!(result.status(), Status::SUCCESS);
    }

    #[test]
    fn single_stage_uses_the_outer_streams() {
        for &mode in &MODES {
            let mut session = Session::new(mode);
            let result = session.run(vec![Job::new("echo", args!["hello", "world"])]);
            assert_eq!(result.pipes(), 0);
            assert_eq!(result.status(), Status::SUCCESS);
            assert_eq!(read(&session.stdout), "hello world\n");
        }
    }

    #[test]
    fn builtin_to_builtin() {
        for &mode in &MODES {
            let mut session = Session::new(mode);
            let result = session
                .run(vec![Job::new("echo", args!["hello"]), Job::new("wc", args!["-w"])]);
            assert_eq!(result.pipes(), 1);
            assert_eq!(read(&session.stdout), "1\n", "{:?}", mode);
        }
    }

    #[test]
    fn builtins_and_externals_mix() {
        for &mode in &MODES {
            let mut session = Session::new(mode);
            let result = session.run(vec![
                Job::new("echo", args!["b", "a"]),
                Job::new("tr", args![" ", "\n"]),
                Job::new("sort", args![]),
                Job::new("cat", args!["-n"]),
            ]);
            assert_eq!(result.pipes(), 3);
            assert!(result.last_failure().is_none());
            assert_eq!(read(&session.stdout), "     1\ta\n     2\tb\n");
        }
    }

    #[test]
    fn failing_stage_does_not_stop_the_others() {
        for &mode in &MODES {
            let mut session = Session::new(mode);
            let result = session.run(vec![
                Job::new("no-such-program-anywhere", args![]),
                Job::new("wc", args!["-l"]),
            ]);
            assert_eq!(result.status(), Status::SUCCESS);
            assert_eq!(
                result.last_failure(),
                Some(("no-such-program-anywhere", Status::NO_SUCH_COMMAND))
            );
            assert_eq!(read(&session.stdout), "0\n");
            assert_eq!(
                read(&session.stderr),
                "pipesh: command not found: no-such-program-anywhere\n"
            );
        }
    }

    #[test]
    fn pipeline_status_is_the_last_stage() {
        let mut session = Session::new(ExecutionMode::Concurrent);
        let result = session.run(vec![Job::new("true", args![]), Job::new("false", args![])]);
        assert_eq!(result.status(), Status::FALSE);
        let result = session.run(vec![Job::new("false", args![]), Job::new("true", args![])]);
        assert_eq!(result.status(), Status::SUCCESS);
        assert_eq!(result.last_failure(), Some(("false", Status::FALSE)));
    }

    #[test]
    fn externals_get_exactly_the_session_environment() {
        for &mode in &MODES {
            let mut session = Session::new(mode);
            session.shell.variables_mut().set("ONLY_HERE", "yes");
            session.run(vec![Job::new("env", args![])]);
            let mut lines: Vec<_> = read(&session.stdout).lines().map(String::from).collect();
            lines.sort();
            assert_eq!(lines, ["ONLY_HERE=yes", "PATH=/usr/bin:/bin"]);
        }
    }

    #[test]
    fn sequential_assignments_are_visible_downstream() {
        let mut session = Session::new(ExecutionMode::Sequential);
        session.run(vec![Job::new("SEEN=now", args![]), Job::new("printenv", args!["SEEN"])]);
        assert_eq!(read(&session.stdout), "now\n");
        assert_eq!(session.shell.variables().get("SEEN"), Some("now"));
    }

    #[test]
    fn concurrent_assignments_apply_after_the_run() {
        let mut session = Session::new(ExecutionMode::Concurrent);
        let result = session.run(vec![
            Job::new("LATE=1", args!["ignored"]),
            Job::new("LATE=2", args![]),
            Job::new("printenv", args!["LATE"]),
        ]);
        assert_eq!(result.status(), Status::FALSE);
        assert_eq!(read(&session.stdout), "");
        assert_eq!(session.shell.variables().get("LATE"), Some("2"));
    }

    #[test]
    fn exit_is_recorded_not_obeyed() {
        let mut session = Session::new(ExecutionMode::Concurrent);
        let result = session.run(vec![Job::new("exit", args!["5"]), Job::new("echo", args!["on"])]);
        assert_eq!(result.exit_requested(), Some(5));
        assert_eq!(result.status(), Status::SUCCESS);
        assert_eq!(read(&session.stdout), "on\n");
    }

    #[test]
    fn interrupt_terminates_externals() {
        let mut session = Session::new(ExecutionMode::Concurrent);
        let interrupt = session.shell.interrupt().clone();
        let raiser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            interrupt.raise();
        });
        let result = session.run(vec![Job::new("sleep", args!["10"]), Job::new("cat", args![])]);
        raiser.join().unwrap();
        assert_eq!(result.stages()[0].1, Status::TERMINATED);
    }

    /// Raises the interrupt of `session` after `delay`.
    fn interrupt_after(session: &Session, delay: Duration) -> thread::JoinHandle<()> {
        let interrupt = session.shell.interrupt().clone();
        thread::spawn(move || {
            thread::sleep(delay);
            interrupt.raise();
        })
    }

    #[test]
    fn interrupt_wakes_builtins_waiting_on_a_silent_input() {
        let (reader, writer) = nix::unistd::pipe().unwrap();
        let (reader, _writer) =
            unsafe { (File::from_raw_fd(reader), File::from_raw_fd(writer)) };
        for &mode in &MODES {
            let stdin = reader.try_clone().unwrap();
            let mut session = Session::with_stdin(mode, stdin);
            let start = Instant::now();
            let raiser = interrupt_after(&session, Duration::from_millis(300));
            let result =
                session.run(vec![Job::new("cat", args![]), Job::new("sleep", args!["30"])]);
            raiser.join().unwrap();
            assert!(start.elapsed() < Duration::from_secs(3), "{:?} did not stop", mode);
            assert_eq!(result.stages()[0].1, Status::TERMINATED);
        }
    }

    #[test]
    fn children_ignoring_sigterm_are_killed() {
        let mut session = Session::new(ExecutionMode::Concurrent);
        let start = Instant::now();
        let raiser = interrupt_after(&session, Duration::from_millis(200));
        let result = session.run(vec![
            Job::new("sh", args!["-c", "trap '' TERM; exec sleep 30"]),
            Job::new("cat", args![]),
        ]);
        raiser.join().unwrap();
        assert_eq!(result.stages()[0].1, Status::from_signal(9));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn pipe_allocation_failure_is_one_error() {
        let err = Wiring::allocate_with(3, || Err(nix::errno::Errno::EMFILE)).unwrap_err();
        let err = PipelineError::CreatePipe(err);
        assert!(err.to_string().starts_with("could not create pipe: "));
    }
}

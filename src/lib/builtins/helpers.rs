use crate::shell::Interrupt;
use nix::{
    errno::Errno,
    poll::{self, PollFd, PollFlags},
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read, Write},
    os::unix::{
        io::{AsRawFd, RawFd},
        process::ExitStatusExt,
    },
    path::Path,
    process::ExitStatus,
};

/// The exit status of a stage, plus whether the stage asked the session to end.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Status {
    code: i32,
    exit: bool,
}

impl Status {
    pub const COULD_NOT_EXEC: Self = Status::from_exit_code(126);
    pub const FALSE: Self = Status::from_exit_code(1);
    pub const NO_SUCH_COMMAND: Self = Status::from_exit_code(127);
    pub const SUCCESS: Self = Status::from_exit_code(0);
    pub const TERMINATED: Self = Status::from_exit_code(143);
    pub const TRUE: Self = Status::from_exit_code(0);

    pub const fn from_signal(signal: i32) -> Self { Status::from_exit_code(128 + signal) }

    pub const fn from_exit_code(code: i32) -> Self { Status { code, exit: false } }

    /// A status that asks the interactive session to terminate with `code`.
    /// The pipeline engine records it; only the REPL acts on it.
    pub const fn exit_requested(code: i32) -> Self { Status { code, exit: true } }

    /// Writes `err` as one line on `stderr` and returns a generic failure.
    pub fn error<W: Write, T: AsRef<str>>(stderr: &mut W, err: T) -> Self {
        let err = err.as_ref();
        if !err.is_empty() {
            let _ = writeln!(stderr, "{}", err);
        }
        Status::FALSE
    }

    /// Writes `err` as one line on `stderr` and returns the usage error status.
    pub fn bad_argument<W: Write, T: AsRef<str>>(stderr: &mut W, err: T) -> Self {
        let err = err.as_ref();
        if !err.is_empty() {
            let _ = writeln!(stderr, "{}", err);
        }
        Status::from_exit_code(2)
    }

    /// Maps the outcome of a builtin's I/O to a status. A reader that went away
    /// (`EPIPE`) fails quietly, an interrupt maps to `TERMINATED`.
    pub fn from_io<W: Write>(stderr: &mut W, name: &str, result: io::Result<()>) -> Self {
        match result {
            Ok(()) => Status::SUCCESS,
            Err(ref why) if why.kind() == io::ErrorKind::BrokenPipe => Status::FALSE,
            Err(ref why) if why.kind() == io::ErrorKind::Interrupted => Status::TERMINATED,
            Err(why) => Status::error(stderr, format!("{}: {}", name, why)),
        }
    }

    pub const fn is_success(self) -> bool { self.code == 0 }

    pub const fn is_failure(self) -> bool { self.code != 0 }

    pub const fn is_exit(self) -> bool { self.exit }

    pub const fn as_os_code(self) -> i32 { self.code }
}

impl From<ExitStatus> for Status {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Status::from_exit_code(code),
            (None, Some(signal)) => Status::from_signal(signal),
            (None, None) => Status::COULD_NOT_EXEC,
        }
    }
}

/// How long a read waits for input before it looks at the interrupt again.
const POLL_INTERVAL_MS: i32 = 50;

/// A reader that waits for input in short slices, so that a raised interrupt is
/// seen even while the other end of a pipe stays silent. An interrupted read
/// looks like the end of the stream; callers tell the two apart through the
/// interrupt itself.
pub(crate) struct Interruptible<'a, R> {
    inner:     R,
    fd:        RawFd,
    interrupt: &'a Interrupt,
}

impl<'a, R: Read> Interruptible<'a, R> {
    pub(crate) fn new(inner: R, fd: RawFd, interrupt: &'a Interrupt) -> Self {
        Interruptible { inner, fd, interrupt }
    }
}

impl<'a, R: Read> Read for Interruptible<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut fds = [PollFd::new(self.fd, PollFlags::POLLIN)];
        loop {
            if self.interrupt.is_raised() {
                return Ok(0);
            }
            match poll::poll(&mut fds, POLL_INTERVAL_MS) {
                Ok(0) | Err(Errno::EINTR) => continue,
                Ok(_) => return self.inner.read(buf),
                Err(errno) => return Err(io::Error::from_raw_os_error(errno as i32)),
            }
        }
    }
}

/// Opens a builtin operand: `-` is the stage input, anything else a file
/// relative to the stage's working directory.
pub(crate) fn open_input<'a>(
    stdin: &'a File,
    cwd: &Path,
    operand: &str,
    interrupt: &'a Interrupt,
) -> io::Result<Box<dyn BufRead + 'a>> {
    if operand == "-" {
        let reader = Interruptible::new(stdin, stdin.as_raw_fd(), interrupt);
        Ok(Box::new(BufReader::new(reader)))
    } else {
        let file = File::open(cwd.join(operand))?;
        let fd = file.as_raw_fd();
        Ok(Box::new(BufReader::new(Interruptible::new(file, fd, interrupt))))
    }
}

fn interrupted() -> io::Error { io::Error::new(io::ErrorKind::Interrupted, "interrupted") }

/// Feeds every line of `reader` to `line`, terminator included. The last line
/// may lack one. Stops with `ErrorKind::Interrupted` once the session
/// interrupt is raised.
pub(crate) fn for_each_raw_line<R, F>(mut reader: R, interrupt: &Interrupt, mut line: F) -> io::Result<()>
where
    R: BufRead,
    F: FnMut(&[u8]) -> io::Result<()>,
{
    let mut buffer = Vec::with_capacity(256);
    loop {
        if interrupt.is_raised() {
            return Err(interrupted());
        }
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return if interrupt.is_raised() { Err(interrupted()) } else { Ok(()) };
        }
        line(&buffer)?;
    }
}

/// Like [`for_each_raw_line`], without the terminator.
pub(crate) fn for_each_line<R, F>(reader: R, interrupt: &Interrupt, mut line: F) -> io::Result<()>
where
    R: BufRead,
    F: FnMut(&[u8]) -> io::Result<()>,
{
    for_each_raw_line(reader, interrupt, |raw| line(raw.strip_suffix(b"\n").unwrap_or(raw)))
}

use nix::{
    fcntl::{self, FcntlArg, OFlag},
    libc, unistd,
};
use std::{
    fs::{File, OpenOptions},
    io,
    os::unix::{
        fs::OpenOptionsExt,
        io::{FromRawFd, IntoRawFd, RawFd},
    },
};

/// The outer streams of a session: stage 0 reads `stdin`, the last stage writes `stdout`,
/// and every stage shares `stderr`.
#[derive(Debug)]
pub struct Streams {
    pub stdin:  File,
    pub stdout: File,
    pub stderr: File,
}

/// Duplicates `fd` with the close-on-exec flag set, so that spawned children only see the
/// descriptors handed to them explicitly.
fn dup_cloexec(fd: RawFd) -> io::Result<File> {
    fcntl::fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(0))
        .map(|fd| unsafe { File::from_raw_fd(fd) })
        .map_err(|errno| io::Error::from_raw_os_error(errno as i32))
}

impl Streams {
    pub fn new(stdin: File, stdout: File, stderr: File) -> Self { Streams { stdin, stdout, stderr } }

    /// Duplicates STDIN, STDOUT, and STDERR; in that order; and returns them as `File`s,
    /// which closes the duplicates when dropped.
    pub fn duplicate() -> io::Result<Self> {
        // STDIN may have been closed, in which case stage 0 reads from /dev/null.
        let stdin = match dup_cloexec(libc::STDIN_FILENO) {
            Ok(stdin) => stdin,
            Err(_) => {
                OpenOptions::new().read(true).custom_flags(OFlag::O_CLOEXEC.bits()).open("/dev/null")?
            }
        };
        let stdout = dup_cloexec(libc::STDOUT_FILENO)?;
        let stderr = dup_cloexec(libc::STDERR_FILENO)?;
        Ok(Streams { stdin, stdout, stderr })
    }

    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Streams {
            stdin:  self.stdin.try_clone()?,
            stdout: self.stdout.try_clone()?,
            stderr: self.stderr.try_clone()?,
        })
    }
}

/// Closes `file` now and reports the failure, which dropping a `File` would swallow.
pub(crate) fn close(file: File) -> nix::Result<()> { unistd::close(file.into_raw_fd()) }

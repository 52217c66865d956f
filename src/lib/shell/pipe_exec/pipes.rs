use super::streams;
use nix::{fcntl::OFlag, unistd};
use std::{
    fs::File,
    io::Write,
    os::unix::io::{FromRawFd, RawFd},
};

/// Owns the `n - 1` pipe pairs that connect the stages of an `n` stage pipeline.
///
/// Pipe `i` carries the output of stage `i` to the input of stage `i + 1`. Ends are handed
/// out to stages with [`Wiring::stage_ends`]; whatever is still held when the guard goes away
/// is closed, so every endpoint is closed exactly once on every path.
#[derive(Debug)]
pub(crate) struct Wiring {
    readers: Vec<Option<File>>,
    writers: Vec<Option<File>>,
}

impl Wiring {
    /// Creates the pipes for `stages` stages, all close-on-exec.
    pub(crate) fn allocate(stages: usize) -> nix::Result<Self> {
        Self::allocate_with(stages, || unistd::pipe2(OFlag::O_CLOEXEC))
    }

    /// Creates the pipes with `pipe`. When a pair cannot be created, the pairs created so far
    /// are closed before the error is returned.
    pub(crate) fn allocate_with<F>(stages: usize, mut pipe: F) -> nix::Result<Self>
    where
        F: FnMut() -> nix::Result<(RawFd, RawFd)>,
    {
        let pairs = stages.saturating_sub(1);
        let mut wiring =
            Wiring { readers: Vec::with_capacity(pairs), writers: Vec::with_capacity(pairs) };
        for _ in 0..pairs {
            let (reader, writer) = pipe()?;
            unsafe {
                wiring.readers.push(Some(File::from_raw_fd(reader)));
                wiring.writers.push(Some(File::from_raw_fd(writer)));
            }
        }
        Ok(wiring)
    }

    pub(crate) fn pairs(&self) -> usize { self.readers.len() }

    /// Takes the (input, output) ends of stage `index`. `None` means the stage is bound to
    /// the outer stream on that side.
    pub(crate) fn stage_ends(&mut self, index: usize) -> (Option<File>, Option<File>) {
        let input = index.checked_sub(1).and_then(|prev| self.readers.get_mut(prev)?.take());
        let output = self.writers.get_mut(index).and_then(Option::take);
        (input, output)
    }

    /// Closes every end still held, reporting failures on `stderr`.
    pub(crate) fn close_all<W: Write>(&mut self, stderr: &mut W) {
        for end in self.readers.iter_mut().chain(self.writers.iter_mut()) {
            if let Some(file) = end.take() {
                if let Err(why) = streams::close(file) {
                    let _ = writeln!(stderr, "pipesh: failed to close pipe: {}", why);
                }
            }
        }
    }
}

impl Drop for Wiring {
    fn drop(&mut self) { self.close_all(&mut std::io::sink()); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;
    use std::io::{ErrorKind, Read};

    #[test]
    fn single_stage_has_no_pipes() {
        let mut wiring = Wiring::allocate(1).unwrap();
        assert_eq!(wiring.pairs(), 0);
        let (input, output) = wiring.stage_ends(0);
        assert!(input.is_none() && output.is_none());
        assert_eq!(Wiring::allocate(0).unwrap().pairs(), 0);
    }

    #[test]
    fn adjacent_stages_share_a_pipe() {
        let mut wiring = Wiring::allocate(3).unwrap();
        assert_eq!(wiring.pairs(), 2);

        let (first_in, first_out) = wiring.stage_ends(0);
        let (middle_in, middle_out) = wiring.stage_ends(1);
        let (last_in, last_out) = wiring.stage_ends(2);
        assert!(first_in.is_none() && last_out.is_none());
        assert!(middle_out.is_some() && last_in.is_some());

        let mut writer = first_out.unwrap();
        writer.write_all(b"hello\n").unwrap();
        drop(writer);

        let mut received = String::new();
        middle_in.unwrap().read_to_string(&mut received).unwrap();
        assert_eq!(received, "hello\n");
    }

    #[test]
    fn ends_are_handed_out_once() {
        let mut wiring = Wiring::allocate(2).unwrap();
        let _ = wiring.stage_ends(0);
        assert!(wiring.stage_ends(0).1.is_none());
    }

    #[test]
    fn dropping_the_guard_closes_held_ends() {
        let mut wiring = Wiring::allocate(2).unwrap();
        let (_, writer) = wiring.stage_ends(0);
        let writer = writer.unwrap();
        drop(wiring);

        // the only reader is gone
        let err = (&writer).write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn partial_allocation_is_released() {
        let mut readers = Vec::new();
        let mut calls = 0;
        let result = Wiring::allocate_with(4, || {
            calls += 1;
            if calls == 3 {
                return Err(Errno::EMFILE);
            }
            let (reader, writer) = unistd::pipe2(OFlag::O_CLOEXEC)?;
            readers.push(unsafe { File::from_raw_fd(unistd::dup(reader)?) });
            Ok((reader, writer))
        });
        assert_eq!(result.unwrap_err(), Errno::EMFILE);
        assert_eq!(readers.len(), 2);

        // every writer was closed, so readers see end-of-file straight away
        for mut reader in readers {
            let mut buf = [0; 1];
            assert_eq!(reader.read(&mut buf).unwrap(), 0);
        }
    }
}

use super::Status;
use crate as pipesh;
use crate::{shell::Context, types};
use builtins_proc::builtin;
use std::io::{BufWriter, Write};

#[builtin(
    desc = "display text",
    help = "alone",
    man = "
SYNOPSIS
    echo --help
    echo [-n] [STRING]...

DESCRIPTION
    Print the STRING(s) to standard output, separated by a single space.
    Every other argument, -h included, is printed as it is.

OPTIONS
    -n
        do not output the trailing newline"
)]
pub fn echo(args: &[types::Str], ctx: &mut Context<'_>) -> Status {
    let (newline, data) = match args.split_first() {
        Some((flag, rest)) if flag == "-n" => (false, rest),
        _ => (true, args),
    };

    let mut buffer = BufWriter::new(&ctx.stdout);
    let result = (|| {
        let mut first = true;
        for arg in data {
            if first {
                first = false;
            } else {
                buffer.write_all(b" ")?;
            }
            buffer.write_all(arg.as_bytes())?;
        }
        if newline {
            buffer.write_all(b"\n")?;
        }
        buffer.flush()
    })();
    Status::from_io(&mut ctx.stderr, "echo", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::context::tests::Fixture;

    #[test]
    fn joins_arguments_with_one_space() {
        let (status, stdout, _) = Fixture::new("").run(builtin_echo, &["hello", "world"]);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(stdout, "hello world\n");
    }

    #[test]
    fn no_newline() {
        let (_, stdout, _) = Fixture::new("").run(builtin_echo, &["-n", "test"]);
        assert_eq!(stdout, "test");
    }

    #[test]
    fn only_a_leading_flag_is_an_option() {
        let (_, stdout, _) = Fixture::new("").run(builtin_echo, &["a", "-n"]);
        assert_eq!(stdout, "a -n\n");
    }

    #[test]
    fn empty() {
        let (_, stdout, _) = Fixture::new("").run(builtin_echo, &[]);
        assert_eq!(stdout, "\n");
    }

    #[test]
    fn help_only_when_alone() {
        let (_, stdout, _) = Fixture::new("").run(builtin_echo, &["-h"]);
        assert_eq!(stdout, "-h\n");
        let (_, stdout, _) = Fixture::new("").run(builtin_echo, &["a", "--help"]);
        assert_eq!(stdout, "a --help\n");
        let (status, stdout, _) = Fixture::new("").run(builtin_echo, &["--help"]);
        assert_eq!(status, Status::SUCCESS);
        assert!(stdout.starts_with("NAME\n    echo - display text"));
    }
}

use super::{for_each_line, open_input, Status};
use crate as pipesh;
use crate::{shell::Context, types};
use builtins_proc::builtin;
use std::io::{self, BufWriter, Write};

#[derive(Default, Debug, Clone, Copy)]
struct Flags {
    number_all:       bool,
    number_non_blank: bool,
    squeeze_blank:    bool,
    show_ends:        bool,
    show_tabs:        bool,
}

/// Line numbering and blank-line state carried across every operand.
#[derive(Debug)]
struct Printer<W> {
    out:        W,
    flags:      Flags,
    line:       usize,
    prev_blank: bool,
}

impl<W: Write> Printer<W> {
    fn new(out: W, flags: Flags) -> Self { Printer { out, flags, line: 1, prev_blank: false } }

    fn print(&mut self, line: &[u8]) -> io::Result<()> {
        let blank = line.is_empty();
        if self.flags.squeeze_blank && blank && self.prev_blank {
            return Ok(());
        }
        self.prev_blank = blank;

        let numbered = if self.flags.number_non_blank { !blank } else { self.flags.number_all };
        if numbered {
            write!(self.out, "{:6}\t", self.line)?;
            self.line += 1;
        }

        if self.flags.number_non_blank && blank {
            // -b leaves blank lines bare, even with -E
            return self.out.write_all(b"\n");
        }

        if self.flags.show_tabs {
            for chunk in line.split(|&b| b == b'\t').enumerate() {
                if chunk.0 != 0 {
                    self.out.write_all(b"^I")?;
                }
                self.out.write_all(chunk.1)?;
            }
        } else {
            self.out.write_all(line)?;
        }

        if self.flags.show_ends {
            self.out.write_all(b"$")?;
        }
        self.out.write_all(b"\n")
    }
}

fn parse_flags(args: &[types::Str]) -> (Flags, Vec<&str>) {
    let mut flags = Flags::default();
    let mut files = Vec::new();
    let mut rest = args;
    while let Some((arg, tail)) = rest.split_first() {
        if !arg.starts_with('-') || arg.len() == 1 {
            break;
        }
        match arg.as_str() {
            "-n" | "--number" => flags.number_all = true,
            "-b" | "--number-nonblank" => flags.number_non_blank = true,
            "-s" | "--squeeze-blank" => flags.squeeze_blank = true,
            "-E" | "--show-ends" => flags.show_ends = true,
            "-T" | "--show-tabs" => flags.show_tabs = true,
            // anything else is taken for a file name
            other => files.push(other),
        }
        rest = tail;
    }
    files.extend(rest.iter().map(String::as_str));
    if files.is_empty() {
        files.push("-");
    }
    (flags, files)
}

#[builtin(
    desc = "concatenate files and print on the standard output",
    man = "
SYNOPSIS
    cat [ -h | --help ] [OPTION]... [FILE]...

DESCRIPTION
    Concatenate FILE(s) to standard output. With no FILE, or when FILE is -,
    read standard input. Relative paths are resolved against the working
    directory of the stage.

OPTIONS
    -b, --number-nonblank
        number nonempty output lines, overrides -n
    -n, --number
        number all output lines
    -s, --squeeze-blank
        suppress repeated empty output lines
    -E, --show-ends
        display $ at end of each line
    -T, --show-tabs
        display TAB characters as ^I"
)]
pub fn cat(args: &[types::Str], ctx: &mut Context<'_>) -> Status {
    let (flags, files) = parse_flags(args);
    let mut printer = Printer::new(BufWriter::new(&ctx.stdout), flags);

    for file in files {
        let reader = match open_input(&ctx.stdin, &ctx.cwd, file, &ctx.interrupt) {
            Ok(reader) => reader,
            Err(why) => {
                let _ = printer.out.flush();
                return Status::error(&mut &ctx.stderr, format!("cat: {}: {}", file, why));
            }
        };
        let result = for_each_line(reader, &ctx.interrupt, |line| printer.print(line));
        if result.is_err() {
            return Status::from_io(&mut &ctx.stderr, "cat", result);
        }
    }

    let result = printer.out.flush();
    Status::from_io(&mut &ctx.stderr, "cat", result)
}

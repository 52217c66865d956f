use super::{for_each_raw_line, open_input, Status};
use crate as pipesh;
use crate::{
    shell::{Context, Interrupt},
    types,
};
use builtins_proc::builtin;
use itertools::Itertools;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Count {
    All,
    Lines,
    Words,
    Bytes,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Totals {
    lines: usize,
    words: usize,
    bytes: usize,
}

impl Totals {
    fn render(self, count: Count) -> String {
        match count {
            Count::All => [self.lines, self.words, self.bytes].iter().join(" "),
            Count::Lines => self.lines.to_string(),
            Count::Words => self.words.to_string(),
            Count::Bytes => self.bytes.to_string(),
        }
    }
}

/// Counts a stream. An unterminated last line still counts as a line.
fn tally<R: BufRead>(reader: R, interrupt: &Interrupt) -> io::Result<Totals> {
    let mut totals = Totals::default();
    for_each_raw_line(reader, interrupt, |line| {
        totals.lines += 1;
        totals.bytes += line.len();
        totals.words += String::from_utf8_lossy(line).split_whitespace().count();
        Ok(())
    })?;
    Ok(totals)
}

#[builtin(
    desc = "print line, word and byte counts",
    man = "
SYNOPSIS
    wc [ -h | --help ] [-l | -w | -c] [FILE]...

DESCRIPTION
    Print the number of lines, words and bytes of each FILE on its own line,
    separated by spaces. With no FILE, or when FILE is -, read standard input.
    A file that cannot be opened is reported and skipped.

OPTIONS
    -l
        print only the line count
    -w
        print only the word count
    -c
        print only the byte count"
)]
pub fn wc(args: &[types::Str], ctx: &mut Context<'_>) -> Status {
    let mut count = Count::All;
    let mut rest = args;
    while let Some((arg, tail)) = rest.split_first() {
        if !arg.starts_with('-') || arg.len() == 1 {
            break;
        }
        count = match arg.as_str() {
            "-l" => Count::Lines,
            "-w" => Count::Words,
            "-c" => Count::Bytes,
            other => {
                return Status::bad_argument(
                    &mut ctx.stderr,
                    format!("wc: invalid option '{}'", other),
                )
            }
        };
        rest = tail;
    }
    let files: &[types::Str] = rest;
    let stdin_only = [types::Str::from("-")];
    let files = if files.is_empty() { &stdin_only[..] } else { files };

    let mut status = Status::SUCCESS;
    for file in files {
        let reader = match open_input(&ctx.stdin, &ctx.cwd, file, &ctx.interrupt) {
            Ok(reader) => reader,
            Err(why) => {
                status = Status::error(&mut &ctx.stderr, format!("wc: cannot open {}: {}", file, why));
                continue;
            }
        };
        let result = tally(reader, &ctx.interrupt)
            .and_then(|totals| writeln!(&ctx.stdout, "{}", totals.render(count)));
        if result.is_err() {
            return Status::from_io(&mut &ctx.stderr, "wc", result);
        }
    }
    status
}

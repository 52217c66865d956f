use super::{for_each_line, open_input, Status};
use crate as pipesh;
use crate::{shell::Context, types};
use builtins_proc::builtin;
use regex::{Regex, RegexBuilder};
use std::{
    borrow::Cow,
    io::{BufWriter, Write},
};

#[derive(Debug, Default, PartialEq)]
struct Options<'a> {
    ignore_case: bool,
    word:        bool,
    after:       usize,
    pattern:     &'a str,
    files:       Vec<&'a str>,
}

fn parse_context(value: &str) -> Result<usize, String> {
    value.parse().map_err(|_| format!("grep: {}: invalid context length argument", value))
}

fn parse_options(args: &[types::Str]) -> Result<Options<'_>, String> {
    let mut options = Options::default();
    let mut iter = args.iter().map(String::as_str);
    let mut positional = Vec::new();

    while let Some(arg) = iter.next() {
        match arg {
            "--" => {
                positional.extend(iter.by_ref());
                break;
            }
            "-i" => options.ignore_case = true,
            "-w" => options.word = true,
            "-A" => match iter.next() {
                Some(value) => options.after = parse_context(value)?,
                None => return Err("grep: option requires an argument -- 'A'".into()),
            },
            _ if arg.starts_with("-A") => {
                let value = &arg[2..];
                options.after = parse_context(value.strip_prefix('=').unwrap_or(value))?;
            }
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("grep: unknown option: {}", arg));
            }
            _ => {
                positional.push(arg);
                positional.extend(iter.by_ref());
                break;
            }
        }
    }

    let mut positional = positional.into_iter();
    options.pattern = positional.next().ok_or("grep: missing search pattern")?;
    options.files = positional.collect();
    if options.files.is_empty() {
        options.files.push("-");
    }
    Ok(options)
}

fn is_word_char(c: char) -> bool { c.is_alphanumeric() || c == '_' }

/// True when some match of `regex` in `line` is not glued to a word character.
fn matches_word(regex: &Regex, line: &str) -> bool {
    regex.find_iter(line).any(|found| {
        let before = line[..found.start()].chars().next_back();
        let after = line[found.end()..].chars().next();
        !before.map_or(false, is_word_char) && !after.map_or(false, is_word_char)
    })
}

#[builtin(
    desc = "print lines that match a regular expression",
    man = "
SYNOPSIS
    grep [ -h | --help ] [-i] [-w] [-A NUM] PATTERN [FILE]...

DESCRIPTION
    Search each FILE for lines matching the regular expression PATTERN and
    print them. With no FILE, or when FILE is -, read standard input.

OPTIONS
    -i
        ignore case distinctions in patterns and data
    -w
        select only lines where the match forms a whole word
    -A NUM
        print NUM lines of trailing context after each match; a line is never
        printed twice"
)]
pub fn grep(args: &[types::Str], ctx: &mut Context<'_>) -> Status {
    let options = match parse_options(args) {
        Ok(options) => options,
        Err(why) => return Status::bad_argument(&mut ctx.stderr, why),
    };
    let regex = match RegexBuilder::new(options.pattern).case_insensitive(options.ignore_case).build()
    {
        Ok(regex) => regex,
        Err(why) => {
            return Status::error(
                &mut ctx.stderr,
                format!("grep: invalid regular expression: {}", why),
            )
        }
    };

    let mut out = BufWriter::new(&ctx.stdout);
    let mut status = Status::SUCCESS;
    for file in &options.files {
        let reader = match open_input(&ctx.stdin, &ctx.cwd, file, &ctx.interrupt) {
            Ok(reader) => reader,
            Err(why) => {
                status = Status::error(&mut &ctx.stderr, format!("grep: {}: {}", file, why));
                continue;
            }
        };

        // trailing context still owed to the last match
        let mut pending = 0;
        let result = for_each_line(reader, &ctx.interrupt, |raw| {
            let line: Cow<'_, str> = String::from_utf8_lossy(raw);
            let hit =
                if options.word { matches_word(&regex, &line) } else { regex.is_match(&line) };
            if hit {
                pending = options.after;
            } else if pending > 0 {
                pending -= 1;
            } else {
                return Ok(());
            }
            out.write_all(raw)?;
            out.write_all(b"\n")
        });
        if result.is_err() {
            return Status::from_io(&mut &ctx.stderr, "grep", result);
        }
    }

    let result = out.flush();
    match Status::from_io(&mut &ctx.stderr, "grep", result) {
        Status::SUCCESS => status,
        failed => failed,
    }
}

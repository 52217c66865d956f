use crate::{shell::Context, types};
use std::io::Write;

fn print_man(ctx: &mut Context<'_>, man_page: &'static str) -> bool {
    let _ = writeln!(ctx.stdout, "{}", man_page);
    true
}

/// Prints `man_page` on the stage output when a leading option asks for help.
/// Options end at the first operand or at `--`.
pub fn check_help(args: &[types::Str], ctx: &mut Context<'_>, man_page: &'static str) -> bool {
    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return print_man(ctx, man_page),
            "--" => break,
            _ if arg.starts_with('-') && arg.len() > 1 => (),
            _ => break,
        }
    }
    false
}

/// Prints `man_page` only when `--help` is the sole argument, for builtins that
/// print their operands verbatim.
pub fn check_help_alone(
    args: &[types::Str],
    ctx: &mut Context<'_>,
    man_page: &'static str,
) -> bool {
    match args {
        [only] if only == "--help" => print_man(ctx, man_page),
        _ => false,
    }
}

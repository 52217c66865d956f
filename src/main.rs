use clap::Parser;
use pipesh::{ExecutionMode, Flow, Shell, Status};
use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
    process,
};

mod binary;

use self::binary::InteractiveShell;

/// A small shell that runs builtins and external programs connected by pipes
#[derive(Debug, Parser)]
#[command(name = "pipesh")]
#[command(disable_version_flag = true)]
struct CommandLineArgs {
    /// Evaluate the given command instead of reading from the commandline
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,
    /// Do not execute any commands, only check that they parse
    #[arg(short = 'n', long = "no-execute")]
    no_execute: bool,
    /// Print commands before they are executed
    #[arg(short = 'x')]
    print_commands: bool,
    /// Run each stage to completion before starting the next one
    #[arg(long)]
    sequential: bool,
    /// Print the version, platform and revision of pipesh then exit
    #[arg(short = 'v', long)]
    version: bool,
    /// Script to execute, one pipeline per line. Standard input is read when omitted.
    script: Option<PathBuf>,
}

fn main() {
    let command_line_args = CommandLineArgs::parse();

    if command_line_args.version {
        println!("{}", pipesh::version());
        return;
    }

    let mut shell = match Shell::new() {
        Ok(shell) => shell,
        Err(why) => {
            eprintln!("pipesh: could not set up the standard streams: {}", why);
            process::exit(Status::COULD_NOT_EXEC.as_os_code());
        }
    };
    let opts = shell.opts_mut();
    opts.no_exec = command_line_args.no_execute;
    opts.print_comms = command_line_args.print_commands;
    if command_line_args.sequential {
        opts.mode = ExecutionMode::Sequential;
    }

    let status = if let Some(command) = command_line_args.command {
        match shell.execute_command(&command) {
            Ok(Flow::Proceed(status)) | Ok(Flow::Exit(status)) => status,
            Err(why) => {
                shell.report(&why);
                shell.previous_status()
            }
        }
    } else if let Some(path) = command_line_args.script {
        match File::open(&path) {
            Ok(file) => InteractiveShell::new(shell).execute_script(BufReader::new(file)),
            Err(why) => {
                eprintln!("pipesh: {}: {}", path.display(), why);
                Status::NO_SUCH_COMMAND
            }
        }
    } else if atty::is(atty::Stream::Stdin) {
        InteractiveShell::new(shell).execute_interactive()
    } else {
        InteractiveShell::new(shell).execute_script(io::stdin().lock())
    };

    process::exit(status.as_os_code());
}

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use ember_save_cli::{run, CommandKind, CommonOptions, DEFAULT_STORE_DIR};

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let mut options = CommonOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--store" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --store".to_string())?;
                options.store_dir = PathBuf::from(value);
                index += 2;
            }
            _ => break,
        }
    }

    let command = args
        .get(index)
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[(index + 1)..];

    let kind = match command {
        "normalize" => {
            let path = command_args
                .first()
                .ok_or_else(|| "normalize requires a file path".to_string())?;
            let out = match &command_args[1..] {
                [] => None,
                [flag, out] if flag == "--out" => Some(PathBuf::from(out)),
                _ => {
                    return Err(
                        "unknown normalize arguments (expected --out <file>)".to_string()
                    )
                }
            };
            CommandKind::Normalize {
                path: PathBuf::from(path),
                out,
            }
        }
        "inspect" => match command_args {
            [path] => CommandKind::Inspect {
                path: PathBuf::from(path),
            },
            _ => return Err("inspect takes exactly one file path".to_string()),
        },
        "get" => match command_args {
            [user, slot] => CommandKind::Get {
                user: user.clone(),
                slot: slot.clone(),
            },
            _ => return Err("get requires <user> <slot>".to_string()),
        },
        "put" => match command_args {
            [user, slot, path] => CommandKind::Put {
                user: user.clone(),
                slot: slot.clone(),
                path: PathBuf::from(path),
            },
            _ => return Err("put requires <user> <slot> <file>".to_string()),
        },
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    run(kind, &options, &mut io::stdout())
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "emberctl - save slot and payload tool".to_string(),
        String::new(),
        "Usage:".to_string(),
        "  emberctl normalize <file> [--out <file>]".to_string(),
        "  emberctl inspect <file>".to_string(),
        "  emberctl [--store <dir>] get <user> <slot>".to_string(),
        "  emberctl [--store <dir>] put <user> <slot> <file>".to_string(),
        String::new(),
        "Defaults:".to_string(),
        format!("  --store {DEFAULT_STORE_DIR}"),
    ]
    .join("\n")
}

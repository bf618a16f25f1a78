use std::path::PathBuf;

pub const USAGE: &str = "\
usage: tracksync <command> [args]

commands:
  scan [root...]       reconcile the catalog with the given folders (default: configured roots)
  list                 print the catalog
  inspect <file>       show the identity frames stored in a file
  fix-tags <file>...   stamp missing identity frames into files
  config               print the effective settings as TOML
  help                 show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan { roots: Vec<PathBuf> },
    List,
    Inspect(PathBuf),
    FixTags(Vec<PathBuf>),
    Config,
    Help,
}

/// Parse the arguments following the program name. No command means `scan`.
pub fn parse<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(cmd) = args.next() else {
        return Ok(Command::Scan { roots: Vec::new() });
    };
    let rest: Vec<String> = args.collect();

    match cmd.as_str() {
        "scan" => Ok(Command::Scan {
            roots: rest.into_iter().map(PathBuf::from).collect(),
        }),
        "list" => no_args(&cmd, &rest).map(|_| Command::List),
        "config" => no_args(&cmd, &rest).map(|_| Command::Config),
        "inspect" => match rest.as_slice() {
            [file] => Ok(Command::Inspect(PathBuf::from(file))),
            _ => Err("inspect takes exactly one file".to_string()),
        },
        "fix-tags" => {
            if rest.is_empty() {
                Err("fix-tags needs at least one file".to_string())
            } else {
                Ok(Command::FixTags(rest.into_iter().map(PathBuf::from).collect()))
            }
        }
        "help" | "-h" | "--help" => Ok(Command::Help),
        other => Err(format!("unknown command {other:?}")),
    }
}

fn no_args(cmd: &str, rest: &[String]) -> Result<(), String> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(format!("{cmd} takes no arguments"))
    }
}

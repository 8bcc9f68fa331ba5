use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::io::Read;
use std::path::Path;

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::ipc::{send_request, Request};
use crate::registry::CommandRegistry;

/// mark - terminal assistant you can drive from other terminals
#[derive(Parser, Debug)]
#[command(name = "mark")]
#[command(version)]
#[command(about = "Terminal LLM assistant with a remote-control socket")]
#[command(long_about = "mark is a terminal assistant for chatting with a language model.

Run 'mark' to start the TUI in the current directory. While it runs, other
terminals (editors, scripts) in the same directory can drive it with the
subcommands below, e.g.:

  mark add-context-item-file src/main.rs
  git diff | mark add-context-item-text \"Review this diff\" --stdin
  mark run

Set DEBUG=1 to write logs to debug.log.")]
pub struct Cli {
    /// Path to config file (defaults to .mark.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Write a default .mark.toml config file
    #[arg(long)]
    pub init: bool,
}

/// A remote command parsed from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub name: String,
    pub args: Vec<String>,
    /// Append piped standard input to the request
    pub read_stdin: bool,
}

/// Root command with one subcommand per registry entry
pub fn command(registry: &CommandRegistry) -> clap::Command {
    let mut cmd = Cli::command();

    for descriptor in registry.iter() {
        let mut sub = clap::Command::new(descriptor.name).about(descriptor.about);
        for arg_name in descriptor.arg_names {
            sub = sub.arg(Arg::new(*arg_name).required(true));
        }
        if descriptor.accepts_stdin {
            sub = sub.arg(
                Arg::new("stdin")
                    .long("stdin")
                    .action(ArgAction::SetTrue)
                    .help("Append piped standard input to the message"),
            );
        }
        cmd = cmd.subcommand(sub);
    }

    cmd
}

/// Parse `args` against the registry-generated command line
pub fn try_parse_from<I, T>(
    registry: &CommandRegistry,
    args: I,
) -> Result<(Cli, Option<RemoteCommand>), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command(registry).try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let remote = matches
        .subcommand()
        .and_then(|(name, sub)| remote_command(registry, name, sub));
    Ok((cli, remote))
}

/// Parse the process arguments, exiting with usage on error
pub fn parse(registry: &CommandRegistry) -> (Cli, Option<RemoteCommand>) {
    try_parse_from(registry, std::env::args_os()).unwrap_or_else(|e| e.exit())
}

fn remote_command(registry: &CommandRegistry, name: &str, matches: &ArgMatches) -> Option<RemoteCommand> {
    let descriptor = registry.get(name)?;
    let args = descriptor
        .arg_names
        .iter()
        .map(|arg| matches.get_one::<String>(arg).cloned().unwrap_or_default())
        .collect();
    let read_stdin = descriptor.accepts_stdin && matches.get_flag("stdin");

    Some(RemoteCommand {
        name: name.to_string(),
        args,
        read_stdin,
    })
}

/// Build the request for a remote command, checking its arity
pub fn build_request(
    registry: &CommandRegistry,
    remote: &RemoteCommand,
    stdin: Option<String>,
) -> anyhow::Result<Request> {
    registry.check_arity(&remote.name, remote.args.len())?;

    let request = Request::with_args(remote.name.clone(), remote.args.clone());
    Ok(match stdin {
        Some(stdin) => request.stdin(stdin),
        None => request,
    })
}

/// Send one command to the instance running in `working_dir`
pub async fn run_remote_command(
    registry: &CommandRegistry,
    working_dir: &Path,
    remote: &RemoteCommand,
) -> anyhow::Result<()> {
    let stdin = if remote.read_stdin {
        if atty::is(atty::Stream::Stdin) {
            return Err(anyhow!("--stdin needs piped input, but stdin is a terminal"));
        }
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read standard input")?;
        Some(buffer)
    } else {
        None
    };

    let request = build_request(registry, remote, stdin)?;
    send_request(working_dir, &request).await?;
    Ok(())
}

/// Initialize a new config file with the defaults
pub fn init_config(config_path: &str) -> anyhow::Result<()> {
    if Path::new(config_path).exists() {
        println!("Config file '{}' already exists.", config_path);
        return Ok(());
    }

    Config::default()
        .save(config_path)
        .with_context(|| format!("Failed to write config to '{}'", config_path))?;

    println!("Created {}", config_path);
    println!("\nNext steps:");
    println!("  1. Export your API key (OPENAI_API_KEY by default)");
    println!("  2. Run 'mark' to start the TUI");

    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

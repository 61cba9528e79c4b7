//! sash - command-line client for the i3 IPC interface.
//!
//! Thin front-end over `sash-ipc`: typed queries print as pretty JSON,
//! `events` subscribes and streams decoded events to stdout until
//! interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sash_ipc::{Connection, EventMask};

/// i3 IPC command-line client
#[derive(Parser)]
#[command(name = "sash")]
#[command(about = "Query and control a running i3 via its IPC socket")]
#[command(version)]
struct Cli {
    /// Explicit IPC socket path (defaults to $I3SOCK, then
    /// `i3 --get-socketpath`)
    #[arg(long, value_name = "PATH", global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List workspaces
    Workspaces,

    /// List outputs
    Outputs,

    /// Print the layout tree
    Tree,

    /// Print i3's version
    Version,

    /// List configured bar IDs
    Bars,

    /// List currently set marks
    Marks,

    /// Run an i3 command (joined from the remaining arguments)
    #[command(alias = "command")]
    Run {
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Subscribe to events and print them as they arrive
    #[allow(clippy::struct_excessive_bools)] // one flag per event kind
    Events {
        /// Workspace events
        #[arg(long)]
        workspace: bool,

        /// Output events
        #[arg(long)]
        output: bool,

        /// Binding-mode events
        #[arg(long)]
        mode: bool,

        /// Window events
        #[arg(long)]
        window: bool,

        /// Bar-config-update events
        #[arg(long)]
        barconfig: bool,

        /// Binding events
        #[arg(long)]
        binding: bool,
    },
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sash=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[allow(clippy::fn_params_excessive_bools)] // one flag per event kind, mirrors the CLI surface
fn events_mask(
    workspace: bool,
    output: bool,
    mode: bool,
    window: bool,
    barconfig: bool,
    binding: bool,
) -> EventMask {
    let mut mask = EventMask::NONE;
    if workspace {
        mask |= EventMask::WORKSPACE;
    }
    if output {
        mask |= EventMask::OUTPUT;
    }
    if mode {
        mask |= EventMask::MODE;
    }
    if window {
        mask |= EventMask::WINDOW;
    }
    if barconfig {
        mask |= EventMask::BARCONFIG_UPDATE;
    }
    if binding {
        mask |= EventMask::BINDING;
    }
    if mask.is_empty() {
        // No flags means everything.
        mask = EventMask::ALL;
    }
    mask
}

fn run_events(conn: &mut Connection, mask: EventMask) -> Result<()> {
    if !conn.subscribe(mask)? {
        bail!("i3 rejected the subscription");
    }

    conn.on_workspace_event(|ev| {
        let name = ev.current.as_ref().map_or("?", |ws| ws.name.as_str());
        println!("workspace {:?}: {name}", ev.change);
    });
    conn.on_window_event(|ev| {
        let name = ev.container.as_ref().map_or("?", |c| c.name.as_str());
        println!("window {:?}: {name}", ev.change);
    });
    conn.on_output_event(|change| println!("output: {change}"));
    conn.on_mode_event(|mode| println!("mode: {mode}"));
    conn.on_barconfig_update(|| println!("barconfig_update"));
    conn.on_binding_event(|binding| {
        println!(
            "binding {:?} {} -> {}",
            binding.input_type,
            binding.symbol.as_deref().unwrap_or("<none>"),
            binding.command
        );
    });

    conn.start_event_handling()?;
    loop {
        conn.handle_event()?;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let mut conn = match &cli.socket {
        Some(path) => Connection::connect_to(path.clone()),
        None => Connection::connect(),
    }
    .context("failed to connect to i3")?;
    tracing::debug!(socket = %conn.socket_path().display(), "connected");

    match cli.command {
        Commands::Workspaces => print_json(&conn.get_workspaces()?),
        Commands::Outputs => print_json(&conn.get_outputs()?),
        Commands::Tree => print_json(&conn.get_tree()?),
        Commands::Version => print_json(&conn.get_version()?),
        Commands::Bars => print_json(&conn.get_bar_config_ids()?),
        Commands::Marks => print_json(&conn.get_marks()?),
        Commands::Run { command } => {
            let command = command.join(" ");
            let results = conn.send_command_full(&command)?;
            for result in &results {
                if !result.success {
                    if let Some(error) = &result.error {
                        eprintln!("error: {error}");
                    }
                    bail!("command failed: {command}");
                }
            }
            println!("ok");
            Ok(())
        }
        Commands::Events {
            workspace,
            output,
            mode,
            window,
            barconfig,
            binding,
        } => run_events(
            &mut conn,
            events_mask(workspace, output, mode, window, barconfig, binding),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_event_flags_means_all() {
        let mask = events_mask(false, false, false, false, false, false);
        assert_eq!(mask, EventMask::ALL);
    }

    #[test]
    fn test_event_flags_combine() {
        let mask = events_mask(true, false, false, true, false, false);
        assert_eq!(mask, EventMask::WORKSPACE | EventMask::WINDOW);
    }
}

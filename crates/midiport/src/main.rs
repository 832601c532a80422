mod commands;

use clap::{Parser, Subcommand};
use midiport_native::packet::TimestampConvention;
use midiport_types::endpoint_type::EndpointType;

#[derive(Debug, Parser)]
#[command(name = "midiport", version, about = "List MIDI endpoints and send MIDI through them")]
struct Cli {
    /// Override the host's packet timestamp convention (wide or split)
    #[arg(long, global = true)]
    timestamp: Option<TimestampConvention>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the endpoints the MIDI host currently exposes
    List {
        #[arg(long = "type")]
        endpoint_type: Option<EndpointType>,
        #[arg(long)]
        json: bool,
    },
    /// Show one endpoint by id
    Show {
        id: u32,
        #[arg(long)]
        json: bool,
    },
    /// Send one MIDI message, given as hex bytes, to an output endpoint
    Send {
        id: u32,
        #[arg(required = true, num_args = 1..)]
        bytes: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Starting midiport");

    let cli = Cli::parse();
    let session = commands::open_session(cli.timestamp)?;

    match cli.command {
        Command::List {
            endpoint_type,
            json,
        } => commands::list(&session, endpoint_type, json),
        Command::Show { id, json } => commands::show(&session, id, json),
        Command::Send { id, bytes } => commands::send(&session, id, &bytes),
    }
}

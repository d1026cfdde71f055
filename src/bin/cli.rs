//! proglog CLI Client
//!
//! Command-line interface for interacting with a proglog server.

use clap::{Parser, Subcommand};
use proglog::network::Client;

/// proglog CLI
#[derive(Parser, Debug)]
#[command(name = "proglog-cli")]
#[command(about = "CLI for the proglog commit log")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a record
    Produce {
        /// The record to append
        record: String,
    },

    /// Read the record at an offset
    Consume {
        /// The offset to read
        offset: u64,
    },

    /// Show the retained offset range
    Offsets,

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("(error) could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Produce { record } => client
            .produce(record.as_bytes())
            .map(|offset| format!("offset {}", offset)),
        Commands::Consume { offset } => client
            .consume(offset)
            .map(|record| String::from_utf8_lossy(&record).into_owned()),
        Commands::Offsets => client
            .offsets()
            .map(|(lowest, next)| format!("[{}, {})", lowest, next)),
        Commands::Ping => client.ping().map(|_| "PONG".to_string()),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) if e.is_not_found() => {
            println!("(not found) {}", e);
            std::process::exit(2);
        }
        Err(e) => {
            let hint = if e.is_retryable() { " (retry may help)" } else { "" };
            eprintln!("(error) {}{}", e, hint);
            std::process::exit(1);
        }
    }
}

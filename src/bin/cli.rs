//! NimbusKV CLI Client
//!
//! Command-line interface for interacting with NimbusKV.

use clap::{Parser, Subcommand};
use nimbuskv::{
    Client, ElementFilter, Key, Operations, Record, RemovePolicy, Result, Value, WritePolicy,
};

/// NimbusKV CLI
#[derive(Parser, Debug)]
#[command(name = "nimbuskv-cli")]
#[command(about = "CLI for the NimbusKV record store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Namespace of the key
    #[arg(short, long, default_value = "test")]
    namespace: String,

    /// Set of the key
    #[arg(long, default_value = "demo")]
    set: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Read a record, or only the named bins
    Get {
        key: String,

        /// Bins to select
        bins: Vec<String>,
    },

    /// Write one bin
    Put {
        key: String,
        bin: String,
        value: String,

        /// Only write if the record has this generation
        #[arg(long)]
        generation: Option<u32>,

        /// TTL in seconds (0 uses the namespace default)
        #[arg(long, default_value = "0")]
        ttl: u32,

        /// Store the user key with the record
        #[arg(long)]
        send_key: bool,
    },

    /// Show generation and TTL of a record
    Exists { key: String },

    /// Delete a record
    Remove {
        key: String,

        /// Only delete if the record has this generation
        #[arg(long)]
        generation: Option<u32>,
    },

    /// Add to an integer bin
    Incr {
        key: String,
        bin: String,

        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },

    /// Append to a string bin
    Append {
        key: String,
        bin: String,
        value: String,
    },

    /// Prepend to a string bin
    Prepend {
        key: String,
        bin: String,
        value: String,
    },

    /// Large ordered list operations
    Llist {
        #[command(subcommand)]
        command: ListCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ListCommands {
    /// Insert an element
    Add {
        key: String,
        bin: String,
        value: String,
    },

    /// Remove one equal element
    Remove {
        key: String,
        bin: String,
        value: String,
    },

    /// Number of elements
    Size { key: String, bin: String },

    /// Elements in sorted order, optionally within [min, max]
    Filter {
        key: String,
        bin: String,

        #[arg(long, allow_hyphen_values = true)]
        min: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        max: Option<String>,
    },

    /// Drop the whole list
    Destroy { key: String, bin: String },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut client = Client::connect(&args.server)?;
    let key = |user_key: &str| Key::new(args.namespace.as_str(), args.set.as_str(), user_key);

    match &args.command {
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Get { key: k, bins } => {
            let record = if bins.is_empty() {
                client.get(&key(k))?
            } else {
                let names: Vec<&str> = bins.iter().map(String::as_str).collect();
                client.select(&key(k), &names)?
            };
            print_record(&record);
        }
        Commands::Put {
            key: k,
            bin,
            value,
            generation,
            ttl,
            send_key,
        } => {
            let mut policy = WritePolicy::new();
            if let Some(generation) = generation {
                policy = policy.generation_eq(*generation);
            }
            if *send_key {
                policy = policy.send_key();
            }
            let record = Record::new()
                .with_bin(bin.as_str(), parse_value(value))
                .with_ttl(*ttl);
            let generation = client.put(&key(k), &record, &policy)?;
            println!("OK (generation {})", generation);
        }
        Commands::Exists { key: k } => {
            let metadata = client.exists(&key(k))?;
            println!("generation={} ttl={}", metadata.generation, metadata.ttl);
        }
        Commands::Remove { key: k, generation } => {
            let policy = match generation {
                Some(generation) => RemovePolicy::new().generation_eq(*generation),
                None => RemovePolicy::new(),
            };
            client.remove(&key(k), &policy)?;
            println!("OK");
        }
        Commands::Incr { key: k, bin, delta } => {
            let ops = Operations::new().incr(bin.as_str(), *delta).read(bin.as_str());
            let record = client.operate(&key(k), &ops, &WritePolicy::new())?;
            print_operated(record);
        }
        Commands::Append { key: k, bin, value } => {
            let ops = Operations::new()
                .append(bin.as_str(), value.as_str())
                .read(bin.as_str());
            let record = client.operate(&key(k), &ops, &WritePolicy::new())?;
            print_operated(record);
        }
        Commands::Prepend { key: k, bin, value } => {
            let ops = Operations::new()
                .prepend(bin.as_str(), value.as_str())
                .read(bin.as_str());
            let record = client.operate(&key(k), &ops, &WritePolicy::new())?;
            print_operated(record);
        }
        Commands::Llist { command } => run_llist(&mut client, command, key)?,
    }

    Ok(())
}

fn run_llist(client: &mut Client, command: &ListCommands, key: impl Fn(&str) -> Key) -> Result<()> {
    match command {
        ListCommands::Add { key: k, bin, value } => {
            client.llist_add(&key(k), bin, parse_value(value))?;
            println!("OK");
        }
        ListCommands::Remove { key: k, bin, value } => {
            client.llist_remove(&key(k), bin, parse_value(value))?;
            println!("OK");
        }
        ListCommands::Size { key: k, bin } => {
            println!("{}", client.llist_size(&key(k), bin)?);
        }
        ListCommands::Filter { key: k, bin, min, max } => {
            let filter = match (min, max) {
                (None, None) => None,
                (min, max) => Some(ElementFilter::Range {
                    min: min.as_deref().map(parse_value),
                    max: max.as_deref().map(parse_value),
                }),
            };
            for value in client.llist_filter(&key(k), bin, filter.as_ref())? {
                println!("{}", value);
            }
        }
        ListCommands::Destroy { key: k, bin } => {
            client.llist_destroy(&key(k), bin)?;
            println!("OK");
        }
    }

    Ok(())
}

/// Integers are sent as integers, everything else as a string
fn parse_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::Integer(n),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn print_record(record: &Record) {
    println!("generation={} ttl={}", record.generation, record.ttl);
    if let Some(user_key) = &record.key {
        println!("key={}", user_key);
    }
    for (name, value) in record.bins() {
        println!("  {} = {}", name, value);
    }
}

fn print_operated(record: Option<Record>) {
    match record {
        Some(record) => print_record(&record),
        None => println!("OK"),
    }
}

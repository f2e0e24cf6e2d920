//! `keyspace-cli`: an interactive REPL client for the keyspace server.
//!
//! Grounded on the original project's `CLI`/`main.cpp`: connect, then either
//! run one command non-interactively (trailing arguments) or drop into a
//! read-send-print loop supporting `help`, `quit`, and `exit`.

use std::io::{self, Write};

use clap::Parser;
use keyspace_cli::repl::{split_args, Client};

#[derive(Parser, Debug)]
#[command(name = "keyspace-cli")]
#[command(author, version, about = "Interactive client for the keyspace server")]
struct Cli {
    /// Server host.
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(short, long, default_value_t = 6379)]
    port: u16,

    /// A single command to run non-interactively; omit to enter the REPL.
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let mut client = match Client::connect(&cli.host, cli.port) {
        Ok(client) => client,
        Err(err) => {
            eprintln!(
                "(error) could not connect to {}:{}: {err}",
                cli.host, cli.port
            );
            std::process::exit(1);
        }
    };

    if !cli.command.is_empty() {
        match client.execute(&cli.command) {
            Ok(reply) => println!("{reply}"),
            Err(err) => eprintln!("(error) {err}"),
        }
        return Ok(());
    }

    println!("Connected to keyspace server at {}:{}", cli.host, cli.port);
    let stdin = io::stdin();
    loop {
        print!("{}:{}> ", cli.host, cli.port);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            println!("Goodbye!");
            break;
        }
        if line == "help" {
            println!("Enter a command, e.g. SET key value, GET key, DEL key. quit/exit to leave.");
            continue;
        }

        let args = split_args(line);
        if args.is_empty() {
            continue;
        }
        match client.execute(&args) {
            Ok(reply) => println!("{reply}"),
            Err(err) => {
                eprintln!("(error) failed to send command: {err}");
                break;
            }
        }
    }
    Ok(())
}

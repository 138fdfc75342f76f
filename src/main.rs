use std::io::{self, BufRead, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use keybasectl::lookup::{Client, LookupError, lookup};
use keybasectl::query::{DEFAULT_API_BASE, LookupKind};

const USER_ENV: &str = "KEYBASECTL_USER";

#[derive(Parser)]
#[command(
    name = "keybasectl",
    version,
    about = "Look up usernames and their public keys on keybase.io",
    after_help = "All usernames are sent to the Keybase user lookup API in a single \
                  request per lookup. Users are looked up first; public keys are only \
                  checked once every user was found.\n\n\
                  Exit status is 0 when everything was found, 1 when something was \
                  missing or the API could not be queried, and 2 on usage errors."
)]
struct Cli {
    /// Usernames to look up (also reads from stdin)
    users: Vec<String>,

    /// Comma-separated usernames to look up
    #[arg(short, long, env = USER_ENV, value_delimiter = ',')]
    user: Vec<String>,

    /// Turn on debug logging to stderr
    #[arg(short, long)]
    debug: bool,

    /// Keybase API endpoint to target
    #[arg(long, env = "KEYBASECTL_API_ENDPOINT", default_value = DEFAULT_API_BASE)]
    api: String,

    /// Suppress output, exit code only
    #[arg(short, long)]
    quiet: bool,

    /// Only check that users exist, skip the public key lookup
    #[arg(long)]
    skip_keys: bool,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("keybasectl=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();
}

/// Run one lookup and print a line per username. Returns whether every
/// username was found.
fn lookup_and_report(client: &Client, names: &[String], kind: LookupKind, quiet: bool) -> bool {
    let (found_label, missing_label) = if kind == LookupKind::PublicKey {
        ("key found", "key not found")
    } else {
        ("found", "not found")
    };

    let classification = match lookup(client, names, kind) {
        Ok(c) => c,
        Err(LookupError::NotFound(e)) => {
            error!(%kind, "{e}");
            e.into_classification()
        }
        Err(e) => {
            error!(%kind, "lookup failed: {e}");
            eprintln!("error: {e}");
            return false;
        }
    };

    if !quiet {
        for name in names {
            let label = if classification.found().contains(name) {
                found_label
            } else {
                missing_label
            };
            println!("{name}\t{label}");
        }
    }

    classification.is_complete()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);
    info!("starting engines");

    let mut names: Vec<String> = cli.user;
    names.extend(cli.users);

    // Fall back to stdin only when nothing was given on the command line
    if names.is_empty() && !io::stdin().is_terminal() {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(l) => names.push(l),
                Err(e) => {
                    eprintln!("error: reading stdin: {e}");
                    return ExitCode::from(2);
                }
            }
        }
    }

    let mut names: Vec<String> = names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    // Deduplicate while preserving order
    let mut seen = std::collections::HashSet::new();
    names.retain(|n| seen.insert(n.clone()));

    if names.is_empty() {
        error!(env = USER_ENV, "required flag or environment variable not set");
        eprintln!("error: no usernames provided");
        eprintln!("usage: keybasectl [OPTIONS] --user <USER,...> (or set {USER_ENV})");
        return ExitCode::from(2);
    }

    let client = Client::with_base_url(cli.api);
    info!(api = client.base_url(), users = names.len(), "looking up");

    let mut all_found = lookup_and_report(&client, &names, LookupKind::Identity, cli.quiet);
    if all_found && !cli.skip_keys {
        all_found = lookup_and_report(&client, &names, LookupKind::PublicKey, cli.quiet);
    }

    info!("stopping engines, we're done");
    if all_found {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

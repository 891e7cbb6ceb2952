mod core;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::codec::{self, DecodeError};
use crate::core::draw::{self, Pairing};
use crate::core::roster::Participant;
use crate::core::roster_file::{RosterFile, DEFAULT_ROSTER_FILE};
use crate::core::{config, export};

#[derive(Parser)]
#[command(
    name = "santa",
    version,
    about = "Draw Secret Santa pairings and share them as links"
)]
struct Cli {
    /// Roster file to operate on
    #[arg(long, global = true, env = "SANTA_ROSTER", default_value = DEFAULT_ROSTER_FILE)]
    roster: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty roster file
    Init {
        /// Replace an existing roster
        #[arg(long)]
        force: bool,
    },

    /// Add a participant
    Add {
        /// Display name (duplicates are allowed)
        name: String,
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Remove a participant (and any exclusions pointing at them)
    #[command(alias = "rm")]
    Remove {
        /// Participant id or unique name
        who: String,
    },

    /// Forbid a giver from drawing one or more receivers
    Exclude {
        /// Giver id or unique name
        giver: String,
        /// Receiver ids or unique names
        #[arg(required = true)]
        receivers: Vec<String>,
    },

    /// Lift exclusions previously set with `exclude`
    Include {
        /// Giver id or unique name
        giver: String,
        /// Receiver ids or unique names
        #[arg(required = true)]
        receivers: Vec<String>,
    },

    /// List participants and their exclusions
    #[command(alias = "ls")]
    List,

    /// Draw pairings for the current roster
    Draw {
        /// Show who each giver drew
        #[arg(long)]
        reveal: bool,
        /// Print one share link for the whole draw
        #[arg(long)]
        share: bool,
        /// Print one single-pairing share link per giver
        #[arg(long)]
        each: bool,
        /// Carry email addresses in share links
        #[arg(long)]
        contacts: bool,
        /// Write a receivers-only CSV
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Seed the shuffle for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the pairings inside a share link or token
    Reveal {
        /// Share link or bare token
        token: String,
        /// Write a receivers-only CSV
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },

    /// Read or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective value of a key
    Get { key: String },
    /// Store a value in the config file
    Set { key: String, value: String },
    /// Remove a value from the config file
    Unset { key: String },
    /// List values stored in the config file
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let roster = cli.roster.as_path();
    match cli.command {
        Commands::Init { force } => cmd_init(roster, force)?,
        Commands::Add { name, email } => cmd_add(roster, &name, email.as_deref())?,
        Commands::Remove { who } => cmd_remove(roster, &who)?,
        Commands::Exclude { giver, receivers } => cmd_exclude(roster, &giver, &receivers)?,
        Commands::Include { giver, receivers } => cmd_include(roster, &giver, &receivers)?,
        Commands::List => cmd_list(roster)?,
        Commands::Draw {
            reveal,
            share,
            each,
            contacts,
            csv,
            seed,
        } => cmd_draw(
            roster,
            &DrawOpts {
                reveal,
                share,
                each,
                contacts,
                csv: csv.as_deref(),
                seed,
            },
        )?,
        Commands::Reveal { token, csv } => cmd_reveal(&token, csv.as_deref())?,
        Commands::Config { command } => cmd_config(command)?,
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for tokens and links.
/// `RUST_LOG` wins over the configured level; `-v` wins over both.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config::log_level()))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    let file = RosterFile::init(path, force)?;
    println!("Initialized empty roster in {}", file.path.display());
    Ok(())
}

fn cmd_add(path: &Path, name: &str, email: Option<&str>) -> Result<()> {
    let mut file = RosterFile::open(path)?;
    let duplicate = file.roster.participants.iter().any(|p| p.name == name.trim());
    let participant = file.roster.add(name, email)?.clone();
    file.save()?;

    println!("Added '{}' ({})", participant.name, participant.id);
    if duplicate {
        println!("  note: another participant is also named '{}'; refer to them by id", participant.name);
    }
    Ok(())
}

fn cmd_remove(path: &Path, who: &str) -> Result<()> {
    let mut file = RosterFile::open(path)?;
    let id = file.roster.resolve(who)?.id.clone();
    let removed = file.roster.remove(&id)?;
    file.save()?;
    println!("Removed '{}' ({})", removed.name, removed.id);
    Ok(())
}

fn cmd_exclude(path: &Path, giver: &str, receivers: &[String]) -> Result<()> {
    let mut file = RosterFile::open(path)?;
    let giver = file.roster.resolve(giver)?.clone();
    let receivers = resolve_all(&file, receivers)?;
    if receivers.iter().any(|r| r.id == giver.id) {
        bail!("a participant cannot exclude themselves (they never draw themselves anyway)");
    }

    let mut report = Vec::with_capacity(receivers.len());
    for receiver in &receivers {
        let added = file.roster.exclude(&giver.id, &receiver.id)?;
        report.push((receiver, added));
    }
    file.save()?;

    for (receiver, added) in report {
        if added {
            println!("'{}' will never draw '{}'", giver.name, receiver.name);
        } else {
            println!("'{}' already excludes '{}'", giver.name, receiver.name);
        }
    }
    Ok(())
}

fn cmd_include(path: &Path, giver: &str, receivers: &[String]) -> Result<()> {
    let mut file = RosterFile::open(path)?;
    let giver = file.roster.resolve(giver)?.clone();
    let receivers = resolve_all(&file, receivers)?;

    let mut report = Vec::with_capacity(receivers.len());
    for receiver in &receivers {
        let lifted = file.roster.include(&giver.id, &receiver.id)?;
        report.push((receiver, lifted));
    }
    file.save()?;

    for (receiver, lifted) in report {
        if lifted {
            println!("'{}' may draw '{}' again", giver.name, receiver.name);
        } else {
            println!("'{}' did not exclude '{}'", giver.name, receiver.name);
        }
    }
    Ok(())
}

/// Resolve every name up front so a typo leaves the roster untouched.
fn resolve_all(file: &RosterFile, who: &[String]) -> Result<Vec<Participant>> {
    who.iter()
        .map(|w| file.roster.resolve(w).cloned())
        .collect()
}

fn cmd_list(path: &Path) -> Result<()> {
    let file = RosterFile::open(path)?;
    let roster = &file.roster;

    if roster.is_empty() {
        println!("No participants. Add one with: santa add <name>");
        return Ok(());
    }

    println!("{:<10} {:<20} {:<28} {}", "ID", "NAME", "EMAIL", "NEVER DRAWS");
    println!("{}", "-".repeat(76));
    for p in &roster.participants {
        println!(
            "{:<10} {:<20} {:<28} {}",
            p.id,
            p.name,
            p.email.as_deref().unwrap_or("-"),
            roster.names_of(&p.exclusions).join(", ")
        );
    }
    println!("\n{} participant(s)", roster.len());
    Ok(())
}

struct DrawOpts<'a> {
    reveal: bool,
    share: bool,
    each: bool,
    contacts: bool,
    csv: Option<&'a Path>,
    seed: Option<u64>,
}

fn cmd_draw(path: &Path, opts: &DrawOpts) -> Result<()> {
    let file = RosterFile::open(path)?;
    let participants = &file.roster.participants;
    if participants.len() < 2 {
        bail!(
            "need at least 2 participants to draw (have {})",
            participants.len()
        );
    }

    let max_attempts = config::max_attempts();
    let pairings = match opts.seed {
        Some(seed) => {
            draw::draw_with_rng(participants, max_attempts, &mut StdRng::seed_from_u64(seed))?
        }
        None => draw::draw(participants, max_attempts)?,
    };
    if cfg!(debug_assertions) {
        draw::validate(participants, &pairings).context("drew an invalid assignment")?;
    }

    print_pairings(&pairings, opts.reveal);

    if opts.share || opts.each {
        let base = config::share_base_url();
        if opts.share {
            let token = if opts.contacts {
                codec::encode_with_contacts(&pairings)
            } else {
                codec::encode(&pairings)
            };
            println!("\nShare link: {}", codec::share_link(&base, &token));
        }
        if opts.each {
            println!("\nPersonal links:");
            for pairing in &pairings {
                let token = if opts.contacts {
                    codec::encode_with_contacts(std::slice::from_ref(pairing))
                } else {
                    codec::encode_one(pairing)
                };
                println!("  {}: {}", pairing.giver.name, codec::share_link(&base, &token));
            }
        }
    }

    if let Some(csv) = opts.csv {
        export::write_receivers_csv(csv, &pairings)?;
        println!("\nWrote {} receiver(s) to {}", pairings.len(), csv.display());
    }

    Ok(())
}

fn cmd_reveal(input: &str, csv: Option<&Path>) -> Result<()> {
    let pairings = match codec::decode(input) {
        Ok(pairings) => pairings,
        Err(DecodeError::Missing) => {
            bail!("no pairings data found in the link. Start a new draw with `santa init`.")
        }
        Err(err @ DecodeError::Malformed(_)) => {
            tracing::debug!(%err, "decode failed");
            bail!("failed to decode pairings from the link. Start a new draw with `santa init`.")
        }
    };

    print_pairings(&pairings, true);

    if let Some(csv) = csv {
        export::write_receivers_csv(csv, &pairings)?;
        println!("\nWrote {} receiver(s) to {}", pairings.len(), csv.display());
    }
    Ok(())
}

fn print_pairings(pairings: &[Pairing], reveal: bool) {
    println!("Secret Santa pairings ({})", pairings.len());
    for p in pairings {
        if reveal {
            println!("  {} gives a gift to: {}", p.giver.name, p.receiver.name);
        } else {
            println!("  {} gives a gift to: (hidden)", p.giver.name);
        }
    }
    if !reveal {
        println!("Run with --reveal to show receivers.");
    }
}

fn cmd_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Get { key } => match config::get(&key) {
            Some(value) => println!("{}", value),
            None => bail!("'{}' is not set", key),
        },
        ConfigCommands::Set { key, value } => {
            config::set(&key, &value)?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Unset { key } => {
            config::unset(&key)?;
            println!("Unset {}", key);
        }
        ConfigCommands::List => {
            let values = config::list();
            if values.is_empty() {
                println!("No settings in {}", config::config_path().display());
            }
            for (key, value) in values {
                println!("{} = {}", key, value);
            }
        }
    }
    Ok(())
}

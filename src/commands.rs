//! Command layer
//!
//! Thin glue between parsed arguments and [`ScalewayClient`]. This is where
//! ambiguous names become errors: resolution itself never guesses.

use crate::api::types::{Bootscript, Image, Server, Snapshot};
use crate::api::{ScalewayClient, ServerAction, ServerDefinition};
use crate::cache::ResourceKind;
use anyhow::{bail, Result};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List servers
    Ps {
        /// Show all servers (default shows just running)
        #[arg(short, long)]
        all: bool,
        /// Show at most N servers (0 for no limit)
        #[arg(short = 'n', long, default_value_t = 0)]
        limit: usize,
        /// Only display identifiers
        #[arg(short, long)]
        quiet: bool,
    },
    /// List images
    Images {
        #[arg(short, long)]
        quiet: bool,
    },
    /// List snapshots
    Snapshots {
        #[arg(short, long)]
        quiet: bool,
    },
    /// List bootscripts
    Bootscripts {
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show the full description of one or more resources
    Inspect {
        /// server, image, snapshot or bootscript
        kind: ResourceKind,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print every identifier matching a name, identifier or prefix
    Resolve {
        kind: ResourceKind,
        needle: String,
    },
    /// Power on servers
    Start {
        #[arg(required = true)]
        servers: Vec<String>,
    },
    /// Power off servers
    Stop {
        #[arg(required = true)]
        servers: Vec<String>,
    },
    /// Reboot servers
    Reboot {
        #[arg(required = true)]
        servers: Vec<String>,
    },
    /// Create a server from an image
    Create {
        /// Name of the new server
        #[arg(long)]
        name: String,
        /// Bootscript to use instead of the image default
        #[arg(long)]
        bootscript: Option<String>,
        /// Image name, identifier or prefix
        image: String,
    },
}

impl Command {
    /// True if the command posts to the API on behalf of an organization
    pub fn needs_organization(&self) -> bool {
        matches!(self, Command::Create { .. })
    }
}

/// Run a command against the client
pub async fn run(client: &mut ScalewayClient, command: Command) -> Result<()> {
    match command {
        Command::Ps { all, limit, quiet } => {
            let servers = client.list_servers(all, limit).await?;
            print_servers(&servers, quiet);
        }
        Command::Images { quiet } => {
            let images = client.list_images().await?;
            print_images(&images, quiet);
        }
        Command::Snapshots { quiet } => {
            let snapshots = client.list_snapshots().await?;
            print_snapshots(&snapshots, quiet);
        }
        Command::Bootscripts { quiet } => {
            let bootscripts = client.list_bootscripts().await?;
            print_bootscripts(&bootscripts, quiet);
        }
        Command::Inspect { kind, names } => {
            let mut described = Vec::with_capacity(names.len());
            for name in &names {
                let id = resolve_one(client, kind, name).await?;
                described.push(client.inspect(kind, &id).await?);
            }
            println!("{}", serde_json::to_string_pretty(&described)?);
        }
        Command::Resolve { kind, needle } => {
            for id in client.resolve(kind, &needle).await? {
                let name = client.cache().index(kind).name_of(&id).unwrap_or_default();
                println!("{}\t{}", id, name);
            }
        }
        Command::Start { servers } => power(client, &servers, ServerAction::Poweron).await?,
        Command::Stop { servers } => power(client, &servers, ServerAction::Poweroff).await?,
        Command::Reboot { servers } => power(client, &servers, ServerAction::Reboot).await?,
        Command::Create {
            name,
            bootscript,
            image,
        } => {
            let image = resolve_one(client, ResourceKind::Image, &image).await?;
            let bootscript = match bootscript {
                Some(needle) => Some(resolve_one(client, ResourceKind::Bootscript, &needle).await?),
                None => None,
            };

            let id = client
                .create_server(ServerDefinition {
                    name,
                    image,
                    bootscript,
                    ..ServerDefinition::default()
                })
                .await?;
            println!("{}", id);
        }
    }

    Ok(())
}

/// Resolve a needle that must designate exactly one resource
pub async fn resolve_one(
    client: &mut ScalewayClient,
    kind: ResourceKind,
    needle: &str,
) -> Result<String> {
    let ids = client.resolve(kind, needle).await?;

    let mut iter = ids.iter();
    match (iter.next(), iter.next()) {
        (Some(id), None) => Ok(id.clone()),
        (None, _) => bail!("No such {}: {}", kind, needle),
        _ => {
            let index = client.cache().index(kind);
            let candidates: Vec<String> = ids
                .iter()
                .map(|id| format!("  {} {}", id, index.name_of(id).unwrap_or_default()))
                .collect();
            bail!(
                "Too many candidates for {} '{}' ({}):\n{}",
                kind,
                needle,
                ids.len(),
                candidates.join("\n")
            )
        }
    }
}

/// Post the same action on every named server, reporting failures at the end
async fn power(client: &mut ScalewayClient, needles: &[String], action: ServerAction) -> Result<()> {
    let mut failures = 0;

    for needle in needles {
        let outcome = match resolve_one(client, ResourceKind::Server, needle).await {
            Ok(id) => client.server_action(&id, action).await.map_err(Into::into),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => println!("{}", needle),
            Err(e) => {
                eprintln!("{}: {:#}", needle, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} server(s) failed", failures, needles.len());
    }
    Ok(())
}

fn print_servers(servers: &[Server], quiet: bool) {
    if !quiet {
        println!("SERVER ID\tIMAGE\tSTATE\tPUBLIC IP\tNAME");
    }
    for server in servers {
        if quiet {
            println!("{}", server.id);
            continue;
        }
        let ip = server
            .public_ip
            .as_ref()
            .map(|ip| ip.address.as_str())
            .unwrap_or("-");
        println!(
            "{}\t{}\t{}\t{}\t{}",
            server.id, server.image.name, server.state, ip, server.name
        );
    }
}

fn print_images(images: &[Image], quiet: bool) {
    if !quiet {
        println!("IMAGE ID\tCREATED\tSIZE\tNAME");
    }
    for image in images {
        if quiet {
            println!("{}", image.id);
        } else {
            println!(
                "{}\t{}\t{}\t{}",
                image.id, image.creation_date, image.root_volume.size, image.name
            );
        }
    }
}

fn print_snapshots(snapshots: &[Snapshot], quiet: bool) {
    if !quiet {
        println!("SNAPSHOT ID\tSTATE\tSIZE\tNAME");
    }
    for snapshot in snapshots {
        if quiet {
            println!("{}", snapshot.id);
        } else {
            println!(
                "{}\t{}\t{}\t{}",
                snapshot.id, snapshot.state, snapshot.size, snapshot.name
            );
        }
    }
}

fn print_bootscripts(bootscripts: &[Bootscript], quiet: bool) {
    if !quiet {
        println!("BOOTSCRIPT ID\tKERNEL\tTITLE");
    }
    for bootscript in bootscripts {
        if quiet {
            println!("{}", bootscript.id);
        } else {
            println!(
                "{}\t{}\t{}",
                bootscript.id, bootscript.kernel.title, bootscript.title
            );
        }
    }
}

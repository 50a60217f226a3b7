//! Pack subcommands.

use std::io::Write;

use clap::Subcommand;
use contentpack::loader::PackLoader;
use contentpack::pack::Pack;

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List resolved packs
    List {
        /// Only show enabled packs
        #[arg(long)]
        enabled: bool,
    },
    /// Show details for one pack
    Info {
        /// Pack identity
        id: String,
    },
    /// Enable a pack
    Enable {
        /// Pack identity
        id: String,
    },
    /// Disable a pack
    Disable {
        /// Pack identity
        id: String,
    },
    /// List files across all packs
    Find {
        /// Path prefix, e.g. `textures/`
        #[arg(default_value = "")]
        prefix: String,
        /// Only files with this extension
        #[arg(long)]
        ext: Option<String>,
    },
    /// Print a file from the first pack that has it
    Cat {
        /// Path inside the pack
        path: String,
    },
    /// Write a bundled pack into the pack root
    Provision {
        /// Bundled pack name
        #[arg(default_value = "starter")]
        name: String,
    },
}

/// Run a subcommand, writing human-readable output to `out`.
pub fn run(command: Command, loader: &mut PackLoader, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::List { enabled } => list(loader, enabled, out),
        Command::Info { id } => info(loader, &id, out),
        Command::Enable { id } => set_enabled(loader, &id, true, out),
        Command::Disable { id } => set_enabled(loader, &id, false, out),
        Command::Find { prefix, ext } => {
            for name in loader.find(&prefix, ext.as_deref()) {
                writeln!(out, "{}", name)?;
            }
            Ok(())
        }
        Command::Cat { path } => {
            let bytes = loader
                .open_resource(&path)
                .ok_or(CliError::ResourceNotFound(path))?;
            out.write_all(&bytes)?;
            Ok(())
        }
        Command::Provision { name } => {
            let root = loader.config().root.clone();
            match loader.provision(&name)? {
                Some(pack) => writeln!(out, "Provisioned {} into {}", pack, root.display())?,
                None => writeln!(out, "{} is already present in {}", name, root.display())?,
            }
            Ok(())
        }
    }
}

fn list(loader: &PackLoader, enabled_only: bool, out: &mut impl Write) -> Result<(), CliError> {
    let packs = loader.packs();
    if packs.is_empty() {
        writeln!(out, "No packs in {}", loader.config().root.display())?;
        return Ok(());
    }

    for pack in packs.iter().filter(|p| !enabled_only || p.enabled()) {
        writeln!(
            out,
            "{} {:<32} {:<12} {:<9} {}",
            if pack.enabled() { "*" } else { " " },
            pack.id(),
            pack.version(),
            pack.kind(),
            pack.display_name()
        )?;
    }
    Ok(())
}

fn info(loader: &PackLoader, id: &str, out: &mut impl Write) -> Result<(), CliError> {
    let pack = find_pack(loader, id)?;
    let manifest = pack.manifest();

    writeln!(out, "Id:           {}", pack.id())?;
    writeln!(out, "Name:         {}", pack.display_name())?;
    if !manifest.author.is_empty() {
        writeln!(out, "Author:       {}", manifest.author)?;
    }
    writeln!(out, "Version:      {}", pack.version())?;
    if let Some(build) = manifest.target_build {
        writeln!(out, "Target build: {}", build)?;
    }
    writeln!(out, "Kind:         {}", pack.kind())?;
    writeln!(out, "Path:         {}", pack.path().display())?;
    writeln!(out, "Enabled:      {}", pack.enabled())?;
    writeln!(out, "Files:        {}", pack.find("", None).len())?;
    Ok(())
}

fn set_enabled(
    loader: &PackLoader,
    id: &str,
    enabled: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let pack = find_pack(loader, id)?;
    let state = if enabled { "enabled" } else { "disabled" };
    if pack.set_enabled(enabled) {
        writeln!(out, "{} {}", pack.id(), state)?;
    } else {
        writeln!(out, "{} is already {}", pack.id(), state)?;
    }
    Ok(())
}

fn find_pack<'a>(loader: &'a PackLoader, id: &str) -> Result<&'a Pack, CliError> {
    loader
        .get(id)
        .ok_or_else(|| CliError::PackNotFound(id.to_string()))
}

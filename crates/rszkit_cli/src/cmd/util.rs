use std::path::PathBuf;

use rszkit::rsz::{ClassRegistry, GameProfile, Result, RszError};

/// Schema selection shared by every container command.
#[derive(clap::Args)]
pub struct SchemaArgs {
	/// Game identifier, for example `re4`.
	#[arg(long)]
	pub game: String,
	/// Override the game's default TDB version.
	#[arg(long)]
	pub tdb: Option<u32>,
	/// Class descriptor JSON dump.
	#[arg(long)]
	pub registry: PathBuf,
}

impl SchemaArgs {
	/// Resolve the profile and load the class registry.
	pub(crate) fn load(&self) -> Result<(GameProfile, ClassRegistry)> {
		let mut profile = GameProfile::for_game(&self.game)?;
		if let Some(tdb) = self.tdb {
			profile = profile.with_tdb_version(tdb);
		}
		let registry = ClassRegistry::from_json_path(&self.registry)?;
		log::debug!("loaded {} classes for {} (tdb {})", registry.len(), profile.game, profile.tdb_version);
		Ok((profile, registry))
	}
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn emit_json<T: serde::Serialize>(value: &T) -> Result<()> {
	let text = serde_json::to_string_pretty(value).map_err(RszError::JsonOutput)?;
	println!("{text}");
	Ok(())
}

/// Render a type id or hash as `0x`-prefixed hex.
pub(crate) fn hex32(value: u32) -> String {
	format!("0x{value:08x}")
}

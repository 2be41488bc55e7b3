use crate::rsz::{Result, RszError};

/// Schema version below which user data is stored as embedded RSZ blocks.
pub const LEGACY_USER_DATA_BELOW: u32 = 67;

/// Per-game schema (TDB) version and file naming conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameProfile {
	/// Short game identifier such as `re4`.
	pub game: Box<str>,
	/// Type database version that drives the on-disk layout.
	pub tdb_version: u32,
}

const KNOWN_GAMES: &[(&str, u32)] = &[
	("re2", 70),
	("re3", 68),
	("re4", 71),
	("re7", 49),
	("re8", 69),
	("dmc5", 67),
	("mhrise", 71),
	("sf6", 71),
];

impl GameProfile {
	/// Resolve a known game identifier (case-insensitive) to its default schema version.
	pub fn for_game(game: &str) -> Result<Self> {
		let key = game.to_ascii_lowercase();
		let (name, tdb_version) = KNOWN_GAMES
			.iter()
			.find(|(name, _)| *name == key)
			.ok_or_else(|| RszError::UnknownGame { name: game.to_owned() })?;
		Ok(Self {
			game: (*name).into(),
			tdb_version: *tdb_version,
		})
	}

	/// Override the schema version, for builds that shipped a different TDB.
	pub fn with_tdb_version(mut self, tdb_version: u32) -> Self {
		self.tdb_version = tdb_version;
		self
	}

	/// Identifiers accepted by [`GameProfile::for_game`].
	pub fn known_games() -> impl Iterator<Item = &'static str> {
		KNOWN_GAMES.iter().map(|(name, _)| *name)
	}

	/// Whether user-data entries use the embedded-block shape.
	pub fn uses_legacy_user_data(&self) -> bool {
		self.tdb_version < LEGACY_USER_DATA_BELOW
	}

	/// Prefab file suffix, for example `.pfb.17`.
	pub fn pfb_extension(&self) -> &'static str {
		let legacy = match self.game.as_ref() {
			"re2" => self.tdb_version == 66,
			"re7" => self.tdb_version == 49,
			"dmc5" => true,
			_ => false,
		};
		if legacy { ".pfb.16" } else { ".pfb.17" }
	}

	/// File name of the class descriptor dump for this game.
	pub fn registry_file_name(&self) -> String {
		format!("rsz{}.json", self.game)
	}
}

use std::fs;
use std::path::PathBuf;

use rszkit::rsz::{ContainerKind, Diagnostic, PfbFile, Result, RszBlock, UserFile};

use crate::cmd::util::{SchemaArgs, emit_json, hex32};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[command(flatten)]
	pub schema: SchemaArgs,
	#[arg(long)]
	pub json: bool,
}

/// Print container kind, side-table counts and block diagnostics.
pub fn run(args: Args) -> Result<()> {
	let Args { path, schema, json } = args;

	let bytes = fs::read(&path)?;
	let kind = ContainerKind::detect(&bytes)?;
	let (profile, registry) = schema.load()?;

	let mut payload = InfoJson {
		path: path.display().to_string(),
		container: kind.as_str().to_owned(),
		game: profile.game.to_string(),
		tdb_version: profile.tdb_version,
		legacy_user_data: profile.uses_legacy_user_data(),
		file_size: bytes.len(),
		block: BlockJson::default(),
		game_objects: None,
		ref_infos: None,
		resources: None,
		userdata_infos: None,
		diagnostics: Vec::new(),
	};

	let diagnostics = match kind {
		ContainerKind::Pfb => {
			let file = PfbFile::from_bytes(&bytes, profile, &registry)?;
			payload.game_objects = Some(file.game_object_infos().len());
			payload.ref_infos = Some(file.ref_infos().len());
			payload.resources = Some(file.resources().len());
			payload.userdata_infos = Some(file.userdata_infos().len());
			payload.block = BlockJson::from_block(file.block());
			file.block().diagnostics()
		}
		ContainerKind::User => {
			let file = UserFile::from_bytes(&bytes, profile, &registry)?;
			payload.resources = Some(file.resources.len());
			payload.userdata_infos = Some(file.userdata_infos.len());
			payload.block = BlockJson::from_block(&file.block);
			file.block.diagnostics()
		}
		ContainerKind::Rsz => {
			let block = RszBlock::from_bytes(&bytes, &registry, profile.tdb_version)?;
			payload.block = BlockJson::from_block(&block);
			block.diagnostics()
		}
	};
	payload.diagnostics = diagnostics.iter().map(DiagnosticJson::from_diagnostic).collect();

	if json {
		emit_json(&payload)?;
		return Ok(());
	}

	println!("path: {}", payload.path);
	println!("container: {}", payload.container);
	println!("game: {} (tdb {})", payload.game, payload.tdb_version);
	println!("user_data_layout: {}", if payload.legacy_user_data { "embedded" } else { "external" });
	println!("file_size: {}", payload.file_size);
	println!("block_version: {}", payload.block.version);
	println!("objects: {}", payload.block.objects);
	println!("instances: {}", payload.block.instances);
	println!("user_data: {}", payload.block.user_data);
	print_count("game_objects", payload.game_objects);
	print_count("ref_infos", payload.ref_infos);
	print_count("resources", payload.resources);
	print_count("userdata_infos", payload.userdata_infos);
	println!("diagnostics: {}", payload.diagnostics.len());
	for item in &payload.diagnostics {
		match item.nested_in {
			Some(owner) => println!("  #{} {} {} (in user data of #{owner})", item.ordinal, item.type_id, item.kind),
			None => println!("  #{} {} {}", item.ordinal, item.type_id, item.kind),
		}
	}

	Ok(())
}

fn print_count(label: &str, count: Option<usize>) {
	if let Some(count) = count {
		println!("{label}: {count}");
	}
}

#[derive(serde::Serialize)]
struct InfoJson {
	path: String,
	container: String,
	game: String,
	tdb_version: u32,
	legacy_user_data: bool,
	file_size: usize,
	block: BlockJson,
	#[serde(skip_serializing_if = "Option::is_none")]
	game_objects: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	ref_infos: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	resources: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	userdata_infos: Option<usize>,
	diagnostics: Vec<DiagnosticJson>,
}

#[derive(serde::Serialize, Default)]
struct BlockJson {
	version: u32,
	objects: usize,
	instances: usize,
	user_data: usize,
}

impl BlockJson {
	fn from_block(block: &RszBlock) -> Self {
		Self {
			version: block.version,
			objects: block.object_table().len(),
			instances: block.instances().len(),
			user_data: block.user_data_entries().count(),
		}
	}
}

#[derive(serde::Serialize)]
struct DiagnosticJson {
	ordinal: u32,
	type_id: String,
	kind: String,
	nested_in: Option<u32>,
}

impl DiagnosticJson {
	fn from_diagnostic(item: &Diagnostic) -> Self {
		Self {
			ordinal: item.ordinal,
			type_id: hex32(item.type_id),
			kind: item.kind.as_str().to_owned(),
			nested_in: item.nested_in,
		}
	}
}

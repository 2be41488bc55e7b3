use std::path::PathBuf;

use rszkit::rsz::{PfbFile, RebuildOptions, Result};

use crate::cmd::util::{SchemaArgs, emit_json};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	pub out: PathBuf,
	#[command(flatten)]
	pub schema: SchemaArgs,
	/// Leave components of non-root game objects out of the object table.
	#[arg(long)]
	pub root_components_only: bool,
	#[arg(long)]
	pub json: bool,
}

/// Regenerate a prefab's flat tables from its game-object tree and write it.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		out,
		schema,
		root_components_only,
		json,
	} = args;

	let (profile, registry) = schema.load()?;
	let mut file = PfbFile::open(&path, profile, &registry)?;
	let options = RebuildOptions {
		register_nested_components: !root_components_only,
	};
	let pruned = file.rebuild_with(&options)?;
	file.write(&out)?;

	let payload = RebuildJson {
		path: path.display().to_string(),
		out: out.display().to_string(),
		pruned,
		game_objects: file.game_object_infos().len(),
		objects: file.block().object_table().len(),
		instances: file.block().instances().len(),
		extension: file.extension().to_owned(),
	};

	if json {
		emit_json(&payload)?;
		return Ok(());
	}

	println!("path: {}", payload.path);
	println!("out: {}", payload.out);
	println!("pruned: {}", payload.pruned);
	println!("game_objects: {}", payload.game_objects);
	println!("objects: {}", payload.objects);
	println!("instances: {}", payload.instances);
	println!("extension: {}", payload.extension);

	Ok(())
}

#[derive(serde::Serialize)]
struct RebuildJson {
	path: String,
	out: String,
	pruned: usize,
	game_objects: usize,
	objects: usize,
	instances: usize,
	extension: String,
}

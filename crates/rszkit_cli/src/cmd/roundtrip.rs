use std::fs;
use std::path::PathBuf;

use rszkit::rsz::{ContainerKind, PfbFile, Result, RszBlock, UserFile};

use crate::cmd::util::{SchemaArgs, emit_json};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	pub out: PathBuf,
	#[command(flatten)]
	pub schema: SchemaArgs,
	#[arg(long)]
	pub json: bool,
}

/// Read a container, write it back unchanged and compare the bytes.
pub fn run(args: Args) -> Result<()> {
	let Args { path, out, schema, json } = args;

	let bytes = fs::read(&path)?;
	let kind = ContainerKind::detect(&bytes)?;
	let (profile, registry) = schema.load()?;

	let written = match kind {
		ContainerKind::Pfb => PfbFile::from_bytes(&bytes, profile, &registry)?.to_bytes()?,
		ContainerKind::User => UserFile::from_bytes(&bytes, profile, &registry)?.to_bytes()?,
		ContainerKind::Rsz => RszBlock::from_bytes(&bytes, &registry, profile.tdb_version)?.to_bytes()?,
	};
	fs::write(&out, &written)?;

	let first_difference = bytes.iter().zip(&written).position(|(left, right)| left != right);
	let identical = bytes == written;
	if !identical {
		log::warn!("{} did not round-trip byte-exact", path.display());
	}

	if json {
		emit_json(&RoundtripJson {
			path: path.display().to_string(),
			out: out.display().to_string(),
			container: kind.as_str().to_owned(),
			bytes_in: bytes.len(),
			bytes_out: written.len(),
			identical,
			first_difference,
		})?;
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("out: {}", out.display());
	println!("container: {}", kind.as_str());
	println!("bytes_in: {}", bytes.len());
	println!("bytes_out: {}", written.len());
	println!("identical: {identical}");
	if let Some(offset) = first_difference {
		println!("first_difference: 0x{offset:x}");
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct RoundtripJson {
	path: String,
	out: String,
	container: String,
	bytes_in: usize,
	bytes_out: usize,
	identical: bool,
	first_difference: Option<usize>,
}

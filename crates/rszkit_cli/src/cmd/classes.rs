use std::path::PathBuf;

use rszkit::rsz::{ClassRegistry, Result};

use crate::cmd::util::{emit_json, hex32};

#[derive(clap::Args)]
pub struct Args {
	pub registry: PathBuf,
	#[arg(long)]
	pub name: Option<String>,
	#[arg(long)]
	pub json: bool,
}

/// Print registry size, or the field layout of one class.
pub fn run(args: Args) -> Result<()> {
	let Args { registry: path, name, json } = args;

	let registry = ClassRegistry::from_json_path(&path)?;

	let Some(name) = name else {
		let mut classes = registry.classes();
		classes.sort_by(|left, right| left.name.cmp(&right.name));
		if json {
			emit_json(&ClassesJson {
				path: path.display().to_string(),
				count: registry.len(),
				classes: classes
					.iter()
					.map(|class| ClassSummaryJson {
						name: class.name.to_string(),
						type_id: hex32(class.type_id),
						crc: hex32(class.crc),
						fields: class.fields.len(),
					})
					.collect(),
			})?;
			return Ok(());
		}

		println!("path: {}", path.display());
		println!("classes: {}", registry.len());
		println!("type_id\tcrc\tfields\tname");
		for class in classes {
			println!("{}\t{}\t{}\t{}", hex32(class.type_id), hex32(class.crc), class.fields.len(), class.name);
		}
		return Ok(());
	};

	let class = registry.get_by_name(&name)?;
	if json {
		emit_json(&ClassJson {
			name: class.name.to_string(),
			type_id: hex32(class.type_id),
			crc: hex32(class.crc),
			fields: class
				.fields
				.iter()
				.map(|field| FieldJson {
					name: field.name.to_string(),
					kind: field.kind.as_str().to_owned(),
					original_type: field.original_type.to_string(),
					size: field.size,
					align: field.align,
					array: field.array,
					native: field.native,
				})
				.collect(),
		})?;
		return Ok(());
	}

	println!("name: {}", class.name);
	println!("type_id: {}", hex32(class.type_id));
	println!("crc: {}", hex32(class.crc));
	println!("fields: {}", class.fields.len());
	println!("name\tkind\tsize\talign\tarray\toriginal_type");
	for field in &class.fields {
		println!("{}\t{}\t{}\t{}\t{}\t{}", field.name, field.kind.as_str(), field.size, field.align, field.array, field.original_type);
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct ClassesJson {
	path: String,
	count: usize,
	classes: Vec<ClassSummaryJson>,
}

#[derive(serde::Serialize)]
struct ClassSummaryJson {
	name: String,
	type_id: String,
	crc: String,
	fields: usize,
}

#[derive(serde::Serialize)]
struct ClassJson {
	name: String,
	type_id: String,
	crc: String,
	fields: Vec<FieldJson>,
}

#[derive(serde::Serialize)]
struct FieldJson {
	name: String,
	kind: String,
	original_type: String,
	size: usize,
	align: usize,
	array: bool,
	native: bool,
}

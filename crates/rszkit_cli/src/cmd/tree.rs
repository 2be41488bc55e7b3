use std::path::PathBuf;

use rszkit::rsz::{GameObjectNode, InstanceHandle, ObjectGraph, PfbFile, Result, RszBlock};

use crate::cmd::util::{SchemaArgs, emit_json};

#[derive(clap::Args)]
pub struct Args {
	pub path: PathBuf,
	#[command(flatten)]
	pub schema: SchemaArgs,
	#[arg(long)]
	pub json: bool,
}

/// Build and print the game-object forest of a prefab.
pub fn run(args: Args) -> Result<()> {
	let Args { path, schema, json } = args;

	let (profile, registry) = schema.load()?;
	let mut file = PfbFile::open(&path, profile, &registry)?;
	file.root_objects()?;
	let roots = file.graph().map(ObjectGraph::roots).unwrap_or_default();
	let block = file.block();

	if json {
		emit_json(&TreeJson {
			path: path.display().to_string(),
			node_count: roots.iter().map(GameObjectNode::subtree_len).sum(),
			roots: roots.iter().map(|node| node_json(block, node)).collect(),
		})?;
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("roots: {}", roots.len());
	for node in roots {
		print_node(block, node, 0);
	}

	Ok(())
}

fn class_name(block: &RszBlock, handle: InstanceHandle) -> String {
	block.instance(handle.get()).map(|instance| instance.name().to_owned()).unwrap_or_else(|| "?".to_owned())
}

fn print_node(block: &RszBlock, node: &GameObjectNode, depth: usize) {
	let indent = "  ".repeat(depth);
	let id = node.object_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_owned());
	println!("{indent}#{} {} (object {id})", node.instance.get(), class_name(block, node.instance));
	for component in &node.components {
		println!("{indent}  + #{} {}", component.get(), class_name(block, *component));
	}
	for child in &node.children {
		print_node(block, child, depth + 1);
	}
}

fn node_json(block: &RszBlock, node: &GameObjectNode) -> NodeJson {
	NodeJson {
		instance: node.instance.get(),
		object_id: node.object_id,
		class: class_name(block, node.instance),
		components: node
			.components
			.iter()
			.map(|component| ComponentJson {
				instance: component.get(),
				class: class_name(block, *component),
			})
			.collect(),
		children: node.children.iter().map(|child| node_json(block, child)).collect(),
	}
}

#[derive(serde::Serialize)]
struct TreeJson {
	path: String,
	node_count: usize,
	roots: Vec<NodeJson>,
}

#[derive(serde::Serialize)]
struct NodeJson {
	instance: u32,
	object_id: Option<u32>,
	class: String,
	components: Vec<ComponentJson>,
	children: Vec<NodeJson>,
}

#[derive(serde::Serialize)]
struct ComponentJson {
	instance: u32,
	class: String,
}

use std::collections::{HashMap, HashSet};

use crate::rsz::bytes::{Cursor, Record, Writer, to_u32};
use crate::rsz::{Instance, Result, RszBlock, RszError};

/// Index of an instance in a block's instance directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceHandle(u32);

impl InstanceHandle {
	/// Handle of the reserved null instance.
	pub const NULL: Self = Self(0);

	/// Wrap a directory ordinal.
	pub fn new(ordinal: u32) -> Self {
		Self(ordinal)
	}

	/// Directory ordinal.
	pub fn get(self) -> u32 {
		self.0
	}

	/// Directory ordinal as an index.
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

/// Flat game-object record `(objectId, parentId, componentCount)`.
///
/// Ids are object-table positions; `parent_id == -1` marks a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameObjectInfo {
	/// Object-table position of the identity instance.
	pub object_id: i32,
	/// Object-table position of the parent's identity instance, or `-1`.
	pub parent_id: i32,
	/// Number of component entries following `object_id` in the object table.
	pub component_count: i32,
}

impl GameObjectInfo {
	/// Parent id of root objects.
	pub const ROOT_PARENT: i32 = -1;
}

impl Record for GameObjectInfo {
	const SIZE: usize = 12;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			object_id: cursor.read_i32()?,
			parent_id: cursor.read_i32()?,
			component_count: cursor.read_i32()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_i32(self.object_id);
		writer.write_i32(self.parent_id);
		writer.write_i32(self.component_count);
	}
}

/// One game object in the derived tree.
///
/// The node owns its components and children by handle; `parent` is a lookup
/// key only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameObjectNode {
	/// Object-table position this node was built from; `None` for new or adapted nodes.
	pub object_id: Option<u32>,
	/// Identity handle of the parent node.
	pub parent: Option<InstanceHandle>,
	/// Identity instance, usually a `via.GameObject`.
	pub instance: InstanceHandle,
	/// Component instances in table order.
	pub components: Vec<InstanceHandle>,
	/// Child nodes in info-table order.
	pub children: Vec<GameObjectNode>,
}

impl GameObjectNode {
	/// Create a detached node with no components or children.
	pub fn new(instance: InstanceHandle) -> Self {
		Self {
			object_id: None,
			parent: None,
			instance,
			components: Vec::new(),
			children: Vec::new(),
		}
	}

	/// Attach `child` under this node, fixing its parent link.
	pub fn push_child(&mut self, mut child: GameObjectNode) {
		child.parent = Some(self.instance);
		self.children.push(child);
	}

	/// Number of nodes in this subtree, this node included.
	pub fn subtree_len(&self) -> usize {
		1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
	}

	/// Find the node whose identity is `instance` in this subtree.
	pub fn find(&self, instance: InstanceHandle) -> Option<&GameObjectNode> {
		if self.instance == instance {
			return Some(self);
		}
		self.children.iter().find_map(|child| child.find(instance))
	}

	/// Mutable variant of [`GameObjectNode::find`].
	pub fn find_mut(&mut self, instance: InstanceHandle) -> Option<&mut GameObjectNode> {
		if self.instance == instance {
			return Some(self);
		}
		self.children.iter_mut().find_map(|child| child.find_mut(instance))
	}
}

/// Tuning for [`ObjectGraph::rebuild`].
#[derive(Debug, Clone)]
pub struct RebuildOptions {
	/// Register components of non-root nodes in the object table.
	pub register_nested_components: bool,
}

impl Default for RebuildOptions {
	fn default() -> Self {
		Self {
			register_nested_components: true,
		}
	}
}

/// Outcome of a rebuild.
#[derive(Debug, Clone)]
pub struct RebuildResult {
	/// Regenerated game-object records in pre-order.
	pub infos: Vec<GameObjectInfo>,
	/// Instances dropped because no root reaches them.
	pub pruned: usize,
	/// Old object-table position to new one, for every position whose instance is still registered.
	pub object_ids: HashMap<u32, u32>,
}

/// Deep copy of one subtree with its own instance arena.
#[derive(Debug, Clone)]
pub struct AdaptedTree {
	/// Fresh arena; slot 0 is the null instance.
	pub instances: Vec<Instance>,
	/// Copied root with handles into `instances`.
	pub root: GameObjectNode,
}

/// Forest of game objects derived from a block's flat tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectGraph {
	roots: Vec<GameObjectNode>,
}

impl ObjectGraph {
	/// Wrap already-built roots.
	pub fn from_roots(roots: Vec<GameObjectNode>) -> Self {
		Self { roots }
	}

	/// Derive the forest from the object table and game-object records of `block`.
	///
	/// Every id must resolve: a dangling parent, a repeated object id, an
	/// out-of-range position or a parent cycle fails the whole build.
	pub fn build(block: &RszBlock, infos: &[GameObjectInfo]) -> Result<Self> {
		let table = block.object_table();
		let directory_len = block.instances().len();

		let mut by_object_id = HashMap::with_capacity(infos.len());
		let mut parts = Vec::with_capacity(infos.len());
		for (index, info) in infos.iter().enumerate() {
			if by_object_id.insert(info.object_id, index).is_some() {
				return Err(RszError::DuplicateObjectId { object_id: info.object_id });
			}
			let identity = resolve_position(table, directory_len, i64::from(info.object_id))?;
			let count = usize::try_from(info.component_count).map_err(|_| RszError::ObjectIndexOutOfRange {
				index: i64::from(info.component_count),
				len: table.len(),
			})?;
			let mut components = Vec::with_capacity(count.min(table.len()));
			for offset in 1..=count {
				components.push(resolve_position(table, directory_len, i64::from(info.object_id) + offset as i64)?);
			}
			parts.push((identity, components));
		}

		let mut children_of: HashMap<i32, Vec<usize>> = HashMap::new();
		let mut root_indices = Vec::new();
		for (index, info) in infos.iter().enumerate() {
			if info.parent_id == GameObjectInfo::ROOT_PARENT {
				root_indices.push(index);
			} else if by_object_id.contains_key(&info.parent_id) {
				children_of.entry(info.parent_id).or_default().push(index);
			} else {
				return Err(RszError::DanglingParent {
					object_id: info.object_id,
					parent_id: info.parent_id,
				});
			}
		}

		let mut placed = vec![false; infos.len()];
		let roots: Vec<_> = root_indices
			.into_iter()
			.map(|index| assemble(index, None, infos, &parts, &children_of, &mut placed))
			.collect();
		if let Some(index) = placed.iter().position(|done| !done) {
			return Err(RszError::ParentCycle {
				object_id: infos[index].object_id,
			});
		}

		log::debug!("built object graph: {} roots, {} nodes", roots.len(), infos.len());
		Ok(Self { roots })
	}

	/// Root nodes in info-table order.
	pub fn roots(&self) -> &[GameObjectNode] {
		&self.roots
	}

	/// Mutable root list.
	pub fn roots_mut(&mut self) -> &mut Vec<GameObjectNode> {
		&mut self.roots
	}

	/// Consume the graph and return its roots.
	pub fn into_roots(self) -> Vec<GameObjectNode> {
		self.roots
	}

	/// Total node count.
	pub fn node_count(&self) -> usize {
		self.roots.iter().map(GameObjectNode::subtree_len).sum()
	}

	/// Find a node by identity handle anywhere in the forest.
	pub fn find_node(&self, instance: InstanceHandle) -> Option<&GameObjectNode> {
		self.roots.iter().find_map(|root| root.find(instance))
	}

	/// Mutable variant of [`ObjectGraph::find_node`].
	pub fn find_node_mut(&mut self, instance: InstanceHandle) -> Option<&mut GameObjectNode> {
		self.roots.iter_mut().find_map(|root| root.find_mut(instance))
	}

	/// Regenerate `block`'s instance directory and object table from this forest.
	///
	/// Instances are renumbered in traversal order with referenced sub-instances
	/// placed before their referrer; unreachable instances are dropped and
	/// counted. On error `block` is left untouched. On success the forest is
	/// re-derived from the new tables; components left out of the object table
	/// stay attached to their nodes.
	pub fn rebuild(&mut self, block: &mut RszBlock, options: &RebuildOptions) -> Result<RebuildResult> {
		let mut plan = RebuildPlan::new(block.instances(), options);
		for root in &self.roots {
			plan.visit_node(root, GameObjectInfo::ROOT_PARENT, true)?;
		}

		let directory_len = block.instances.len();
		let pruned = directory_len.saturating_sub(plan.order.len());
		let RebuildPlan {
			order,
			assigned,
			object_table,
			infos,
			unregistered,
			..
		} = plan;

		let mut new_positions = HashMap::with_capacity(object_table.len());
		for (position, ordinal) in object_table.iter().enumerate() {
			new_positions.entry(*ordinal).or_insert(position as u32);
		}
		let object_ids: HashMap<u32, u32> = block
			.object_table
			.iter()
			.enumerate()
			.filter_map(|(position, old)| {
				let ordinal = assigned.get(*old as usize).copied().flatten()?;
				Some((position as u32, *new_positions.get(&ordinal)?))
			})
			.collect();

		let mut slots: Vec<Option<Instance>> = std::mem::take(&mut block.instances).into_iter().map(Some).collect();
		let mut instances = Vec::with_capacity(order.len());
		for (new_ordinal, old) in order.iter().enumerate() {
			let taken = slots.get_mut(*old as usize).and_then(Option::take);
			let Some(mut instance) = taken.or_else(|| (*old == 0).then(Instance::null)) else {
				continue;
			};
			let new_ordinal = new_ordinal as u32;
			instance.set_ordinal(Some(new_ordinal));
			instance.remap_references(|target| assigned.get(target as usize).copied().flatten().unwrap_or(0));
			if let Some(entry) = instance.user_data_mut() {
				entry.instance_id = new_ordinal;
			}
			instances.push(instance);
		}
		block.instances = instances;
		block.object_table = object_table;

		if pruned > 0 {
			log::info!("rebuild pruned {pruned} unreachable instances");
		}
		*self = Self::build(block, &infos)?;
		for (identity, components) in unregistered {
			if let Some(node) = self.find_node_mut(InstanceHandle(identity)) {
				node.components = components.into_iter().map(InstanceHandle).collect();
			}
		}
		Ok(RebuildResult { infos, pruned, object_ids })
	}

	/// Deep-copy `node`'s subtree out of `source` into a fresh arena.
	///
	/// Object ids and the root's parent link are cleared. Instances reachable
	/// through references are copied too. User-data entries are reattached to
	/// the copies with an unassigned instance id.
	pub fn adapt(source: &[Instance], node: &GameObjectNode) -> Result<AdaptedTree> {
		let mut copier = Copier {
			source,
			arena: vec![Instance::null()],
			memo: HashMap::new(),
		};
		let root = copier.copy_node(node, None)?;
		Ok(AdaptedTree {
			instances: copier.arena,
			root,
		})
	}
}

fn resolve_position(table: &[u32], directory_len: usize, position: i64) -> Result<InstanceHandle> {
	let ordinal = usize::try_from(position)
		.ok()
		.and_then(|index| table.get(index))
		.copied()
		.ok_or(RszError::ObjectIndexOutOfRange {
			index: position,
			len: table.len(),
		})?;
	if ordinal as usize >= directory_len {
		return Err(RszError::OrdinalOutOfRange { ordinal, len: directory_len });
	}
	Ok(InstanceHandle(ordinal))
}

fn assemble(
	index: usize,
	parent: Option<InstanceHandle>,
	infos: &[GameObjectInfo],
	parts: &[(InstanceHandle, Vec<InstanceHandle>)],
	children_of: &HashMap<i32, Vec<usize>>,
	placed: &mut [bool],
) -> GameObjectNode {
	placed[index] = true;
	let info = infos[index];
	let (identity, components) = &parts[index];
	let children = children_of
		.get(&info.object_id)
		.map(|indices| {
			indices
				.iter()
				.map(|child| assemble(*child, Some(*identity), infos, parts, children_of, placed))
				.collect()
		})
		.unwrap_or_default();

	GameObjectNode {
		object_id: u32::try_from(info.object_id).ok(),
		parent,
		instance: *identity,
		components: components.clone(),
		children,
	}
}

struct RebuildPlan<'a> {
	instances: &'a [Instance],
	options: &'a RebuildOptions,
	order: Vec<u32>,
	assigned: Vec<Option<u32>>,
	visiting: Vec<bool>,
	seen_nodes: HashSet<InstanceHandle>,
	object_table: Vec<u32>,
	infos: Vec<GameObjectInfo>,
	unregistered: Vec<(u32, Vec<u32>)>,
}

impl<'a> RebuildPlan<'a> {
	fn new(instances: &'a [Instance], options: &'a RebuildOptions) -> Self {
		let mut assigned = vec![None; instances.len()];
		if let Some(slot) = assigned.first_mut() {
			*slot = Some(0);
		}
		Self {
			instances,
			options,
			order: vec![0],
			assigned,
			visiting: vec![false; instances.len()],
			seen_nodes: HashSet::new(),
			object_table: Vec::new(),
			infos: Vec::new(),
			unregistered: Vec::new(),
		}
	}

	fn visit_node(&mut self, node: &GameObjectNode, parent_id: i32, is_root: bool) -> Result<()> {
		if !self.seen_nodes.insert(node.instance) {
			log::warn!("game object {} reached twice, keeping the first visit", node.instance.get());
			return Ok(());
		}

		let identity = self.place_tree_member(node.instance)?;
		let object_id = to_u32("object table length", self.object_table.len())?;
		self.object_table.push(identity);

		let register = is_root || self.options.register_nested_components;
		let mut components = Vec::with_capacity(node.components.len());
		for component in &node.components {
			let ordinal = self.place_tree_member(*component)?;
			if register {
				self.object_table.push(ordinal);
			} else {
				components.push(ordinal);
			}
		}
		if !components.is_empty() {
			self.unregistered.push((identity, components));
		}

		let object_id = object_id as i32;
		self.infos.push(GameObjectInfo {
			object_id,
			parent_id,
			component_count: if register { node.components.len() as i32 } else { 0 },
		});

		for child in &node.children {
			self.visit_node(child, object_id, false)?;
		}
		Ok(())
	}

	fn place_tree_member(&mut self, handle: InstanceHandle) -> Result<u32> {
		if handle == InstanceHandle::NULL {
			return Err(RszError::NullInstanceInTree);
		}
		self.place(handle.get())
	}

	fn place(&mut self, handle: u32) -> Result<u32> {
		let index = handle as usize;
		if index >= self.instances.len() {
			return Err(RszError::OrdinalOutOfRange {
				ordinal: handle,
				len: self.instances.len(),
			});
		}
		if let Some(ordinal) = self.assigned[index] {
			return Ok(ordinal);
		}
		if self.visiting[index] {
			return Ok(0);
		}

		self.visiting[index] = true;
		for target in self.instances[index].references() {
			self.place(target)?;
		}
		self.visiting[index] = false;

		let ordinal = to_u32("instance count", self.order.len())?;
		self.assigned[index] = Some(ordinal);
		self.order.push(handle);
		Ok(ordinal)
	}
}

struct Copier<'a> {
	source: &'a [Instance],
	arena: Vec<Instance>,
	memo: HashMap<u32, u32>,
}

impl Copier<'_> {
	fn copy_node(&mut self, node: &GameObjectNode, parent: Option<InstanceHandle>) -> Result<GameObjectNode> {
		let instance = self.copy_tree_member(node.instance)?;
		let mut components = Vec::with_capacity(node.components.len());
		for component in &node.components {
			components.push(self.copy_tree_member(*component)?);
		}
		let mut children = Vec::with_capacity(node.children.len());
		for child in &node.children {
			children.push(self.copy_node(child, Some(instance))?);
		}
		Ok(GameObjectNode {
			object_id: None,
			parent,
			instance,
			components,
			children,
		})
	}

	fn copy_tree_member(&mut self, handle: InstanceHandle) -> Result<InstanceHandle> {
		if handle == InstanceHandle::NULL {
			return Err(RszError::NullInstanceInTree);
		}
		Ok(InstanceHandle(self.copy(handle.get())?))
	}

	fn copy(&mut self, handle: u32) -> Result<u32> {
		if handle == 0 {
			return Ok(0);
		}
		if let Some(copied) = self.memo.get(&handle) {
			return Ok(*copied);
		}
		let source = self.source.get(handle as usize).ok_or(RszError::OrdinalOutOfRange {
			ordinal: handle,
			len: self.source.len(),
		})?;

		let mut copy = source.clone_detached();
		if let Some(entry) = source.user_data() {
			let mut entry = entry.clone();
			entry.instance_id = 0;
			copy.attach_user_data(entry);
		}
		let new_handle = to_u32("instance count", self.arena.len())?;
		self.memo.insert(handle, new_handle);
		self.arena.push(copy);

		for target in source.references() {
			self.copy(target)?;
		}
		let memo = &self.memo;
		self.arena[new_handle as usize].remap_references(|target| memo.get(&target).copied().unwrap_or(0));
		Ok(new_handle)
	}
}

#[cfg(test)]
mod tests;

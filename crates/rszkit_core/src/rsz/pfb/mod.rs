use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::rsz::bytes::{Cursor, Record, Writer, signed_to_usize, to_i32};
use crate::rsz::{
	ClassRegistry, ContainerState, GameObjectInfo, GameObjectNode, GameProfile, Instance, InstanceHandle, ObjectGraph, RebuildOptions, Result, RszBlock, RszError,
	UserDataPayload,
};

/// PFB container magic (`PFB\0`).
pub const PFB_MAGIC: u32 = 0x0042_4650;

/// Header version written for new prefabs.
const DEFAULT_BLOCK_VERSION: u32 = 16;

/// Fixed 56-byte prefab header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PfbHeader {
	/// Leading magic.
	pub magic: u32,
	/// Game-object record count.
	pub info_count: i32,
	/// Resource path count.
	pub resource_count: i32,
	/// Game-object reference record count.
	pub ref_info_count: i32,
	/// User-data path count.
	pub userdata_count: i64,
	/// Offset of the game-object reference records.
	pub ref_info_offset: i64,
	/// Offset of the resource path records.
	pub resource_info_offset: i64,
	/// Offset of the user-data path records.
	pub userdata_info_offset: i64,
	/// Offset of the embedded RSZ block.
	pub data_offset: i64,
}

impl Record for PfbHeader {
	const SIZE: usize = 56;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			magic: cursor.read_u32()?,
			info_count: cursor.read_i32()?,
			resource_count: cursor.read_i32()?,
			ref_info_count: cursor.read_i32()?,
			userdata_count: cursor.read_i64()?,
			ref_info_offset: cursor.read_i64()?,
			resource_info_offset: cursor.read_i64()?,
			userdata_info_offset: cursor.read_i64()?,
			data_offset: cursor.read_i64()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_u32(self.magic);
		writer.write_i32(self.info_count);
		writer.write_i32(self.resource_count);
		writer.write_i32(self.ref_info_count);
		writer.write_i64(self.userdata_count);
		writer.write_i64(self.ref_info_offset);
		writer.write_i64(self.resource_info_offset);
		writer.write_i64(self.userdata_info_offset);
		writer.write_i64(self.data_offset);
	}
}

/// Cross-object reference record: a property of one object pointing at another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameObjectRefInfo {
	/// Object-table position of the referring object.
	pub object_id: u32,
	/// Property index on the referring component.
	pub property_id: i32,
	/// Array slot, or `-1` for scalar properties.
	pub array_index: i32,
	/// Object-table position of the target object.
	pub target_id: u32,
}

impl Record for GameObjectRefInfo {
	const SIZE: usize = 16;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			object_id: cursor.read_u32()?,
			property_id: cursor.read_i32()?,
			array_index: cursor.read_i32()?,
			target_id: cursor.read_u32()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_u32(self.object_id);
		writer.write_i32(self.property_id);
		writer.write_i32(self.array_index);
		writer.write_u32(self.target_id);
	}
}

/// External resource path referenced by the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
	/// Resource path.
	pub path: String,
}

/// External user-data file referenced by the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserdataInfo {
	/// Type id of the user-data class.
	pub type_id: u32,
	/// Layout hash of the user-data class.
	pub crc: u32,
	/// Path of the `.user` file.
	pub path: String,
}

/// Editable prefab container.
#[derive(Debug)]
pub struct PfbFile {
	profile: GameProfile,
	state: ContainerState,
	infos: Vec<GameObjectInfo>,
	ref_infos: Vec<GameObjectRefInfo>,
	resources: Vec<ResourceInfo>,
	userdata_infos: Vec<UserdataInfo>,
	block: RszBlock,
	graph: Option<ObjectGraph>,
	dropped_ref_infos: usize,
}

impl PfbFile {
	/// Create an empty, unloaded prefab for `profile`.
	pub fn new(profile: GameProfile) -> Self {
		let block = RszBlock::new(DEFAULT_BLOCK_VERSION, profile.tdb_version);
		Self {
			profile,
			state: ContainerState::Unloaded,
			infos: Vec::new(),
			ref_infos: Vec::new(),
			resources: Vec::new(),
			userdata_infos: Vec::new(),
			block,
			graph: None,
			dropped_ref_infos: 0,
		}
	}

	/// Read a prefab from disk.
	pub fn open(path: impl AsRef<Path>, profile: GameProfile, registry: &ClassRegistry) -> Result<Self> {
		let path = path.as_ref();
		log::info!("opening prefab {}", path.display());
		let bytes = fs::read(path)?;
		Self::from_bytes(&bytes, profile, registry)
	}

	/// Parse a prefab from memory.
	pub fn from_bytes(bytes: &[u8], profile: GameProfile, registry: &ClassRegistry) -> Result<Self> {
		let mut file = Self::new(profile);
		file.read(bytes, registry)?;
		Ok(file)
	}

	/// Replace this container's contents with `bytes`.
	///
	/// A failed read leaves the container `Unloaded` with empty tables.
	pub fn read(&mut self, bytes: &[u8], registry: &ClassRegistry) -> Result<()> {
		self.state = ContainerState::Reading;
		self.graph = None;
		match self.read_tables(bytes, registry) {
			Ok(()) => {
				self.state = ContainerState::Loaded;
				Ok(())
			}
			Err(err) => {
				*self = Self::new(self.profile.clone());
				Err(err)
			}
		}
	}

	fn read_tables(&mut self, bytes: &[u8], registry: &ClassRegistry) -> Result<()> {
		let mut cursor = Cursor::new(bytes);
		let header: PfbHeader = cursor.read_record()?;
		if header.magic != PFB_MAGIC {
			return Err(RszError::BadMagic {
				container: "PFB",
				expected: PFB_MAGIC,
				got: header.magic,
			});
		}

		let infos = cursor.read_records(signed_to_usize("info count", i64::from(header.info_count))?)?;

		cursor.seek(signed_to_usize("ref info offset", header.ref_info_offset)?)?;
		let ref_infos = cursor.read_records(signed_to_usize("ref info count", i64::from(header.ref_info_count))?)?;

		cursor.seek(signed_to_usize("resource offset", header.resource_info_offset)?)?;
		let mut resources = Vec::new();
		for _ in 0..signed_to_usize("resource count", i64::from(header.resource_count))? {
			let offset = cursor.read_u64()?;
			resources.push(ResourceInfo {
				path: cursor.read_wstring_at(offset)?,
			});
		}

		cursor.seek(signed_to_usize("user data offset", header.userdata_info_offset)?)?;
		let mut userdata_infos = Vec::new();
		for _ in 0..signed_to_usize("user data count", header.userdata_count)? {
			let type_id = cursor.read_u32()?;
			let crc = cursor.read_u32()?;
			let offset = cursor.read_u64()?;
			userdata_infos.push(UserdataInfo {
				type_id,
				crc,
				path: cursor.read_wstring_at(offset)?,
			});
		}

		let mut data = cursor.with_base(signed_to_usize("data offset", header.data_offset)?)?;
		let block = RszBlock::read(&mut data, registry, self.profile.tdb_version)?;
		log::debug!(
			"prefab: {} game objects, {} refs, {} resources, {} user data, {} instances",
			header.info_count,
			header.ref_info_count,
			header.resource_count,
			header.userdata_count,
			block.instances().len()
		);

		self.infos = infos;
		self.ref_infos = ref_infos;
		self.resources = resources;
		self.userdata_infos = userdata_infos;
		self.block = block;
		Ok(())
	}

	/// Serialize the flat tables.
	///
	/// Fails with [`RszError::InvalidState`] while edits are waiting for a rebuild.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		if !self.state.can_write() {
			return Err(RszError::InvalidState {
				op: "write",
				state: self.state.as_str(),
			});
		}

		let mut writer = Writer::new();
		writer.seek(PfbHeader::SIZE);
		writer.write_records(&self.infos);

		writer.align(16);
		let ref_info_offset = writer.tell();
		writer.write_records(&self.ref_infos);

		writer.align(16);
		let resource_info_offset = writer.tell();
		for resource in &self.resources {
			writer.defer_wstring(&resource.path);
		}

		writer.align(16);
		let userdata_info_offset = writer.tell();
		for info in &self.userdata_infos {
			writer.write_u32(info.type_id);
			writer.write_u32(info.crc);
			writer.defer_wstring(&info.path);
		}
		writer.flush_deferred_strings()?;

		let block = self.block.to_bytes()?;
		let data_offset = writer.append_aligned(&block, 16);

		let header = PfbHeader {
			magic: PFB_MAGIC,
			info_count: to_i32("info count", self.infos.len())?,
			resource_count: to_i32("resource count", self.resources.len())?,
			ref_info_count: to_i32("ref info count", self.ref_infos.len())?,
			userdata_count: self.userdata_infos.len() as i64,
			ref_info_offset: ref_info_offset as i64,
			resource_info_offset: resource_info_offset as i64,
			userdata_info_offset: userdata_info_offset as i64,
			data_offset: data_offset as i64,
		};
		writer.seek(0);
		writer.write_record(&header);
		Ok(writer.into_bytes())
	}

	/// Serialize and write to `path`.
	pub fn write(&mut self, path: impl AsRef<Path>) -> Result<()> {
		let bytes = self.to_bytes()?;
		fs::write(path.as_ref(), bytes)?;
		log::info!("wrote prefab {}", path.as_ref().display());
		self.state = ContainerState::Written;
		Ok(())
	}

	/// Game-object forest, built from the flat tables on first access.
	pub fn root_objects(&mut self) -> Result<&[GameObjectNode]> {
		let graph = self.ensure_graph()?;
		Ok(graph.roots())
	}

	/// Mutable game-object forest; marks the container dirty.
	pub fn root_objects_mut(&mut self) -> Result<&mut Vec<GameObjectNode>> {
		self.ensure_graph()?;
		self.state = ContainerState::Dirty;
		match self.graph.as_mut() {
			Some(graph) => Ok(graph.roots_mut()),
			None => Err(RszError::InvalidState {
				op: "edit tree",
				state: self.state.as_str(),
			}),
		}
	}

	/// Built game-object graph, if any.
	pub fn graph(&self) -> Option<&ObjectGraph> {
		self.graph.as_ref()
	}

	fn ensure_graph(&mut self) -> Result<&ObjectGraph> {
		if self.state == ContainerState::Unloaded {
			return Err(RszError::InvalidState {
				op: "build tree",
				state: self.state.as_str(),
			});
		}
		let graph = match self.graph.take() {
			Some(graph) => graph,
			None => {
				let graph = ObjectGraph::build(&self.block, &self.infos)?;
				if self.state == ContainerState::Loaded {
					self.state = ContainerState::TreeBuilt;
				}
				graph
			}
		};
		Ok(self.graph.insert(graph))
	}

	/// Embedded RSZ block.
	pub fn block(&self) -> &RszBlock {
		&self.block
	}

	/// Mutable embedded RSZ block; marks the container dirty.
	pub fn block_mut(&mut self) -> &mut RszBlock {
		self.state = ContainerState::Dirty;
		&mut self.block
	}

	/// Append an instance for use in the tree; marks the container dirty.
	pub fn add_instance(&mut self, instance: Instance) -> Result<InstanceHandle> {
		self.block_mut().add_instance(instance)
	}

	/// Regenerate the flat tables from the tree with default options.
	pub fn rebuild(&mut self) -> Result<usize> {
		self.rebuild_with(&RebuildOptions::default())
	}

	/// Regenerate the flat tables from the tree and return the pruned instance count.
	///
	/// On error the flat tables are unchanged and the state is restored.
	pub fn rebuild_with(&mut self, options: &RebuildOptions) -> Result<usize> {
		self.ensure_graph()?;
		let previous = self.state;
		let Some(mut graph) = self.graph.take() else {
			return Err(RszError::InvalidState {
				op: "rebuild",
				state: previous.as_str(),
			});
		};

		self.state = ContainerState::Rebuilding;
		let result = match graph.rebuild(&mut self.block, options) {
			Ok(result) => result,
			Err(err) => {
				self.graph = Some(graph);
				self.state = previous;
				return Err(err);
			}
		};

		self.infos = result.infos;
		self.dropped_ref_infos = self.remap_ref_infos(&result.object_ids);
		self.sync_userdata_infos();
		self.graph = Some(graph);
		self.state = ContainerState::Writable;
		Ok(result.pruned)
	}

	fn remap_ref_infos(&mut self, object_ids: &HashMap<u32, u32>) -> usize {
		let before = self.ref_infos.len();
		self.ref_infos.retain_mut(|info| match (object_ids.get(&info.object_id), object_ids.get(&info.target_id)) {
			(Some(object_id), Some(target_id)) => {
				info.object_id = *object_id;
				info.target_id = *target_id;
				true
			}
			_ => false,
		});
		let dropped = before - self.ref_infos.len();
		if dropped > 0 {
			log::warn!("dropped {dropped} game object references to pruned objects");
		}
		dropped
	}

	fn sync_userdata_infos(&mut self) {
		if self.block.uses_legacy_user_data() {
			return;
		}
		self.userdata_infos = self
			.block
			.user_data_entries()
			.filter_map(|(ordinal, entry)| match &entry.payload {
				UserDataPayload::External { path } => Some(UserdataInfo {
					type_id: entry.type_id,
					crc: self.block.instance(ordinal).map_or(0, Instance::layout_hash),
					path: path.clone(),
				}),
				UserDataPayload::Embedded { .. } => None,
			})
			.collect();
	}

	/// Build a new prefab whose single root is a deep copy of `node` from `source`.
	pub fn from_game_object(profile: GameProfile, source: &RszBlock, node: &GameObjectNode) -> Result<Self> {
		let adapted = ObjectGraph::adapt(source.instances(), node)?;
		let mut file = Self::new(profile);
		file.block = RszBlock::from_arena(source.version, file.profile.tdb_version, adapted.instances);
		file.graph = Some(ObjectGraph::from_roots(vec![adapted.root]));
		file.state = ContainerState::Dirty;
		let pruned = file.rebuild()?;
		log::debug!("prefab from game object: {} instances, {pruned} pruned", file.block.instances().len());
		Ok(file)
	}

	/// Reference records dropped by the last rebuild because their object left the object table.
	pub fn dropped_ref_infos(&self) -> usize {
		self.dropped_ref_infos
	}

	/// Current lifecycle state.
	pub fn state(&self) -> ContainerState {
		self.state
	}

	/// Whether edits are waiting for a rebuild.
	pub fn is_dirty(&self) -> bool {
		self.state == ContainerState::Dirty
	}

	/// Profile the container was read with.
	pub fn profile(&self) -> &GameProfile {
		&self.profile
	}

	/// File suffix for this profile, for example `.pfb.17`.
	pub fn extension(&self) -> &'static str {
		self.profile.pfb_extension()
	}

	/// Flat game-object records.
	pub fn game_object_infos(&self) -> &[GameObjectInfo] {
		&self.infos
	}

	/// Cross-object reference records.
	pub fn ref_infos(&self) -> &[GameObjectRefInfo] {
		&self.ref_infos
	}

	/// Resource paths.
	pub fn resources(&self) -> &[ResourceInfo] {
		&self.resources
	}

	/// Mutable resource paths.
	pub fn resources_mut(&mut self) -> &mut Vec<ResourceInfo> {
		&mut self.resources
	}

	/// User-data paths.
	pub fn userdata_infos(&self) -> &[UserdataInfo] {
		&self.userdata_infos
	}
}

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use crate::rsz::bytes::{Cursor, Record, Writer, to_u32, to_usize};
use crate::rsz::profile::LEGACY_USER_DATA_BELOW;
use crate::rsz::{ClassRegistry, Instance, InstanceHandle, Result, RszError, UserDataEntry, UserDataPayload};

/// RSZ block magic (`RSZ\0`).
pub const RSZ_MAGIC: u32 = 0x005A_5352;

/// Fixed 48-byte header at the start of every RSZ block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RszHeader {
	/// Leading magic.
	pub magic: u32,
	/// Block format version.
	pub version: u32,
	/// Object table entry count.
	pub object_count: u32,
	/// Instance directory entry count, including the null instance.
	pub instance_count: u32,
	/// User-data directory entry count.
	pub userdata_count: u64,
	/// Offset of the instance directory.
	pub instance_offset: u64,
	/// Offset of the instance payload region.
	pub data_offset: u64,
	/// Offset of the user-data directory.
	pub userdata_offset: u64,
}

impl Record for RszHeader {
	const SIZE: usize = 48;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			magic: cursor.read_u32()?,
			version: cursor.read_u32()?,
			object_count: cursor.read_u32()?,
			instance_count: cursor.read_u32()?,
			userdata_count: cursor.read_u64()?,
			instance_offset: cursor.read_u64()?,
			data_offset: cursor.read_u64()?,
			userdata_offset: cursor.read_u64()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_u32(self.magic);
		writer.write_u32(self.version);
		writer.write_u32(self.object_count);
		writer.write_u32(self.instance_count);
		writer.write_u64(self.userdata_count);
		writer.write_u64(self.instance_offset);
		writer.write_u64(self.data_offset);
		writer.write_u64(self.userdata_offset);
	}
}

/// Instance directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceInfo {
	/// Class type id.
	pub type_id: u32,
	/// Class layout hash.
	pub layout_hash: u32,
}

impl Record for InstanceInfo {
	const SIZE: usize = 8;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			type_id: cursor.read_u32()?,
			layout_hash: cursor.read_u32()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_u32(self.type_id);
		writer.write_u32(self.layout_hash);
	}
}

struct LegacyUserDataRecord {
	instance_id: u32,
	type_id: u32,
	path_hash: u32,
	data_size: u32,
	offset: u64,
}

impl LegacyUserDataRecord {
	const SIZE_OFFSET: usize = 12;
	const DATA_OFFSET: usize = 16;
}

impl Record for LegacyUserDataRecord {
	const SIZE: usize = 24;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			instance_id: cursor.read_u32()?,
			type_id: cursor.read_u32()?,
			path_hash: cursor.read_u32()?,
			data_size: cursor.read_u32()?,
			offset: cursor.read_u64()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_u32(self.instance_id);
		writer.write_u32(self.type_id);
		writer.write_u32(self.path_hash);
		writer.write_u32(self.data_size);
		writer.write_u64(self.offset);
	}
}

struct ModernUserDataRecord {
	instance_id: u32,
	type_id: u32,
	path_offset: u64,
}

impl Record for ModernUserDataRecord {
	const SIZE: usize = 16;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			instance_id: cursor.read_u32()?,
			type_id: cursor.read_u32()?,
			path_offset: cursor.read_u64()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_u32(self.instance_id);
		writer.write_u32(self.type_id);
		writer.write_u64(self.path_offset);
	}
}

/// Kind of a recovered read problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
	/// Type id absent from the class registry; instance kept opaque.
	UnresolvedType,
}

impl DiagnosticKind {
	/// Stable snake_case label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::UnresolvedType => "unresolved_type",
		}
	}
}

/// Recovered problem recorded while reading a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	/// Ordinal of the affected instance within its block.
	pub ordinal: u32,
	/// Type id stored in the directory.
	pub type_id: u32,
	/// Problem kind.
	pub kind: DiagnosticKind,
	/// Ordinal of the outermost user-data instance owning the nested block, if any.
	pub nested_in: Option<u32>,
}

/// Decoded RSZ block: object table, instance directory and user-data links.
#[derive(Debug, Clone)]
pub struct RszBlock {
	/// Header format version, carried through on write.
	pub version: u32,
	tdb_version: u32,
	pub(crate) object_table: Vec<u32>,
	pub(crate) instances: Vec<Instance>,
	diagnostics: Vec<Diagnostic>,
}

impl RszBlock {
	/// Create an empty block holding only the null instance.
	pub fn new(version: u32, tdb_version: u32) -> Self {
		Self {
			version,
			tdb_version,
			object_table: Vec::new(),
			instances: vec![Instance::null()],
			diagnostics: Vec::new(),
		}
	}

	pub(crate) fn from_arena(version: u32, tdb_version: u32, instances: Vec<Instance>) -> Self {
		Self {
			version,
			tdb_version,
			object_table: Vec::new(),
			instances,
			diagnostics: Vec::new(),
		}
	}

	/// Parse a standalone block from the start of `bytes`.
	pub fn from_bytes(bytes: &[u8], registry: &ClassRegistry, tdb_version: u32) -> Result<Self> {
		Self::read(&mut Cursor::new(bytes), registry, tdb_version)
	}

	/// Parse a block whose header sits at position 0 of `cursor`.
	///
	/// Offsets inside the block are relative to the cursor base, so embedded
	/// blocks are read through [`Cursor::with_base`].
	pub fn read(cursor: &mut Cursor<'_>, registry: &ClassRegistry, tdb_version: u32) -> Result<Self> {
		cursor.seek(0)?;
		let header: RszHeader = cursor.read_record()?;
		if header.magic != RSZ_MAGIC {
			return Err(RszError::BadMagic {
				container: "RSZ",
				expected: RSZ_MAGIC,
				got: header.magic,
			});
		}
		log::debug!(
			"rsz block at {:#x}: {} objects, {} instances, {} user data, instances@{:#x} userdata@{:#x} data@{:#x}",
			cursor.base(),
			header.object_count,
			header.instance_count,
			header.userdata_count,
			header.instance_offset,
			header.userdata_offset,
			header.data_offset
		);

		let mut object_table = Vec::with_capacity((header.object_count as usize).min(cursor.remaining() / 4));
		for _ in 0..header.object_count {
			object_table.push(cursor.read_u32()?);
		}

		cursor.seek_u64(header.instance_offset)?;
		let directory: Vec<InstanceInfo> = cursor.read_records(header.instance_count as usize)?;

		cursor.seek_u64(header.userdata_offset)?;
		let userdata_count = to_usize("user data count", header.userdata_count)?;
		let mut user_data = read_user_data(cursor, registry, tdb_version, userdata_count)?;
		for instance_id in user_data.keys() {
			if *instance_id as usize >= directory.len() {
				return Err(RszError::UserDataOutOfRange {
					instance_id: *instance_id,
					len: directory.len(),
				});
			}
		}

		cursor.seek_u64(header.data_offset)?;
		let mut instances = Vec::with_capacity(directory.len());
		let mut diagnostics = Vec::new();
		for (index, info) in directory.iter().enumerate() {
			let ordinal = to_u32("instance ordinal", index)?;
			let entry = user_data.remove(&ordinal);
			let instance = if ordinal == 0 || info.type_id == 0 {
				let mut null = Instance::null_at(ordinal, info.type_id, info.layout_hash);
				if let Some(entry) = entry {
					null.attach_user_data(entry);
				}
				null
			} else {
				match (registry.lookup(info.type_id), entry) {
					(Some(class), Some(entry)) => Instance::user_data_at(Arc::clone(class), ordinal, info.layout_hash, entry),
					(Some(class), None) => Instance::decode(cursor, class, ordinal, info.layout_hash)?,
					(None, entry) => {
						log::warn!("instance {ordinal}: unresolved type id 0x{:08x}, keeping it opaque", info.type_id);
						diagnostics.push(Diagnostic {
							ordinal,
							type_id: info.type_id,
							kind: DiagnosticKind::UnresolvedType,
							nested_in: None,
						});
						let mut instance = Instance::opaque(ordinal, info.type_id, info.layout_hash);
						if let Some(entry) = entry {
							instance.attach_user_data(entry);
						}
						instance
					}
				}
			};
			instances.push(instance);
		}

		Ok(Self {
			version: header.version,
			tdb_version,
			object_table,
			instances,
			diagnostics,
		})
	}

	/// Serialize with fresh offsets: header, tables, strings, payloads, then legacy nested blocks.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		let legacy = self.uses_legacy_user_data();
		let mut writer = Writer::new();
		writer.seek(RszHeader::SIZE);
		for ordinal in &self.object_table {
			writer.write_u32(*ordinal);
		}

		writer.align(16);
		let instance_offset = writer.tell();
		for instance in &self.instances {
			writer.write_record(&InstanceInfo {
				type_id: instance.type_id(),
				layout_hash: instance.layout_hash(),
			});
		}

		writer.align(16);
		let userdata_offset = writer.tell();
		let mut nested = Vec::new();
		let mut userdata_count = 0_u64;
		for (ordinal, entry) in self.user_data_entries() {
			userdata_count += 1;
			match (&entry.payload, legacy) {
				(UserDataPayload::Embedded { path_hash, block, .. }, true) => {
					nested.push((writer.tell(), block));
					writer.write_record(&LegacyUserDataRecord {
						instance_id: ordinal,
						type_id: entry.type_id,
						path_hash: *path_hash,
						data_size: 0,
						offset: 0,
					});
				}
				(UserDataPayload::External { path }, false) => {
					writer.write_u32(ordinal);
					writer.write_u32(entry.type_id);
					writer.defer_wstring(path);
				}
				_ => {
					return Err(RszError::UserDataShape {
						instance_id: ordinal,
						expected: if legacy { "embedded" } else { "external" },
					});
				}
			}
		}
		writer.flush_deferred_strings()?;

		writer.align(16);
		let data_offset = writer.tell();
		for instance in &self.instances {
			instance.encode(&mut writer)?;
		}

		for (slot, block) in nested {
			let bytes = block.to_bytes()?;
			let start = writer.append_aligned(&bytes, 16);
			writer.patch_u32(slot + LegacyUserDataRecord::SIZE_OFFSET, to_u32("nested block size", bytes.len())?);
			writer.patch_u64(slot + LegacyUserDataRecord::DATA_OFFSET, start as u64);
		}

		let header = RszHeader {
			magic: RSZ_MAGIC,
			version: self.version,
			object_count: to_u32("object count", self.object_table.len())?,
			instance_count: to_u32("instance count", self.instances.len())?,
			userdata_count,
			instance_offset: instance_offset as u64,
			data_offset: data_offset as u64,
			userdata_offset: userdata_offset as u64,
		};
		writer.seek(0);
		writer.write_record(&header);
		Ok(writer.into_bytes())
	}

	/// Schema version used to pick the user-data layout.
	pub fn tdb_version(&self) -> u32 {
		self.tdb_version
	}

	/// Whether user data is stored as embedded blocks.
	pub fn uses_legacy_user_data(&self) -> bool {
		self.tdb_version < LEGACY_USER_DATA_BELOW
	}

	/// Object table ordinals.
	pub fn object_table(&self) -> &[u32] {
		&self.object_table
	}

	/// Instance directory in ordinal order.
	pub fn instances(&self) -> &[Instance] {
		&self.instances
	}

	/// Instance at `ordinal`.
	pub fn instance(&self, ordinal: u32) -> Option<&Instance> {
		self.instances.get(ordinal as usize)
	}

	/// Mutable instance at `ordinal`.
	pub fn instance_mut(&mut self, ordinal: u32) -> Option<&mut Instance> {
		self.instances.get_mut(ordinal as usize)
	}

	/// Instance referenced by object table position `index`.
	pub fn object_instance(&self, index: usize) -> Option<&Instance> {
		self.object_table.get(index).and_then(|ordinal| self.instance(*ordinal))
	}

	/// User-data entry linked to `ordinal`.
	pub fn user_data_for(&self, ordinal: u32) -> Option<&UserDataEntry> {
		self.instance(ordinal).and_then(Instance::user_data)
	}

	/// User-data entries in ascending ordinal order.
	pub fn user_data_entries(&self) -> impl Iterator<Item = (u32, &UserDataEntry)> {
		self.instances
			.iter()
			.enumerate()
			.filter_map(|(index, instance)| instance.user_data().map(|entry| (index as u32, entry)))
	}

	/// Append an instance to the directory and return its handle.
	///
	/// The instance stays out of the object table until a tree rebuild reaches it.
	pub fn add_instance(&mut self, mut instance: Instance) -> Result<InstanceHandle> {
		let ordinal = to_u32("instance count", self.instances.len())?;
		instance.set_ordinal(Some(ordinal));
		self.instances.push(instance);
		Ok(InstanceHandle::new(ordinal))
	}

	/// Append an ordinal to the object table.
	pub fn push_object(&mut self, ordinal: u32) -> Result<()> {
		if ordinal as usize >= self.instances.len() {
			return Err(RszError::OrdinalOutOfRange {
				ordinal,
				len: self.instances.len(),
			});
		}
		self.object_table.push(ordinal);
		Ok(())
	}

	/// Recovered problems of this block and of every nested block.
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		let mut out = self.diagnostics.clone();
		for (ordinal, entry) in self.user_data_entries() {
			if let Some(block) = entry.embedded_block() {
				out.extend(block.diagnostics().into_iter().map(|diagnostic| Diagnostic {
					nested_in: diagnostic.nested_in.or(Some(ordinal)),
					..diagnostic
				}));
			}
		}
		out
	}

	/// Number of recovered problems, nested blocks included.
	pub fn diagnostic_count(&self) -> usize {
		self.diagnostics().len()
	}
}

fn read_user_data(cursor: &mut Cursor<'_>, registry: &ClassRegistry, tdb_version: u32, count: usize) -> Result<HashMap<u32, UserDataEntry>> {
	let mut out = HashMap::with_capacity(count.min(cursor.remaining() / ModernUserDataRecord::SIZE));
	if tdb_version < LEGACY_USER_DATA_BELOW {
		let records: Vec<LegacyUserDataRecord> = cursor.read_records(count)?;
		for record in records {
			let offset = to_usize("nested block offset", record.offset)?;
			let mut nested = cursor.with_base(offset)?;
			log::debug!("instance {}: nested rsz block at {:#x}", record.instance_id, nested.base());
			let block = RszBlock::read(&mut nested, registry, tdb_version)?;
			let entry = UserDataEntry {
				instance_id: record.instance_id,
				type_id: record.type_id,
				payload: UserDataPayload::Embedded {
					path_hash: record.path_hash,
					data_size: record.data_size,
					offset: record.offset,
					block: Box::new(block),
				},
			};
			insert_user_data(&mut out, entry)?;
		}
	} else {
		let records: Vec<ModernUserDataRecord> = cursor.read_records(count)?;
		for record in records {
			let path = cursor.read_wstring_at(record.path_offset)?;
			insert_user_data(&mut out, UserDataEntry::external(record.instance_id, record.type_id, path))?;
		}
	}
	Ok(out)
}

fn insert_user_data(map: &mut HashMap<u32, UserDataEntry>, entry: UserDataEntry) -> Result<()> {
	let instance_id = entry.instance_id;
	if map.insert(instance_id, entry).is_some() {
		return Err(RszError::DuplicateUserData { instance_id });
	}
	Ok(())
}

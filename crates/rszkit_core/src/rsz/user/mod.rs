use std::fs;
use std::path::Path;

use crate::rsz::bytes::{Cursor, Record, Writer, signed_to_usize, to_i32, to_usize};
use crate::rsz::{ClassRegistry, GameProfile, Instance, ResourceInfo, Result, RszBlock, RszError, UserdataInfo};

/// USER container magic (`USR\0`).
pub const USER_MAGIC: u32 = 0x0052_5355;

/// Fixed 40-byte user-data file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserHeader {
	/// Leading magic.
	pub magic: u32,
	/// Resource path count.
	pub resource_count: i32,
	/// User-data path count.
	pub userdata_count: i32,
	/// Info record count, carried through unchanged.
	pub info_count: i32,
	/// Offset of the resource path records.
	pub resource_info_offset: u64,
	/// Offset of the user-data path records.
	pub userdata_info_offset: u64,
	/// Offset of the embedded RSZ block.
	pub data_offset: u64,
}

impl Record for UserHeader {
	const SIZE: usize = 40;

	fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			magic: cursor.read_u32()?,
			resource_count: cursor.read_i32()?,
			userdata_count: cursor.read_i32()?,
			info_count: cursor.read_i32()?,
			resource_info_offset: cursor.read_u64()?,
			userdata_info_offset: cursor.read_u64()?,
			data_offset: cursor.read_u64()?,
		})
	}

	fn write(&self, writer: &mut Writer) {
		writer.write_u32(self.magic);
		writer.write_i32(self.resource_count);
		writer.write_i32(self.userdata_count);
		writer.write_i32(self.info_count);
		writer.write_u64(self.resource_info_offset);
		writer.write_u64(self.userdata_info_offset);
		writer.write_u64(self.data_offset);
	}
}

/// Generic user-data container: side tables plus one RSZ block.
#[derive(Debug, Clone)]
pub struct UserFile {
	/// Profile the file was read with.
	pub profile: GameProfile,
	/// Info record count from the header.
	pub info_count: i32,
	/// Resource paths.
	pub resources: Vec<ResourceInfo>,
	/// User-data paths.
	pub userdata_infos: Vec<UserdataInfo>,
	/// Embedded RSZ block.
	pub block: RszBlock,
}

impl UserFile {
	/// Read a user-data file from disk.
	pub fn open(path: impl AsRef<Path>, profile: GameProfile, registry: &ClassRegistry) -> Result<Self> {
		let path = path.as_ref();
		log::info!("opening user file {}", path.display());
		let bytes = fs::read(path)?;
		Self::from_bytes(&bytes, profile, registry)
	}

	/// Parse a user-data file from memory.
	pub fn from_bytes(bytes: &[u8], profile: GameProfile, registry: &ClassRegistry) -> Result<Self> {
		let mut cursor = Cursor::new(bytes);
		let header: UserHeader = cursor.read_record()?;
		if header.magic != USER_MAGIC {
			return Err(RszError::BadMagic {
				container: "USER",
				expected: USER_MAGIC,
				got: header.magic,
			});
		}

		cursor.seek_u64(header.resource_info_offset)?;
		let mut resources = Vec::new();
		for _ in 0..signed_to_usize("resource count", i64::from(header.resource_count))? {
			let offset = cursor.read_u64()?;
			resources.push(ResourceInfo {
				path: cursor.read_wstring_at(offset)?,
			});
		}

		cursor.seek_u64(header.userdata_info_offset)?;
		let mut userdata_infos = Vec::new();
		for _ in 0..signed_to_usize("user data count", i64::from(header.userdata_count))? {
			let type_id = cursor.read_u32()?;
			let crc = cursor.read_u32()?;
			let offset = cursor.read_u64()?;
			userdata_infos.push(UserdataInfo {
				type_id,
				crc,
				path: cursor.read_wstring_at(offset)?,
			});
		}

		let block = RszBlock::read(&mut cursor.with_base(to_usize("data offset", header.data_offset)?)?, registry, profile.tdb_version)?;
		log::debug!("user file: {} resources, {} user data, {} instances", resources.len(), userdata_infos.len(), block.instances().len());

		Ok(Self {
			profile,
			info_count: header.info_count,
			resources,
			userdata_infos,
			block,
		})
	}

	/// Serialize with fresh offsets.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		let mut writer = Writer::new();
		writer.seek(UserHeader::SIZE);

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

		let header = UserHeader {
			magic: USER_MAGIC,
			resource_count: to_i32("resource count", self.resources.len())?,
			userdata_count: to_i32("user data count", self.userdata_infos.len())?,
			info_count: self.info_count,
			resource_info_offset: resource_info_offset as u64,
			userdata_info_offset: userdata_info_offset as u64,
			data_offset: data_offset as u64,
		};
		writer.seek(0);
		writer.write_record(&header);
		Ok(writer.into_bytes())
	}

	/// Serialize and write to `path`.
	pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
		let bytes = self.to_bytes()?;
		fs::write(path.as_ref(), bytes)?;
		log::info!("wrote user file {}", path.as_ref().display());
		Ok(())
	}

	/// Root instances listed in the object table.
	pub fn roots(&self) -> impl Iterator<Item = &Instance> {
		(0..self.block.object_table().len()).filter_map(|index| self.block.object_instance(index))
	}
}

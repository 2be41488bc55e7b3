//! Shared test helpers for workspace crates.
//!
//! Containers are laid out by hand here, independently of the library writer,
//! so round-trip tests compare the writer against a known-good byte image.

use std::path::{Path, PathBuf};

use serde_json::json;

/// `via.GameObject` type id.
pub const GAME_OBJECT: u32 = 0x1000_0001;
/// `via.GameObject` layout hash.
pub const GAME_OBJECT_CRC: u32 = 0xA000_0001;
/// `via.Transform` type id.
pub const TRANSFORM: u32 = 0x1000_0002;
/// `via.Transform` layout hash.
pub const TRANSFORM_CRC: u32 = 0xA000_0002;
/// `app.WeaponParam` type id.
pub const WEAPON_PARAM: u32 = 0x1000_0003;
/// `app.WeaponParam` layout hash.
pub const WEAPON_PARAM_CRC: u32 = 0xA000_0003;
/// `app.DamageCurve` type id.
pub const DAMAGE_CURVE: u32 = 0x1000_0004;
/// `app.DamageCurve` layout hash.
pub const DAMAGE_CURVE_CRC: u32 = 0xA000_0004;
/// `app.WeaponSettings` type id.
pub const WEAPON_SETTINGS: u32 = 0x1000_0005;
/// `app.WeaponSettings` layout hash.
pub const WEAPON_SETTINGS_CRC: u32 = 0xA000_0005;
/// A type id absent from the sample registry.
pub const UNREGISTERED: u32 = 0x0BAD_0001;

/// RSZ block magic.
pub const RSZ_MAGIC: u32 = 0x005A_5352;
/// PFB container magic.
pub const PFB_MAGIC: u32 = 0x0042_4650;
/// USER container magic.
pub const USER_MAGIC: u32 = 0x0052_5355;

/// Path used by the sample external user-data entry.
pub const SETTINGS_PATH: &str = "weapon/settings.user";

/// Resolve the workspace root path.
pub fn workspace_root() -> PathBuf {
	let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
	manifest_dir
		.join("..")
		.join("..")
		.canonicalize()
		.unwrap_or_else(|_| manifest_dir.join("..").join(".."))
}

/// Resolve the workspace target directory.
pub fn target_dir() -> PathBuf {
	std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| workspace_root().join("target"))
}

/// Create (if needed) and return a per-test scratch directory under the target dir.
pub fn scratch_dir(name: &str) -> PathBuf {
	let dir = target_dir().join("rszkit-scratch").join(name);
	std::fs::create_dir_all(&dir).expect("scratch dir is creatable");
	dir
}

/// Class descriptor dump covering every sample container.
pub fn sample_registry_json() -> String {
	let descriptor = json!({
		"10000001": {
			"name": "via.GameObject",
			"crc": "a0000001",
			"fields": [
				{ "name": "v0", "type": "String", "size": 4, "align": 4, "array": false, "native": false, "original_type": "System.String" },
				{ "name": "v1", "type": "Bool", "size": 1, "align": 1, "array": false, "native": false, "original_type": "System.Boolean" },
				{ "name": "v2", "type": "F32", "size": 4, "align": 4, "array": false, "native": false, "original_type": "System.Single" }
			]
		},
		"10000002": {
			"name": "via.Transform",
			"crc": "a0000002",
			"fields": [
				{ "name": "v0", "type": "Vec4", "size": 16, "align": 16, "array": false, "native": true, "original_type": "via.vec4" },
				{ "name": "v1", "type": "Quaternion", "size": 16, "align": 16, "array": false, "native": true, "original_type": "via.Quaternion" }
			]
		},
		"10000003": {
			"name": "app.WeaponParam",
			"crc": "a0000003",
			"fields": [
				{ "name": "damage", "type": "S32", "size": 4, "align": 4 },
				{ "name": "rate", "type": "F32", "size": 4, "align": 4 },
				{ "name": "tags", "type": "String", "size": 4, "align": 4, "array": true },
				{ "name": "settings", "type": "Object", "size": 4, "align": 4, "original_type": "app.DamageCurve" },
				{ "name": "curve", "type": "UserData", "size": 4, "align": 4, "original_type": "app.WeaponSettings" }
			]
		},
		"10000004": {
			"name": "app.DamageCurve",
			"crc": "a0000004",
			"fields": [
				{ "name": "points", "type": "F32", "size": 4, "align": 4, "array": true }
			]
		},
		"10000005": {
			"name": "app.WeaponSettings",
			"crc": "a0000005",
			"fields": [
				{ "name": "level", "type": "U8", "size": 1, "align": 1 },
				{ "name": "label", "type": "String", "size": 4, "align": 4 }
			]
		}
	});
	descriptor.to_string()
}

/// Little-endian byte builder used to lay out fixtures.
#[derive(Debug, Default)]
pub struct ByteBuf {
	bytes: Vec<u8>,
}

impl ByteBuf {
	/// Current length, which is also the write position.
	pub fn pos(&self) -> usize {
		self.bytes.len()
	}

	/// Append raw bytes.
	pub fn bytes(&mut self, bytes: &[u8]) {
		self.bytes.extend_from_slice(bytes);
	}

	/// Append a `u8`.
	pub fn u8(&mut self, value: u8) {
		self.bytes.push(value);
	}

	/// Append a `u16`.
	pub fn u16(&mut self, value: u16) {
		self.bytes(&value.to_le_bytes());
	}

	/// Append a `u32`.
	pub fn u32(&mut self, value: u32) {
		self.bytes(&value.to_le_bytes());
	}

	/// Append an `i32`.
	pub fn i32(&mut self, value: i32) {
		self.bytes(&value.to_le_bytes());
	}

	/// Append a `u64`.
	pub fn u64(&mut self, value: u64) {
		self.bytes(&value.to_le_bytes());
	}

	/// Append an `f32`.
	pub fn f32(&mut self, value: f32) {
		self.bytes(&value.to_le_bytes());
	}

	/// Zero-pad to a multiple of `n`.
	pub fn align(&mut self, n: usize) {
		while self.bytes.len() % n != 0 {
			self.bytes.push(0);
		}
	}

	/// Append NUL-terminated UTF-16 code units.
	pub fn wstring(&mut self, text: &str) {
		for unit in text.encode_utf16() {
			self.u16(unit);
		}
		self.u16(0);
	}

	/// Append an instance string field: align 4, unit count, units.
	pub fn rsz_string(&mut self, text: &str) {
		self.align(4);
		self.u32(text.encode_utf16().count() as u32 + 1);
		self.wstring(text);
	}

	/// Overwrite a `u32` at `at`.
	pub fn patch_u32(&mut self, at: usize, value: u32) {
		self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
	}

	/// Overwrite a `u64` at `at`.
	pub fn patch_u64(&mut self, at: usize, value: u64) {
		self.bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
	}

	/// Return the built bytes.
	pub fn into_inner(self) -> Vec<u8> {
		self.bytes
	}
}

/// User-data directory contents for [`rsz_block`].
pub enum UserDataLayout {
	/// Modern entries: `(instance_id, type_id, path)`.
	Modern(Vec<(u32, u32, String)>),
	/// Legacy entries: `(instance_id, type_id, path_hash, nested block bytes)`.
	Legacy(Vec<(u32, u32, u32, Vec<u8>)>),
}

/// Inputs for laying out one RSZ block.
pub struct BlockLayout<'a> {
	/// Header version field.
	pub version: u32,
	/// Object table ordinals.
	pub object_table: Vec<u32>,
	/// Instance directory `(type_id, layout_hash)` records.
	pub directory: Vec<(u32, u32)>,
	/// User-data directory.
	pub user_data: UserDataLayout,
	/// Writes instance payloads starting at the data offset.
	pub payload: &'a dyn Fn(&mut ByteBuf),
}

/// Lay out an RSZ block with the canonical section order and alignment.
pub fn rsz_block(layout: &BlockLayout<'_>) -> Vec<u8> {
	let mut buf = ByteBuf::default();
	buf.bytes(&[0; 48]);
	for ordinal in &layout.object_table {
		buf.u32(*ordinal);
	}

	buf.align(16);
	let instance_offset = buf.pos();
	for (type_id, hash) in &layout.directory {
		buf.u32(*type_id);
		buf.u32(*hash);
	}

	buf.align(16);
	let userdata_offset = buf.pos();
	let mut legacy_slots = Vec::new();
	let userdata_count = match &layout.user_data {
		UserDataLayout::Modern(entries) => {
			let mut slots = Vec::new();
			for (instance_id, type_id, _) in entries {
				buf.u32(*instance_id);
				buf.u32(*type_id);
				slots.push(buf.pos());
				buf.u64(0);
			}
			for (slot, (_, _, path)) in slots.into_iter().zip(entries) {
				let offset = buf.pos();
				buf.wstring(path);
				buf.patch_u64(slot, offset as u64);
			}
			entries.len()
		}
		UserDataLayout::Legacy(entries) => {
			for (instance_id, type_id, path_hash, _) in entries {
				buf.u32(*instance_id);
				buf.u32(*type_id);
				buf.u32(*path_hash);
				legacy_slots.push(buf.pos());
				buf.u32(0);
				buf.u64(0);
			}
			entries.len()
		}
	};

	buf.align(16);
	let data_offset = buf.pos();
	(layout.payload)(&mut buf);

	if let UserDataLayout::Legacy(entries) = &layout.user_data {
		for (slot, (_, _, _, nested)) in legacy_slots.into_iter().zip(entries) {
			buf.align(16);
			let offset = buf.pos();
			buf.bytes(nested);
			buf.patch_u32(slot, nested.len() as u32);
			buf.patch_u64(slot + 4, offset as u64);
		}
	}

	buf.patch_u32(0, RSZ_MAGIC);
	buf.patch_u32(4, layout.version);
	buf.patch_u32(8, layout.object_table.len() as u32);
	buf.patch_u32(12, layout.directory.len() as u32);
	buf.patch_u64(16, userdata_count as u64);
	buf.patch_u64(24, instance_offset as u64);
	buf.patch_u64(32, data_offset as u64);
	buf.patch_u64(40, userdata_offset as u64);
	buf.into_inner()
}

/// Inputs for laying out a PFB container.
pub struct PfbLayout<'a> {
	/// `(object_id, parent_id, component_count)` records.
	pub infos: Vec<(i32, i32, i32)>,
	/// `(object_id, property_id, array_index, target_id)` records.
	pub ref_infos: Vec<(u32, i32, i32, u32)>,
	/// Resource paths.
	pub resources: Vec<&'a str>,
	/// `(type_id, crc, path)` user-data records.
	pub userdata: Vec<(u32, u32, &'a str)>,
	/// Embedded RSZ block bytes.
	pub rsz: Vec<u8>,
}

/// Lay out a PFB container with every offset-bearing section 16-byte aligned.
pub fn pfb(layout: &PfbLayout<'_>) -> Vec<u8> {
	let mut buf = ByteBuf::default();
	buf.bytes(&[0; 56]);
	for (object_id, parent_id, component_count) in &layout.infos {
		buf.i32(*object_id);
		buf.i32(*parent_id);
		buf.i32(*component_count);
	}

	buf.align(16);
	let ref_offset = buf.pos();
	for (object_id, property_id, array_index, target_id) in &layout.ref_infos {
		buf.u32(*object_id);
		buf.i32(*property_id);
		buf.i32(*array_index);
		buf.u32(*target_id);
	}

	let (resource_offset, userdata_offset, data_offset) = write_side_tables(&mut buf, &layout.resources, &layout.userdata, &layout.rsz);

	buf.patch_u32(0, PFB_MAGIC);
	buf.patch_u32(4, layout.infos.len() as u32);
	buf.patch_u32(8, layout.resources.len() as u32);
	buf.patch_u32(12, layout.ref_infos.len() as u32);
	buf.patch_u64(16, layout.userdata.len() as u64);
	buf.patch_u64(24, ref_offset as u64);
	buf.patch_u64(32, resource_offset as u64);
	buf.patch_u64(40, userdata_offset as u64);
	buf.patch_u64(48, data_offset as u64);
	buf.into_inner()
}

/// Lay out a USER container.
pub fn user_file(resources: &[&str], userdata: &[(u32, u32, &str)], info_count: i32, rsz: &[u8]) -> Vec<u8> {
	let mut buf = ByteBuf::default();
	buf.bytes(&[0; 40]);

	let (resource_offset, userdata_offset, data_offset) = write_side_tables(&mut buf, resources, userdata, rsz);

	buf.patch_u32(0, USER_MAGIC);
	buf.patch_u32(4, resources.len() as u32);
	buf.patch_u32(8, userdata.len() as u32);
	buf.patch_u32(12, info_count as u32);
	buf.patch_u64(16, resource_offset as u64);
	buf.patch_u64(24, userdata_offset as u64);
	buf.patch_u64(32, data_offset as u64);
	buf.into_inner()
}

fn write_side_tables(buf: &mut ByteBuf, resources: &[&str], userdata: &[(u32, u32, &str)], rsz: &[u8]) -> (usize, usize, usize) {
	let mut slots = Vec::new();

	buf.align(16);
	let resource_offset = buf.pos();
	for path in resources {
		slots.push((buf.pos(), *path));
		buf.u64(0);
	}

	buf.align(16);
	let userdata_offset = buf.pos();
	for (type_id, crc, path) in userdata {
		buf.u32(*type_id);
		buf.u32(*crc);
		slots.push((buf.pos(), *path));
		buf.u64(0);
	}

	for (slot, path) in slots {
		let offset = buf.pos();
		buf.wstring(path);
		buf.patch_u64(slot, offset as u64);
	}

	buf.align(16);
	let data_offset = buf.pos();
	buf.bytes(rsz);
	(resource_offset, userdata_offset, data_offset)
}

/// Write a `via.GameObject` payload.
pub fn put_game_object(buf: &mut ByteBuf, name: &str, update: bool, timescale: f32) {
	buf.rsz_string(name);
	buf.u8(u8::from(update));
	buf.align(4);
	buf.f32(timescale);
}

/// Write a `via.Transform` payload.
pub fn put_transform(buf: &mut ByteBuf, position: [f32; 4], rotation: [f32; 4]) {
	buf.align(16);
	for value in position {
		buf.f32(value);
	}
	buf.align(16);
	for value in rotation {
		buf.f32(value);
	}
}

/// Write an `app.DamageCurve` payload.
pub fn put_damage_curve(buf: &mut ByteBuf, points: &[f32]) {
	buf.align(4);
	buf.u32(points.len() as u32);
	for point in points {
		buf.align(4);
		buf.f32(*point);
	}
}

/// Write an `app.WeaponParam` payload.
pub fn put_weapon_param(buf: &mut ByteBuf, damage: i32, rate: f32, tags: &[&str], settings: u32, curve: u32) {
	buf.align(4);
	buf.i32(damage);
	buf.align(4);
	buf.f32(rate);
	buf.align(4);
	buf.u32(tags.len() as u32);
	for tag in tags {
		buf.rsz_string(tag);
	}
	buf.align(4);
	buf.u32(settings);
	buf.align(4);
	buf.u32(curve);
}

/// Write an `app.WeaponSettings` payload.
pub fn put_weapon_settings(buf: &mut ByteBuf, level: u8, label: &str) {
	buf.u8(level);
	buf.rsz_string(label);
}

/// RSZ block behind [`sample_pfb`]: two game objects, components, a nested object and one external user-data entry.
///
/// Ordinals: 0 null, 1 `Root`, 2 transform, 3 damage curve, 4 settings (user data),
/// 5 weapon param, 6 `Child`, 7 transform.
pub fn sample_prefab_block() -> Vec<u8> {
	let payload = |buf: &mut ByteBuf| {
		put_game_object(buf, "Root", true, 1.0);
		put_transform(buf, [0.0, 1.0, 2.0, 1.0], [0.0, 0.0, 0.0, 1.0]);
		put_damage_curve(buf, &[0.0, 0.5, 1.0]);
		put_weapon_param(buf, 120, 1.5, &["fire", "heavy"], 3, 4);
		put_game_object(buf, "Child", false, 1.0);
		put_transform(buf, [4.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]);
	};
	rsz_block(&BlockLayout {
		version: 16,
		object_table: vec![1, 2, 5, 6, 7],
		directory: vec![
			(0, 0),
			(GAME_OBJECT, GAME_OBJECT_CRC),
			(TRANSFORM, TRANSFORM_CRC),
			(DAMAGE_CURVE, DAMAGE_CURVE_CRC),
			(WEAPON_SETTINGS, WEAPON_SETTINGS_CRC),
			(WEAPON_PARAM, WEAPON_PARAM_CRC),
			(GAME_OBJECT, GAME_OBJECT_CRC),
			(TRANSFORM, TRANSFORM_CRC),
		],
		user_data: UserDataLayout::Modern(vec![(4, WEAPON_SETTINGS, SETTINGS_PATH.to_owned())]),
		payload: &payload,
	})
}

/// Prefab for schema version 71: `Root` (transform, weapon param) with one child `Child` (transform).
pub fn sample_pfb() -> Vec<u8> {
	pfb(&PfbLayout {
		infos: vec![(0, -1, 2), (3, 0, 1)],
		ref_infos: vec![(0, 7, -1, 3)],
		resources: vec!["weapon/model.mesh"],
		userdata: vec![(WEAPON_SETTINGS, WEAPON_SETTINGS_CRC, SETTINGS_PATH)],
		rsz: sample_prefab_block(),
	})
}

/// Nested block with no objects and only the null instance.
pub fn empty_nested_block() -> Vec<u8> {
	rsz_block(&BlockLayout {
		version: 16,
		object_table: Vec::new(),
		directory: vec![(0, 0)],
		user_data: UserDataLayout::Legacy(Vec::new()),
		payload: &|_| {},
	})
}

/// Legacy (schema < 67) block with one embedded user-data entry at ordinal 1.
pub fn sample_legacy_block() -> Vec<u8> {
	rsz_block(&BlockLayout {
		version: 16,
		object_table: vec![1],
		directory: vec![(0, 0), (WEAPON_SETTINGS, WEAPON_SETTINGS_CRC)],
		user_data: UserDataLayout::Legacy(vec![(1, WEAPON_SETTINGS, 0x1234_5678, empty_nested_block())]),
		payload: &|_| {},
	})
}

/// USER container holding one `app.WeaponSettings` root.
pub fn sample_user_file() -> Vec<u8> {
	let payload = |buf: &mut ByteBuf| put_weapon_settings(buf, 3, "hard");
	let rsz = rsz_block(&BlockLayout {
		version: 16,
		object_table: vec![1],
		directory: vec![(0, 0), (WEAPON_SETTINGS, WEAPON_SETTINGS_CRC)],
		user_data: UserDataLayout::Modern(Vec::new()),
		payload: &payload,
	});
	user_file(&["weapon/icon.tex"], &[], 0, &rsz)
}

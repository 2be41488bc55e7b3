use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::rsz::{GameProfile, Result, RszError};

/// Storage class of one field, derived from the descriptor's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
	/// One-byte boolean.
	Bool,
	/// Signed 8-bit integer.
	S8,
	/// Unsigned 8-bit integer.
	U8,
	/// Signed 16-bit integer.
	S16,
	/// Unsigned 16-bit integer.
	U16,
	/// Signed 32-bit integer.
	S32,
	/// Unsigned 32-bit integer.
	U32,
	/// Signed 64-bit integer.
	S64,
	/// Unsigned 64-bit integer.
	U64,
	/// 32-bit float.
	F32,
	/// 64-bit float.
	F64,
	/// Length-prefixed UTF-16 string.
	String,
	/// Length-prefixed UTF-16 resource path.
	Resource,
	/// Ordinal of a nested instance.
	Object,
	/// Ordinal of a user-data instance.
	UserData,
	/// Fixed-size compound kept as raw bytes (vectors, GUIDs, matrices, ...).
	Raw,
}

impl FieldKind {
	/// Map a descriptor type tag to a field kind.
	pub fn from_tag(tag: &str) -> Self {
		match tag {
			"Bool" => Self::Bool,
			"S8" => Self::S8,
			"U8" => Self::U8,
			"S16" => Self::S16,
			"U16" => Self::U16,
			"S32" => Self::S32,
			"U32" => Self::U32,
			"S64" => Self::S64,
			"U64" => Self::U64,
			"F32" => Self::F32,
			"F64" => Self::F64,
			"String" => Self::String,
			"Resource" => Self::Resource,
			"Object" => Self::Object,
			"UserData" => Self::UserData,
			_ => Self::Raw,
		}
	}

	/// Stable label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Bool => "Bool",
			Self::S8 => "S8",
			Self::U8 => "U8",
			Self::S16 => "S16",
			Self::U16 => "U16",
			Self::S32 => "S32",
			Self::U32 => "U32",
			Self::S64 => "S64",
			Self::U64 => "U64",
			Self::F32 => "F32",
			Self::F64 => "F64",
			Self::String => "String",
			Self::Resource => "Resource",
			Self::Object => "Object",
			Self::UserData => "UserData",
			Self::Raw => "Raw",
		}
	}

	/// Encoded byte width for fixed-width kinds.
	pub fn fixed_size(self) -> Option<usize> {
		match self {
			Self::Bool | Self::S8 | Self::U8 => Some(1),
			Self::S16 | Self::U16 => Some(2),
			Self::S32 | Self::U32 | Self::F32 | Self::Object | Self::UserData => Some(4),
			Self::S64 | Self::U64 | Self::F64 => Some(8),
			Self::String | Self::Resource | Self::Raw => None,
		}
	}

	/// Whether values of this kind are instance ordinals.
	pub fn is_reference(self) -> bool {
		matches!(self, Self::Object | Self::UserData)
	}

	/// Whether values of this kind are length-prefixed strings.
	pub fn is_string(self) -> bool {
		matches!(self, Self::String | Self::Resource)
	}
}

/// One field declaration of a class layout.
#[derive(Debug, Clone)]
pub struct FieldDef {
	/// Field identifier.
	pub name: Box<str>,
	/// Storage class.
	pub kind: FieldKind,
	/// Type tag as written in the descriptor.
	pub type_tag: Box<str>,
	/// Runtime type name, informational.
	pub original_type: Box<str>,
	/// Element size in bytes.
	pub size: usize,
	/// Element alignment in bytes.
	pub align: usize,
	/// Whether the field is a counted array.
	pub array: bool,
	/// Native-field marker from the descriptor.
	pub native: bool,
}

/// Immutable class layout keyed by type id.
#[derive(Debug, Clone)]
pub struct ClassDef {
	/// 32-bit type hash.
	pub type_id: u32,
	/// Layout hash written next to the type id in instance directories.
	pub crc: u32,
	/// Fully qualified class name.
	pub name: Box<str>,
	/// Fields in serialization order.
	pub fields: Vec<FieldDef>,
}

impl ClassDef {
	/// Look up a field declaration and its position by name.
	pub fn field(&self, name: &str) -> Option<(usize, &FieldDef)> {
		self.fields.iter().enumerate().find(|(_, field)| field.name.as_ref() == name)
	}
}

/// Read-only lookup from type id or class name to class layout.
///
/// Safe to share across threads once built.
#[derive(Debug, Default)]
pub struct ClassRegistry {
	by_id: HashMap<u32, Arc<ClassDef>>,
	by_name: HashMap<Box<str>, u32>,
}

#[derive(Deserialize)]
struct ClassDescriptor {
	name: String,
	#[serde(default)]
	crc: Option<String>,
	#[serde(default)]
	fields: Vec<FieldDescriptor>,
}

#[derive(Deserialize)]
struct FieldDescriptor {
	name: String,
	#[serde(rename = "type")]
	type_tag: String,
	size: usize,
	align: usize,
	#[serde(default)]
	array: bool,
	#[serde(default)]
	native: bool,
	#[serde(default)]
	original_type: String,
}

impl ClassRegistry {
	/// Build a registry from already-constructed class layouts.
	pub fn from_classes(classes: impl IntoIterator<Item = ClassDef>) -> Result<Self> {
		let mut registry = Self::default();
		for class in classes {
			registry.insert(class)?;
		}
		Ok(registry)
	}

	/// Parse a JSON descriptor dump keyed by hex type id.
	pub fn from_json_str(text: &str) -> Result<Self> {
		let raw: BTreeMap<String, ClassDescriptor> = serde_json::from_str(text)?;
		let mut classes = Vec::with_capacity(raw.len());
		for (key, descriptor) in raw {
			classes.push(class_from_descriptor(&key, descriptor)?);
		}
		let registry = Self::from_classes(classes)?;
		log::debug!("loaded class registry with {} classes", registry.len());
		Ok(registry)
	}

	/// Read and parse a JSON descriptor dump from disk.
	pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		log::info!("loading class registry from {}", path.display());
		let text = fs::read_to_string(path)?;
		Self::from_json_str(&text)
	}

	/// Load `rsz<game>.json` for a profile from `dir`.
	pub fn load_for_profile(dir: impl AsRef<Path>, profile: &GameProfile) -> Result<Self> {
		Self::from_json_path(dir.as_ref().join(profile.registry_file_name()))
	}

	/// Look up a class by type id.
	pub fn lookup(&self, type_id: u32) -> Option<&Arc<ClassDef>> {
		self.by_id.get(&type_id)
	}

	/// Look up a class by name.
	pub fn lookup_by_name(&self, name: &str) -> Option<&Arc<ClassDef>> {
		self.by_name.get(name).and_then(|type_id| self.by_id.get(type_id))
	}

	/// Look up a class by type id, failing with [`RszError::ClassNotFound`].
	pub fn get(&self, type_id: u32) -> Result<&Arc<ClassDef>> {
		self.lookup(type_id).ok_or_else(|| RszError::ClassNotFound {
			key: format!("0x{type_id:08x}"),
		})
	}

	/// Look up a class by name, failing with [`RszError::ClassNotFound`].
	pub fn get_by_name(&self, name: &str) -> Result<&Arc<ClassDef>> {
		self.lookup_by_name(name).ok_or_else(|| RszError::ClassNotFound { key: name.to_owned() })
	}

	/// Number of registered classes.
	pub fn len(&self) -> usize {
		self.by_id.len()
	}

	/// Whether the registry holds no classes.
	pub fn is_empty(&self) -> bool {
		self.by_id.is_empty()
	}

	/// Iterate classes in type-id order.
	pub fn classes(&self) -> Vec<&Arc<ClassDef>> {
		let mut out: Vec<_> = self.by_id.values().collect();
		out.sort_by_key(|class| class.type_id);
		out
	}

	fn insert(&mut self, class: ClassDef) -> Result<()> {
		if self.by_id.contains_key(&class.type_id) {
			return Err(RszError::RegistryInvalid {
				reason: format!("duplicate type id 0x{:08x}", class.type_id),
			});
		}
		if self.by_name.contains_key(class.name.as_ref()) {
			return Err(RszError::RegistryInvalid {
				reason: format!("duplicate class name {}", class.name),
			});
		}
		self.by_name.insert(class.name.clone(), class.type_id);
		self.by_id.insert(class.type_id, Arc::new(class));
		Ok(())
	}
}

fn class_from_descriptor(key: &str, descriptor: ClassDescriptor) -> Result<ClassDef> {
	let type_id = parse_hex(key)?;
	let crc = match descriptor.crc.as_deref() {
		Some(text) if !text.is_empty() => parse_hex(text)?,
		_ => 0,
	};

	let mut fields = Vec::with_capacity(descriptor.fields.len());
	for field in descriptor.fields {
		let kind = FieldKind::from_tag(&field.type_tag);
		if !field.align.is_power_of_two() {
			return Err(RszError::RegistryInvalid {
				reason: format!("{}.{}: alignment {} is not a power of two", descriptor.name, field.name, field.align),
			});
		}
		match kind.fixed_size() {
			Some(expected) if field.size != expected => {
				return Err(RszError::RegistryInvalid {
					reason: format!("{}.{}: {} field has size {}, expected {}", descriptor.name, field.name, kind.as_str(), field.size, expected),
				});
			}
			_ => {}
		}
		fields.push(FieldDef {
			name: field.name.into_boxed_str(),
			kind,
			type_tag: field.type_tag.into_boxed_str(),
			original_type: field.original_type.into_boxed_str(),
			size: field.size,
			align: field.align,
			array: field.array,
			native: field.native,
		});
	}

	Ok(ClassDef {
		type_id,
		crc,
		name: descriptor.name.into_boxed_str(),
		fields,
	})
}

fn parse_hex(text: &str) -> Result<u32> {
	let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
	u32::from_str_radix(digits, 16).map_err(|_| RszError::RegistryInvalid {
		reason: format!("invalid hex id {text:?}"),
	})
}

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::rsz::bytes::{Cursor, Writer, to_u32};
use crate::rsz::value::{FieldValue, Value};
use crate::rsz::{ClassDef, FieldDef, FieldKind, Result, RszError, UserDataEntry};

/// Decode status of an instance slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
	/// Reserved null instance; no class, no payload.
	Null,
	/// Fields decoded from (or created for) a known class.
	Decoded,
	/// User-data placeholder; data lives in the linked entry.
	UserData,
	/// Type id not found in the registry; fields unavailable.
	Opaque,
}

/// One class-typed instance of an RSZ instance directory.
#[derive(Debug, Clone)]
pub struct Instance {
	class: Option<Arc<ClassDef>>,
	type_id: u32,
	layout_hash: u32,
	ordinal: Option<u32>,
	state: InstanceState,
	fields: Vec<FieldValue>,
	user_data: Option<UserDataEntry>,
}

impl Instance {
	/// The reserved null instance at ordinal 0.
	pub fn null() -> Self {
		Self::null_at(0, 0, 0)
	}

	pub(crate) fn null_at(ordinal: u32, type_id: u32, layout_hash: u32) -> Self {
		Self {
			class: None,
			type_id,
			layout_hash,
			ordinal: Some(ordinal),
			state: InstanceState::Null,
			fields: Vec::new(),
			user_data: None,
		}
	}

	pub(crate) fn opaque(ordinal: u32, type_id: u32, layout_hash: u32) -> Self {
		Self {
			class: None,
			type_id,
			layout_hash,
			ordinal: Some(ordinal),
			state: InstanceState::Opaque,
			fields: Vec::new(),
			user_data: None,
		}
	}

	pub(crate) fn user_data_at(class: Arc<ClassDef>, ordinal: u32, layout_hash: u32, entry: UserDataEntry) -> Self {
		Self {
			type_id: class.type_id,
			layout_hash,
			class: Some(class),
			ordinal: Some(ordinal),
			state: InstanceState::UserData,
			fields: Vec::new(),
			user_data: Some(entry),
		}
	}

	/// Create an unassigned instance with default field values.
	pub fn new(class: Arc<ClassDef>) -> Self {
		let fields = class
			.fields
			.iter()
			.map(|field| FieldValue {
				name: field.name.clone(),
				value: default_value(field),
			})
			.collect();
		Self {
			type_id: class.type_id,
			layout_hash: class.crc,
			class: Some(class),
			ordinal: None,
			state: InstanceState::Decoded,
			fields,
			user_data: None,
		}
	}

	/// Create an unassigned user-data placeholder linked to `entry`.
	pub fn user_data_placeholder(class: Arc<ClassDef>, entry: UserDataEntry) -> Self {
		Self {
			type_id: class.type_id,
			layout_hash: class.crc,
			class: Some(class),
			ordinal: None,
			state: InstanceState::UserData,
			fields: Vec::new(),
			user_data: Some(entry),
		}
	}

	/// Decode fields of `class` in schema order at the cursor position.
	pub fn decode(cursor: &mut Cursor<'_>, class: &Arc<ClassDef>, ordinal: u32, layout_hash: u32) -> Result<Self> {
		let mut fields = Vec::with_capacity(class.fields.len());
		for field in &class.fields {
			let value = if field.array {
				cursor.align(4)?;
				let count = cursor.read_u32()? as usize;
				let mut items = Vec::with_capacity(count.min(cursor.remaining()));
				for _ in 0..count {
					items.push(decode_element(cursor, field)?);
				}
				Value::Array(items)
			} else {
				decode_element(cursor, field)?
			};
			fields.push(FieldValue {
				name: field.name.clone(),
				value,
			});
		}

		log::trace!("decoded instance {ordinal} ({}) with {} fields", class.name, fields.len());
		Ok(Self {
			class: Some(Arc::clone(class)),
			type_id: class.type_id,
			layout_hash,
			ordinal: Some(ordinal),
			state: InstanceState::Decoded,
			fields,
			user_data: None,
		})
	}

	/// Re-emit fields in schema order; no-op for payload-less instances.
	pub fn encode(&self, writer: &mut Writer) -> Result<()> {
		let Some(class) = self.class.as_ref().filter(|_| self.state == InstanceState::Decoded) else {
			return Ok(());
		};

		for (field, item) in class.fields.iter().zip(&self.fields) {
			check_value(field, &item.value)?;
			if field.array {
				let Value::Array(items) = &item.value else {
					return Err(mismatch(field, &item.value));
				};
				writer.align(4);
				writer.write_u32(to_u32("array length", items.len())?);
				for element in items {
					encode_element(writer, field, element)?;
				}
			} else {
				encode_element(writer, field, &item.value)?;
			}
		}
		Ok(())
	}

	/// Deep copy with the ordinal unassigned and the user-data link dropped.
	pub fn clone_detached(&self) -> Self {
		Self {
			class: self.class.clone(),
			type_id: self.type_id,
			layout_hash: self.layout_hash,
			ordinal: None,
			state: self.state,
			fields: self.fields.clone(),
			user_data: None,
		}
	}

	/// Class layout, absent for null and opaque instances.
	pub fn class(&self) -> Option<&Arc<ClassDef>> {
		self.class.as_ref()
	}

	/// Class name, or a placeholder label.
	pub fn name(&self) -> &str {
		match (&self.class, self.state) {
			(Some(class), _) => &class.name,
			(None, InstanceState::Null) => "<null>",
			(None, _) => "<unresolved>",
		}
	}

	/// Type id from the instance directory.
	pub fn type_id(&self) -> u32 {
		self.type_id
	}

	/// Layout hash from the instance directory.
	pub fn layout_hash(&self) -> u32 {
		self.layout_hash
	}

	/// Directory position, `None` while unassigned.
	pub fn ordinal(&self) -> Option<u32> {
		self.ordinal
	}

	pub(crate) fn set_ordinal(&mut self, ordinal: Option<u32>) {
		self.ordinal = ordinal;
	}

	/// Decode status.
	pub fn state(&self) -> InstanceState {
		self.state
	}

	/// Whether this is a null instance.
	pub fn is_null(&self) -> bool {
		self.state == InstanceState::Null
	}

	/// Whether this instance's class could not be resolved.
	pub fn is_opaque(&self) -> bool {
		self.state == InstanceState::Opaque
	}

	/// Decoded fields in schema order.
	pub fn fields(&self) -> &[FieldValue] {
		&self.fields
	}

	/// Linked user-data entry.
	pub fn user_data(&self) -> Option<&UserDataEntry> {
		self.user_data.as_ref()
	}

	/// Mutable linked user-data entry.
	pub fn user_data_mut(&mut self) -> Option<&mut UserDataEntry> {
		self.user_data.as_mut()
	}

	/// Attach a user-data entry, turning this instance into a placeholder.
	pub fn attach_user_data(&mut self, entry: UserDataEntry) {
		if self.class.is_some() {
			self.state = InstanceState::UserData;
			self.fields.clear();
		}
		self.user_data = Some(entry);
	}

	/// Remove and return the linked user-data entry.
	pub fn detach_user_data(&mut self) -> Option<UserDataEntry> {
		self.user_data.take()
	}

	/// Read a field value by name.
	pub fn get_field(&self, name: &str) -> Result<&Value> {
		let index = self.field_index(name)?;
		Ok(&self.fields[index].value)
	}

	/// Replace a field value, rejecting values that do not match the declared type.
	pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
		let index = self.field_index(name)?;
		if let Some(class) = &self.class {
			check_value(&class.fields[index], &value)?;
		}
		self.fields[index].value = value;
		Ok(())
	}

	/// Non-null ordinals referenced by object and user-data fields, in field order.
	pub fn references(&self) -> Vec<u32> {
		let mut out = Vec::new();
		for item in &self.fields {
			item.value.collect_refs(&mut out);
		}
		out.retain(|ordinal| *ordinal != 0);
		out
	}

	/// Rewrite every reference ordinal through `map`; null references are passed to `map` too.
	pub fn remap_references(&mut self, mut map: impl FnMut(u32) -> u32) {
		for item in &mut self.fields {
			item.value.remap_refs(&mut map);
		}
	}

	fn field_index(&self, name: &str) -> Result<usize> {
		let reason = match self.state {
			InstanceState::Decoded => None,
			InstanceState::Null => Some("null instance"),
			InstanceState::Opaque => Some("unresolved class"),
			InstanceState::UserData => Some("user data placeholder"),
		};
		if let Some(reason) = reason {
			return Err(RszError::FieldUnavailable {
				ordinal: self.ordinal,
				reason,
			});
		}

		self.fields
			.iter()
			.position(|item| item.name.as_ref() == name)
			.ok_or_else(|| RszError::FieldNotFound {
				class: self.name().to_owned(),
				field: name.to_owned(),
			})
	}
}

fn decode_element(cursor: &mut Cursor<'_>, field: &FieldDef) -> Result<Value> {
	if field.kind.is_string() {
		cursor.align(4)?;
		let units = cursor.read_u32()? as usize;
		return Ok(Value::from_utf16_units(cursor.read_utf16(units)?));
	}
	if field.kind.is_reference() {
		cursor.align(4)?;
		return Ok(Value::Ref(cursor.read_u32()?));
	}

	cursor.align(field.align)?;
	let value = match field.kind {
		FieldKind::Bool => match cursor.read_u8()? {
			0 => Value::Bool(false),
			1 => Value::Bool(true),
			other => Value::Bytes(vec![other]),
		},
		FieldKind::S8 => Value::I64(i64::from(cursor.read_u8()? as i8)),
		FieldKind::U8 => Value::U64(u64::from(cursor.read_u8()?)),
		FieldKind::S16 => Value::I64(i64::from(cursor.read_u16()? as i16)),
		FieldKind::U16 => Value::U64(u64::from(cursor.read_u16()?)),
		FieldKind::S32 => Value::I64(i64::from(cursor.read_i32()?)),
		FieldKind::U32 => Value::U64(u64::from(cursor.read_u32()?)),
		FieldKind::S64 => Value::I64(cursor.read_i64()?),
		FieldKind::U64 => Value::U64(cursor.read_u64()?),
		FieldKind::F32 => Value::F32(f32::from_bits(cursor.read_u32()?)),
		FieldKind::F64 => Value::F64(f64::from_bits(cursor.read_u64()?)),
		FieldKind::String | FieldKind::Resource | FieldKind::Object | FieldKind::UserData | FieldKind::Raw => {
			Value::Bytes(cursor.read_exact(field.size)?.to_vec())
		}
	};
	Ok(value)
}

fn encode_element(writer: &mut Writer, field: &FieldDef, value: &Value) -> Result<()> {
	match (field.kind, value) {
		(FieldKind::String | FieldKind::Resource, Value::String(text)) => {
			writer.align(4);
			let units = text.encode_utf16().count() + 1;
			writer.write_u32(to_u32("string length", units)?);
			writer.write_wstring(text);
		}
		(FieldKind::String | FieldKind::Resource, Value::Utf16(units)) => {
			writer.align(4);
			writer.write_u32(to_u32("string length", units.len())?);
			writer.write_utf16(units);
		}
		(FieldKind::Object | FieldKind::UserData, Value::Ref(ordinal)) => {
			writer.align(4);
			writer.write_u32(*ordinal);
		}
		(kind, value) => {
			writer.align(field.align);
			match (kind, value) {
				(FieldKind::Bool, Value::Bool(flag)) => writer.write_u8(u8::from(*flag)),
				(FieldKind::Bool, Value::Bytes(raw)) if raw.len() == 1 => writer.write_bytes(raw),
				(FieldKind::S8, Value::I64(number)) => writer.write_u8(*number as i8 as u8),
				(FieldKind::U8, Value::U64(number)) => writer.write_u8(*number as u8),
				(FieldKind::S16, Value::I64(number)) => writer.write_u16(*number as i16 as u16),
				(FieldKind::U16, Value::U64(number)) => writer.write_u16(*number as u16),
				(FieldKind::S32, Value::I64(number)) => writer.write_i32(*number as i32),
				(FieldKind::U32, Value::U64(number)) => writer.write_u32(*number as u32),
				(FieldKind::S64, Value::I64(number)) => writer.write_i64(*number),
				(FieldKind::U64, Value::U64(number)) => writer.write_u64(*number),
				(FieldKind::F32, Value::F32(number)) => writer.write_u32(number.to_bits()),
				(FieldKind::F64, Value::F64(number)) => writer.write_u64(number.to_bits()),
				(FieldKind::Raw, Value::Bytes(bytes)) => writer.write_bytes(bytes),
				_ => return Err(mismatch(field, value)),
			}
		}
	}
	Ok(())
}

fn check_value(field: &FieldDef, value: &Value) -> Result<()> {
	if field.array {
		let Value::Array(items) = value else {
			return Err(mismatch(field, value));
		};
		for item in items {
			check_element(field, item)?;
		}
		return Ok(());
	}
	check_element(field, value)
}

fn check_element(field: &FieldDef, value: &Value) -> Result<()> {
	let ok = match (field.kind, value) {
		(FieldKind::Bool, Value::Bool(_)) => true,
		(FieldKind::Bool, Value::Bytes(raw)) => raw.len() == 1,
		(FieldKind::S8, Value::I64(number)) => i8::try_from(*number).is_ok(),
		(FieldKind::S16, Value::I64(number)) => i16::try_from(*number).is_ok(),
		(FieldKind::S32, Value::I64(number)) => i32::try_from(*number).is_ok(),
		(FieldKind::S64, Value::I64(_)) => true,
		(FieldKind::U8, Value::U64(number)) => u8::try_from(*number).is_ok(),
		(FieldKind::U16, Value::U64(number)) => u16::try_from(*number).is_ok(),
		(FieldKind::U32, Value::U64(number)) => u32::try_from(*number).is_ok(),
		(FieldKind::U64, Value::U64(_)) => true,
		(FieldKind::F32, Value::F32(_)) => true,
		(FieldKind::F64, Value::F64(_)) => true,
		(FieldKind::String | FieldKind::Resource, Value::String(_) | Value::Utf16(_)) => true,
		(FieldKind::Object | FieldKind::UserData, Value::Ref(_)) => true,
		(FieldKind::Raw, Value::Bytes(bytes)) => bytes.len() == field.size,
		_ => false,
	};
	if ok { Ok(()) } else { Err(mismatch(field, value)) }
}

fn mismatch(field: &FieldDef, value: &Value) -> RszError {
	let expected = if field.array {
		format!("{}[]", field.kind.as_str())
	} else {
		field.kind.as_str().to_owned()
	};
	RszError::FieldTypeMismatch {
		field: field.name.to_string(),
		expected,
		got: value.kind_name(),
	}
}

fn default_value(field: &FieldDef) -> Value {
	if field.array {
		return Value::Array(Vec::new());
	}
	match field.kind {
		FieldKind::Bool => Value::Bool(false),
		FieldKind::S8 | FieldKind::S16 | FieldKind::S32 | FieldKind::S64 => Value::I64(0),
		FieldKind::U8 | FieldKind::U16 | FieldKind::U32 | FieldKind::U64 => Value::U64(0),
		FieldKind::F32 => Value::F32(0.0),
		FieldKind::F64 => Value::F64(0.0),
		FieldKind::String | FieldKind::Resource => Value::String(String::new()),
		FieldKind::Object | FieldKind::UserData => Value::Ref(0),
		FieldKind::Raw => Value::Bytes(vec![0; field.size]),
	}
}

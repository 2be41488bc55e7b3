/// Runtime value of one decoded field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Boolean scalar.
	Bool(bool),
	/// Signed integer scalar.
	I64(i64),
	/// Unsigned integer scalar.
	U64(u64),
	/// 32-bit float scalar.
	F32(f32),
	/// 64-bit float scalar.
	F64(f64),
	/// Fixed-size compound kept verbatim.
	Bytes(Vec<u8>),
	/// UTF-16 string or resource path.
	String(String),
	/// String field whose stored code units do not form one NUL-terminated
	/// UTF-16 string; kept verbatim, terminator included.
	Utf16(Vec<u16>),
	/// Ordinal of another instance in the owning directory; `0` is null.
	Ref(u32),
	/// Counted array of element values.
	Array(Vec<Value>),
}

impl Value {
	/// Stable label for diagnostics and type errors.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Bool(_) => "bool",
			Self::I64(_) => "i64",
			Self::U64(_) => "u64",
			Self::F32(_) => "f32",
			Self::F64(_) => "f64",
			Self::Bytes(_) => "bytes",
			Self::String(_) => "string",
			Self::Utf16(_) => "utf16",
			Self::Ref(_) => "ref",
			Self::Array(_) => "array",
		}
	}

	/// Borrow the string payload.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(text) => Some(text),
			_ => None,
		}
	}

	/// Decode stored string units, keeping them raw unless they re-encode to the same units.
	pub(crate) fn from_utf16_units(units: Vec<u16>) -> Self {
		if let Some((&0, body)) = units.split_last() {
			if let Ok(text) = String::from_utf16(body) {
				return Self::String(text);
			}
		}
		Self::Utf16(units)
	}

	/// Return the referenced ordinal.
	pub fn as_ref_ordinal(&self) -> Option<u32> {
		match self {
			Self::Ref(ordinal) => Some(*ordinal),
			_ => None,
		}
	}

	/// Return a signed integer payload.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::I64(value) => Some(*value),
			_ => None,
		}
	}

	/// Return an unsigned integer payload.
	pub fn as_u64(&self) -> Option<u64> {
		match self {
			Self::U64(value) => Some(*value),
			_ => None,
		}
	}

	/// Return a boolean payload.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			_ => None,
		}
	}

	/// Borrow array elements.
	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Self::Array(items) => Some(items),
			_ => None,
		}
	}

	pub(crate) fn collect_refs(&self, out: &mut Vec<u32>) {
		match self {
			Self::Ref(ordinal) => out.push(*ordinal),
			Self::Array(items) => {
				for item in items {
					item.collect_refs(out);
				}
			}
			_ => {}
		}
	}

	pub(crate) fn remap_refs(&mut self, map: &mut impl FnMut(u32) -> u32) {
		match self {
			Self::Ref(ordinal) => *ordinal = map(*ordinal),
			Self::Array(items) => {
				for item in items {
					item.remap_refs(map);
				}
			}
			_ => {}
		}
	}
}

/// Named decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
	/// Field identifier.
	pub name: Box<str>,
	/// Decoded field payload.
	pub value: Value,
}

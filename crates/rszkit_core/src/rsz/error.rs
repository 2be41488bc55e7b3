use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, RszError>;

/// Coarse error classes used by callers to decide how far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Bad magic or malformed tables; the read is aborted.
	Structural,
	/// A class could not be resolved or a field could not be accessed.
	Schema,
	/// Dangling parent or ordinal; tree build/rebuild is aborted.
	Reference,
	/// Access past the end of a buffer.
	IoBoundary,
	/// Filesystem, descriptor or API misuse.
	Usage,
}

/// Errors produced while reading, editing and writing RSZ containers.
#[derive(Debug, Error)]
pub enum RszError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Leading magic did not match the container being read.
	#[error("not a {container} container: expected magic 0x{expected:08x}, got 0x{got:08x}")]
	BadMagic {
		/// Container kind being read.
		container: &'static str,
		/// Magic required by the container.
		expected: u32,
		/// Magic found in the data.
		got: u32,
	},
	/// Leading magic matches no known container.
	#[error("unrecognized container magic 0x{magic:08x}")]
	UnknownContainer {
		/// Magic found in the data, or zero when fewer than four bytes exist.
		magic: u32,
	},
	/// Two user-data directory entries point at the same instance.
	#[error("duplicate user data entry for instance {instance_id}")]
	DuplicateUserData {
		/// Instance ordinal claimed twice.
		instance_id: u32,
	},
	/// A user-data entry names an ordinal outside the instance directory.
	#[error("user data entry targets instance {instance_id}, directory has {len} instances")]
	UserDataOutOfRange {
		/// Ordinal stored in the entry.
		instance_id: u32,
		/// Instance directory length.
		len: usize,
	},
	/// A user-data entry's shape does not match the block's schema version.
	#[error("user data entry for instance {instance_id} does not use the {expected} layout")]
	UserDataShape {
		/// Ordinal of the owning instance.
		instance_id: u32,
		/// Layout required by the block.
		expected: &'static str,
	},
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Absolute byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// A wide string ran to the end of the buffer without a terminator.
	#[error("unterminated wide string at offset {at}")]
	UnterminatedString {
		/// Absolute byte offset where the string starts.
		at: usize,
	},
	/// A path string is not valid UTF-16.
	#[error("invalid UTF-16 in path string at offset {at}")]
	InvalidUtf16 {
		/// Absolute byte offset where the string starts.
		at: usize,
	},
	/// Deferred strings were flushed again with nothing pending.
	#[error("string table flushed twice with no pending strings")]
	StringTableEmpty,
	/// Class descriptor JSON could not be parsed.
	#[error("registry descriptor: {0}")]
	RegistryJson(#[from] serde_json::Error),
	/// A report could not be encoded as JSON.
	#[error("failed to encode json: {0}")]
	JsonOutput(serde_json::Error),
	/// Class descriptor parsed but is not usable.
	#[error("invalid registry descriptor: {reason}")]
	RegistryInvalid {
		/// Human-readable reason.
		reason: String,
	},
	/// Game identifier is not known to the profile table.
	#[error("unknown game profile: {name}")]
	UnknownGame {
		/// Requested game identifier.
		name: String,
	},
	/// Requested class is absent from the registry.
	#[error("class not found: {key}")]
	ClassNotFound {
		/// Type id or class name that was looked up.
		key: String,
	},
	/// Requested field does not exist on the class.
	#[error("field {field} not found on {class}")]
	FieldNotFound {
		/// Class name.
		class: String,
		/// Requested field name.
		field: String,
	},
	/// Instance has no decoded fields to access.
	#[error("fields of instance {ordinal:?} are unavailable: {reason}")]
	FieldUnavailable {
		/// Ordinal of the instance, if assigned.
		ordinal: Option<u32>,
		/// Why the fields are unavailable.
		reason: &'static str,
	},
	/// Value does not match the field's declared type.
	#[error("field {field} expects {expected}, got {got}")]
	FieldTypeMismatch {
		/// Field name.
		field: String,
		/// Declared field type.
		expected: String,
		/// Kind of the rejected value.
		got: &'static str,
	},
	/// Game object names a parent that does not exist.
	#[error("game object {object_id} references missing parent {parent_id}")]
	DanglingParent {
		/// Object-table position of the child.
		object_id: i32,
		/// Missing parent object-table position.
		parent_id: i32,
	},
	/// Two game object records share one object id.
	#[error("duplicate game object id {object_id}")]
	DuplicateObjectId {
		/// Repeated object-table position.
		object_id: i32,
	},
	/// Parent links form a loop that never reaches a root.
	#[error("game object {object_id} is part of a parent cycle")]
	ParentCycle {
		/// One object-table position on the cycle.
		object_id: i32,
	},
	/// Object-table position outside the object table.
	#[error("object table index {index} out of range (len={len})")]
	ObjectIndexOutOfRange {
		/// Requested position.
		index: i64,
		/// Object table length.
		len: usize,
	},
	/// Instance ordinal or handle outside the instance directory.
	#[error("instance ordinal {ordinal} out of range (len={len})")]
	OrdinalOutOfRange {
		/// Requested ordinal.
		ordinal: u32,
		/// Directory length.
		len: usize,
	},
	/// The reserved null instance was used as a game object or component.
	#[error("null instance used as game object or component")]
	NullInstanceInTree,
	/// Operation is not allowed in the container's current state.
	#[error("cannot {op} while container is {state}")]
	InvalidState {
		/// Attempted operation.
		op: &'static str,
		/// Current state label.
		state: &'static str,
	},
	/// A count or offset does not fit the on-disk field.
	#[error("{what} does not fit on disk: {value}")]
	ValueOutOfRange {
		/// Field being written.
		what: &'static str,
		/// Offending value.
		value: u64,
	},
}

impl RszError {
	/// Classify this error into the container error taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::BadMagic { .. }
			| Self::UnknownContainer { .. }
			| Self::DuplicateUserData { .. }
			| Self::UserDataOutOfRange { .. }
			| Self::UserDataShape { .. }
			| Self::UnterminatedString { .. }
			| Self::InvalidUtf16 { .. } => ErrorKind::Structural,
			Self::ClassNotFound { .. } | Self::FieldNotFound { .. } | Self::FieldUnavailable { .. } | Self::FieldTypeMismatch { .. } => ErrorKind::Schema,
			Self::DanglingParent { .. }
			| Self::DuplicateObjectId { .. }
			| Self::ParentCycle { .. }
			| Self::ObjectIndexOutOfRange { .. }
			| Self::OrdinalOutOfRange { .. }
			| Self::NullInstanceInTree => ErrorKind::Reference,
			Self::UnexpectedEof { .. } => ErrorKind::IoBoundary,
			Self::Io(_)
			| Self::StringTableEmpty
			| Self::RegistryJson(_)
			| Self::JsonOutput(_)
			| Self::RegistryInvalid { .. }
			| Self::UnknownGame { .. }
			| Self::InvalidState { .. }
			| Self::ValueOutOfRange { .. } => ErrorKind::Usage,
		}
	}
}

use crate::rsz::RszBlock;

/// Out-of-line payload reference attached to one instance ordinal.
#[derive(Debug, Clone)]
pub struct UserDataEntry {
	/// Ordinal of the owning instance; rewritten on rebuild.
	pub instance_id: u32,
	/// Type id of the referenced user-data class.
	pub type_id: u32,
	/// Shape-specific payload.
	pub payload: UserDataPayload,
}

/// The two on-disk user-data shapes.
#[derive(Debug, Clone)]
pub enum UserDataPayload {
	/// Schema version >= 67: path to an external `.user` file.
	External {
		/// Resource path of the external file.
		path: String,
	},
	/// Schema version < 67: nested RSZ block stored inside the container.
	Embedded {
		/// Hash of the source JSON path.
		path_hash: u32,
		/// Nested block byte size as read from disk.
		data_size: u32,
		/// Nested block offset as read from disk, relative to the parent block.
		offset: u64,
		/// Parsed nested block.
		block: Box<RszBlock>,
	},
}

impl UserDataEntry {
	/// Create a modern external-path entry.
	pub fn external(instance_id: u32, type_id: u32, path: impl Into<String>) -> Self {
		Self {
			instance_id,
			type_id,
			payload: UserDataPayload::External { path: path.into() },
		}
	}

	/// Create a legacy embedded entry; size and offset are assigned on write.
	pub fn embedded(instance_id: u32, type_id: u32, path_hash: u32, block: RszBlock) -> Self {
		Self {
			instance_id,
			type_id,
			payload: UserDataPayload::Embedded {
				path_hash,
				data_size: 0,
				offset: 0,
				block: Box::new(block),
			},
		}
	}

	/// External path, for modern entries.
	pub fn path(&self) -> Option<&str> {
		match &self.payload {
			UserDataPayload::External { path } => Some(path),
			UserDataPayload::Embedded { .. } => None,
		}
	}

	/// Nested block, for legacy entries.
	pub fn embedded_block(&self) -> Option<&RszBlock> {
		match &self.payload {
			UserDataPayload::External { .. } => None,
			UserDataPayload::Embedded { block, .. } => Some(block),
		}
	}

	/// Mutable nested block, for legacy entries.
	pub fn embedded_block_mut(&mut self) -> Option<&mut RszBlock> {
		match &mut self.payload {
			UserDataPayload::External { .. } => None,
			UserDataPayload::Embedded { block, .. } => Some(block),
		}
	}

	/// Whether this entry uses the legacy embedded shape.
	pub fn is_embedded(&self) -> bool {
		matches!(self.payload, UserDataPayload::Embedded { .. })
	}
}

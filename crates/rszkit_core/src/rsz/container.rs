use crate::rsz::{PFB_MAGIC, RSZ_MAGIC, Result, RszError, USER_MAGIC};

/// Container family identified by its leading magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
	/// Prefab (`PFB\0`).
	Pfb,
	/// Generic user-data file (`USR\0`).
	User,
	/// Bare RSZ block (`RSZ\0`).
	Rsz,
}

impl ContainerKind {
	/// Identify a container from its first four bytes.
	pub fn sniff(bytes: &[u8]) -> Option<Self> {
		let magic = u32::from_le_bytes(bytes.get(0..4)?.try_into().ok()?);
		match magic {
			PFB_MAGIC => Some(Self::Pfb),
			USER_MAGIC => Some(Self::User),
			RSZ_MAGIC => Some(Self::Rsz),
			_ => None,
		}
	}

	/// Like [`ContainerKind::sniff`], but reports the unrecognized magic.
	pub fn detect(bytes: &[u8]) -> Result<Self> {
		Self::sniff(bytes).ok_or_else(|| {
			let mut magic = [0_u8; 4];
			if let Some(head) = bytes.get(0..4) {
				magic.copy_from_slice(head);
			}
			RszError::UnknownContainer {
				magic: u32::from_le_bytes(magic),
			}
		})
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pfb => "pfb",
			Self::User => "user",
			Self::Rsz => "rsz",
		}
	}
}

/// Lifecycle of an editable container.
///
/// `Unloaded -> Reading -> Loaded -> TreeBuilt -> Dirty -> Rebuilding -> Writable -> Written`;
/// a failed read falls back to `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
	/// Nothing read yet, or the last read failed.
	Unloaded,
	/// A read is in progress.
	Reading,
	/// Flat tables decoded; no tree built yet.
	Loaded,
	/// Game-object tree derived from the flat tables.
	TreeBuilt,
	/// Tree or instances mutated since the last rebuild.
	Dirty,
	/// Flat tables are being regenerated from the tree.
	Rebuilding,
	/// Flat tables match the tree.
	Writable,
	/// Bytes were written out.
	Written,
}

impl ContainerState {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unloaded => "unloaded",
			Self::Reading => "reading",
			Self::Loaded => "loaded",
			Self::TreeBuilt => "tree-built",
			Self::Dirty => "dirty",
			Self::Rebuilding => "rebuilding",
			Self::Writable => "writable",
			Self::Written => "written",
		}
	}

	/// Whether serializing in this state yields consistent bytes.
	pub fn can_write(self) -> bool {
		matches!(self, Self::Loaded | Self::TreeBuilt | Self::Writable | Self::Written)
	}
}

mod block;
/// Bounded little-endian reader and writer primitives.
pub mod bytes;
mod container;
mod error;
mod graph;
mod instance;
mod pfb;
mod profile;
mod registry;
mod user;
mod userdata;
mod value;

pub use block::{Diagnostic, DiagnosticKind, InstanceInfo, RSZ_MAGIC, RszBlock, RszHeader};
pub use container::{ContainerKind, ContainerState};
pub use error::{ErrorKind, Result, RszError};
pub use graph::{AdaptedTree, GameObjectInfo, GameObjectNode, InstanceHandle, ObjectGraph, RebuildOptions, RebuildResult};
pub use instance::{Instance, InstanceState};
pub use pfb::{GameObjectRefInfo, PFB_MAGIC, PfbFile, PfbHeader, ResourceInfo, UserdataInfo};
pub use profile::{GameProfile, LEGACY_USER_DATA_BELOW};
pub use registry::{ClassDef, ClassRegistry, FieldDef, FieldKind};
pub use user::{USER_MAGIC, UserFile, UserHeader};
pub use userdata::{UserDataEntry, UserDataPayload};
pub use value::{FieldValue, Value};

/// Registry listing and class layout command.
pub mod classes;
/// Container header and table summary command.
pub mod info;
/// Prefab table rebuild command.
pub mod rebuild;
/// Read-then-write fidelity check command.
pub mod roundtrip;
/// Prefab game-object forest command.
pub mod tree;
/// Shared argument and output helpers.
pub mod util;

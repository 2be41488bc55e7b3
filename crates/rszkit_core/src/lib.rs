//! Read, edit and rewrite RSZ-serialized game asset containers.

/// RSZ block codec, class registry, object graph and PFB/USER containers.
pub mod rsz;

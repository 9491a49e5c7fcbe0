// Re-export protobuf, so we use a consistent version.
pub use protobuf;

// Export the generated modules.
include!(concat!(env!("OUT_DIR"), "/protos/mod.rs"));

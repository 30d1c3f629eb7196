mod compiler;
mod database;

pub use compiler::{
    compile_level_descriptors, ContentCompileError, ContentErrorCode, SourceLocation,
};
pub use database::{LevelDescriptor, LevelDescriptorDatabase};

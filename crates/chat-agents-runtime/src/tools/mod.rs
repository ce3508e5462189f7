pub mod filesystem;

pub use filesystem::{
    create_filesystem_tools, EditFileTool, GlobTool, LsTool, ReadFileTool, SharedBackend,
    WriteFileTool,
};

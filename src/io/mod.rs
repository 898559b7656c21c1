pub mod project_io;
pub mod storage;

pub mod archive;
pub mod archived;
pub mod completion;
pub mod crud;
pub mod dates;
pub mod navigation;
pub mod orphans;
pub mod slug;
pub mod status;
pub mod task;

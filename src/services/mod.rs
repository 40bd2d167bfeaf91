pub mod directory;
pub mod notify;
pub mod queries;
pub mod repo;
pub mod rides;

pub mod byte_store;
pub mod layout;
pub mod file_lock;

pub mod kv;
pub mod record;

pub use kv::Store;
pub use record::Record;

pub mod in_memory;
pub mod partner_http;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod row_lock;

pub mod storage;

pub use storage::{StorageContract, ENTRYPOINT};

pub mod amount;
pub mod receipt;
pub mod response;

pub use amount::*;
pub use receipt::*;
pub use response::*;

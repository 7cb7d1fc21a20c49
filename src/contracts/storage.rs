use ethers::prelude::*;

// Write target for finalized bill amounts. `set` is the only entrypoint used.
abigen!(
    StorageContract,
    r#"[
        function set(uint256 value) external
    ]"#
);

pub const ENTRYPOINT: &str = "set";

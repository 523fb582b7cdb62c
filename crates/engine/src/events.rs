use alloy_primitives::{Address, U256};
use keyguard_macros::standard;
use keyguard_tx::Selector;

/// Key manager events
#[standard]
pub enum KeyManagerEvent {
    /// A controller was authorized to run `selector` on the account
    PermissionsVerified {
        signer: Address,
        value: U256,
        selector: Selector,
    },
}

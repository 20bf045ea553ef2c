use serde::{Deserialize, Serialize};

pub type Address = u32;

/// Hands out component addresses in registration order, so the same
/// bootstrap always yields the same addresses.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AddressGenerator {
    curr: u32,
}

impl AddressGenerator {
    pub fn new() -> AddressGenerator {
        AddressGenerator { curr: 0 }
    }

    pub fn next(&mut self) -> Address {
        let addr = self.curr;

        self.curr += 1;

        addr
    }
}

// Risk management: position sizing against account risk.
pub mod lot;

pub use lot::{lot_size, LotSpec};

//! Reference strategies implementing [`Strategy`](super::Strategy).

mod breakout;
mod dca;
mod grid;
mod mean_reversion;
mod momentum;

pub use breakout::{BreakoutConfig, BreakoutStrategy};
pub use dca::{DcaConfig, DcaDirection, DcaStrategy};
pub use grid::{GridConfig, GridStrategy};
pub use mean_reversion::{MeanReversionConfig, MeanReversionStrategy};
pub use momentum::{MomentumConfig, MomentumStrategy};

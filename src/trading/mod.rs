//! Strategy contract, shared strategy parameters, risk checks and the
//! bundled reference strategies.

mod config;
pub mod indicators;
mod risk;
pub mod strategies;
mod strategy;

pub use config::StrategyConfig;
pub use risk::{AcceptAll, LimitsRiskManager, RiskDecision, RiskLimits, RiskManager};
pub use strategies::{
    BreakoutConfig, BreakoutStrategy, DcaConfig, DcaDirection, DcaStrategy, GridConfig, GridStrategy,
    MeanReversionConfig, MeanReversionStrategy, MomentumConfig, MomentumStrategy,
};
pub use strategy::{Strategy, StrategyStats};

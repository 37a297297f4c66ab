//! Search service construction and the composed service.

mod builder;
mod market;

pub use builder::{Fleamark, FleamarkBuilder};
pub use market::MarketSearch;

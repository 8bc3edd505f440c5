pub mod candle;
pub mod frame;
pub mod indicators;

pub use candle::{Candle, CandleSeries, Timeframe};
pub use frame::IndicatorFrame;

pub mod fib;
pub mod ignition;
pub mod pivots;
pub mod rally;
pub mod swings;
pub mod zones;

pub use fib::{fib_from_swings, intelligent_fib, FibDirection, FibLevel, FibSet};
pub use ignition::{detect_ignition, IgnitionSignal, IgnitionState, TradeLevels};
pub use pivots::{classic_pivots, pivots_from_daily, PivotLevels};
pub use rally::{exit_triggers, rally_score, RallyScore};
pub use swings::{find_swings_zigzag, Swing, SwingKind};
pub use zones::{build_zones, confluence_zones, Zone, ZoneKind, ZoneParams};

//! Explicit command registry for the external command surface. Populated by
//! explicit `register` calls at startup, never directory scanning, so what is
//! registered can be verified statically and listed deterministically.

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub section: &'static str,
    pub desc: &'static str,
    /// Listing position within a section, lowest first.
    pub order: u32,
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    map: FxHashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, replacing any previous spec with the same name.
    /// Returns the replaced spec, if any.
    pub fn register(&mut self, spec: CommandSpec) -> Option<CommandSpec> {
        self.map.insert(spec.name, spec)
    }

    pub fn resolve(&self, name: &str) -> Option<&CommandSpec> {
        self.map.get(name)
    }

    /// All commands, ordered by (section, order, name).
    pub fn list(&self) -> Vec<&CommandSpec> {
        let mut out: Vec<&CommandSpec> = self.map.values().collect();
        out.sort_by_key(|s| (s.section, s.order, s.name));
        out
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The built-in command surface.
pub fn default_registry() -> CommandRegistry {
    let mut reg = CommandRegistry::new();
    let specs = [
        CommandSpec { name: "start", section: "monitoring", desc: "Start monitoring this channel", order: 10 },
        CommandSpec { name: "stop", section: "monitoring", desc: "Stop monitoring this channel", order: 20 },
        CommandSpec { name: "status", section: "monitoring", desc: "Show this channel's configuration", order: 30 },
        CommandSpec { name: "rallywatch", section: "monitoring", desc: "Toggle aggressive ignition watch and scan now", order: 40 },
        CommandSpec { name: "zones", section: "analysis", desc: "Confluence R/S zones per active timeframe", order: 10 },
        CommandSpec { name: "setcoin", section: "config", desc: "Set symbol and exchange for this channel", order: 10 },
        CommandSpec { name: "settimeframes", section: "config", desc: "Set the monitored timeframes", order: 20 },
        CommandSpec { name: "setscore", section: "config", desc: "Set the rally score threshold", order: 30 },
        CommandSpec { name: "setthresholds", section: "config", desc: "Set RSI/volume thresholds", order: 40 },
        CommandSpec { name: "cooloff", section: "config", desc: "Set minutes between alerts", order: 50 },
    ];
    for spec in specs {
        reg.register(spec);
    }
    reg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_surface_resolves_by_name() {
        let reg = default_registry();
        assert_eq!(reg.len(), 10);
        assert!(reg.resolve("start").is_some());
        assert!(reg.resolve("zones").is_some());
        assert!(reg.resolve("does-not-exist").is_none());
    }

    #[test]
    fn duplicate_registration_replaces() {
        let mut reg = CommandRegistry::new();
        reg.register(CommandSpec { name: "ping", section: "misc", desc: "old", order: 1 });
        let old = reg
            .register(CommandSpec { name: "ping", section: "misc", desc: "new", order: 1 })
            .unwrap();
        assert_eq!(old.desc, "old");
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.resolve("ping").unwrap().desc, "new");
    }

    #[test]
    fn listing_is_deterministic() {
        let reg = default_registry();
        let listed = reg.list();
        assert_eq!(listed.len(), reg.len());
        let mut sorted = listed.clone();
        sorted.sort_by_key(|s| (s.section, s.order, s.name));
        assert_eq!(listed, sorted);
    }
}

//! Named zone collection with stable iteration order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Zone, ZoneError};

/// Holds all configured zones, keyed by name. Iteration order is the sorted
/// name order, which keeps overlay composition deterministic.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneRegistry {
    zones: BTreeMap<String, Zone>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone. Names are unique; adding a second zone with the same
    /// name is an error rather than a silent replace.
    pub fn add(&mut self, zone: Zone) -> Result<(), ZoneError> {
        let name = zone.name().to_owned();
        if self.zones.contains_key(&name) {
            return Err(ZoneError::DuplicateZone(name));
        }
        self.zones.insert(name, zone);
        Ok(())
    }

    /// Remove a zone and everything it owns (mappings, cached overlays).
    pub fn remove(&mut self, name: &str) -> Result<Zone, ZoneError> {
        self.zones
            .remove(name)
            .ok_or_else(|| ZoneError::UnknownZone(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.zones.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Zone> {
        self.zones.values_mut()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn clear(&mut self) {
        self.zones.clear();
    }

    pub fn to_json(&self) -> Result<String, ZoneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ZoneError> {
        let registry: ZoneRegistry = serde_json::from_str(text)?;
        for zone in registry.iter() {
            zone.validate()?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unit;

    fn zone(name: &str) -> Zone {
        Zone::new(name, 10.0, 10.0, Unit::Cm, 4.0).expect("zone")
    }

    #[test]
    fn add_get_remove() {
        let mut reg = ZoneRegistry::new();
        reg.add(zone("table")).expect("add");
        assert!(reg.contains("table"));
        assert_eq!(reg.get("table").map(|z| z.name()), Some("table"));

        let removed = reg.remove("table").expect("remove");
        assert_eq!(removed.name(), "table");
        assert!(reg.is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = ZoneRegistry::new();
        reg.add(zone("table")).expect("add");
        assert!(matches!(
            reg.add(zone("table")),
            Err(ZoneError::DuplicateZone(name)) if name == "table"
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn removing_unknown_zone_fails() {
        let mut reg = ZoneRegistry::new();
        assert!(matches!(
            reg.remove("ghost"),
            Err(ZoneError::UnknownZone(name)) if name == "ghost"
        ));
    }

    #[test]
    fn iteration_is_name_ordered() {
        let mut reg = ZoneRegistry::new();
        reg.add(zone("zebra")).expect("add");
        reg.add(zone("apple")).expect("add");
        reg.add(zone("mango")).expect("add");
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, ["apple", "mango", "zebra"]);
    }

    #[test]
    fn json_round_trip() {
        let mut reg = ZoneRegistry::new();
        reg.add(zone("a")).expect("add");
        reg.add(zone("b")).expect("add");

        let json = reg.to_json().expect("serialize");
        let back = ZoneRegistry::from_json(&json).expect("parse");
        assert_eq!(back.len(), 2);
        assert!(back.contains("a") && back.contains("b"));
    }
}

use anyhow::{Context, Result};
use model::Vehicle;
use std::{collections::HashMap, path::Path};

// a handful of cars for tests and demos, not the full in-game inventory
const SAMPLE: &str = include_str!("../data/sample_vehicles.json");

/// Vehicle metadata keyed by the console's numeric car id.
#[derive(Clone, Debug, Default)]
pub struct VehicleCatalog {
    db: HashMap<u32, Vehicle>,
    sample: bool,
}

impl VehicleCatalog {
    /// Small sample catalog compiled into the crate. Real sessions should
    /// load the full inventory through [`VehicleCatalog::load`].
    pub fn bundled() -> Result<Self> {
        let mut catalog = Self::from_json_str(SAMPLE).context("parse bundled vehicle catalog")?;
        catalog.sample = true;
        Ok(catalog)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let db: HashMap<u32, Vehicle> = serde_json::from_str(s)?;
        Ok(Self { db, sample: false })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read vehicle catalog {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parse vehicle catalog {}", path.display()))
    }

    /// Override file when given, bundled catalog otherwise.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        match override_path {
            Some(p) => Self::from_path(p),
            None => Self::bundled(),
        }
    }

    /// True for the compiled-in sample.
    pub fn is_sample(&self) -> bool {
        self.sample
    }

    pub fn get(&self, id: u32) -> Option<&Vehicle> {
        self.db.get(&id)
    }

    /// Unknown ids give an empty record.
    pub fn lookup(&self, id: u32) -> Vehicle {
        self.get(id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl FromIterator<Vehicle> for VehicleCatalog {
    fn from_iter<I: IntoIterator<Item = Vehicle>>(iter: I) -> Self {
        Self { db: iter.into_iter().map(|v| (v.id, v)).collect(), sample: false }
    }
}

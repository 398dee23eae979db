use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{
    error::{Error, Result},
    weights::FieldWeights,
};

const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

pub const MODEL_NAME_KEY: &str = "model_name";
pub const EMBEDDER_KEY: &str = "embedder";
pub const FIELD_WEIGHTS_KEY: &str = "field_weights";

pub struct ConfigDb {
    db: Database,
}

impl ConfigDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Get a setting, returning the default if not set.
    pub fn get_setting_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get_setting(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    pub fn remove_setting(&self, key: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(SETTINGS)?;
            table.remove(key)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }

    // -- Field weights --

    /// Stored weights, or `None` when the defaults are in effect.
    pub fn field_weights(&self) -> Result<Option<FieldWeights>> {
        self.get_setting(FIELD_WEIGHTS_KEY)?
            .map(|json| FieldWeights::from_json(&json))
            .transpose()
    }

    pub fn set_field_weights(&self, weights: &FieldWeights) -> Result<()> {
        weights.validate()?;
        self.set_setting(FIELD_WEIGHTS_KEY, &weights.to_json()?)
    }

    // -- Embedder --

    /// Fail if the store was populated by a different embedder.
    pub fn check_embedder(&self, name: &str) -> Result<()> {
        match self.get_setting(EMBEDDER_KEY)? {
            Some(stored) if stored != name => Err(Error::Config(format!(
                "store was built with the '{stored}' embedder but '{name}' was \
                 requested; re-ingest with --reset to switch"
            ))),
            _ => Ok(()),
        }
    }

    /// Record the embedder used to populate the store.
    pub fn record_embedder(&self, name: &str) -> Result<()> {
        self.check_embedder(name)?;
        self.set_setting(EMBEDDER_KEY, name)
    }
}

impl std::fmt::Debug for ConfigDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDb").finish_non_exhaustive()
    }
}

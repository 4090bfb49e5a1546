//! Repository for connector definitions and their last execution.

use intools_core::executor::JsonObject;
use intools_core::{Connector, Executor};

use crate::error::StoreError;
use crate::keys;
use crate::store::{get_json, to_json, Store, Transaction};

/// Provides persistence operations for connectors.
pub struct ConnectorRepo;

impl ConnectorRepo {
    /// Upsert a connector.
    ///
    /// In one transaction: moves the connector name to the head of its
    /// group's list, moves the group to the head of the group index and
    /// writes the connector JSON. Saving twice leaves one entry of each.
    pub async fn save(store: &dyn Store, connector: &Connector) -> Result<(), StoreError> {
        let conf_key = keys::connector_conf(&connector.group, &connector.name);
        let raw = to_json(&conf_key, connector)?;

        let tx = Transaction::new()
            .list_upsert(keys::group_connectors(&connector.group), connector.name.clone())
            .list_upsert(keys::groups(), connector.group.clone())
            .set(conf_key, raw);
        store.exec(tx).await
    }

    /// Load a connector definition.
    pub async fn find(
        store: &dyn Store,
        group: &str,
        name: &str,
    ) -> Result<Option<Connector>, StoreError> {
        get_json(store, &keys::connector_conf(group, name)).await
    }

    /// Names of the connectors in `group`, most recently saved first.
    pub async fn list_names(store: &dyn Store, group: &str) -> Result<Vec<String>, StoreError> {
        store.list_range(&keys::group_connectors(group)).await
    }

    /// Load every connector of `group`.
    ///
    /// Entries whose definition is missing or unreadable are skipped with a
    /// warning so one bad record does not hide the rest of the group.
    pub async fn list(store: &dyn Store, group: &str) -> Result<Vec<Connector>, StoreError> {
        let names = Self::list_names(store, group).await?;
        let mut connectors = Vec::with_capacity(names.len());
        for name in names {
            match Self::find(store, group, &name).await {
                Ok(Some(connector)) => connectors.push(connector),
                Ok(None) => {
                    tracing::warn!(group, connector = %name, "Connector listed without a definition, skipping");
                }
                Err(e) => {
                    tracing::warn!(group, connector = %name, error = %e, "Unreadable connector definition, skipping");
                }
            }
        }
        Ok(connectors)
    }

    /// Purge the definition, last executor and last result of a connector
    /// and drop it from its group's list.
    pub async fn remove(store: &dyn Store, group: &str, name: &str) -> Result<(), StoreError> {
        let tx = Transaction::new()
            .delete(vec![
                keys::connector_conf(group, name),
                keys::connector_executor(group, name),
                keys::connector_result(group, name),
            ])
            .list_remove(keys::group_connectors(group), name);
        store.exec(tx).await
    }

    /// Record the outcome of a run.
    ///
    /// The result slot is only overwritten when the run is valid, so it
    /// always holds the payload of the last run whose logs were read.
    pub async fn save_executor(
        store: &dyn Store,
        group: &str,
        name: &str,
        executor: &Executor,
    ) -> Result<(), StoreError> {
        let exec_key = keys::connector_executor(group, name);
        let mut tx = Transaction::new().set(exec_key.clone(), to_json(&exec_key, executor)?);
        if executor.valid {
            let result_key = keys::connector_result(group, name);
            let raw = to_json(&result_key, &executor.json_stdout)?;
            tx = tx.set(result_key, raw);
        }
        store.exec(tx).await
    }

    /// Last recorded executor, valid or not.
    pub async fn find_executor(
        store: &dyn Store,
        group: &str,
        name: &str,
    ) -> Result<Option<Executor>, StoreError> {
        get_json(store, &keys::connector_executor(group, name)).await
    }

    /// Parsed stdout of the last valid run.
    ///
    /// The outer `Option` is `None` when no valid run was recorded; the
    /// inner one when that run's stdout was not a JSON object.
    pub async fn find_result(
        store: &dyn Store,
        group: &str,
        name: &str,
    ) -> Result<Option<Option<JsonObject>>, StoreError> {
        get_json(store, &keys::connector_result(group, name)).await
    }
}

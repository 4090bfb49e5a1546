//! Registry service: persistence plus scheduling for groups and connectors.

use std::sync::Arc;

use intools_core::connector::validate_segment;
use intools_core::{Connector, Executor, Group};
use intools_db::repositories::{ConnectorRepo, GroupRepo};

use crate::context::EngineContext;
use crate::error::RegistryError;
use crate::executor::ExecutionEngine;
use crate::scheduler::Scheduler;

pub struct Registry {
    ctx: EngineContext,
    engine: Arc<ExecutionEngine>,
    scheduler: Arc<Scheduler>,
}

impl Registry {
    pub fn new(ctx: EngineContext, engine: Arc<ExecutionEngine>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            ctx,
            engine,
            scheduler,
        }
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    // ---- connectors ----

    pub async fn get_connector(&self, group: &str, name: &str) -> Result<Connector, RegistryError> {
        ConnectorRepo::find(self.ctx.store.as_ref(), group, name)
            .await?
            .ok_or_else(|| RegistryError::not_found("Connector", format!("{group}:{name}")))
    }

    pub async fn list_connectors(&self, group: &str) -> Result<Vec<Connector>, RegistryError> {
        Ok(ConnectorRepo::list(self.ctx.store.as_ref(), group).await?)
    }

    /// Validate, normalize and upsert a connector definition.
    pub async fn save_connector(&self, mut connector: Connector) -> Result<Connector, RegistryError> {
        connector.validate()?;
        connector.normalize();
        ConnectorRepo::save(self.ctx.store.as_ref(), &connector).await?;
        tracing::info!(
            group = %connector.group,
            connector = %connector.name,
            "Connector saved",
        );
        Ok(connector)
    }

    /// Save a connector, (re)schedule it and start a first run in the
    /// background.
    pub async fn register_connector(&self, connector: Connector) -> Result<Connector, RegistryError> {
        let connector = self.save_connector(connector).await?;
        self.scheduler.set_job(&connector);

        let engine = self.engine.clone();
        let first = connector.clone();
        tokio::spawn(async move {
            if let Err(failure) = engine.execute(&first).await {
                tracing::warn!(connector = %first.id(), error = %failure, "Initial run failed");
            }
        });
        Ok(connector)
    }

    /// Unschedule a connector and purge everything stored for it.
    ///
    /// A run already in flight finishes before the purge, so its record
    /// cannot outlive the connector.
    pub async fn remove_connector(&self, connector: &Connector) -> Result<(), RegistryError> {
        let id = connector.id();
        self.scheduler.remove_job(&id);
        let _lease = self.engine.lease(&id).await;
        ConnectorRepo::remove(self.ctx.store.as_ref(), &connector.group, &connector.name).await?;
        tracing::info!(
            group = %connector.group,
            connector = %connector.name,
            "Connector removed",
        );
        Ok(())
    }

    /// Run a stored connector now, outside its schedule.
    pub async fn execute_now(&self, group: &str, name: &str) -> Result<Executor, RegistryError> {
        let connector = self.get_connector(group, name).await?;
        Ok(self.engine.execute(&connector).await?)
    }

    pub async fn last_executor(&self, group: &str, name: &str) -> Result<Executor, RegistryError> {
        self.get_connector(group, name).await?;
        ConnectorRepo::find_executor(self.ctx.store.as_ref(), group, name)
            .await?
            .ok_or_else(|| RegistryError::not_found("Execution", format!("{group}:{name}")))
    }

    /// Parsed stdout of the last valid run; `null` when it was not JSON.
    pub async fn last_result(
        &self,
        group: &str,
        name: &str,
    ) -> Result<serde_json::Value, RegistryError> {
        self.get_connector(group, name).await?;
        match ConnectorRepo::find_result(self.ctx.store.as_ref(), group, name).await? {
            Some(Some(obj)) => Ok(serde_json::Value::Object(obj)),
            Some(None) => Ok(serde_json::Value::Null),
            None => Err(RegistryError::not_found("Result", format!("{group}:{name}"))),
        }
    }

    // ---- groups ----

    /// Register a group. Returns `false` when it already existed.
    pub async fn create_group(&self, name: &str) -> Result<bool, RegistryError> {
        validate_segment("group", name)?;
        let created = GroupRepo::create(self.ctx.store.as_ref(), name).await?;
        if created {
            tracing::info!(group = name, "Group created");
        }
        Ok(created)
    }

    /// Delete a group and every connector in it.
    ///
    /// A connector that cannot be removed is logged and skipped; a failure
    /// to drop the group itself is returned.
    pub async fn delete_group(&self, name: &str) -> Result<(), RegistryError> {
        let store = self.ctx.store.as_ref();
        if !GroupRepo::exists(store, name).await? {
            return Err(RegistryError::not_found("Group", name));
        }

        for connector_name in ConnectorRepo::list_names(store, name).await? {
            let id = format!("{name}:{connector_name}");
            self.scheduler.remove_job(&id);
            let _lease = self.engine.lease(&id).await;
            if let Err(e) = ConnectorRepo::remove(store, name, &connector_name).await {
                tracing::error!(
                    group = name,
                    connector = %connector_name,
                    error = %e,
                    "Failed to remove connector during group deletion",
                );
            }
        }

        GroupRepo::delete(store, name).await?;
        tracing::info!(group = name, "Group deleted");
        Ok(())
    }

    pub async fn list_groups(&self, include_connectors: bool) -> Result<Vec<Group>, RegistryError> {
        let names = GroupRepo::list(self.ctx.store.as_ref()).await?;
        let mut groups = Vec::with_capacity(names.len());
        for name in names {
            groups.push(self.load_group(name, include_connectors).await?);
        }
        Ok(groups)
    }

    pub async fn get_group(
        &self,
        name: &str,
        include_connectors: bool,
    ) -> Result<Group, RegistryError> {
        if !GroupRepo::exists(self.ctx.store.as_ref(), name).await? {
            return Err(RegistryError::not_found("Group", name));
        }
        self.load_group(name.to_string(), include_connectors).await
    }

    async fn load_group(&self, name: String, include_connectors: bool) -> Result<Group, RegistryError> {
        let connectors = if include_connectors {
            Some(self.list_connectors(&name).await?)
        } else {
            None
        };
        Ok(Group { name, connectors })
    }

    pub async fn groups_len(&self) -> Result<usize, RegistryError> {
        Ok(GroupRepo::count(self.ctx.store.as_ref()).await?)
    }

    /// Schedule every stored connector. Returns how many were scheduled.
    pub async fn reload(&self) -> Result<usize, RegistryError> {
        let mut scheduled = 0;
        for group in GroupRepo::list(self.ctx.store.as_ref()).await? {
            for connector in self.list_connectors(&group).await? {
                self.scheduler.set_job(&connector);
                scheduled += 1;
            }
        }
        tracing::info!(scheduled, "Connectors reloaded");
        Ok(scheduled)
    }
}

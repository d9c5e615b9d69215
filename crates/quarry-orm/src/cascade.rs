//! Writing nested rows across associated tables.
//!
//! The root row is persisted first. Each nested row under an association
//! name is updated when it carries a primary key value and inserted
//! otherwise. The choice is made on the row as given, before the parent's
//! key is injected into its foreign key (unless it already has one). An
//! update that matches no row fails the call, and the whole call is one
//! transaction.

use std::sync::Arc;

use async_recursion::async_recursion;
use quarry_core::{Action, AssociationKind, Changeset, Entry, Field, Query, Row, Schema};
use tracing::debug;

use crate::database::Database;
use crate::driver::Driver;
use crate::error::{OrmError, Result};

/// Splits a row into its scalar part and its association entries, in input
/// order.
fn split(schema: &Schema, row: Row) -> Result<(Row, Vec<(String, Entry)>)> {
    let mut scalars = Row::new();
    let mut nested = vec![];
    for (name, entry) in row {
        if schema.has_association(&name) {
            if matches!(entry, Entry::Value(_)) {
                return Err(OrmError::NotNested(name));
            }
            nested.push((name, entry));
        } else {
            scalars.insert_entry(name, entry);
        }
    }
    Ok((scalars, nested))
}

/// Chooses insert or update for a row by whether it carries a key.
fn action_for(schema: &Schema, row: &Row) -> Action {
    match schema.primary_key() {
        Some(pk) if row.get(pk.name()).is_some_and(|v| !v.is_empty_key()) => Action::Update,
        _ => Action::Insert,
    }
}

/// Whether a row to update carries nothing but its key.
fn key_only(schema: &Schema, row: &Row) -> bool {
    let pk = schema.primary_key().map(Field::name);
    action_for(schema, row) == Action::Update && row.keys().all(|k| Some(k) == pk)
}

impl<D: Driver> Database<D> {
    /// Inserts a row and every nested association row under it.
    ///
    /// Returns the persisted row: the root changeset, with generated keys,
    /// plus the persisted nested rows under their association names. On any
    /// failure every write made by the call is rolled back.
    pub async fn insert_cascade(&mut self, schema: &Arc<Schema>, row: Row) -> Result<Row> {
        self.cascade(schema, row, Action::Insert).await
    }

    /// Updates a row by its primary key, then upserts every nested
    /// association row under it. Atomic like
    /// [`insert_cascade`](Self::insert_cascade).
    pub async fn update_cascade(&mut self, schema: &Arc<Schema>, row: Row) -> Result<Row> {
        self.cascade(schema, row, Action::Update).await
    }

    async fn cascade(&mut self, schema: &Arc<Schema>, row: Row, action: Action) -> Result<Row> {
        self.begin().await?;
        match self.persist(schema, row, action).await {
            Ok(saved) => {
                self.commit().await?;
                Ok(saved)
            }
            Err(e) => self.abort(e).await,
        }
    }

    #[async_recursion(?Send)]
    async fn persist(&mut self, schema: &Arc<Schema>, row: Row, action: Action) -> Result<Row> {
        let (scalars, nested) = split(schema, row)?;
        let changeset = match action {
            Action::Insert => self.insert(&Query::new([schema]).insert(scalars)).await?,
            // Nothing to set; the key still links the nested rows.
            Action::Update if key_only(schema, &scalars) => {
                Changeset::new(schema, &scalars, Action::Update)?
            }
            Action::Update => {
                let (changeset, rows) =
                    self.update_counted(&Query::new([schema]).update(scalars)).await?;
                if rows == 0 {
                    let key = schema
                        .primary_key()
                        .and_then(|pk| changeset.row().get(pk.name()))
                        .map(|v| v.to_sql_inline())
                        .unwrap_or_default();
                    return Err(OrmError::RowNotFound {
                        schema: String::from(schema.name()),
                        key,
                    });
                }
                changeset
            }
        };
        let mut saved = changeset.into_row();

        for (name, entry) in nested {
            let association = schema.association(&name)?;
            let target = association.resolve(self.context().registry())?;
            let key = saved
                .get(association.local_key())
                .filter(|v| !v.is_empty_key())
                .cloned()
                .ok_or_else(|| OrmError::MissingParentKey {
                    schema: String::from(schema.name()),
                    association: name.clone(),
                    key: String::from(association.local_key()),
                })?;

            let children = match entry {
                Entry::One(child) => child.into_iter().collect(),
                Entry::Many(children) => children,
                Entry::Value(_) => vec![],
            };
            let mut persisted = Vec::with_capacity(children.len());
            for mut child in children {
                let action = action_for(&target, &child);
                if !child.has_value(association.foreign_key()) {
                    child.insert(association.foreign_key(), key.clone());
                }
                debug!(
                    schema = %target.name(),
                    association = %name,
                    action = ?action,
                    "Cascading nested row"
                );
                persisted.push(self.persist(&target, child, action).await?);
            }

            let entry = match association.kind() {
                AssociationKind::HasOne => Entry::One(persisted.into_iter().next()),
                AssociationKind::HasMany => Entry::Many(persisted),
            };
            saved.insert_entry(name, entry);
        }
        Ok(saved)
    }
}

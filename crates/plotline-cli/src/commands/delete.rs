use plotline_core::models::Entity;
use plotline_core::{EntityKind, LocalStore};

use crate::commands::common::{open_session, resolve_entity, Describe};
use crate::error::CliError;
use crate::session::SessionOptions;

pub async fn run_delete(
    kind: EntityKind,
    query: &str,
    options: &SessionOptions,
) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let id = delete_kind(&session.store, kind, query)?;
    session.finish().await?;

    println!("{id}");
    Ok(())
}

/// Deletes through the store so dependents cascade in the same write.
pub fn delete_kind(store: &LocalStore, kind: EntityKind, query: &str) -> Result<String, CliError> {
    dispatch_kind!(kind, delete_entity(store, query))
}

fn delete_entity<E: Describe>(store: &LocalStore, query: &str) -> Result<String, CliError> {
    let entity = resolve_entity::<E>(store, query)?;
    store.delete::<E>(entity.id());
    tracing::debug!(kind = E::KIND.label(), id = %entity.id(), "Deleted entity");
    Ok(entity.id().to_string())
}

use plotline_core::models::Entity;
use plotline_core::{EntityKind, LocalStore};

use crate::cli::EditArgs;
use crate::commands::common::{open_session, resolve_entity, Editable, EntityEdit};
use crate::error::CliError;
use crate::session::SessionOptions;

pub async fn run_edit(args: EditArgs, options: &SessionOptions) -> Result<(), CliError> {
    let kind = EntityKind::from(args.kind);
    let edit = EntityEdit {
        name: args.name,
        description: args.description,
        order: args.order,
        status: args.status,
    };
    if edit.is_empty() {
        return Err(CliError::InvalidEdit(
            "Nothing to change; pass at least one of --name, --description, --order or --status"
                .to_string(),
        ));
    }

    let session = open_session(options).await?;
    let id = edit_kind(&session.store, kind, &args.id, &edit)?;
    session.finish().await?;

    println!("{id}");
    Ok(())
}

pub fn edit_kind(
    store: &LocalStore,
    kind: EntityKind,
    query: &str,
    edit: &EntityEdit,
) -> Result<String, CliError> {
    dispatch_kind!(kind, edit_entity(store, query, edit))
}

/// The edit is checked against a copy first so a rejected field leaves the
/// stored entity untouched.
fn edit_entity<E: Editable>(
    store: &LocalStore,
    query: &str,
    edit: &EntityEdit,
) -> Result<String, CliError> {
    let mut edited = resolve_entity::<E>(store, query)?;
    edited.apply_edit(edit)?;

    let id = edited.id().clone();
    store.update::<E>(&id, move |current| *current = edited);
    Ok(id.to_string())
}

//! `facevault list` — enrolled faces with their feature counts.

use crate::cli::output::{self, FaceRow, FaceStatus};
use crate::cli::{unlock_store, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (store, _password) = unlock_store(cli)?;
    let records = store.list_records()?;

    let mut damaged = 0;
    let rows: Vec<FaceRow> = records
        .into_iter()
        .map(|meta| {
            let status = match store.get_face(&meta.id) {
                Ok(entry) => FaceStatus::Face(entry.vector.len()),
                Err(VaultError::Integrity) => {
                    damaged += 1;
                    FaceStatus::Damaged
                }
                Err(_) => FaceStatus::Opaque,
            };
            FaceRow { meta, status }
        })
        .collect();

    output::info(&format!(
        "{}: {} record(s)",
        store.path().display(),
        rows.len()
    ));
    output::print_faces_table(&rows, &store.public_identity()?.fingerprint());

    if damaged > 0 {
        output::warning(&format!(
            "{damaged} record(s) failed their integrity check and cannot be read"
        ));
    }
    Ok(())
}

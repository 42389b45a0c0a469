use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const COLLECTIONS: [&str; 4] = ["contexts", "snapshots", "trashedSnapshots", "trashedContexts"];

/// Upgrades a raw document in place to `CURRENT_SCHEMA_VERSION`.
///
/// Returns `true` when anything changed so the caller can write it back.
pub fn run_migrations(raw: &mut Value) -> Result<bool> {
    let object = raw
        .as_object_mut()
        .ok_or_else(|| anyhow!("journal document is not a JSON object"))?;

    let mut version = match object.get("schemaVersion") {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| anyhow!("invalid schemaVersion {value}"))?,
    };

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "journal version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(false);
    }

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(object, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    object.insert("schemaVersion".into(), Value::from(version));
    Ok(true)
}

fn apply_migration(object: &mut Map<String, Value>, version: u32) -> Result<()> {
    match version {
        // Unversioned documents may predate the trash collections and app state.
        1 => {
            for key in COLLECTIONS {
                match object.get(key) {
                    None | Some(Value::Null) => {
                        object.insert(key.into(), Value::Array(Vec::new()));
                    }
                    Some(Value::Array(_)) => {}
                    Some(other) => bail!("{key} must be an array, found {other}"),
                }
            }
            if !matches!(object.get("appState"), Some(Value::Object(_))) {
                object.insert("appState".into(), Value::Object(Map::new()));
            }
            Ok(())
        }
        other => Err(anyhow!("no migration defined for version {other}")),
    }
}

//! Import of browser password exports (CSV).
//!
//! Each usable row becomes a login record. Record ids are derived from the
//! row's username, password and name, so importing the same file again yields
//! the same ids.

use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::VaultResult;
use crate::record::{Credential, Record, UriValue};
use crate::uri_normalizer::shorten_uri;

const URL_COLUMNS: &[&str] = &["url", "origin"];
const USERNAME_COLUMNS: &[&str] = &["username", "accountname"];
const PASSWORD_COLUMNS: &[&str] = &["password"];
const NAME_COLUMNS: &[&str] = &["name"];
const NOTE_COLUMNS: &[&str] = &["note", "notes"];

/// Id seed used in place of the name when the export has no name column.
const MISSING_NAME_SEED: &str = "None";

/// Deterministic record id for an imported row.
pub fn browser_record_id(username: &str, password: &str, name: &str) -> String {
    let seed = format!("{}{}{}", username, password, name);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

/// Column positions, resolved once from the header row.
struct Columns {
    url: Vec<usize>,
    username: Vec<usize>,
    password: Vec<usize>,
    name: Vec<usize>,
    notes: Vec<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |candidates: &[&str]| -> Vec<usize> {
            candidates
                .iter()
                .filter_map(|c| normalized.iter().position(|h| h == c))
                .collect()
        };
        Self {
            url: find(URL_COLUMNS),
            username: find(USERNAME_COLUMNS),
            password: find(PASSWORD_COLUMNS),
            name: find(NAME_COLUMNS),
            notes: find(NOTE_COLUMNS),
        }
    }
}

/// First non-empty value among `columns`.
fn first_value<'r>(row: &'r StringRecord, columns: &[usize]) -> &'r str {
    columns
        .iter()
        .filter_map(|&i| row.get(i))
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

/// Parse a browser CSV export into login records.
///
/// Headers are matched case-insensitively. Rows without a url, a username and
/// a password are skipped.
pub fn read_browser_csv<R: Read>(reader: R) -> VaultResult<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::from_headers(csv_reader.headers()?);

    let mut records = Vec::new();
    let mut skipped = 0u32;
    for row in csv_reader.records() {
        let row = row?;
        let url = first_value(&row, &columns.url);
        let username = first_value(&row, &columns.username);
        let password = first_value(&row, &columns.password);
        if url.is_empty() && username.is_empty() && password.is_empty() {
            skipped += 1;
            continue;
        }
        let name = first_value(&row, &columns.name);
        let notes = first_value(&row, &columns.notes);

        let uris = if url.is_empty() {
            Vec::new()
        } else {
            vec![UriValue::new(shorten_uri(url))]
        };
        // Without a name column the id seed uses "None" for the name
        let id_name = if columns.name.is_empty() { MISSING_NAME_SEED } else { name };
        let mut record = Record::login(
            browser_record_id(username, password, id_name),
            name,
            Credential {
                username: username.to_string(),
                secret: password.to_string(),
                uris,
                ..Credential::default()
            },
        );
        if !notes.is_empty() {
            record.notes = Some(notes.to_string());
        }
        records.push(record);
    }

    if skipped > 0 {
        debug!(skipped, "skipped empty browser export rows");
    }
    Ok(records)
}

/// Read a browser CSV export from `path`.
pub fn import_browser_csv(path: &Path) -> VaultResult<Vec<Record>> {
    let records = read_browser_csv(File::open(path)?)?;
    info!(path = %path.display(), imported = records.len(), "imported browser passwords");
    Ok(records)
}

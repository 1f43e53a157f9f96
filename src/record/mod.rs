//! Credential records as they appear in a password-manager export.
//!
//! Only login items take part in dedup and merge. Fields this tool does not
//! model are kept in pass-through maps and written back unchanged.

mod fingerprint;
mod serde_fields;
mod set;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;
use tracing::debug;

use crate::uri_normalizer::{normalize_domain, shorten_uri};
pub use fingerprint::{credential_fingerprint, fingerprint};
pub use set::{RecordSet, SlotId};

/// Export item type.
///
/// Encoded as the integer `type` field; unknown codes are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ItemKind {
    #[default]
    Login,
    SecureNote,
    Card,
    Identity,
    SshKey,
    Other(i64),
}

impl From<i64> for ItemKind {
    fn from(code: i64) -> Self {
        match code {
            1 => ItemKind::Login,
            2 => ItemKind::SecureNote,
            3 => ItemKind::Card,
            4 => ItemKind::Identity,
            5 => ItemKind::SshKey,
            other => ItemKind::Other(other),
        }
    }
}

impl From<ItemKind> for i64 {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Login => 1,
            ItemKind::SecureNote => 2,
            ItemKind::Card => 3,
            ItemKind::Identity => 4,
            ItemKind::SshKey => 5,
            ItemKind::Other(code) => code,
        }
    }
}

/// An entry of `login.uris`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UriValue {
    /// URI match detection mode (0 domain, 1 host, 2 starts-with, ...); `None` uses the vault default
    #[serde(rename = "match", default)]
    pub match_mode: Option<u8>,
    #[serde(default, deserialize_with = "serde_fields::null_as_default")]
    pub uri: String,
}

impl UriValue {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            match_mode: None,
            uri: uri.into(),
        }
    }
}

/// The `login` section of an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Credential {
    /// Passkeys stored on the login; opaque to this tool
    #[serde(
        rename = "fido2Credentials",
        default,
        deserialize_with = "serde_fields::null_as_default"
    )]
    pub external_credentials: Vec<Value>,
    #[serde(
        default,
        deserialize_with = "serde_fields::null_as_default",
        serialize_with = "serde_fields::empty_vec_as_null"
    )]
    pub uris: Vec<UriValue>,
    #[serde(
        default,
        deserialize_with = "serde_fields::null_as_default",
        serialize_with = "serde_fields::empty_str_as_null"
    )]
    pub username: String,
    #[serde(
        rename = "password",
        default,
        deserialize_with = "serde_fields::null_as_default",
        serialize_with = "serde_fields::empty_str_as_null"
    )]
    pub secret: String,
    #[serde(rename = "totp", default)]
    pub one_time_passcode: Option<String>,
    /// Login fields not modeled here (e.g. `passwordRevisionDate`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

static EMPTY_CREDENTIAL: OnceLock<Credential> = OnceLock::new();

/// A top-level export item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "passwordHistory", default)]
    pub password_history: Option<Value>,
    #[serde(rename = "revisionDate", default, with = "serde_fields::timestamp")]
    pub revised: Option<DateTime<Utc>>,
    #[serde(rename = "creationDate", default, with = "serde_fields::timestamp")]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "deletedDate", default, with = "serde_fields::timestamp")]
    pub deleted: Option<DateTime<Utc>>,
    #[serde(default = "new_record_id", deserialize_with = "serde_fields::id_or_generated")]
    pub id: String,
    #[serde(rename = "organizationId", default)]
    pub organization_ref: Option<String>,
    #[serde(rename = "folderId", default)]
    pub folder_ref: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    #[serde(default, deserialize_with = "serde_fields::null_as_default")]
    pub reprompt: i64,
    #[serde(
        default,
        deserialize_with = "serde_fields::null_as_default",
        serialize_with = "serde_fields::empty_str_as_null"
    )]
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "serde_fields::null_as_default")]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<Credential>,
    #[serde(rename = "collectionIds", default)]
    pub collection_refs: Option<Vec<String>>,
    /// Item fields not modeled here (custom fields, attachments, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Record {
    /// A login record with no timestamps or folder.
    pub fn login(id: impl Into<String>, name: impl Into<String>, credential: Credential) -> Self {
        Self {
            password_history: None,
            revised: None,
            created: None,
            deleted: None,
            id: id.into(),
            organization_ref: None,
            folder_ref: None,
            kind: ItemKind::Login,
            reprompt: 0,
            name: name.into(),
            notes: None,
            favorite: false,
            login: Some(credential),
            collection_refs: None,
            extra: Map::new(),
        }
    }

    pub fn is_login(&self) -> bool {
        self.kind == ItemKind::Login
    }

    /// The login section, or an empty credential when the item has none.
    pub fn credential(&self) -> &Credential {
        match &self.login {
            Some(credential) => credential,
            None => EMPTY_CREDENTIAL.get_or_init(Credential::default),
        }
    }

    pub fn credential_mut(&mut self) -> &mut Credential {
        self.login.get_or_insert_with(Credential::default)
    }

    /// A copy of this record holding only `uris`.
    pub fn with_uris(&self, uris: Vec<UriValue>) -> Record {
        let mut copy = self.clone();
        copy.credential_mut().uris = uris;
        copy
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }

    /// Sorted, unique domain keys of this record's URIs.
    pub fn domains(&self) -> Vec<String> {
        self.credential()
            .uris
            .iter()
            .filter(|u| !u.uri.trim().is_empty())
            .map(|u| normalize_domain(&u.uri))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Replace every URI with its shortened form, dropping exact repeats.
    pub fn shorten_uris(&mut self) {
        if self.login.is_none() {
            return;
        }
        let credential = self.credential_mut();
        let mut seen: HashSet<String> = HashSet::new();
        let uris = std::mem::take(&mut credential.uris);
        for mut entry in uris {
            entry.uri = shorten_uri(&entry.uri);
            if entry.uri.is_empty() || seen.insert(entry.uri.clone()) {
                credential.uris.push(entry);
            }
        }
    }

    /// Merge another record's URIs into this one.
    ///
    /// Each source URI is shortened and appended, with the source's match mode,
    /// unless this record already holds that shortened URI. Nothing else on
    /// this record changes, so merging the same source twice is a no-op.
    pub fn merge(&mut self, source: &Record) -> &mut Self {
        let mut existing: HashSet<String> = self
            .credential()
            .uris
            .iter()
            .map(|u| shorten_uri(&u.uri))
            .collect();

        let mut added = Vec::new();
        for entry in &source.credential().uris {
            let shortened = shorten_uri(&entry.uri);
            if shortened.is_empty() || existing.contains(&shortened) {
                continue;
            }
            existing.insert(shortened.clone());
            debug!(
                uri = %shortened,
                target = %self.id,
                source = %source.id,
                "added uri from merged entry"
            );
            added.push(UriValue {
                match_mode: entry.match_mode,
                uri: shortened,
            });
        }

        if !added.is_empty() {
            self.credential_mut().uris.extend(added);
        }

        debug!(
            source_name = %source.name,
            source = %source.id,
            target_name = %self.name,
            target = %self.id,
            "merged entry"
        );
        self
    }
}

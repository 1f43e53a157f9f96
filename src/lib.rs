//! Vault Cleanup Library
//!
//! Deduplicates and merges credential records from a password-manager JSON
//! export and an optional browser CSV export, including:
//! - **uri_normalizer**: Domain keys and shortened URIs
//! - **record**: Export items, fingerprints and URI merge
//! - **dedup**: Structural dedup by site, username and secret
//! - **merge_cache**: Persisted operator merge decisions, replayed on later runs
//! - **common_credentials**: Interactive resolution of logins sharing a credential
//! - **export** / **browser_import**: Reading and writing the documents
//! - **pipeline**: The full cleanup run
//!
//! # Example
//! ```no_run
//! use std::path::Path;
//! use vault_cleanup::{clean_records, DeclineOracle, FileStore, MergeCache, VaultExport};
//!
//! # fn main() -> vault_cleanup::VaultResult<()> {
//! let export = VaultExport::load(Path::new("vault.json"))?;
//! let mut cache = MergeCache::open(FileStore::new("cache.json"));
//! let cleaned = clean_records(export.logins.clone(), None, &mut cache, &mut DeclineOracle)?;
//! export.save(Path::new("cleaned.json"), &cleaned.records)?;
//! # Ok(())
//! # }
//! ```

mod atomic_file;

pub mod browser_import;
pub mod common_credentials;
pub mod dedup;
pub mod error;
pub mod export;
pub mod merge_cache;
pub mod pipeline;
pub mod record;
pub mod uri_normalizer;

pub use browser_import::{browser_record_id, import_browser_csv, read_browser_csv};
pub use common_credentials::{
    resolve_common_credentials, Answer, DecisionOracle, DeclineOracle, GroupMember, ResolveOutput,
    ResolveStats, ScriptedOracle, TerminalOracle,
};
pub use dedup::{deduplicate, deduplicate_with_stats, login_keys, DedupStats, LoginKey};
pub use error::{VaultError, VaultResult};
pub use export::VaultExport;
pub use merge_cache::{CacheStore, FileStore, MemoryStore, MergeCache, MergeOperation};
pub use pipeline::{clean_records, CleanupOutput, CleanupReport};
pub use record::{Credential, ItemKind, Record, RecordSet, SlotId, UriValue};
pub use uri_normalizer::{normalize_domain, shorten_uri, shorten_uri_with_limit, DEFAULT_MAX_URI_LEN};

// SPDX-License-Identifier: MIT OR Apache-2.0
//! `SEARCH_FILES`, `SEARCH_EMAILS`, `SEARCH_DATASETS`: deterministic,
//! case-sensitive literal substring search over a host-provided, scoped
//! corpus, with full-list-first truncation and snippet extraction.

use pda_error::ErrorCode;
use pda_executor::{CapabilityFailure, Executor, ExecutorOutput};
use pda_types::TaskManifest;

const MIN_QUERY_LEN: usize = 1;
const MAX_QUERY_LEN: usize = 4096;
const MIN_MAX_RESULTS: u32 = 1;
const MAX_MAX_RESULTS: u32 = 1000;
const SNIPPET_CONTEXT: usize = 100;
const SNIPPET_MAX_LEN: usize = 200;

/// A single file in a scope's corpus.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Sort key and identity.
    pub filename: String,
    /// Searchable text content.
    pub content: String,
}

/// A single email in a scope's corpus.
#[derive(Debug, Clone)]
pub struct EmailEntry {
    /// Identity, not used for sorting.
    pub id: String,
    /// Sort key; records with `None` are excluded from results entirely.
    pub received_timestamp: Option<i64>,
    /// Searchable text content.
    pub content: String,
}

/// A single dataset record in a scope's corpus.
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    /// Sort key and identity.
    pub primary_key: String,
    /// Searchable text content.
    pub content: String,
}

/// Host-provided search corpus, scoped by `target_scope`. Returning `None`
/// means the scope is allowed but the host cannot currently serve it
/// (`SCOPE_UNAVAILABLE`), distinct from the scope never being on the
/// allowlist at all (`SCOPE_NOT_ALLOWED`, checked before this is consulted).
pub trait SearchSource {
    /// List every file in `scope`, in deterministic source order.
    fn list_files(&self, scope: &str) -> Option<Vec<FileEntry>>;
    /// List every email in `scope`, in deterministic source order.
    fn list_emails(&self, scope: &str) -> Option<Vec<EmailEntry>>;
    /// List every dataset record in `scope`, in deterministic source order.
    fn list_datasets(&self, scope: &str) -> Option<Vec<DatasetEntry>>;
}

/// Search executor over an allowlisted set of scopes.
pub struct SearchExecutor<'a> {
    scope_allowlist: Vec<String>,
    source: &'a dyn SearchSource,
}

fn fail(code: ErrorCode, message: &str) -> CapabilityFailure {
    CapabilityFailure::new(code, message)
}

fn snippet(content: &str, match_start_chars: usize, match_len_chars: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    let start = match_start_chars.saturating_sub(SNIPPET_CONTEXT);
    let end = (match_start_chars + match_len_chars + SNIPPET_CONTEXT).min(chars.len());
    let mut slice: String = chars[start..end].iter().collect();
    if slice.chars().count() > SNIPPET_MAX_LEN {
        slice = slice.chars().take(SNIPPET_MAX_LEN).collect();
    }
    slice
}

fn find_match(content: &str, query: &str) -> Option<(usize, usize)> {
    let byte_idx = content.find(query)?;
    let char_idx = content[..byte_idx].chars().count();
    Some((char_idx, query.chars().count()))
}

impl<'a> SearchExecutor<'a> {
    /// Build an executor permitting only scopes in `scope_allowlist`.
    pub fn new(scope_allowlist: Vec<String>, source: &'a dyn SearchSource) -> Self {
        Self { scope_allowlist, source }
    }

    fn validate_query<'m>(&self, manifest: &'m TaskManifest) -> Result<&'m str, CapabilityFailure> {
        let query = manifest
            .inputs
            .get("query")
            .map(String::as_str)
            .ok_or_else(|| fail(ErrorCode::InvalidQuery, "missing input 'query'"))?;
        let trimmed = query.trim();
        let len = trimmed.chars().count();
        if len < MIN_QUERY_LEN || len > MAX_QUERY_LEN {
            return Err(fail(ErrorCode::InvalidQuery, "query length out of bounds"));
        }
        Ok(query)
    }

    fn validate_scope<'m>(&self, manifest: &'m TaskManifest) -> Result<&'m str, CapabilityFailure> {
        let scope = manifest
            .inputs
            .get("target_scope")
            .map(String::as_str)
            .ok_or_else(|| fail(ErrorCode::ScopeNotAllowed, "missing input 'target_scope'"))?;
        if !self.scope_allowlist.iter().any(|s| s == scope) {
            return Err(fail(ErrorCode::ScopeNotAllowed, "target_scope is not on the static allowlist"));
        }
        Ok(scope)
    }

    fn validate_max_results(&self, manifest: &TaskManifest) -> Result<u32, CapabilityFailure> {
        let raw = manifest
            .inputs
            .get("max_results")
            .ok_or_else(|| fail(ErrorCode::ExecutionFailed, "missing input 'max_results'"))?;
        let value: u32 = raw
            .parse()
            .map_err(|_| fail(ErrorCode::ExecutionFailed, "max_results must be a non-negative integer"))?;
        if !(MIN_MAX_RESULTS..=MAX_MAX_RESULTS).contains(&value) {
            return Err(fail(ErrorCode::ExecutionFailed, "max_results out of bounds [1, 1000]"));
        }
        Ok(value)
    }

    fn search_files(&self, query: &str, scope: &str, max_results: u32) -> Result<serde_json::Value, CapabilityFailure> {
        let mut entries = self
            .source
            .list_files(scope)
            .ok_or_else(|| fail(ErrorCode::ScopeUnavailable, "scope is currently unavailable"))?;
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));

        let matches: Vec<_> = entries
            .into_iter()
            .filter_map(|e| find_match(&e.content, query).map(|(start, len)| (e, start, len)))
            .collect();

        let count = matches.len();
        let truncated = count > max_results as usize;
        let results: Vec<_> = matches
            .into_iter()
            .take(max_results as usize)
            .map(|(e, start, len)| {
                serde_json::json!({
                    "filename": e.filename,
                    "snippet": snippet(&e.content, start, len),
                })
            })
            .collect();

        Ok(serde_json::json!({ "count": count, "truncated": truncated, "results": results }))
    }

    fn search_emails(&self, query: &str, scope: &str, max_results: u32) -> Result<serde_json::Value, CapabilityFailure> {
        let entries = self
            .source
            .list_emails(scope)
            .ok_or_else(|| fail(ErrorCode::ScopeUnavailable, "scope is currently unavailable"))?;

        let mut with_timestamp: Vec<_> = entries
            .into_iter()
            .filter(|e| e.received_timestamp.is_some())
            .collect();
        with_timestamp.sort_by_key(|e| e.received_timestamp.unwrap());

        let matches: Vec<_> = with_timestamp
            .into_iter()
            .filter_map(|e| find_match(&e.content, query).map(|(start, len)| (e, start, len)))
            .collect();

        let count = matches.len();
        let truncated = count > max_results as usize;
        let results: Vec<_> = matches
            .into_iter()
            .take(max_results as usize)
            .map(|(e, start, len)| {
                serde_json::json!({
                    "id": e.id,
                    "received_timestamp": e.received_timestamp,
                    "snippet": snippet(&e.content, start, len),
                })
            })
            .collect();

        Ok(serde_json::json!({ "count": count, "truncated": truncated, "results": results }))
    }

    fn search_datasets(&self, query: &str, scope: &str, max_results: u32) -> Result<serde_json::Value, CapabilityFailure> {
        let mut entries = self
            .source
            .list_datasets(scope)
            .ok_or_else(|| fail(ErrorCode::ScopeUnavailable, "scope is currently unavailable"))?;
        entries.sort_by(|a, b| a.primary_key.cmp(&b.primary_key));

        let matches: Vec<_> = entries
            .into_iter()
            .filter_map(|e| find_match(&e.content, query).map(|(start, len)| (e, start, len)))
            .collect();

        let count = matches.len();
        let truncated = count > max_results as usize;
        let results: Vec<_> = matches
            .into_iter()
            .take(max_results as usize)
            .map(|(e, start, len)| {
                serde_json::json!({
                    "primary_key": e.primary_key,
                    "snippet": snippet(&e.content, start, len),
                })
            })
            .collect();

        Ok(serde_json::json!({ "count": count, "truncated": truncated, "results": results }))
    }
}

impl<'a> Executor for SearchExecutor<'a> {
    fn capability_ids(&self) -> &[&str] {
        &["SEARCH_FILES", "SEARCH_EMAILS", "SEARCH_DATASETS"]
    }

    fn execute_inner(&self, manifest: &TaskManifest) -> Result<ExecutorOutput, CapabilityFailure> {
        let query = self.validate_query(manifest)?;
        let scope = self.validate_scope(manifest)?;
        let max_results = self.validate_max_results(manifest)?;

        let output = match manifest.capability_id.as_str() {
            "SEARCH_FILES" => self.search_files(query, scope, max_results)?,
            "SEARCH_EMAILS" => self.search_emails(query, scope, max_results)?,
            "SEARCH_DATASETS" => self.search_datasets(query, scope, max_results)?,
            other => {
                return Err(CapabilityFailure::new(
                    ErrorCode::UnsupportedCapability,
                    format!("unsupported capability {other}"),
                ))
            }
        };

        Ok(ExecutorOutput::new(output))
    }
}

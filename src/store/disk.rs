//! Directory-backed cache store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<namespace>/.created           creation timestamp (RFC3339)
//! <root>/<namespace>/<digest>.json      entry metadata, digest = sha256(key)
//! <root>/<namespace>/<uuid>.body        response body referenced by metadata
//! ```
//!
//! Metadata is replaced with write-to-temp then rename, and each body gets a
//! fresh file name, so a reader sees either the old entry or the new one.

use super::CacheStore;
use crate::config::schema::validate_namespace;
use crate::error::{ShellkeepError, ShellkeepResult};
use crate::fetch::{Response, ResponseKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;
use uuid::Uuid;

const CREATED_FILE: &str = ".created";

/// On-disk metadata for one cached response
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    status: u16,
    headers: Vec<(String, String)>,
    kind: ResponseKind,
    redirected: bool,
    url: Option<Url>,
    stored_at: DateTime<Utc>,
    body_file: String,
}

impl EntryMeta {
    fn into_response(self, body: Vec<u8>) -> ShellkeepResult<Response> {
        let status = StatusCode::from_u16(self.status).map_err(|e| {
            ShellkeepError::Store(format!("bad status {} for {}: {e}", self.status, self.key))
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        Ok(Response {
            status,
            headers,
            body,
            kind: self.kind,
            redirected: self.redirected,
            url: self.url,
        })
    }
}

/// Cache store persisted under a directory
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    root: PathBuf,
}

impl DiskCacheStore {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> ShellkeepResult<PathBuf> {
        validate_namespace(namespace)?;
        Ok(self.root.join(namespace))
    }

    async fn read_meta(path: &Path) -> ShellkeepResult<Option<EntryMeta>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShellkeepError::io(
                format!("reading cache entry {}", path.display()),
                e,
            )),
        }
    }

    async fn created_at(dir: &Path) -> DateTime<Utc> {
        fs::read_to_string(dir.join(CREATED_FILE))
            .await
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// File stem for a key: first 16 bytes of its SHA-256, hex encoded
fn entry_stem(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..16])
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|meta| meta.is_dir())
}

async fn write_atomic(dir: &Path, target: &Path, content: &[u8]) -> ShellkeepResult<()> {
    let temp = dir.join(format!(".tmp-{}", Uuid::new_v4()));
    fs::write(&temp, content)
        .await
        .map_err(|e| ShellkeepError::io(format!("writing {}", temp.display()), e))?;
    if let Err(e) = fs::rename(&temp, target).await {
        let _ = fs::remove_file(&temp).await;
        return Err(ShellkeepError::io(
            format!("replacing {}", target.display()),
            e,
        ));
    }
    Ok(())
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn open(&self, namespace: &str) -> ShellkeepResult<()> {
        let dir = self.namespace_dir(namespace)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellkeepError::io(format!("creating namespace {}", dir.display()), e))?;

        let created = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(CREATED_FILE))
            .await;
        match created {
            Ok(mut file) => {
                file.write_all(Utc::now().to_rfc3339().as_bytes())
                    .await
                    .map_err(|e| ShellkeepError::io("recording namespace creation", e))?;
                file.flush()
                    .await
                    .map_err(|e| ShellkeepError::io("recording namespace creation", e))?;
                debug!("Created namespace {}", namespace);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(ShellkeepError::io(
                format!("opening namespace {}", dir.display()),
                e,
            )),
        }
    }

    async fn has(&self, namespace: &str) -> ShellkeepResult<bool> {
        let dir = self.namespace_dir(namespace)?;
        Ok(is_dir(&dir).await)
    }

    async fn get(&self, namespace: &str, key: &str) -> ShellkeepResult<Option<Response>> {
        let dir = self.namespace_dir(namespace)?;
        let Some(meta) = Self::read_meta(&dir.join(format!("{}.json", entry_stem(key)))).await?
        else {
            return Ok(None);
        };

        let body_path = dir.join(&meta.body_file);
        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            // Replaced by a concurrent write between reading metadata and body
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Body for {} vanished during read", key);
                return Ok(None);
            }
            Err(e) => {
                return Err(ShellkeepError::io(
                    format!("reading cache body {}", body_path.display()),
                    e,
                ))
            }
        };

        meta.into_response(body).map(Some)
    }

    async fn put(&self, namespace: &str, key: &str, response: &Response) -> ShellkeepResult<()> {
        self.open(namespace).await?;
        let dir = self.namespace_dir(namespace)?;
        let meta_path = dir.join(format!("{}.json", entry_stem(key)));
        let previous = Self::read_meta(&meta_path).await.ok().flatten();

        let body_file = format!("{}.body", Uuid::new_v4());
        fs::write(dir.join(&body_file), &response.body)
            .await
            .map_err(|e| ShellkeepError::io(format!("writing cache body for {key}"), e))?;

        let meta = EntryMeta {
            key: key.to_string(),
            status: response.status.as_u16(),
            headers: response.header_pairs(),
            kind: response.kind,
            redirected: response.redirected,
            url: response.url.clone(),
            stored_at: Utc::now(),
            body_file,
        };
        write_atomic(&dir, &meta_path, serde_json::to_string(&meta)?.as_bytes()).await?;

        if let Some(previous) = previous {
            let _ = fs::remove_file(dir.join(previous.body_file)).await;
        }
        Ok(())
    }

    async fn keys(&self, namespace: &str) -> ShellkeepResult<Vec<String>> {
        let dir = self.namespace_dir(namespace)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(ShellkeepError::io(
                    format!("listing namespace {}", dir.display()),
                    e,
                ))
            }
        };

        let mut keys = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShellkeepError::io("reading namespace entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(meta) = Self::read_meta(&path).await? {
                    keys.push(meta.key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn namespaces(&self) -> ShellkeepResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(ShellkeepError::io(
                    format!("listing store {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut found = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShellkeepError::io("reading store entry", e))?
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if validate_namespace(name).is_ok() && is_dir(&path).await {
                found.push((Self::created_at(&path).await, name.to_string()));
            }
        }

        found.sort();
        Ok(found.into_iter().map(|(_, name)| name).collect())
    }

    async fn delete(&self, namespace: &str) -> ShellkeepResult<bool> {
        let dir = self.namespace_dir(namespace)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellkeepError::io(
                format!("deleting namespace {}", dir.display()),
                e,
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}

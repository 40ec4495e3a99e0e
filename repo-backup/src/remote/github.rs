//! GitHub repository contents API client.
//!
//! Objects are addressed as `owner/repo/path`; bodies carry base64 content and
//! updates must quote the blob sha of the object being replaced.

use super::{basename, ObjectKind, RemoteObjectMetadata, RemoteStore};
use crate::config::Config;
use crate::utils::{Result, SyncError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const API_VERSION: &str = "2022-11-28";
const REPO_DESCRIPTION: &str = "Backup repository created by repo-backup";

/// Access token. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// `owner/name` pair identifying a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoRef {
    type Err = SyncError;

    fn from_str(full_name: &str) -> Result<Self> {
        match full_name.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(SyncError::InvalidInput(format!(
                "repository must be owner/name, got {:?}",
                full_name
            ))),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl ContentItem {
    fn into_metadata(self) -> RemoteObjectMetadata {
        let kind = if self.kind == "dir" {
            ObjectKind::Directory
        } else {
            ObjectKind::File
        };
        RemoteObjectMetadata {
            path: self.path,
            name: self.name,
            content_id: self.sha,
            size: self.size,
            kind,
        }
    }
}

/// A path that is a directory answers with an array, a file with one object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Single(Box<ContentItem>),
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: ContentItem,
}

#[derive(Debug, Serialize)]
struct CreateRepositoryRequest<'a> {
    name: &'a str,
    private: bool,
    description: &'a str,
    auto_init: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client handle for one session; construct once and pass it to every call.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
    credential: Option<Credential>,
    repo: Option<RepoRef>,
    branch: Option<String>,
    commit_message_prefix: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, user_agent: &str, credential: Option<Credential>) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| SyncError::InvalidInput(format!("bad API url {}: {}", api_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_url,
            credential,
            repo: None,
            branch: None,
            commit_message_prefix: "Backup".to_string(),
        })
    }

    /// Build a client from configuration. The repository is optional so that
    /// account-level calls work without one.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::new(
            &config.remote.api_url,
            &config.remote.user_agent,
            config.credential(),
        )?
        .with_branch(config.remote.branch.clone())
        .with_commit_message_prefix(&config.backup.commit_message_prefix);

        if config.remote.repository.is_some() {
            client = client.for_repository(config.repository()?);
        }
        Ok(client)
    }

    pub fn for_repository(mut self, repo: RepoRef) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_commit_message_prefix(mut self, prefix: &str) -> Self {
        self.commit_message_prefix = prefix.to_string();
        self
    }

    pub fn repository(&self) -> Option<&RepoRef> {
        self.repo.as_ref()
    }

    /// Verify the token by fetching the account it belongs to.
    pub async fn authenticated_user(&self) -> Result<AuthenticatedUser> {
        let url = self.endpoint(&["user"])?;
        let response = self.send(self.http.get(url), "user").await?;
        Ok(response.json().await?)
    }

    /// Repositories of the authenticated account, most recently updated first.
    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let mut url = self.endpoint(&["user", "repos"])?;
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", "100");
        let response = self.send(self.http.get(url), "user/repos").await?;
        Ok(response.json().await?)
    }

    /// Create an initialised repository so its default branch exists.
    pub async fn create_repository(&self, name: &str, private: bool) -> Result<Repository> {
        let url = self.endpoint(&["user", "repos"])?;
        let body = CreateRepositoryRequest {
            name,
            private,
            description: REPO_DESCRIPTION,
            auto_init: true,
        };
        let response = self.send(self.http.post(url).json(&body), name).await?;
        Ok(response.json().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidInput(format!("API url {} cannot be a base", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn selected_repository(&self) -> Result<&RepoRef> {
        self.repo.as_ref().ok_or_else(|| {
            SyncError::InvalidInput("no repository selected for contents access".to_string())
        })
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        let repo = self.selected_repository()?;

        let mut url = self.endpoint(&["repos", repo.owner.as_str(), repo.name.as_str(), "contents"])?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    fn read_url(&self, path: &str) -> Result<Url> {
        let mut url = self.contents_url(path)?;
        if let Some(branch) = &self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        Ok(url)
    }

    /// Attach the credential, send, and map error statuses onto [`SyncError`].
    async fn send(&self, request: RequestBuilder, subject: &str) -> Result<Response> {
        let credential = self.credential.as_ref().ok_or(SyncError::Unauthenticated)?;
        let request = request.header(AUTHORIZATION, format!("Bearer {}", credential.secret()));

        let response = request.send().await?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), subject);

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);

        Err(match status {
            StatusCode::UNAUTHORIZED => SyncError::Unauthenticated,
            StatusCode::NOT_FOUND => SyncError::NotFound(subject.to_string()),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                SyncError::conflict(subject, message)
            }
            _ => SyncError::RemoteIo(format!("{} for {}: {}", status, subject, message)),
        })
    }

    async fn fetch_contents(&self, path: &str) -> Result<ContentsResponse> {
        let url = self.read_url(path)?;
        let response = self.send(self.http.get(url), path).await?;
        Ok(response.json().await?)
    }

    async fn download_raw(&self, download_url: &str, path: &str) -> Result<Vec<u8>> {
        let url = Url::parse(download_url)
            .map_err(|e| SyncError::RemoteIo(format!("bad download url for {}: {}", path, e)))?;
        let response = self.send(self.http.get(url), path).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode a base64 payload that may be wrapped across lines.
fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

#[async_trait]
impl RemoteStore for GitHubClient {
    async fn get_metadata(&self, path: &str) -> Result<Option<RemoteObjectMetadata>> {
        match self.fetch_contents(path).await {
            Ok(ContentsResponse::Single(item)) => Ok(Some(item.into_metadata())),
            Ok(ContentsResponse::Listing(_)) => {
                let path = path.trim_matches('/');
                // Listings do not carry the tree sha of the directory itself
                Ok(Some(RemoteObjectMetadata {
                    path: path.to_string(),
                    name: basename(path).to_string(),
                    content_id: String::new(),
                    size: 0,
                    kind: ObjectKind::Directory,
                }))
            }
            Err(SyncError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_content(&self, path: &str) -> Result<Vec<u8>> {
        let item = match self.fetch_contents(path).await? {
            ContentsResponse::Single(item) => item,
            ContentsResponse::Listing(_) => {
                return Err(SyncError::InvalidInput(format!("{} is a directory", path)));
            }
        };

        match (item.encoding.as_deref(), item.content.as_deref()) {
            (Some("base64"), Some(content)) => decode_content(content),
            // Too large to inline; the raw download still works
            _ => match item.download_url.as_deref() {
                Some(download_url) => self.download_raw(download_url, path).await,
                None if item.size == 0 => Ok(Vec::new()),
                None => Err(SyncError::RemoteIo(format!("no content returned for {}", path))),
            },
        }
    }

    async fn put_content(
        &self,
        path: &str,
        content: &[u8],
        expected_content_id: Option<&str>,
    ) -> Result<RemoteObjectMetadata> {
        let url = self.contents_url(path)?;
        let body = PutContentsRequest {
            message: format!("{}: {}", self.commit_message_prefix, basename(path)),
            content: STANDARD.encode(content),
            sha: expected_content_id,
            branch: self.branch.as_deref(),
        };

        let response = self.send(self.http.put(url).json(&body), path).await?;
        let created: PutContentsResponse = response.json().await?;
        Ok(created.content.into_metadata())
    }

    async fn list(&self, dir: &str) -> Result<Vec<RemoteObjectMetadata>> {
        let entries = match self.fetch_contents(dir).await? {
            ContentsResponse::Listing(items) => items,
            ContentsResponse::Single(item) => vec![*item],
        };
        Ok(entries.into_iter().map(ContentItem::into_metadata).collect())
    }

    fn ensure_target(&self) -> Result<()> {
        self.selected_repository().map(|_| ())
    }
}

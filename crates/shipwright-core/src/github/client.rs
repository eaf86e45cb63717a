//! Blocking REST client for GitHub releases.

use std::io::{Read, Write};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{
    Asset, GitHubError, GitHubResult, NewRelease, Release, ReleaseStore, ReleaseUpdate,
    Repository, TagRef,
};
use crate::reference::RepoId;

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const JSON_ACCEPT: &str = "application/vnd.github+json";
const BINARY_ACCEPT: &str = "application/octet-stream";
const USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: usize = 100;
const CHUNK_SIZE: usize = 8192;

/// GitHub API client backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    agent: ureq::Agent,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client for `api_url`, authenticating with `token` when given.
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .build();
        Self {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// The API root this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.api_url, repo.owner, repo.repo)
    }

    fn request(&self, method: &str, url: &str, accept: &str) -> ureq::Request {
        let req = self
            .agent
            .request(method, url)
            .set("Accept", accept)
            .set("User-Agent", USER_AGENT)
            .set("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => req.set("Authorization", &format!("token {token}")),
            None => req,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> GitHubResult<T> {
        debug!(%url, "GET");
        let resp = self
            .request("GET", url, JSON_ACCEPT)
            .call()
            .map_err(|e| map_error(url, e))?;
        decode(url, resp)
    }

    fn get_optional<T: DeserializeOwned>(&self, url: &str) -> GitHubResult<Option<T>> {
        debug!(%url, "GET");
        match self.request("GET", url, JSON_ACCEPT).call() {
            Ok(resp) => decode(url, resp).map(Some),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(e) => Err(map_error(url, e)),
        }
    }

    fn delete(&self, url: &str) -> GitHubResult<()> {
        debug!(%url, "DELETE");
        self.request("DELETE", url, JSON_ACCEPT)
            .call()
            .map_err(|e| map_error(url, e))?;
        Ok(())
    }
}

impl ReleaseStore for GitHubClient {
    #[instrument(skip(self), fields(%repo))]
    fn release_by_tag(&self, repo: &RepoId, tag: &str) -> GitHubResult<Option<Release>> {
        self.get_optional(&self.repo_url(repo, &format!("/releases/tags/{tag}")))
    }

    #[instrument(skip(self), fields(%repo))]
    fn release_by_id(&self, repo: &RepoId, id: u64) -> GitHubResult<Option<Release>> {
        self.get_optional(&self.repo_url(repo, &format!("/releases/{id}")))
    }

    #[instrument(skip(self), fields(%repo))]
    fn list_tags(&self, repo: &RepoId) -> GitHubResult<Vec<TagRef>> {
        let url = self.repo_url(repo, "/git/refs/tags");
        let mut tags = Vec::new();

        for page in 1_u32.. {
            debug!(%url, page, "GET");
            let result = self
                .request("GET", &url, JSON_ACCEPT)
                .query("per_page", &PER_PAGE.to_string())
                .query("page", &page.to_string())
                .call();
            let parsed: Vec<TagRef> = match result {
                Ok(resp) => decode(&url, resp)?,
                // A repository without tags has no refs/tags namespace at all.
                Err(ureq::Error::Status(404, _)) => break,
                Err(e) => return Err(map_error(&url, e)),
            };

            let len = parsed.len();
            tags.extend(parsed);
            if len < PER_PAGE {
                break;
            }
        }

        debug!(count = tags.len(), "listed tag refs");
        Ok(tags)
    }

    #[instrument(skip(self), fields(%repo))]
    fn repository(&self, repo: &RepoId) -> GitHubResult<Repository> {
        self.get_json(&self.repo_url(repo, ""))
    }

    #[instrument(skip(self, update), fields(%repo, draft = update.draft))]
    fn update_release(
        &self,
        repo: &RepoId,
        id: u64,
        update: &ReleaseUpdate,
    ) -> GitHubResult<Release> {
        let url = self.repo_url(repo, &format!("/releases/{id}"));
        debug!(%url, "PATCH");
        let resp = self
            .request("PATCH", &url, JSON_ACCEPT)
            .send_json(update)
            .map_err(|e| map_error(&url, e))?;
        decode(&url, resp)
    }

    #[instrument(skip(self), fields(%repo))]
    fn delete_release(&self, repo: &RepoId, id: u64) -> GitHubResult<()> {
        self.delete(&self.repo_url(repo, &format!("/releases/{id}")))
    }

    #[instrument(skip(self), fields(%repo))]
    fn delete_asset(&self, repo: &RepoId, asset_id: u64) -> GitHubResult<()> {
        self.delete(&self.repo_url(repo, &format!("/releases/assets/{asset_id}")))
    }

    #[instrument(skip(self, asset, sink), fields(asset = %asset.name))]
    fn download_asset(&self, asset: &Asset, sink: &mut dyn Write) -> GitHubResult<u64> {
        debug!(url = %asset.url, "GET");
        let resp = self
            .request("GET", &asset.url, BINARY_ACCEPT)
            .call()
            .map_err(|e| map_error(&asset.url, e))?;

        let mut reader = resp.into_reader();
        let mut buf = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n])?;
            total += n as u64;
        }
        sink.flush()?;

        debug!(bytes = total, "downloaded asset");
        Ok(total)
    }

    #[instrument(skip(self, release), fields(%repo, tag = %release.tag_name))]
    fn create_release(&self, repo: &RepoId, release: &NewRelease) -> GitHubResult<Release> {
        let url = self.repo_url(repo, "/releases");
        debug!(%url, "POST");
        let resp = self
            .request("POST", &url, JSON_ACCEPT)
            .send_json(release)
            .map_err(|e| map_error(&url, e))?;
        decode(&url, resp)
    }

    #[instrument(skip(self, release, data), fields(release = release.id, size = data.len()))]
    fn upload_asset(&self, release: &Release, name: &str, data: &[u8]) -> GitHubResult<Asset> {
        let url = upload_base(&release.upload_url)
            .ok_or(GitHubError::MissingUploadUrl(release.id))?;
        debug!(%url, "POST");
        let resp = self
            .request("POST", url, JSON_ACCEPT)
            .set("Content-Type", BINARY_ACCEPT)
            .query("name", name)
            .query("label", "")
            .send_bytes(data)
            .map_err(|e| map_error(url, e))?;
        decode(url, resp)
    }
}

/// Strip the RFC 6570 `{?name,label}` suffix from an upload URL template.
fn upload_base(template: &str) -> Option<&str> {
    let base = template.split('{').next().unwrap_or_default().trim();
    (!base.is_empty()).then_some(base)
}

fn decode<T: DeserializeOwned>(url: &str, resp: ureq::Response) -> GitHubResult<T> {
    resp.into_json().map_err(|source| GitHubError::Decode {
        url: url.to_string(),
        source,
    })
}

fn map_error(url: &str, err: ureq::Error) -> GitHubError {
    match err {
        ureq::Error::Status(status, resp) => GitHubError::Status {
            status,
            url: url.to_string(),
            body: resp.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => GitHubError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

//! In-memory stand-ins for the hosting API and the shell, for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::command::{CommandError, CommandOutput, CommandResult, CommandRunner};
use crate::github::{
    Asset, GitHubError, GitHubResult, GitObject, NewRelease, Release, ReleaseStore,
    ReleaseUpdate, Repository, TagRef,
};
use crate::reference::RepoId;

/// Build a draft release with the given assets.
pub fn release(id: u64, tag: &str, assets: Vec<Asset>) -> Release {
    Release {
        id,
        tag_name: tag.to_string(),
        target_commitish: "main".to_string(),
        name: Some(format!("Release {tag}")),
        body: Some("release notes".to_string()),
        draft: true,
        prerelease: false,
        html_url: format!("https://github.com/foo/bar/releases/tag/{tag}"),
        upload_url: format!("https://uploads.github.com/repos/foo/bar/releases/{id}/assets{{?name,label}}"),
        assets,
    }
}

/// Build an asset record.
pub fn asset(id: u64, name: &str) -> Asset {
    Asset {
        id,
        name: name.to_string(),
        url: format!("https://api.github.com/repos/foo/bar/releases/assets/{id}"),
        browser_download_url: String::new(),
        label: None,
        size: 0,
    }
}

/// Fake [`ReleaseStore`] that records every call.
#[derive(Default)]
pub struct FakeStore {
    pub releases: RefCell<Vec<Release>>,
    pub tags: Vec<TagRef>,
    pub clone_url: String,
    pub content: HashMap<u64, Vec<u8>>,
    /// Calls whose log line starts with this prefix fail with a 500.
    pub fail_on: Option<String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeStore {
    pub fn with_release(release: Release) -> Self {
        Self {
            releases: RefCell::new(vec![release]),
            ..Self::default()
        }
    }

    pub fn tag(mut self, name: &str, sha: &str) -> Self {
        self.tags.push(TagRef {
            ref_name: format!("refs/tags/{name}"),
            object: GitObject {
                sha: sha.to_string(),
                kind: "commit".to_string(),
            },
        });
        self
    }

    pub fn asset_bytes(mut self, id: u64, bytes: &[u8]) -> Self {
        self.content.insert(id, bytes.to_vec());
        self
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.fail_on = Some(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that would change remote state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("GET"))
            .collect()
    }

    fn record(&self, call: String) -> GitHubResult<()> {
        let fail = self
            .fail_on
            .as_deref()
            .is_some_and(|prefix| call.starts_with(prefix));
        self.calls.borrow_mut().push(call.clone());
        if fail {
            return Err(GitHubError::Status {
                status: 500,
                url: call,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl ReleaseStore for FakeStore {
    fn release_by_tag(&self, _repo: &RepoId, tag: &str) -> GitHubResult<Option<Release>> {
        self.record(format!("GET release tag {tag}"))?;
        Ok(self
            .releases
            .borrow()
            .iter()
            .find(|r| r.tag_name == tag)
            .cloned())
    }

    fn release_by_id(&self, _repo: &RepoId, id: u64) -> GitHubResult<Option<Release>> {
        self.record(format!("GET release {id}"))?;
        Ok(self.releases.borrow().iter().find(|r| r.id == id).cloned())
    }

    fn list_tags(&self, _repo: &RepoId) -> GitHubResult<Vec<TagRef>> {
        self.record("GET tags".to_string())?;
        Ok(self.tags.clone())
    }

    fn repository(&self, repo: &RepoId) -> GitHubResult<Repository> {
        self.record("GET repository".to_string())?;
        Ok(Repository {
            full_name: repo.to_string(),
            html_url: self.clone_url.clone(),
            default_branch: "main".to_string(),
        })
    }

    fn update_release(
        &self,
        _repo: &RepoId,
        id: u64,
        update: &ReleaseUpdate,
    ) -> GitHubResult<Release> {
        self.record(format!("PATCH release {id} draft={}", update.draft))?;
        let mut releases = self.releases.borrow_mut();
        let release = releases
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GitHubError::Status {
                status: 404,
                url: format!("release {id}"),
                body: String::new(),
            })?;
        release.draft = update.draft;
        release.name.clone_from(&update.name);
        release.body.clone_from(&update.body);
        Ok(release.clone())
    }

    fn delete_release(&self, _repo: &RepoId, id: u64) -> GitHubResult<()> {
        self.record(format!("DELETE release {id}"))
    }

    fn delete_asset(&self, _repo: &RepoId, asset_id: u64) -> GitHubResult<()> {
        self.record(format!("DELETE asset {asset_id}"))
    }

    fn download_asset(&self, asset: &Asset, sink: &mut dyn Write) -> GitHubResult<u64> {
        self.record(format!("GET asset {}", asset.id))?;
        let bytes = self.content.get(&asset.id).cloned().unwrap_or_default();
        sink.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    fn create_release(&self, _repo: &RepoId, new: &NewRelease) -> GitHubResult<Release> {
        self.record(format!("POST release {}", new.tag_name))?;
        let mut created = release(100, &new.tag_name, Vec::new());
        created.name = Some(new.name.clone());
        created.body = Some(new.body.clone());
        created.draft = new.draft;
        created.prerelease = new.prerelease;
        created.target_commitish.clone_from(&new.target_commitish);
        self.releases.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn upload_asset(&self, release: &Release, name: &str, data: &[u8]) -> GitHubResult<Asset> {
        self.record(format!("POST asset {name} to {}", release.id))?;
        let mut uploaded = asset(200, name);
        uploaded.size = data.len() as u64;
        Ok(uploaded)
    }
}

/// Fake [`CommandRunner`] with scripted responses.
#[derive(Default)]
pub struct FakeRunner {
    /// `(prefix, stdout)`: the first matching prefix answers the command.
    pub responses: Vec<(String, String)>,
    /// Commands starting with this prefix fail.
    pub fail_on: Option<String>,
    pub calls: RefCell<Vec<(String, Utf8PathBuf)>>,
}

impl FakeRunner {
    pub fn respond(mut self, prefix: &str, stdout: &str) -> Self {
        self.responses.push((prefix.to_string(), stdout.to_string()));
        self
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.fail_on = Some(prefix.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &str, cwd: &Utf8Path) -> CommandResult<CommandOutput> {
        self.calls
            .borrow_mut()
            .push((command.to_string(), cwd.to_path_buf()));

        if self
            .fail_on
            .as_deref()
            .is_some_and(|prefix| command.starts_with(prefix))
        {
            return Err(CommandError::Failed {
                command: command.to_string(),
                exit_code: Some(1),
                stderr: "injected failure".to_string(),
            });
        }

        let stdout = self
            .responses
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok(CommandOutput {
            stdout,
            ..CommandOutput::default()
        })
    }
}

/// A gzip-compressed tarball with the given entries.
pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A minimal wheel for `name`/`version`.
pub fn wheel(name: &str, version: &str) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let info = format!("{name}-{version}.dist-info");
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (file, body) in [
        (format!("{name}/__init__.py"), String::new()),
        (format!("{info}/WHEEL"), "Wheel-Version: 1.0\n".to_string()),
        (
            format!("{info}/METADATA"),
            format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n"),
        ),
    ] {
        zip.start_file(file, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A minimal sdist for `name`/`version`.
pub fn sdist(name: &str, version: &str) -> Vec<u8> {
    let pkg_info = format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n");
    tar_gz(&[
        (&format!("{name}-{version}/PKG-INFO"), pkg_info.as_bytes()),
        (&format!("{name}-{version}/setup.py"), b"".as_slice()),
    ])
}

/// A minimal npm tarball for `name`/`version`.
pub fn npm_tarball(name: &str, version: &str) -> Vec<u8> {
    let manifest = format!(r#"{{"name": "{name}", "version": "{version}"}}"#);
    tar_gz(&[("package/package.json", manifest.as_bytes())])
}

//! GitHub REST payloads. Only the fields shipwright reads are modeled.

use serde::{Deserialize, Serialize};

/// A release record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Release {
    /// Numeric release id.
    pub id: u64,
    /// Tag the release points at.
    pub tag_name: String,
    /// Branch or commit the tag is created from.
    #[serde(default)]
    pub target_commitish: String,
    /// Release title.
    #[serde(default)]
    pub name: Option<String>,
    /// Release notes (markdown).
    #[serde(default)]
    pub body: Option<String>,
    /// Whether the release is still a draft.
    #[serde(default)]
    pub draft: bool,
    /// Whether the release is marked as a pre-release.
    #[serde(default)]
    pub prerelease: bool,
    /// Canonical web URL of the release page.
    #[serde(default)]
    pub html_url: String,
    /// RFC 6570 URI template for asset uploads.
    #[serde(default)]
    pub upload_url: String,
    /// Attached assets, in the order the API lists them.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A binary attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Asset {
    /// Numeric asset id.
    pub id: u64,
    /// File name.
    pub name: String,
    /// API URL; download with `Accept: application/octet-stream`.
    pub url: String,
    /// Public download URL.
    #[serde(default)]
    pub browser_download_url: String,
    /// Optional display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Size in bytes as reported by the API.
    #[serde(default)]
    pub size: u64,
}

/// A git reference under `refs/tags/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagRef {
    /// Full reference name, e.g. `refs/tags/v1.0.0`.
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// The object the reference points to.
    pub object: GitObject,
}

/// Target of a git reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GitObject {
    /// Object hash.
    pub sha: String,
    /// Object type (`commit` or `tag`).
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    /// `owner/repo`.
    #[serde(default)]
    pub full_name: String,
    /// Web URL, also usable as a clone URL.
    pub html_url: String,
    /// Default branch name.
    #[serde(default)]
    pub default_branch: String,
}

/// Body of a release update. Every field is sent so nothing is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseUpdate {
    /// Tag name.
    pub tag_name: String,
    /// Target branch or commit.
    pub target_commitish: String,
    /// Release title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Release notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Draft flag.
    pub draft: bool,
    /// Pre-release flag.
    pub prerelease: bool,
}

impl ReleaseUpdate {
    /// An update that keeps everything about `release` except the draft flag.
    pub fn with_draft(release: &Release, draft: bool) -> Self {
        Self {
            tag_name: release.tag_name.clone(),
            target_commitish: release.target_commitish.clone(),
            name: release.name.clone(),
            body: release.body.clone(),
            draft,
            prerelease: release.prerelease,
        }
    }
}

/// Body of a release creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    /// Tag to create or reuse.
    pub tag_name: String,
    /// Branch the tag is created from.
    pub target_commitish: String,
    /// Release title.
    pub name: String,
    /// Release notes.
    pub body: String,
    /// Draft flag.
    pub draft: bool,
    /// Pre-release flag.
    pub prerelease: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_deserializes_minimal_payload() {
        let json = r#"{
            "id": 1,
            "tag_name": "v1.0.0",
            "target_commitish": "main",
            "draft": true,
            "html_url": "https://github.com/foo/bar/releases/tag/v1.0.0",
            "upload_url": "https://uploads.github.com/repos/foo/bar/releases/1/assets{?name,label}",
            "assets": [{"id": 9, "name": "foo-1.0.0.tgz", "url": "https://api.github.com/repos/foo/bar/releases/assets/9"}]
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert!(release.draft);
        assert!(release.name.is_none());
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].name, "foo-1.0.0.tgz");
    }

    #[test]
    fn tag_ref_uses_ref_key() {
        let json = r#"{"ref": "refs/tags/v1.0.0", "object": {"sha": "abc", "type": "tag"}}"#;
        let tag: TagRef = serde_json::from_str(json).unwrap();
        assert_eq!(tag.ref_name, "refs/tags/v1.0.0");
        assert_eq!(tag.object.kind, "tag");
    }

    #[test]
    fn update_preserves_everything_but_draft() {
        let release = Release {
            id: 3,
            tag_name: "v2.0.0".into(),
            target_commitish: "main".into(),
            name: Some("Release v2.0.0".into()),
            body: Some("notes".into()),
            draft: true,
            prerelease: true,
            html_url: String::new(),
            upload_url: String::new(),
            assets: Vec::new(),
        };
        let update = ReleaseUpdate::with_draft(&release, false);
        assert_eq!(update.tag_name, "v2.0.0");
        assert_eq!(update.target_commitish, "main");
        assert_eq!(update.body.as_deref(), Some("notes"));
        assert!(update.prerelease);
        assert!(!update.draft);

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["draft"], false);
        assert_eq!(json["name"], "Release v2.0.0");
    }
}

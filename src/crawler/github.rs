//! Mirror the markdown files of a GitHub repository subtree.
//!
//! A `github.com/<user>/<repo>/(blob|tree)/<branch>/<path>` URL is mapped to
//! its `raw.githubusercontent.com` equivalent, then `wget` mirrors the `*.md`
//! files under it into the docs directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use url::Url;

#[derive(Debug, Error)]
pub enum GithubUrlError {
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("not a GitHub blob or tree path: {0}")]
    InvalidPath(String),
}

/// A resolved download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocsTarget {
    /// Repository name (used for the output directory).
    pub repo: String,
    /// Base URL under `raw.githubusercontent.com`, with a trailing slash.
    pub raw_base_url: String,
    /// Directory the mirrored files land in.
    pub output_dir: PathBuf,
}

/// Parse a GitHub blob/tree URL into a raw-content download target.
pub fn parse_github_url(github_url: &str, docs_dir: &Path) -> Result<RawDocsTarget, GithubUrlError> {
    let url = Url::parse(github_url)?;
    let parts: Vec<&str> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if parts.len() < 4 || !matches!(parts[2], "blob" | "tree") {
        return Err(GithubUrlError::InvalidPath(url.path().to_string()));
    }

    let (user, repo, branch) = (parts[0], parts[1], parts[3]);
    let folder = parts[4..].join("/");

    let raw_base_url = if folder.is_empty() {
        format!("https://raw.githubusercontent.com/{}/{}/{}/", user, repo, branch)
    } else {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}/",
            user, repo, branch, folder
        )
    };

    Ok(RawDocsTarget {
        repo: repo.to_string(),
        raw_base_url,
        output_dir: docs_dir.join(repo),
    })
}

/// Download the `*.md` files under the target via `wget`.
pub async fn mirror_markdown(target: &RawDocsTarget) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&target.output_dir).await?;

    tracing::info!(
        url = %target.raw_base_url,
        output = %target.output_dir.display(),
        "Mirroring markdown files"
    );

    let output = Command::new("wget")
        .args(["-r", "-A", "*.md", "-np", "-nH", "--cut-dirs=3", "-R", "index.html*"])
        .arg("-P")
        .arg(&target.output_dir)
        .arg(&target.raw_base_url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run wget: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "wget exited with {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_url_maps_to_raw_base() {
        let target = parse_github_url(
            "https://github.com/unclecode/crawl4ai/tree/main/docs/md_v2",
            Path::new(".docs"),
        )
        .unwrap();
        assert_eq!(target.repo, "crawl4ai");
        assert_eq!(
            target.raw_base_url,
            "https://raw.githubusercontent.com/unclecode/crawl4ai/main/docs/md_v2/"
        );
        assert_eq!(target.output_dir, Path::new(".docs").join("crawl4ai"));
    }

    #[test]
    fn blob_url_is_accepted() {
        let target = parse_github_url(
            "https://github.com/user/repo/blob/main/README.md",
            Path::new(".docs"),
        )
        .unwrap();
        assert_eq!(
            target.raw_base_url,
            "https://raw.githubusercontent.com/user/repo/main/README.md/"
        );
    }

    #[test]
    fn repo_root_tree_url_has_no_folder() {
        let target =
            parse_github_url("https://github.com/user/repo/tree/v2", Path::new("out")).unwrap();
        assert_eq!(
            target.raw_base_url,
            "https://raw.githubusercontent.com/user/repo/v2/"
        );
    }

    #[test]
    fn non_blob_tree_path_is_rejected() {
        let err = parse_github_url(
            "https://github.com/user/repo/releases/tag/v1",
            Path::new(".docs"),
        )
        .unwrap_err();
        assert!(matches!(err, GithubUrlError::InvalidPath(_)));
    }

    #[test]
    fn short_path_is_rejected() {
        let err =
            parse_github_url("https://github.com/user/repo", Path::new(".docs")).unwrap_err();
        assert!(matches!(err, GithubUrlError::InvalidPath(_)));
    }

    #[test]
    fn unparsable_url_is_rejected() {
        assert!(matches!(
            parse_github_url("not a url", Path::new(".docs")).unwrap_err(),
            GithubUrlError::Parse(_)
        ));
    }
}

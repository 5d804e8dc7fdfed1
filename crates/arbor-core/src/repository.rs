//! Repository descriptions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A remote repository an artifact can be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "default".to_string()
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            content_type: default_content_type(),
        }
    }
}

/// A local repository rooted at a directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalRepository {
    pub basedir: PathBuf,
}

/// Where a version range resolver found a particular version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactRepository {
    Remote(RemoteRepository),
    Local(LocalRepository),
}

/// Append the recessive repositories whose id is not already present
pub fn aggregate_repositories(
    dominant: &[RemoteRepository],
    recessive: &[RemoteRepository],
) -> Vec<RemoteRepository> {
    if recessive.is_empty() {
        return dominant.to_vec();
    }

    let mut result = dominant.to_vec();
    for repository in recessive {
        if !result.iter().any(|r| r.id == repository.id) {
            result.push(repository.clone());
        }
    }
    result
}

//! Source repository URL parsing

use url::Url;

/// Owner and name of the repository being forked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRepository {
    pub owner: String,
    pub name: String,
}

impl SourceRepository {
    /// Take owner and name from the first two path segments of `url`.
    ///
    /// Accepts anything with a URL path (`https://github.com/acme/widgets`,
    /// `ssh://git@github.com/acme/widgets.git`) as well as SCP-style
    /// `git@github.com:acme/widgets.git`. A trailing `.git` is dropped.
    pub fn parse(url: &str) -> Result<Self, String> {
        let url = url.trim();
        let segments: Vec<String> = match Url::parse(url) {
            Ok(parsed) if parsed.cannot_be_a_base() => {
                return Err("URL has no path segments".to_string())
            }
            Ok(parsed) => parsed
                .path_segments()
                .map(|segments| segments.map(str::to_string).collect())
                .unwrap_or_default(),
            Err(_) => scp_path(url)
                .ok_or_else(|| "not a URL".to_string())?
                .split('/')
                .map(str::to_string)
                .collect(),
        };

        let mut segments = segments.into_iter().filter(|segment| !segment.is_empty());
        let owner = segments.next();
        let name = segments.next();
        let (owner, name) = match (owner, name) {
            (Some(owner), Some(name)) => (owner, name),
            _ => return Err("expected an owner and a repository in the path".to_string()),
        };

        let name = name.strip_suffix(".git").unwrap_or(&name).to_string();
        if name.is_empty() {
            return Err("repository name is empty".to_string());
        }

        Ok(Self { owner, name })
    }

    /// Name of the private repository created for this source
    pub fn private_name(&self) -> String {
        format!("{}-{}-private", self.owner, self.name)
    }

    pub fn description(&self) -> String {
        format!("Private fork of {}/{}", self.owner, self.name)
    }
}

/// Path part of `user@host:path`
fn scp_path(url: &str) -> Option<&str> {
    let (host, path) = url.split_once(':')?;
    if host.is_empty() || host.contains('/') || path.starts_with("//") {
        return None;
    }
    Some(path)
}

//! Upstream source kinds and their URL builders.

use crate::config::UpstreamEndpoints;
use crate::{RelwatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The upstream registries relwatch knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Npm,
    Packagist,
    Pypi,
    Github,
    Endoflife,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Npm,
        SourceKind::Packagist,
        SourceKind::Pypi,
        SourceKind::Github,
        SourceKind::Endoflife,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Npm => "npm",
            SourceKind::Packagist => "packagist",
            SourceKind::Pypi => "pypi",
            SourceKind::Github => "github",
            SourceKind::Endoflife => "endoflife",
        }
    }

    /// Value of the `source` field in records produced from this kind.
    pub fn origin(&self) -> &'static str {
        match self {
            SourceKind::Npm => "npmjs.org",
            SourceKind::Packagist => "packagist.org",
            SourceKind::Pypi => "pypi.org",
            SourceKind::Github => "github.com",
            SourceKind::Endoflife => "endoflife.date",
        }
    }

    /// Build the request URL for `identifier` against the configured bases.
    ///
    /// The identifier is percent-encoded segment by segment. Only the
    /// separators the registry itself expects (`owner/repo`, `vendor/pkg`)
    /// survive unencoded.
    pub fn url(&self, endpoints: &UpstreamEndpoints, identifier: &str) -> Result<String> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(RelwatchError::Validation {
                field: "identifier".into(),
                message: format!("empty {} identifier", self),
            });
        }

        let url = match self {
            SourceKind::Npm => {
                format!("{}/{}", base(&endpoints.npm), encode_npm_name(identifier))
            }
            SourceKind::Packagist => {
                let (vendor, package) = split_pair(identifier, *self)?;
                format!(
                    "{}/packages/{}/{}.json",
                    base(&endpoints.packagist),
                    urlencoding::encode(vendor),
                    urlencoding::encode(package)
                )
            }
            SourceKind::Pypi => format!(
                "{}/pypi/{}/json",
                base(&endpoints.pypi),
                urlencoding::encode(identifier)
            ),
            SourceKind::Github => {
                let (owner, repo) = split_pair(identifier, *self)?;
                format!(
                    "{}/repos/{}/{}/releases/latest",
                    base(&endpoints.github),
                    urlencoding::encode(owner),
                    urlencoding::encode(repo)
                )
            }
            SourceKind::Endoflife => format!(
                "{}/api/{}.json",
                base(&endpoints.endoflife),
                urlencoding::encode(identifier)
            ),
        };

        Ok(url)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = RelwatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "npm" => Ok(SourceKind::Npm),
            "packagist" | "composer" => Ok(SourceKind::Packagist),
            "pypi" => Ok(SourceKind::Pypi),
            "github" => Ok(SourceKind::Github),
            "endoflife" => Ok(SourceKind::Endoflife),
            other => Err(RelwatchError::UnsupportedSource(other.to_string())),
        }
    }
}

fn base(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Scoped names keep the leading `@`; the scope separator becomes `%2F`.
fn encode_npm_name(name: &str) -> String {
    match name.strip_prefix('@') {
        Some(scoped) => format!("@{}", urlencoding::encode(scoped)),
        None => urlencoding::encode(name).into_owned(),
    }
}

fn split_pair(identifier: &str, kind: SourceKind) -> Result<(&str, &str)> {
    match identifier.split_once('/') {
        Some((left, right))
            if !left.is_empty() && !right.is_empty() && !right.contains('/') =>
        {
            Ok((left, right))
        }
        _ => Err(RelwatchError::Validation {
            field: "identifier".into(),
            message: format!("{} identifier must look like 'a/b', got '{}'", kind, identifier),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> UpstreamEndpoints {
        UpstreamEndpoints::default()
    }

    #[test]
    fn test_npm_urls() {
        assert_eq!(
            SourceKind::Npm.url(&endpoints(), "react").unwrap(),
            "https://registry.npmjs.org/react"
        );
        assert_eq!(
            SourceKind::Npm.url(&endpoints(), "@types/node").unwrap(),
            "https://registry.npmjs.org/@types%2Fnode"
        );
    }

    #[test]
    fn test_identifiers_are_percent_encoded() {
        let url = SourceKind::Npm.url(&endpoints(), "left pad?x=1").unwrap();
        assert_eq!(url, "https://registry.npmjs.org/left%20pad%3Fx%3D1");

        let url = SourceKind::Endoflife.url(&endpoints(), "../php").unwrap();
        assert_eq!(url, "https://endoflife.date/api/..%2Fphp.json");
    }

    #[test]
    fn test_pair_sources() {
        assert_eq!(
            SourceKind::Packagist
                .url(&endpoints(), "laravel/framework")
                .unwrap(),
            "https://packagist.org/packages/laravel/framework.json"
        );
        assert_eq!(
            SourceKind::Github.url(&endpoints(), "rust-lang/rust").unwrap(),
            "https://api.github.com/repos/rust-lang/rust/releases/latest"
        );
        assert!(SourceKind::Github.url(&endpoints(), "rust-lang").is_err());
        assert!(SourceKind::Github.url(&endpoints(), "a/b/c").is_err());
        assert!(SourceKind::Packagist.url(&endpoints(), "/framework").is_err());
    }

    #[test]
    fn test_pypi_and_endoflife_urls() {
        assert_eq!(
            SourceKind::Pypi.url(&endpoints(), "requests").unwrap(),
            "https://pypi.org/pypi/requests/json"
        );
        assert_eq!(
            SourceKind::Endoflife.url(&endpoints(), "nodejs").unwrap(),
            "https://endoflife.date/api/nodejs.json"
        );
    }

    #[test]
    fn test_trailing_slash_on_base() {
        let endpoints = UpstreamEndpoints::all("http://127.0.0.1:9000/");
        assert_eq!(
            SourceKind::Pypi.url(&endpoints, "flask").unwrap(),
            "http://127.0.0.1:9000/pypi/flask/json"
        );
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(SourceKind::Npm.url(&endpoints(), "  ").is_err());
    }

    #[test]
    fn test_source_kind_parse() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert_eq!("NPM".parse::<SourceKind>().unwrap(), SourceKind::Npm);
        let err = "cargo".parse::<SourceKind>().unwrap_err();
        assert!(matches!(err, RelwatchError::UnsupportedSource(ref s) if s == "cargo"));
    }
}

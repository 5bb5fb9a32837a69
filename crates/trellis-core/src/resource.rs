use std::fmt;
use std::str::FromStr;

pub const PATH_SEPARATOR: char = '/';
pub const TYPE_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("malformed resource path '{path}': {reason}")]
    MalformedResourcePath { path: String, reason: &'static str },
    #[error("resource type must be non-empty and must not contain ':' or '/': '{0}'")]
    InvalidResourceType(String),
    #[error("malformed resource key '{0}' (expected \"type:/path\")")]
    MalformedResourceKey(String),
}

/// Partitions independent permission trees, e.g. `thing`, `policy`, `message`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Result<Self, ResourceError> {
        let name = name.into();
        if name.is_empty() || name.contains(TYPE_SEPARATOR) || name.contains(PATH_SEPARATOR) {
            return Err(ResourceError::InvalidResourceType(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered sequence of non-empty segments. The empty sequence is the root.
///
/// Segments are validated once here, so the engine never re-checks them at
/// query time.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Result<Self, ResourceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_segment(segment, || format!("/{}", segments.join("/")))?;
        }
        Ok(Self { segments })
    }

    /// Parses the external `/a/b/c` form. `""` and `"/"` denote the root; a
    /// single trailing separator is tolerated.
    pub fn parse(path: &str) -> Result<Self, ResourceError> {
        let trimmed = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
        if trimmed.starts_with(PATH_SEPARATOR) {
            return Err(ResourceError::MalformedResourcePath {
                path: path.to_string(),
                reason: "empty segment",
            });
        }
        let trimmed = trimmed.strip_suffix(PATH_SEPARATOR).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in trimmed.split(PATH_SEPARATOR) {
            if segment.is_empty() {
                return Err(ResourceError::MalformedResourcePath {
                    path: path.to_string(),
                    reason: "empty segment",
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn child(&self, segment: impl Into<String>) -> Result<Self, ResourceError> {
        let segment = segment.into();
        validate_segment(&segment, || format!("{self}/{segment}"))?;
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// Path made of the first `len` segments.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

fn validate_segment(segment: &str, path: impl FnOnce() -> String) -> Result<(), ResourceError> {
    if segment.is_empty() {
        return Err(ResourceError::MalformedResourcePath {
            path: path(),
            reason: "empty segment",
        });
    }
    if segment.contains(PATH_SEPARATOR) {
        return Err(ResourceError::MalformedResourcePath {
            path: path(),
            reason: "segment contains the path separator",
        });
    }
    Ok(())
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourcePath {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    pub resource_type: ResourceType,
    pub path: ResourcePath,
}

impl ResourceKey {
    pub fn new(resource_type: ResourceType, path: ResourcePath) -> Self {
        Self {
            resource_type,
            path,
        }
    }

    pub fn root(resource_type: ResourceType) -> Self {
        Self::new(resource_type, ResourcePath::root())
    }

    /// Parses `type:/path`.
    pub fn parse(key: &str) -> Result<Self, ResourceError> {
        let (resource_type, path) = key
            .split_once(TYPE_SEPARATOR)
            .ok_or_else(|| ResourceError::MalformedResourceKey(key.to_string()))?;
        if !path.is_empty() && !path.starts_with(PATH_SEPARATOR) {
            return Err(ResourceError::MalformedResourceKey(key.to_string()));
        }
        Ok(Self {
            resource_type: ResourceType::new(resource_type)?,
            path: ResourcePath::parse(path)?,
        })
    }

    pub fn child(&self, segment: impl Into<String>) -> Result<Self, ResourceError> {
        Ok(Self {
            resource_type: self.resource_type.clone(),
            path: self.path.child(segment)?,
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.resource_type, TYPE_SEPARATOR, self.path)
    }
}

impl FromStr for ResourceKey {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

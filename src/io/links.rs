use std::collections::HashMap;

use crate::model::config::LinkRoute;
use crate::model::item::LinkTarget;

/// Error type for link resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("no route configured for {kind}:{id}")]
    UnknownTarget { kind: String, id: String },
    #[error("custom link has an empty url")]
    EmptyUrl,
}

/// Turns a typed link target into a destination path.
///
/// Implementations are pure lookups: the menu structure plays no part.
pub trait LinkResolver {
    fn resolve(&self, target: &LinkTarget) -> Result<String, LinkError>;
}

/// Lookup table of configured routes, keyed by `(kind, id)`.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(String, String), String>,
}

impl RouteTable {
    pub fn new(routes: &[LinkRoute]) -> Self {
        RouteTable {
            routes: routes
                .iter()
                .map(|r| ((r.kind.clone(), r.id.clone()), r.path.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl LinkResolver for RouteTable {
    fn resolve(&self, target: &LinkTarget) -> Result<String, LinkError> {
        match target {
            LinkTarget::Custom { url } => {
                let url = url.trim();
                if url.is_empty() {
                    Err(LinkError::EmptyUrl)
                } else {
                    Ok(url.to_string())
                }
            }
            LinkTarget::Entity { kind, id } => self
                .routes
                .get(&(kind.clone(), id.clone()))
                .cloned()
                .ok_or_else(|| LinkError::UnknownTarget {
                    kind: kind.clone(),
                    id: id.clone(),
                }),
        }
    }
}

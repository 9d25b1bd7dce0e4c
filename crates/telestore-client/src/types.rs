//! Wire types shared by every document backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One node of a document's structured content.
///
/// Content is a list of nodes; a node is either a bare text string or an
/// element with a tag, optional attributes and child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// A text node.
    Text(String),
    /// An element node.
    Element(NodeElement),
}

/// An element in the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeElement {
    /// Lowercase tag name, e.g. `p`.
    pub tag: String,
    /// Only `href` and `src` are honoured by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Build a text node.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build an element node without attributes.
    #[must_use]
    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Self::Element(NodeElement {
            tag: tag.into(),
            attrs: None,
            children,
        })
    }

    /// The text of a text node.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(_) => None,
        }
    }

    /// Child nodes of an element; empty for text nodes.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Text(_) => &[],
            Self::Element(element) => &element.children,
        }
    }
}

/// A document as returned by create, fetch and edit calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Backend-assigned locator.
    pub path: String,
    #[serde(default)]
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Present only when the call asked for content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Node>>,
}

/// A listing entry: just enough to resolve a title to a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub path: String,
    pub title: String,
}

/// An account on the document backend.
///
/// The access token is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub short_name: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_url: String,
    /// Only returned by account creation and token revocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("short_name", &self.short_name)
            .field("author_name", &self.author_name)
            .field("author_url", &self.author_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

/// One page of a document listing.
#[cfg(feature = "http-client")]
#[derive(Debug, Deserialize)]
pub(crate) struct DocumentList {
    pub total_count: u64,
    pub pages: Vec<DocumentSummary>,
}

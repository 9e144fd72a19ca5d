use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Content variant the site can render a block in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    React,
    Vue,
    Html,
}

impl Flavor {
    pub const ALL: [Flavor; 3] = [Flavor::React, Flavor::Vue, Flavor::Html];

    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::React => "react",
            Flavor::Vue => "vue",
            Flavor::Html => "html",
        }
    }

    /// Name the language endpoint expects in `snippet_lang`.
    ///
    /// Only the React mapping has been observed; Vue and HTML are passed
    /// through unchanged.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Flavor::React => "react-v4",
            Flavor::Vue => "vue",
            Flavor::Html => "html",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Flavor::React => "jsx",
            Flavor::Vue => "vue",
            Flavor::Html => "html",
        }
    }

    /// File name used for this flavor inside an item directory, e.g. `react.jsx`.
    pub fn artifact_name(&self) -> String {
        format!("{}.{}", self.as_str(), self.extension())
    }

    /// Maps the snippet name reported by the server back to a flavor.
    ///
    /// Accepts both the plain name and the wire name.
    pub fn from_served(name: &str) -> Option<Flavor> {
        Flavor::ALL
            .into_iter()
            .find(|f| f.as_str() == name || f.wire_name() == name)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "react" => Ok(Flavor::React),
            "vue" => Ok(Flavor::Vue),
            "html" => Ok(Flavor::Html),
            other => Err(format!("unknown flavor '{}' (expected react, vue or html)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subcategory {
    #[serde(default)]
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snippet {
    pub name: String,
    #[serde(default)]
    pub code: String,
}

impl Snippet {
    pub fn flavor(&self) -> Option<Flavor> {
        Flavor::from_served(&self.name)
    }
}

/// One catalog block as embedded in a subcategory page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

impl Item {
    /// Stable identifier: the uuid when present, otherwise the numeric or string id.
    pub fn identifier(&self) -> Option<String> {
        if let Some(uuid) = self.uuid.as_ref().filter(|u| !u.is_empty()) {
            return Some(uuid.clone());
        }
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn served_flavor(&self) -> Option<Flavor> {
        self.snippet.as_ref().and_then(Snippet::flavor)
    }
}

/// Output grouping derived from a subcategory URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryPath {
    pub category: String,
    pub subcategory: String,
}

impl CategoryPath {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn unknown() -> Self {
        Self {
            category: Self::UNKNOWN.to_string(),
            subcategory: Self::UNKNOWN.to_string(),
        }
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.subcategory)
    }
}

//! The route table.
//!
//! Routing itself lives outside the template engine; the engine only needs the
//! table read-only, to reverse a route name into a path for `{% url %}`. The
//! table is stored in `routes.json` as an object keyed by path:
//!
//! ```json
//! {
//!     "/": { "target": "Home::index", "name": "home" },
//!     "/groups": { "target": "Group::list", "methods": ["GET", "POST"], "name": "groups" }
//! }
//! ```
//!
//! File order is preserved: when two routes share a name, the first one wins.

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::NelumboError;

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

/// A single route entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// The `Controller::method` the route dispatches to.
    pub target: String,
    /// Accepted HTTP methods. Defaults to `["GET"]`.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    /// Optional route name, used for reverse lookups.
    #[serde(default)]
    pub name: Option<String>,
}

impl Route {
    /// Creates a GET-only route without a name.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            methods: default_methods(),
            name: None,
        }
    }

    /// Sets the route name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An ordered mapping from request path to [`Route`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<(String, Route)>,
}

impl RouteTable {
    /// Creates an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route, replacing an existing entry for the same path in place.
    pub fn insert(&mut self, path: impl Into<String>, route: Route) {
        let path = path.into();
        if let Some(entry) = self.routes.iter_mut().find(|(p, _)| *p == path) {
            entry.1 = route;
        } else {
            self.routes.push((path, route));
        }
    }

    /// Returns the route registered for `path`.
    pub fn get(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, route)| route)
    }

    /// Returns the path of the first route named `name`.
    pub fn reverse(&self, name: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|(_, route)| route.name.as_deref() == Some(name))
            .map(|(path, _)| path.as_str())
    }

    /// Iterates over `(path, route)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Route)> {
        self.routes.iter().map(|(path, route)| (path.as_str(), route))
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Parses a route table from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a `SerializationError` if the JSON is malformed or a route lacks a target.
    pub fn from_json_str(json: &str) -> Result<Self, NelumboError> {
        serde_json::from_str(json)
            .map_err(|e| NelumboError::SerializationError(format!("Failed to parse routes: {e}")))
    }

    /// Reads a route table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NelumboError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

impl<'de> Deserialize<'de> for RouteTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RouteTableVisitor;

        impl<'de> Visitor<'de> for RouteTableVisitor {
            type Value = RouteTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping paths to routes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RouteTable, A::Error> {
                let mut table = RouteTable::new();
                while let Some((path, route)) = access.next_entry::<String, Route>()? {
                    table.insert(path, route);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(RouteTableVisitor)
    }
}

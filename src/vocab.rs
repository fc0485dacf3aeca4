//! Method-name vocabularies and route string helpers.

use phf::phf_set;
use std::collections::HashSet;

/// HTTP verbs as they appear as method names on routers.
pub static HTTP_METHODS: phf::Set<&'static str> = phf_set! {
    "get", "post", "put", "delete", "patch", "head", "options", "connect", "trace",
};

/// Methods of application/router objects that are not HTTP verbs.
pub static APP_FRAMEWORK_METHODS: phf::Set<&'static str> = phf_set! {
    "all", "use", "route", "param", "listen", "set", "engine", "enable", "disable",
    "enabled", "disabled", "render", "path", "static", "mount", "locals", "del",
};

/// Effective vocabularies, after configuration overrides.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    http_methods: HashSet<String>,
    app_framework_methods: HashSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            http_methods: HTTP_METHODS.iter().map(|s| s.to_string()).collect(),
            app_framework_methods: APP_FRAMEWORK_METHODS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Vocabulary {
    pub fn new(http_methods: Option<&[String]>, app_framework_methods: Option<&[String]>) -> Self {
        let mut vocab = Self::default();
        if let Some(methods) = http_methods {
            vocab.http_methods = methods.iter().map(|m| m.to_lowercase()).collect();
        }
        if let Some(methods) = app_framework_methods {
            vocab.app_framework_methods = methods.iter().map(|m| m.to_lowercase()).collect();
        }
        vocab
    }

    /// Case-sensitive: `Get` is a decorator name, not a router method.
    pub fn is_http_method(&self, name: &str) -> bool {
        self.http_methods.contains(name)
    }

    pub fn is_http_method_ignore_case(&self, name: &str) -> bool {
        self.http_methods.contains(&name.to_lowercase())
    }

    pub fn is_app_framework_method(&self, name: &str) -> bool {
        self.app_framework_methods.contains(name)
    }

    pub fn starts_with_http_method(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.http_methods.iter().any(|m| lower.starts_with(m.as_str()))
    }

    pub fn ends_with_http_method(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.http_methods.iter().any(|m| lower.ends_with(m.as_str()))
    }
}

/// A string looks like a route when it starts with `/`, or contains a
/// `/` and no whitespace.
pub fn is_route_like(value: &str) -> bool {
    value.starts_with('/') || (value.contains('/') && !value.chars().any(char::is_whitespace))
}

/// Joins route segments into `/a/b`, dropping empty segments. The result
/// is `/` when every segment is empty.
pub fn join_route<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let parts: Vec<&str> = segments
        .into_iter()
        .flat_map(|s| s.split('/'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", parts.join("/"))
}

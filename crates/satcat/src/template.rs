//! Path-template expansion.
//!
//! Templates are literal text with `${name}` placeholders; names may carry
//! `:`-namespaced identifiers (`${landsat:path}`). The engine is pure
//! string computation: it knows nothing about documents or persistence and
//! asks a [`FieldResolver`] for every placeholder value. Path separators in
//! the template come through as directory boundaries in the output.

use crate::error::{Error, Result};

/// Supplies values for template placeholders.
///
/// [`crate::Item`] implements this with the full lookup chain (`id`, the
/// date-derived pseudo-fields, own properties, then the owning
/// collection's properties); tests use synthetic resolvers.
pub trait FieldResolver {
    fn get(&self, name: &str) -> Option<String>;
}

impl<F> FieldResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Names of the placeholders in a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Expand every `${name}` in `template` against `resolver`.
///
/// A placeholder no resolver can satisfy is a hard error, never an empty
/// substitution.
pub fn expand(template: &str, resolver: &dyn FieldResolver) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(Error::UnresolvedField(format!(
                "unterminated placeholder in '{template}'"
            )));
        };
        let name = &after[..end];
        match resolver.get(name) {
            Some(value) => out.push_str(&value),
            None => return Err(Error::UnresolvedField(name.to_string())),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, &'static str>);

    impl FieldResolver for MapResolver {
        fn get(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|v| v.to_string())
        }
    }

    fn resolver() -> MapResolver {
        MapResolver(HashMap::from([
            ("id", "X"),
            ("collection", "L8"),
            ("date", "2020-06-11"),
            ("landsat:path", "026"),
        ]))
    }

    #[test]
    fn test_expand_preserves_separators() {
        let out = expand("${collection}/${date}/${id}", &resolver()).unwrap();
        assert_eq!(out, "L8/2020-06-11/X");
    }

    #[test]
    fn test_expand_namespaced_name() {
        let out = expand("path-${landsat:path}", &resolver()).unwrap();
        assert_eq!(out, "path-026");
    }

    #[test]
    fn test_expand_literal_only() {
        assert_eq!(expand("plain/path", &resolver()).unwrap(), "plain/path");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let err = expand("${nosuch}", &resolver()).unwrap_err();
        match err {
            Error::UnresolvedField(name) => assert_eq!(name, "nosuch"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_field_never_substitutes_empty() {
        // even alongside resolvable placeholders
        assert!(expand("${collection}/${nosuch}", &resolver()).is_err());
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert!(expand("${collection", &resolver()).is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholders("${collection}/${date}/${id}"),
            vec!["collection", "date", "id"]
        );
        assert_eq!(placeholders("no-placeholders"), Vec::<&str>::new());
    }

    #[test]
    fn test_closure_resolver() {
        let f = |name: &str| (name == "id").then(|| "42".to_string());
        assert_eq!(expand("${id}", &f).unwrap(), "42");
    }
}

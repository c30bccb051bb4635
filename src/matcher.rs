use crate::PATH_SEPARATOR;
use crate::document::{ApiDocument, normalize_base_path};
use crate::error::ContractError;
use dashmap::DashMap;
use percent_encoding::percent_decode_str;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Characters a placeholder value can never contain.
const PLACEHOLDER_TERMINATORS: [char; 3] = ['/', '?', '#'];
/// Upper bound on memoized request paths. Paths seen after the memo is full
/// are matched every time.
const MEMO_CAPACITY: usize = 1024;

/// The template a request path resolved to, with its extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub template: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateToken {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug)]
struct CompiledTemplate {
    template: String,
    tokens: Vec<TemplateToken>,
}

impl CompiledTemplate {
    /// Splits `/pets/{id}.{format}` into literal and placeholder tokens. An
    /// explode modifier (`{id*}`) is accepted and dropped; operator prefixes
    /// are not supported and stay part of the name.
    fn compile(template: &str) -> Self {
        let mut tokens = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|close| open + close) else {
                break;
            };
            if open > 0 {
                tokens.push(TemplateToken::Literal(rest[..open].to_string()));
            }
            let name = rest[open + 1..close].trim_end_matches('*');
            tokens.push(TemplateToken::Placeholder(name.to_string()));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            tokens.push(TemplateToken::Literal(rest.to_string()));
        }
        Self {
            template: template.to_string(),
            tokens,
        }
    }

    fn extract(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut captures = Vec::new();
        let mut failed = HashSet::new();
        if !Self::match_tokens(&self.tokens, path, &mut captures, &mut failed) {
            return None;
        }
        Some(
            captures
                .into_iter()
                .map(|(name, raw)| {
                    let decoded = percent_decode_str(raw).decode_utf8_lossy().into_owned();
                    (name.to_string(), decoded)
                })
                .collect(),
        )
    }

    /// Backtracking match where each placeholder first tries the longest
    /// capture it can take.
    ///
    /// `failed` records (tokens left, path left) pairs already known not to
    /// match, which keeps adjacent placeholders such as `{a}{b}{c}` polynomial.
    fn match_tokens<'t, 'p>(
        tokens: &'t [TemplateToken],
        path: &'p str,
        captures: &mut Vec<(&'t str, &'p str)>,
        failed: &mut HashSet<(usize, usize)>,
    ) -> bool {
        let key = (tokens.len(), path.len());
        if failed.contains(&key) {
            return false;
        }
        let matched = Self::match_first(tokens, path, captures, failed);
        if !matched {
            failed.insert(key);
        }
        matched
    }

    fn match_first<'t, 'p>(
        tokens: &'t [TemplateToken],
        path: &'p str,
        captures: &mut Vec<(&'t str, &'p str)>,
        failed: &mut HashSet<(usize, usize)>,
    ) -> bool {
        let Some((token, remaining)) = tokens.split_first() else {
            return path.is_empty();
        };
        match token {
            TemplateToken::Literal(literal) => match path.strip_prefix(literal.as_str()) {
                Some(rest) => Self::match_tokens(remaining, rest, captures, failed),
                None => false,
            },
            TemplateToken::Placeholder(name) => {
                let limit = path
                    .find(|c: char| PLACEHOLDER_TERMINATORS.contains(&c))
                    .unwrap_or(path.len());
                let next_literal = match remaining.first() {
                    Some(TemplateToken::Literal(literal)) => Some(literal.as_str()),
                    _ => None,
                };
                let mut ends: Vec<usize> = path[..limit]
                    .char_indices()
                    .map(|(index, c)| index + c.len_utf8())
                    .filter(|end| {
                        next_literal.is_none_or(|literal| path[*end..].starts_with(literal))
                    })
                    .collect();
                ends.reverse();
                for end in ends {
                    captures.push((name.as_str(), &path[..end]));
                    if Self::match_tokens(remaining, &path[end..], captures, failed) {
                        return true;
                    }
                    captures.pop();
                }
                false
            }
        }
    }
}

/// Resolves request paths to the declared path template they belong to.
///
/// Templates are tried in declaration order and the first one that matches
/// wins, even when a later one would match as well. A path equal to a
/// template string is matched directly. Results are memoized per request
/// path, up to a fixed number of paths.
pub struct PathTemplateMatcher {
    templates: Vec<CompiledTemplate>,
    base_path: Option<String>,
    resolved: DashMap<String, Arc<PathMatch>>,
}

impl PathTemplateMatcher {
    pub fn new(templates: &[String], base_path: Option<&str>) -> Self {
        Self {
            templates: templates
                .iter()
                .map(|template| CompiledTemplate::compile(template))
                .collect(),
            base_path: base_path.and_then(normalize_base_path),
            resolved: DashMap::new(),
        }
    }

    pub fn from_document(document: &ApiDocument) -> Self {
        Self::new(document.path_templates(), document.base_path())
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Finds the template `request_path` belongs to.
    ///
    /// # Arguments
    ///
    /// * `request_path` - the observed path, optionally prefixed by the base path
    ///
    /// # Returns
    ///
    /// * `Ok(PathMatch)` - the first matching template and its percent-decoded
    ///   parameter values
    /// * `Err(ContractError::ContractNotFound)` - when no template matches
    ///
    /// # Example
    ///
    /// ```rust
    /// use oas_contract::matcher::PathTemplateMatcher;
    ///
    /// let templates = vec!["/pets".to_string(), "/pets/{id}".to_string()];
    /// let matcher = PathTemplateMatcher::new(&templates, Some("/api"));
    /// let found = matcher.match_path("/api/pets/a+b").unwrap();
    /// assert_eq!(found.template, "/pets/{id}");
    /// assert_eq!(found.params["id"], "a+b");
    /// ```
    pub fn match_path(&self, request_path: &str) -> Result<Arc<PathMatch>, ContractError> {
        if let Some(found) = self.resolved.get(request_path) {
            return Ok(Arc::clone(found.value()));
        }

        let path = self.strip_base_path(request_path);
        let found = match self.find_template(path) {
            Some(found) => Arc::new(found),
            None => {
                log::debug!("No path template matches '{}'", request_path);
                return Err(ContractError::contract_not_found(request_path));
            }
        };
        log::debug!("Path '{}' matched template '{}'", request_path, found.template);
        if self.resolved.len() < MEMO_CAPACITY {
            self.resolved
                .insert(request_path.to_string(), Arc::clone(&found));
        }
        Ok(found)
    }

    fn find_template(&self, path: &str) -> Option<PathMatch> {
        if let Some(exact) = self.templates.iter().find(|compiled| compiled.template == path) {
            return Some(PathMatch {
                template: exact.template.clone(),
                params: BTreeMap::new(),
            });
        }
        self.templates.iter().find_map(|compiled| {
            compiled.extract(path).map(|params| PathMatch {
                template: compiled.template.clone(),
                params,
            })
        })
    }

    fn strip_base_path<'p>(&self, request_path: &'p str) -> &'p str {
        let path = match request_path.find(['?', '#']) {
            Some(end) => &request_path[..end],
            None => request_path,
        };
        let Some(base_path) = self.base_path.as_deref() else {
            return path;
        };
        match path.strip_prefix(base_path) {
            Some("") => PATH_SEPARATOR,
            Some(rest) if rest.starts_with(PATH_SEPARATOR) => rest,
            _ => path,
        }
    }
}

// crates/domain/src/slug.rs

//! Slug canonicalization for bilingual content routes.
//!
//! Every piece of content has exactly one *canonical id* (the key used to
//! query the CMS). Requests can reach it through a legacy alias, through any
//! language's display slug, or through the canonical id itself; links and
//! redirects always use the display slug of the current language.
//!
//! Tables are per content category and are never merged.

use crate::lang::Language;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("category {category}: empty slug in table")]
    EmptySlug { category: String },

    #[error("category {category}: display slug {display:?} is registered for both {first:?} and {second:?}")]
    AmbiguousDisplay {
        category: String,
        display: String,
        first: String,
        second: String,
    },

    #[error("category {category}: alias chain starting at {alias:?} loops")]
    AliasCycle { category: String, alias: String },

    #[error("category {category}: canonical id {canonical:?} is also registered as an alias")]
    AliasedCanonical { category: String, canonical: String },

    #[error("category {category}: {slug:?} resolves to {resolved:?} instead of itself")]
    Unstable {
        category: String,
        slug: String,
        resolved: String,
    },

    #[error("duplicate category: {0}")]
    DuplicateCategory(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a raw URL segment.
///
/// Lowercases, trims whitespace and slashes at both ends, and collapses runs
/// of whitespace and hyphens into a single `-`. Hyphens left dangling at
/// either end are dropped. Never fails; `""` stays `""`.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let trimmed = lowered.trim_matches(|c: char| c.is_whitespace() || c == '/');

    let mut out = String::with_capacity(trimmed.len());
    let mut pending_dash = false;

    for ch in trimmed.chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
            continue;
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.push(ch);
    }

    out
}

fn normalize_base(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn join(base: &str, slug: &str) -> String {
    if base == "/" {
        format!("/{slug}")
    } else {
        format!("{base}/{slug}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Table
// ─────────────────────────────────────────────────────────────────────────────

/// Alias and translation tables for one content category.
#[derive(Debug, Clone)]
pub struct SlugTable {
    category: String,
    bases: HashMap<Language, String>,
    /// legacy / misspelled slug → canonical id (chains already resolved)
    aliases: HashMap<String, String>,
    /// language → canonical id → display slug
    display: HashMap<Language, HashMap<String, String>>,
    /// display slug (any language) → canonical id
    reverse: HashMap<String, String>,
}

impl SlugTable {
    pub fn builder(category: impl Into<String>) -> SlugTableBuilder {
        SlugTableBuilder::new(category)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Listing base path of this category for `language`.
    pub fn base_path(&self, language: Language) -> &str {
        self.bases
            .get(&language)
            .map(String::as_str)
            .unwrap_or("/")
    }

    /// Resolve any known or unknown slug to its canonical id.
    ///
    /// Display slugs of any language are looked up first, then aliases.
    /// Unknown slugs come back normalized.
    pub fn canonicalize(&self, raw: &str) -> String {
        let slug = normalize(raw);
        let slug = match self.reverse.get(&slug) {
            Some(canonical) => canonical.clone(),
            None => slug,
        };
        match self.aliases.get(&slug) {
            Some(canonical) => canonical.clone(),
            None => slug,
        }
    }

    /// Display slug of `canonical` in `language`; the canonical id itself
    /// when no translation is registered.
    pub fn to_display_slug(&self, canonical: &str, language: Language) -> String {
        self.display
            .get(&language)
            .and_then(|by_id| by_id.get(canonical))
            .cloned()
            .unwrap_or_else(|| canonical.to_string())
    }

    /// `(base_path, display_slug)` for a raw slug in `language`.
    pub fn build_route(&self, language: Language, raw: &str) -> (String, String) {
        let canonical = self.canonicalize(raw);
        (
            self.base_path(language).to_string(),
            self.to_display_slug(&canonical, language),
        )
    }

    /// Absolute path of the content page for a raw slug in `language`.
    pub fn href(&self, language: Language, raw: &str) -> String {
        let (base, display) = self.build_route(language, raw);
        join(&base, &display)
    }

    /// True when `requested` is not the ideal display slug for `canonical`.
    pub fn is_canonical_redirect_needed(
        &self,
        requested: &str,
        canonical: &str,
        language: Language,
    ) -> bool {
        requested != self.to_display_slug(canonical, language)
    }

    /// Per-language hrefs of the same content item.
    pub fn alternates(&self, canonical: &str) -> Vec<(Language, String)> {
        Language::ALL
            .iter()
            .map(|&lang| {
                let display = self.to_display_slug(canonical, lang);
                (lang, join(self.base_path(lang), &display))
            })
            .collect()
    }

    fn check_fixed_point(&self, slug: &str) -> Result<(), SlugError> {
        let resolved = self.canonicalize(slug);
        if resolved != slug {
            return Err(SlugError::Unstable {
                category: self.category.clone(),
                slug: slug.to_string(),
                resolved,
            });
        }
        Ok(())
    }

    /// Reject tables on which `canonicalize` would not be idempotent or
    /// display slugs would not round-trip.
    fn validate(&self) -> Result<(), SlugError> {
        for by_id in self.display.values() {
            for (canonical, display) in by_id {
                if self.aliases.contains_key(canonical) {
                    return Err(SlugError::AliasedCanonical {
                        category: self.category.clone(),
                        canonical: canonical.clone(),
                    });
                }
                self.check_fixed_point(canonical)?;

                let back = self.canonicalize(display);
                if &back != canonical {
                    return Err(SlugError::Unstable {
                        category: self.category.clone(),
                        slug: display.clone(),
                        resolved: back,
                    });
                }
            }
        }

        for target in self.aliases.values() {
            self.check_fixed_point(target)?;
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SlugTableBuilder {
    category: String,
    bases: HashMap<Language, String>,
    aliases: Vec<(String, String)>,
    display: Vec<(Language, String, String)>,
}

impl SlugTableBuilder {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn base(mut self, language: Language, path: impl AsRef<str>) -> Self {
        self.bases.insert(language, normalize_base(path.as_ref()));
        self
    }

    pub fn alias(mut self, from: impl AsRef<str>, to: impl AsRef<str>) -> Self {
        self.aliases
            .push((normalize(from.as_ref()), normalize(to.as_ref())));
        self
    }

    pub fn display(
        mut self,
        language: Language,
        canonical: impl AsRef<str>,
        display: impl AsRef<str>,
    ) -> Self {
        self.display.push((
            language,
            normalize(canonical.as_ref()),
            normalize(display.as_ref()),
        ));
        self
    }

    pub fn build(self) -> Result<SlugTable, SlugError> {
        let category = self.category;
        let empty = || SlugError::EmptySlug {
            category: category.clone(),
        };

        // Missing bases default to `<lang prefix>/<category>`.
        let mut bases = self.bases;
        for lang in Language::ALL {
            bases
                .entry(lang)
                .or_insert_with(|| normalize_base(&join(lang.prefix(), &normalize(&category))));
        }

        let mut raw_aliases: HashMap<String, String> = HashMap::new();
        for (from, to) in self.aliases {
            if from.is_empty() || to.is_empty() {
                return Err(empty());
            }
            if from != to {
                raw_aliases.insert(from, to);
            }
        }

        let mut aliases = HashMap::with_capacity(raw_aliases.len());
        for start in raw_aliases.keys() {
            let mut current = start;
            let mut steps = 0;
            while let Some(next) = raw_aliases.get(current) {
                steps += 1;
                if steps > raw_aliases.len() {
                    return Err(SlugError::AliasCycle {
                        category: category.clone(),
                        alias: start.clone(),
                    });
                }
                current = next;
            }
            aliases.insert(start.clone(), current.clone());
        }

        let mut display: HashMap<Language, HashMap<String, String>> = HashMap::new();
        let mut reverse: HashMap<String, String> = HashMap::new();
        for (lang, canonical, shown) in self.display {
            if canonical.is_empty() || shown.is_empty() {
                return Err(empty());
            }
            if shown != canonical {
                if let Some(existing) = reverse.get(&shown) {
                    if existing != &canonical {
                        return Err(SlugError::AmbiguousDisplay {
                            category: category.clone(),
                            display: shown,
                            first: existing.clone(),
                            second: canonical,
                        });
                    }
                }
                reverse.insert(shown.clone(), canonical.clone());
            }
            display.entry(lang).or_default().insert(canonical, shown);
        }

        let table = SlugTable {
            category,
            bases,
            aliases,
            display,
            reverse,
        };
        table.validate()?;
        Ok(table)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// A content route recognized from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub category: String,
    pub language: Language,
    /// Slug segment exactly as it appeared in the path.
    pub raw_slug: String,
}

/// One `SlugTable` per content category.
#[derive(Debug, Clone, Default)]
pub struct SlugRegistry {
    tables: Vec<SlugTable>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: SlugTable) -> Result<(), SlugError> {
        if self.get(table.category()).is_some() {
            return Err(SlugError::DuplicateCategory(table.category().to_string()));
        }
        self.tables.push(table);
        Ok(())
    }

    pub fn get(&self, category: &str) -> Option<&SlugTable> {
        self.tables.iter().find(|t| t.category() == category)
    }

    pub fn tables(&self) -> impl Iterator<Item = &SlugTable> {
        self.tables.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Find the category detail route a path points at.
    ///
    /// Only `<base>/<slug>` shapes match; listing pages (`<base>`) and
    /// deeper paths do not. The longest matching base wins.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let path = path.split('?').next().unwrap_or(path);
        let language = Language::from_path(path);

        let mut best: Option<(usize, RouteMatch)> = None;
        for table in &self.tables {
            let base = table.base_path(language);
            let rest = if base == "/" {
                path.strip_prefix('/')
            } else {
                path.strip_prefix(base).and_then(|r| r.strip_prefix('/'))
            };
            let Some(rest) = rest else { continue };

            let slug = rest.trim_end_matches('/');
            if slug.is_empty() || slug.contains('/') {
                continue;
            }

            if best.as_ref().map_or(true, |(len, _)| base.len() > *len) {
                best = Some((
                    base.len(),
                    RouteMatch {
                        category: table.category().to_string(),
                        language,
                        raw_slug: slug.to_string(),
                    },
                ));
            }
        }

        best.map(|(_, m)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn methods_table() -> SlugTable {
        SlugTable::builder("methods-asset")
            .base(Language::Fr, "/methodes")
            .base(Language::En, "/en/methods")
            .alias("credit-ball", "expertise-credit-bail")
            .display(Language::En, "expertise-credit-bail", "leasehold-financing")
            .build()
            .expect("valid table")
    }

    // ─────────────────────────────────────────────────────────────
    // normalize
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn normalize_collapses_case_whitespace_slashes_and_hyphens() {
        assert_eq!(normalize("  Foo--Bar/"), "foo-bar");
        assert_eq!(normalize("foo-bar"), "foo-bar");
        assert_eq!(normalize("/Foo   Bar/"), "foo-bar");
        assert_eq!(normalize("//foo - bar//"), "foo-bar");
        assert_eq!(normalize("-foo-"), "foo");
    }

    #[test]
    fn normalize_empty_and_blank_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("///"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["  Foo--Bar/", "A B  C", "déjà-Vu", "x"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    // ─────────────────────────────────────────────────────────────
    // canonicalize / display
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn alias_resolves_to_canonical_id() {
        let table = methods_table();
        assert_eq!(table.canonicalize("Credit-Ball"), "expertise-credit-bail");
    }

    #[test]
    fn display_slug_resolves_to_canonical_id() {
        let table = methods_table();
        assert_eq!(
            table.canonicalize("/Leasehold-Financing/"),
            "expertise-credit-bail"
        );
    }

    #[test]
    fn unknown_slug_passes_through_normalized() {
        let table = methods_table();
        assert_eq!(table.canonicalize("  Some Unknown--Slug "), "some-unknown-slug");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let table = methods_table();
        for raw in [
            "Credit-Ball",
            "leasehold-financing",
            "expertise-credit-bail",
            "unknown thing",
            "",
        ] {
            let once = table.canonicalize(raw);
            assert_eq!(table.canonicalize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn display_slug_per_language_with_fallback() {
        let table = methods_table();
        assert_eq!(
            table.to_display_slug("expertise-credit-bail", Language::En),
            "leasehold-financing"
        );
        assert_eq!(
            table.to_display_slug("expertise-credit-bail", Language::Fr),
            "expertise-credit-bail"
        );
        assert_eq!(table.to_display_slug("other", Language::En), "other");
    }

    #[test]
    fn registered_translations_round_trip() {
        let table = methods_table();
        let display = table.to_display_slug("expertise-credit-bail", Language::En);
        assert_eq!(table.canonicalize(&display), "expertise-credit-bail");
    }

    #[test]
    fn build_route_and_href() {
        let table = methods_table();
        assert_eq!(
            table.build_route(Language::En, "credit-ball"),
            ("/en/methods".to_string(), "leasehold-financing".to_string())
        );
        assert_eq!(
            table.href(Language::Fr, "leasehold-financing"),
            "/methodes/expertise-credit-bail"
        );
    }

    #[test]
    fn redirect_needed_only_when_requested_differs_from_display() {
        let table = methods_table();
        for (requested, lang) in [
            ("leasehold-financing", Language::En),
            ("expertise-credit-bail", Language::Fr),
            ("unknown", Language::Fr),
            ("credit-ball", Language::En),
            ("Leasehold-Financing", Language::En),
        ] {
            let canonical = table.canonicalize(requested);
            let ideal = table.to_display_slug(&canonical, lang);
            assert_eq!(
                table.is_canonical_redirect_needed(requested, &canonical, lang),
                requested != ideal,
                "requested {requested:?} in {lang}"
            );
        }
        assert!(!table.is_canonical_redirect_needed(
            "leasehold-financing",
            "expertise-credit-bail",
            Language::En
        ));
        assert!(table.is_canonical_redirect_needed(
            "expertise-credit-bail",
            "expertise-credit-bail",
            Language::En
        ));
    }

    #[test]
    fn alternates_cover_every_language() {
        let table = methods_table();
        let alts = table.alternates("expertise-credit-bail");
        assert_eq!(
            alts,
            vec![
                (Language::Fr, "/methodes/expertise-credit-bail".to_string()),
                (Language::En, "/en/methods/leasehold-financing".to_string()),
            ]
        );
    }

    // ─────────────────────────────────────────────────────────────
    // builder validation
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn default_bases_use_language_prefix_and_category() {
        let table = SlugTable::builder("news").build().unwrap();
        assert_eq!(table.base_path(Language::Fr), "/news");
        assert_eq!(table.base_path(Language::En), "/en/news");
    }

    #[test]
    fn alias_chains_are_flattened() {
        let table = SlugTable::builder("news")
            .alias("a", "b")
            .alias("b", "c")
            .build()
            .unwrap();
        assert_eq!(table.canonicalize("a"), "c");
        assert_eq!(table.canonicalize("b"), "c");
    }

    #[test]
    fn alias_cycle_is_rejected() {
        let err = SlugTable::builder("news")
            .alias("a", "b")
            .alias("b", "a")
            .build()
            .unwrap_err();
        assert!(matches!(err, SlugError::AliasCycle { .. }), "got {err:?}");
    }

    #[test]
    fn ambiguous_display_slug_is_rejected() {
        let err = SlugTable::builder("news")
            .display(Language::En, "one", "same")
            .display(Language::En, "two", "same")
            .build()
            .unwrap_err();
        assert!(
            matches!(err, SlugError::AmbiguousDisplay { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn translated_canonical_cannot_be_an_alias() {
        let err = SlugTable::builder("news")
            .alias("one", "two")
            .display(Language::En, "one", "first")
            .build()
            .unwrap_err();
        assert!(
            matches!(err, SlugError::AliasedCanonical { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn display_slug_shadowing_another_canonical_is_rejected() {
        let err = SlugTable::builder("news")
            .display(Language::En, "one", "two")
            .display(Language::En, "two", "deux")
            .build()
            .unwrap_err();
        assert!(matches!(err, SlugError::Unstable { .. }), "got {err:?}");
    }

    // ─────────────────────────────────────────────────────────────
    // registry
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn registry_keeps_categories_apart() {
        let mut registry = SlugRegistry::new();
        registry.insert(methods_table()).unwrap();
        registry
            .insert(
                SlugTable::builder("news")
                    .base(Language::Fr, "/actualites")
                    .alias("credit-ball", "credit-bail-news")
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(
            registry.get("news").unwrap().canonicalize("credit-ball"),
            "credit-bail-news"
        );
        assert_eq!(
            registry
                .get("methods-asset")
                .unwrap()
                .canonicalize("credit-ball"),
            "expertise-credit-bail"
        );
    }

    #[test]
    fn registry_rejects_duplicate_category() {
        let mut registry = SlugRegistry::new();
        registry.insert(methods_table()).unwrap();
        let err = registry.insert(methods_table()).unwrap_err();
        assert_eq!(err, SlugError::DuplicateCategory("methods-asset".into()));
    }

    #[test]
    fn match_path_finds_detail_routes() {
        let mut registry = SlugRegistry::new();
        registry.insert(methods_table()).unwrap();

        assert_eq!(
            registry.match_path("/en/methods/Leasehold-Financing/"),
            Some(RouteMatch {
                category: "methods-asset".into(),
                language: Language::En,
                raw_slug: "Leasehold-Financing".into(),
            })
        );
        assert_eq!(
            registry
                .match_path("/methodes/credit-ball?utm=x")
                .map(|m| m.raw_slug),
            Some("credit-ball".into())
        );
        assert_eq!(registry.match_path("/methodes"), None);
        assert_eq!(registry.match_path("/methodes/a/b"), None);
        assert_eq!(registry.match_path("/contact"), None);
    }
}

//! Locale selection and translation catalogs.
//!
//! # Design
//! There is no process-wide locale. A `LocaleContext` is resolved once per
//! client (cookie, then negotiated `Accept-Language`, then the fallback) and
//! passed to whatever renders text. Catalogs are registered as loaders and
//! parsed on first use per language; nested JSON objects flatten to dotted
//! keys.
//!
//! Lookups fall back to the fallback locale and then to the key itself, so a
//! missing translation never fails rendering.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::warn;

use crate::config::ClientConfig;

pub const FALLBACK_LOCALE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum I18nError {
    #[error("invalid catalog for {code}: {message}")]
    InvalidCatalog { code: String, message: String },
    #[error("no catalog registered for {0}")]
    Unregistered(String),
}

/// Produces the raw JSON of one catalog.
pub type CatalogLoader = fn() -> &'static str;

/// Flat key → message map for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn from_json(code: &str, raw: &str) -> Result<Self, I18nError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| I18nError::InvalidCatalog {
                code: code.to_string(),
                message: e.to_string(),
            })?;
        let serde_json::Value::Object(root) = value else {
            return Err(I18nError::InvalidCatalog {
                code: code.to_string(),
                message: "top level must be an object".to_string(),
            });
        };

        let mut messages = HashMap::new();
        let mut pending: Vec<(String, serde_json::Map<String, serde_json::Value>)> =
            vec![(String::new(), root)];
        while let Some((prefix, object)) = pending.pop() {
            for (key, value) in object {
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                match value {
                    serde_json::Value::Object(nested) => pending.push((full, nested)),
                    serde_json::Value::String(message) => {
                        messages.insert(full, message);
                    }
                    other => {
                        messages.insert(full, other.to_string());
                    }
                }
            }
        }
        Ok(Self { messages })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

struct Registration {
    loader: CatalogLoader,
    loaded: OnceLock<Result<MessageCatalog, I18nError>>,
}

/// Registry of catalogs, loaded lazily per language code.
pub struct Translations {
    catalogs: HashMap<String, Registration>,
    aliases: HashMap<String, String>,
    fallback: String,
}

impl std::fmt::Debug for Translations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<&String> = self.catalogs.keys().collect();
        codes.sort();
        f.debug_struct("Translations")
            .field("codes", &codes)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl Default for Translations {
    /// The bundled `en` and `zh-CN` catalogs, with `zh` aliased to `zh-CN`.
    fn default() -> Self {
        let mut translations = Self::empty(FALLBACK_LOCALE);
        translations.register("en", || include_str!("../locales/en.json"));
        translations.register("zh-CN", || include_str!("../locales/zh-CN.json"));
        translations.alias("zh", "zh-CN");
        translations
    }
}

impl Translations {
    /// The bundled catalogs with `fallback` as the last-resort locale.
    /// A code that names no bundled catalog keeps the default fallback.
    pub fn with_fallback(fallback: &str) -> Self {
        let mut translations = Self::default();
        match translations.negotiate(fallback).map(str::to_string) {
            Some(code) => translations.fallback = code,
            None => warn!(fallback, "no catalog for configured fallback locale"),
        }
        translations
    }

    pub fn empty(fallback: &str) -> Self {
        Self {
            catalogs: HashMap::new(),
            aliases: HashMap::new(),
            fallback: fallback.to_string(),
        }
    }

    pub fn register(&mut self, code: &str, loader: CatalogLoader) {
        self.catalogs.insert(
            code.to_string(),
            Registration {
                loader,
                loaded: OnceLock::new(),
            },
        );
    }

    /// Serve `code` from the catalog registered as `target`.
    pub fn alias(&mut self, code: &str, target: &str) {
        self.aliases.insert(code.to_string(), target.to_string());
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Registered code that `code` maps to, matching case-insensitively.
    pub fn canonical(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        if let Some((registered, _)) = self
            .catalogs
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(code))
        {
            return Some(registered.as_str());
        }
        let (_, target) = self
            .aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(code))?;
        self.catalogs
            .get_key_value(target.as_str())
            .map(|(registered, _)| registered.as_str())
    }

    /// Map a language tag to a registered code: the tag itself, then its
    /// primary subtag (`en-US` → `en`, `zh-TW` → `zh` → `zh-CN`).
    pub fn negotiate(&self, tag: &str) -> Option<&str> {
        let tag = tag.trim().replace('_', "-");
        if tag.is_empty() {
            return None;
        }
        if let Some(code) = self.canonical(&tag) {
            return Some(code);
        }
        let primary = tag.split('-').next().unwrap_or("");
        self.canonical(primary)
    }

    /// Load (once) and return the catalog for a registered code.
    pub fn catalog(&self, code: &str) -> Result<&MessageCatalog, I18nError> {
        let canonical = self
            .canonical(code)
            .ok_or_else(|| I18nError::Unregistered(code.to_string()))?;
        let registration = &self.catalogs[canonical];
        registration
            .loaded
            .get_or_init(|| MessageCatalog::from_json(canonical, (registration.loader)()))
            .as_ref()
            .map_err(I18nError::clone)
    }

    fn lookup(&self, code: &str, key: &str) -> Option<&str> {
        match self.catalog(code) {
            Ok(catalog) => catalog.get(key),
            Err(err) => {
                warn!(%err, "translation catalog unavailable");
                None
            }
        }
    }
}

/// Value of the `locale` cookie in a `Cookie` header, if set and non-empty.
pub fn locale_from_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "locale")
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Language tags of an `Accept-Language` value, highest quality first.
/// Entries with `q=0` are dropped; ties keep their listed order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then(|| (tag.to_string(), quality))
        })
        .collect();
    tags.sort_by(|a, b| b.1.total_cmp(&a.1));
    tags.into_iter().map(|(tag, _)| tag).collect()
}

/// Pick the UI language: the `locale` cookie, else the best negotiated
/// `Accept-Language` tag, else the registry's fallback.
///
/// A cookie naming an unknown language resolves to the fallback; it does not
/// defer to the negotiated locale.
pub fn resolve_locale(
    translations: &Translations,
    cookie_header: Option<&str>,
    accept_language: Option<&str>,
) -> String {
    if let Some(cookie) = cookie_header.and_then(locale_from_cookie) {
        return translations
            .negotiate(cookie)
            .unwrap_or(translations.fallback())
            .to_string();
    }
    accept_language
        .map(parse_accept_language)
        .unwrap_or_default()
        .iter()
        .find_map(|tag| translations.negotiate(tag))
        .unwrap_or(translations.fallback())
        .to_string()
}

/// Resolved UI language plus the catalogs to translate with.
#[derive(Debug, Clone)]
pub struct LocaleContext {
    locale: String,
    translations: Arc<Translations>,
}

impl LocaleContext {
    pub fn new(translations: Arc<Translations>, locale: &str) -> Self {
        let locale = translations
            .negotiate(locale)
            .unwrap_or(translations.fallback())
            .to_string();
        Self {
            locale,
            translations,
        }
    }

    pub fn resolve(
        translations: Arc<Translations>,
        cookie_header: Option<&str>,
        accept_language: Option<&str>,
    ) -> Self {
        let locale = resolve_locale(&translations, cookie_header, accept_language);
        Self {
            locale,
            translations,
        }
    }

    /// Resolve against the bundled catalogs, falling back to the configured
    /// locale.
    pub fn from_config(
        config: &ClientConfig,
        cookie_header: Option<&str>,
        accept_language: Option<&str>,
    ) -> Self {
        let translations = Arc::new(Translations::with_fallback(&config.fallback_locale));
        Self::resolve(translations, cookie_header, accept_language)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn t(&self, key: &str) -> String {
        self.translations
            .lookup(&self.locale, key)
            .or_else(|| self.translations.lookup(self.translations.fallback(), key))
            .unwrap_or(key)
            .to_string()
    }

    /// Translate `key`, replacing each `{name}` placeholder from `args`.
    pub fn t_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter().fold(self.t(key), |message, (name, value)| {
            message.replace(&format!("{{{name}}}"), value)
        })
    }
}

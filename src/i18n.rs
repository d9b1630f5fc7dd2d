use std::collections::HashMap;

use fluent_templates::{fluent_bundle::FluentValue, static_loader, Loader};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

use crate::core::types::Language;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "ru",
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| lang_id(Language::DEFAULT));

/// Fluent identifier for a user language.
pub fn lang_id(lang: Language) -> LanguageIdentifier {
    lang.code().parse().unwrap_or_default()
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: Language, key: &str) -> String {
    let text = LOCALES
        .lookup(&lang_id(lang), key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t_args(lang: Language, key: &str, args: &[(&str, String)]) -> String {
    let args_map: HashMap<String, FluentValue> = args
        .iter()
        .map(|(k, v)| (k.to_string(), FluentValue::from(v.clone())))
        .collect();

    let text = LOCALES
        .lookup_with_args(&lang_id(lang), key, &args_map)
        .unwrap_or_else(|| {
            LOCALES
                .lookup_with_args(&DEFAULT_LANG, key, &args_map)
                .unwrap_or_else(|| key.to_string())
        });
    text.replace("\\n", "\n")
}

/// Menu button labels in every language, used to recognise button presses
/// regardless of which language the keyboard was rendered in.
pub fn matches_label(text: &str, key: &str) -> bool {
    let text = text.trim();
    Language::ALL.into_iter().any(|lang| t(lang, key) == text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_translation() {
        assert_eq!(t(Language::English, "choose-language"), "Choose language:");
        assert_eq!(t(Language::Russian, "choose-language"), "Выберите язык:");
        assert_eq!(t(Language::Armenian, "choose-language"), "Ընտրեք լեզուն:");
    }

    #[test]
    fn converts_newlines() {
        let text = t(Language::English, "help");
        assert!(text.contains('\n'));
        assert!(!text.contains("\\n"));
    }

    #[test]
    fn interpolates_arguments() {
        let text = t_args(Language::English, "premium-info", &[("price", "5".to_string())]);
        assert!(text.contains("$5/month"));

        let limit = t_args(Language::Russian, "rate-limit", &[("limit", "5".to_string())]);
        assert!(limit.contains('5'));
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(t(Language::English, "no-such-key"), "no-such-key");
    }

    #[test]
    fn every_language_has_every_key() {
        let keys = [
            "choose-language",
            "saved-language",
            "send-link",
            "downloading",
            "download-error",
            "banned",
            "help",
            "change-language",
            "unsupported-link",
            "premium-info",
            "contact-admin",
            "rate-limit",
            "video-caption",
            "menu-help",
            "menu-change-language",
            "menu-premium",
        ];
        for lang in Language::ALL {
            for key in keys {
                assert!(
                    LOCALES.lookup(&lang_id(lang), key).is_some(),
                    "{} missing in {}",
                    key,
                    lang.code()
                );
            }
        }
    }

    #[test]
    fn recognises_labels_in_any_language() {
        assert!(matches_label("ℹ️ Help", "menu-help"));
        assert!(matches_label("ℹ️ Помощь", "menu-help"));
        assert!(matches_label("🔄 Փոխել լեզուն", "menu-change-language"));
        assert!(!matches_label("Help", "menu-help"));
    }
}

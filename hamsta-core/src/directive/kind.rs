//! Directive classification.

use crate::config::Config;

/// What a reserved attribute asks for, resolved once from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `h-signals`: declare named signals.
    Signals,
    /// `h-methods`: declare named methods; only valid next to `h-signals`.
    Methods,
    /// `h-on-<event>`: run statements on each `<event>`.
    Event(String),
    Text,
    Show,
    Class,
    Style,
    /// `h-transition-enter`: companion of `h-show`, not bound on its own.
    TransitionEnter,
    /// `h-transition-leave`: companion of `h-show`, not bound on its own.
    TransitionLeave,
    /// `h-<name>`: bind the plain attribute `<name>`.
    Attribute(String),
}

impl Directive {
    /// Classify an attribute name. Names without the prefix, and names that
    /// are nothing but a prefix, are not directives.
    ///
    /// ```rust
    /// use hamsta_core::{Config, Directive};
    ///
    /// let config = Config::default();
    /// assert_eq!(Directive::parse("h-text", &config), Some(Directive::Text));
    /// assert_eq!(
    ///     Directive::parse("h-on-click", &config),
    ///     Some(Directive::Event("click".into()))
    /// );
    /// assert_eq!(
    ///     Directive::parse("h-href", &config),
    ///     Some(Directive::Attribute("href".into()))
    /// );
    /// assert_eq!(Directive::parse("class", &config), None);
    /// ```
    pub fn parse(name: &str, config: &Config) -> Option<Self> {
        let rest = name.strip_prefix(config.prefix.as_str())?;
        if rest.is_empty() {
            return None;
        }
        if let Some(event) = rest.strip_prefix(config.event_prefix.as_str()) {
            return (!event.is_empty()).then(|| Directive::Event(event.to_string()));
        }

        Some(match rest {
            "signals" => Directive::Signals,
            "methods" => Directive::Methods,
            "text" => Directive::Text,
            "show" => Directive::Show,
            "class" => Directive::Class,
            "style" => Directive::Style,
            "transition-enter" => Directive::TransitionEnter,
            "transition-leave" => Directive::TransitionLeave,
            other => Directive::Attribute(other.to_string()),
        })
    }

    /// Handled by the declaration pass, before any binding.
    pub fn is_declaration(&self) -> bool {
        matches!(self, Directive::Signals | Directive::Methods)
    }

    /// Read by another directive rather than bound itself.
    pub fn is_companion(&self) -> bool {
        matches!(self, Directive::TransitionEnter | Directive::TransitionLeave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_name_resolves() {
        let config = Config::default();
        let cases = [
            ("h-signals", Directive::Signals),
            ("h-methods", Directive::Methods),
            ("h-text", Directive::Text),
            ("h-show", Directive::Show),
            ("h-class", Directive::Class),
            ("h-style", Directive::Style),
            ("h-transition-enter", Directive::TransitionEnter),
            ("h-transition-leave", Directive::TransitionLeave),
            ("h-on-input", Directive::Event("input".into())),
            ("h-aria-label", Directive::Attribute("aria-label".into())),
        ];
        for (name, expected) in cases {
            assert_eq!(Directive::parse(name, &config), Some(expected), "{name}");
        }
    }

    #[test]
    fn bare_prefixes_are_not_directives() {
        let config = Config::default();
        assert_eq!(Directive::parse("h-", &config), None);
        assert_eq!(Directive::parse("h-on-", &config), None);
        assert_eq!(Directive::parse("text", &config), None);
    }

    #[test]
    fn custom_prefix() {
        let config = Config {
            prefix: "data-x-".into(),
            event_prefix: "when-".into(),
            ..Config::default()
        };
        assert_eq!(Directive::parse("data-x-text", &config), Some(Directive::Text));
        assert_eq!(
            Directive::parse("data-x-when-click", &config),
            Some(Directive::Event("click".into()))
        );
        assert_eq!(Directive::parse("h-text", &config), None);
    }
}

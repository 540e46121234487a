use std::{backtrace::Backtrace, fmt::Debug, rc::Rc};

use regex::Regex;


/// Marker that traces every update.
pub const WILDCARD: &str = "*";

/// Tracing rule applied by every write accessor of a scope.
///
/// Equality is identity: two callbacks are equal only if they are the same `Rc`.
#[derive(Clone)]
pub enum DebugDirective {
    /// Trace every update with `tracing::info!`.
    All,
    /// Trace updates of the fields whose name matches the pattern, with a backtrace.
    Pattern(FieldPattern),
    /// Call the function with the field name and the new value instead of logging.
    Callback(Rc<dyn Fn(&str, &dyn Debug)>),
}

impl DebugDirective {
    /// `"*"` is [`DebugDirective::All`], anything else a [`FieldPattern`].
    pub fn parse(s: &str) -> Self {
        if s == WILDCARD {
            DebugDirective::All
        } else {
            DebugDirective::Pattern(FieldPattern::new(s))
        }
    }

    pub fn callback(f: impl Fn(&str, &dyn Debug) + 'static) -> Self {
        DebugDirective::Callback(Rc::new(f))
    }

    /// Reads a directive from the environment variable `key`. Unset or empty means no tracing.
    pub fn from_env(key: &str) -> Option<Self> {
        let value = std::env::var(key).ok()?;
        if value.is_empty() {
            None
        } else {
            Some(Self::parse(&value))
        }
    }

    /// Applies the directive to an update of `field` to `value`.
    pub fn trace(&self, field: &str, value: &dyn Debug) {
        match self {
            DebugDirective::All => {
                tracing::info!(field = %field, value = ?value, "field updated");
            }
            DebugDirective::Pattern(p) => {
                if p.is_match(field) {
                    tracing::info!(
                        field = %field,
                        value = ?value,
                        backtrace = %Backtrace::force_capture(),
                        "field updated"
                    );
                }
            }
            DebugDirective::Callback(f) => f(field, value),
        }
    }
}
impl From<&str> for DebugDirective {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
impl From<String> for DebugDirective {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}
impl PartialEq for DebugDirective {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DebugDirective::All, DebugDirective::All) => true,
            (DebugDirective::Pattern(a), DebugDirective::Pattern(b)) => a == b,
            (DebugDirective::Callback(a), DebugDirective::Callback(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
impl Debug for DebugDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebugDirective::All => write!(f, "All"),
            DebugDirective::Pattern(p) => f.debug_tuple("Pattern").field(&p.source()).finish(),
            DebugDirective::Callback(_) => write!(f, "Callback(<fn>)"),
        }
    }
}

/// A field-name pattern. An invalid pattern matches nothing.
#[derive(Clone)]
pub struct FieldPattern {
    source: Rc<str>,
    regex: Option<Regex>,
}

impl FieldPattern {
    pub fn new(source: &str) -> Self {
        let regex = match Regex::new(source) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(pattern = %source, error = %e, "invalid debug pattern; tracing disabled");
                None
            }
        };
        Self {
            source: source.into(),
            regex,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Unanchored search, so `"count"` matches `"counter"`.
    pub fn is_match(&self, field: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(field))
    }
}
impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
impl Debug for FieldPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.source, f)
    }
}

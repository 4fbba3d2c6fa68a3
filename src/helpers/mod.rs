//! Helper functions for templates
//!
//! Helpers are plain functions over [`Value`]s, collected into a
//! [`HelperRegistry`] that an engine owns. Hosts can start from the
//! built-in set and register their own before rendering.

pub mod compare;
pub mod date;
pub mod format;
pub mod html;
pub mod math;
pub mod text;

use std::collections::HashMap;
use std::sync::Arc;

pub use date::{Clock, FixedClock, SystemClock};
pub use format::CurrencyStyle;

use crate::config::FormatSettings;
use crate::template::Value;

/// A helper callable from templates
pub type HelperFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Named helpers available to one engine
#[derive(Clone)]
pub struct HelperRegistry {
    helpers: HashMap<String, HelperFn>,
}

fn arg(args: &[Value], idx: usize) -> &Value {
    const UNDEFINED: &Value = &Value::Undefined;
    args.get(idx).unwrap_or(UNDEFINED)
}

impl HelperRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            helpers: HashMap::new(),
        }
    }

    /// Built-in helpers using the system clock
    pub fn builtin(settings: &FormatSettings) -> Self {
        Self::builtin_with_clock(settings, Arc::new(SystemClock))
    }

    /// Built-in helpers with an explicit clock for `now`
    pub fn builtin_with_clock(settings: &FormatSettings, clock: Arc<dyn Clock>) -> Self {
        let mut registry = Self::new();
        let tz = settings.tz();

        // Dates
        let default_date = settings.date_format.clone();
        registry.register("formatDate", move |args: &[Value]| {
            let pattern = match arg(args, 1) {
                Value::String(p) => p.clone(),
                _ => default_date.clone(),
            };
            Value::String(date::format_timestamp(arg(args, 0), &pattern, tz))
        });
        let default_time = settings.time_format.clone();
        registry.register("formatTime", move |args: &[Value]| {
            let pattern = match arg(args, 1) {
                Value::String(p) => p.clone(),
                _ => default_time.clone(),
            };
            Value::String(date::format_timestamp(arg(args, 0), &pattern, tz))
        });
        let default_now = settings.date_format.clone();
        registry.register("now", move |args: &[Value]| {
            let pattern = match arg(args, 0) {
                Value::String(p) => p.clone(),
                _ => default_now.clone(),
            };
            Value::String(date::format_moment_in(&clock.now(), &pattern, tz))
        });

        // Comparison and logic
        registry.register("eq", |args: &[Value]| compare::eq(arg(args, 0), arg(args, 1)));
        registry.register("ne", |args: &[Value]| compare::ne(arg(args, 0), arg(args, 1)));
        registry.register("gt", |args: &[Value]| compare::gt(arg(args, 0), arg(args, 1)));
        registry.register("lt", |args: &[Value]| compare::lt(arg(args, 0), arg(args, 1)));
        registry.register("gte", |args: &[Value]| compare::gte(arg(args, 0), arg(args, 1)));
        registry.register("lte", |args: &[Value]| compare::lte(arg(args, 0), arg(args, 1)));
        registry.register("and", compare::and);
        registry.register("or", compare::or);
        registry.register("not", |args: &[Value]| compare::not(arg(args, 0)));

        // Arithmetic
        registry.register("add", |args: &[Value]| math::add(arg(args, 0), arg(args, 1)));
        registry.register("subtract", |args: &[Value]| {
            math::subtract(arg(args, 0), arg(args, 1))
        });
        registry.register("multiply", |args: &[Value]| {
            math::multiply(arg(args, 0), arg(args, 1))
        });
        registry.register("divide", |args: &[Value]| math::divide(arg(args, 0), arg(args, 1)));

        // Text
        registry.register("capitalize", |args: &[Value]| text::capitalize(arg(args, 0)));
        registry.register("uppercase", |args: &[Value]| text::uppercase(arg(args, 0)));
        registry.register("lowercase", |args: &[Value]| text::lowercase(arg(args, 0)));
        registry.register("pluralize", |args: &[Value]| {
            text::pluralize(arg(args, 0), arg(args, 1), args.get(2))
        });
        registry.register("contains", |args: &[Value]| {
            text::contains(arg(args, 0), arg(args, 1))
        });
        registry.register("length", |args: &[Value]| text::length(arg(args, 0)));
        registry.register("default", |args: &[Value]| {
            text::default_value(arg(args, 0), arg(args, 1))
        });
        registry.register("join", |args: &[Value]| text::join(arg(args, 0), args.get(1)));

        // Formatting
        let style = CurrencyStyle::for_locale(&settings.locale);
        registry.register("formatCurrency", move |args: &[Value]| {
            Value::String(format::format_currency(arg(args, 0), &style))
        });
        registry.register("formatPhone", |args: &[Value]| {
            Value::String(format::format_phone(arg(args, 0)))
        });
        registry.register("formatAddress", |args: &[Value]| {
            Value::String(format::format_address(args))
        });

        registry
    }

    /// Register (or replace) a helper
    pub fn register<F>(&mut self, name: &str, helper: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.helpers.insert(name.to_string(), Arc::new(helper));
    }

    pub fn get(&self, name: &str) -> Option<&HelperFn> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Call a helper; an unknown name yields `Undefined`
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        match self.helpers.get(name) {
            Some(helper) => helper(args),
            None => Value::Undefined,
        }
    }

    /// Registered helper names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.helpers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for HelperRegistry {
    /// The built-in set with default format settings
    fn default() -> Self {
        Self::builtin(&FormatSettings::default())
    }
}

impl std::fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("helpers", &self.names())
            .finish()
    }
}

//! `${name}` placeholder substitution

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{context::VariableContext, generator::DataGenerator};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex"));

const RANDOM_TOKEN_LEN: usize = 8;
const UNIQUE_ID_LEN: usize = 8;

/// Replaces `${name}` placeholders in strings and JSON records.
///
/// Substitution is a single pass: text produced by a replacement is never
/// scanned again, so a custom variable whose value contains `${...}` is
/// inserted literally. Unresolved names are left exactly as written.
#[derive(Clone)]
pub struct Interpolator {
    context: VariableContext,
    generator: Arc<DataGenerator>,
}

impl Interpolator {
    pub fn new(context: VariableContext) -> Self {
        Self {
            context,
            generator: Arc::new(DataGenerator::new()),
        }
    }

    /// Interpolator whose random values repeat for the same seed
    pub fn seeded(context: VariableContext, seed: u64) -> Self {
        Self {
            context,
            generator: Arc::new(DataGenerator::seeded(seed)),
        }
    }

    pub fn context(&self) -> &VariableContext {
        &self.context
    }

    /// Derived interpolator with `extra` layered over the custom variables.
    ///
    /// The random source is shared with `self`.
    pub fn scoped(&self, extra: &HashMap<String, Value>) -> Self {
        if extra.is_empty() {
            return self.clone();
        }
        Self {
            context: self.context.merged(extra),
            generator: Arc::clone(&self.generator),
        }
    }

    /// Replace every placeholder in `template`
    pub fn interpolate_string(&self, template: &str) -> String {
        if !template.contains("${") {
            return template.to_string();
        }
        let now = Local::now();
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                let name = caps[1].trim();
                match self.resolve_at(name, &now) {
                    Some(value) => value,
                    None => {
                        warn!(variable = name, "Unresolved variable left in place");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Apply [`interpolate_string`](Self::interpolate_string) to every string
    /// leaf of `value`; keys and non-string scalars are untouched
    pub fn interpolate_value(&self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.interpolate_string(text)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.interpolate_value(item)).collect())
            }
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, field)| (key.clone(), self.interpolate_value(field)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Resolve one variable name, or `None` when nothing provides it
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.resolve_at(name.trim(), &Local::now())
    }

    fn resolve_at(&self, name: &str, now: &DateTime<Local>) -> Option<String> {
        if let Some(value) = self.context.custom_text(name) {
            return Some(value);
        }
        if let Some(var) = name.strip_prefix("env.") {
            let value = std::env::var(var).ok();
            if value.is_none() {
                debug!(variable = var, "Environment variable not set");
            }
            return value;
        }
        if let Some(path) = name.strip_prefix("generator.") {
            return self.generator.generate(path);
        }

        let value = match name {
            "timestamp" => now.timestamp_millis().to_string(),
            "unixTime" => now.timestamp().to_string(),
            "datetime" => now.to_rfc3339(),
            "date" => now.format("%Y-%m-%d").to_string(),
            "time" => now.format("%H:%M:%S").to_string(),
            "year" => now.format("%Y").to_string(),
            "month" => now.format("%m").to_string(),
            "day" => now.format("%d").to_string(),
            "hour" => now.format("%H").to_string(),
            "minute" => now.format("%M").to_string(),
            "second" => now.format("%S").to_string(),
            "random" => self.generator.token(RANDOM_TOKEN_LEN),
            "randomNumber" => self.generator.int(0, 999_999).to_string(),
            "uniqueId" => self
                .generator
                .uuid()
                .simple()
                .to_string()
                .chars()
                .take(UNIQUE_ID_LEN)
                .collect(),
            "uuid" => self.generator.uuid().to_string(),
            "baseUrl" => self.context.base_url.clone()?,
            "username" | "credentials.username" => {
                self.context.credentials.as_ref()?.username.clone()
            }
            "password" | "credentials.password" => {
                self.context.credentials.as_ref()?.password.clone()
            }
            _ => return None,
        };
        Some(value)
    }
}

impl std::fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpolator")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Credentials;
    use serde_json::json;
    use serial_test::serial;

    fn context() -> VariableContext {
        VariableContext::new()
            .with_base_url("https://shop.test")
            .with_credentials(Credentials {
                username: "alice".into(),
                password: "s3cret".into(),
            })
            .with_variable("sku", "A-100")
            .with_variable("qty", 3)
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let interpolator = Interpolator::new(context());
        assert_eq!(interpolator.interpolate_string("plain $ text {}"), "plain $ text {}");
    }

    #[test]
    fn configuration_values_resolve() {
        let interpolator = Interpolator::new(context());
        assert_eq!(
            interpolator.interpolate_string("${baseUrl}/login?u=${username}&p=${ password }"),
            "https://shop.test/login?u=alice&p=s3cret"
        );
    }

    #[test]
    fn custom_variables_render_as_text() {
        let interpolator = Interpolator::new(context());
        assert_eq!(interpolator.interpolate_string("${sku} x${qty}"), "A-100 x3");
    }

    #[test]
    fn unknown_names_are_left_verbatim() {
        let interpolator = Interpolator::new(VariableContext::new());
        assert_eq!(
            interpolator.interpolate_string("${nope} and ${baseUrl}"),
            "${nope} and ${baseUrl}"
        );
    }

    #[test]
    fn replacements_are_not_rescanned() {
        let ctx = VariableContext::new().with_variable("inner", "${baseUrl}");
        let interpolator = Interpolator::new(ctx.with_base_url("https://x.test"));
        assert_eq!(interpolator.interpolate_string("${inner}"), "${baseUrl}");
    }

    #[test]
    fn time_values_have_expected_shape() {
        let interpolator = Interpolator::new(VariableContext::new());
        let date = interpolator.interpolate_string("${date}");
        assert_eq!(date.len(), 10);
        assert_eq!(date.matches('-').count(), 2);
        assert!(interpolator
            .interpolate_string("${timestamp}")
            .parse::<i64>()
            .is_ok());
        assert_eq!(interpolator.interpolate_string("${month}").len(), 2);
    }

    #[test]
    fn random_values_repeat_for_same_seed() {
        let a = Interpolator::seeded(VariableContext::new(), 9);
        let b = Interpolator::seeded(VariableContext::new(), 9);
        let template = "${random}-${uniqueId}-${generator.person.firstName}";
        let first = a.interpolate_string(template);
        assert_eq!(first, b.interpolate_string(template));
        assert_eq!(first.split('-').next().map(str::len), Some(8));
        assert!(!first.contains("${"));
    }

    #[test]
    fn object_leaves_are_interpolated() {
        let interpolator = Interpolator::new(context());
        let record = json!({
            "type": "fill",
            "selector": "#sku-${sku}",
            "value": "${username}",
            "retries": 2,
            "nested": { "list": ["${qty}", true, null] }
        });
        assert_eq!(
            interpolator.interpolate_value(&record),
            json!({
                "type": "fill",
                "selector": "#sku-A-100",
                "value": "alice",
                "retries": 2,
                "nested": { "list": ["3", true, null] }
            })
        );
    }

    #[test]
    fn scoped_variables_override_custom_values() {
        let interpolator = Interpolator::new(context());
        let mut extra = HashMap::new();
        extra.insert("sku".to_string(), json!("B-200"));
        let scoped = interpolator.scoped(&extra);
        assert_eq!(scoped.interpolate_string("${sku}"), "B-200");
        assert_eq!(interpolator.interpolate_string("${sku}"), "A-100");
    }

    #[test]
    #[serial]
    fn env_variables_resolve() {
        std::env::set_var("FLOWRUN_TEST_TOKEN", "abc");
        let interpolator = Interpolator::new(VariableContext::new());
        assert_eq!(interpolator.interpolate_string("${env.FLOWRUN_TEST_TOKEN}"), "abc");
        std::env::remove_var("FLOWRUN_TEST_TOKEN");
        assert_eq!(
            interpolator.interpolate_string("${env.FLOWRUN_TEST_TOKEN}"),
            "${env.FLOWRUN_TEST_TOKEN}"
        );
    }
}

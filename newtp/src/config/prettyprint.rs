//! Configuration pretty-printing
// (c) 2024 Ross Younger

use super::{Configuration, Manager};

use figment::{Metadata, value::Value};
use std::fmt::{Debug, Display};

/// One row of the rendered configuration
#[derive(Debug)]
struct PrettyConfig {
    field: String,
    value: String,
    source: String,
}

impl PrettyConfig {
    fn render_source(meta: Option<&Metadata>) -> String {
        if let Some(m) = meta {
            m.source
                .as_ref()
                .map_or_else(|| m.name.to_string(), figment::Source::to_string)
        } else {
            String::new()
        }
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::String(_tag, s) => s.to_string(),
            Value::Char(_tag, c) => c.to_string(),
            Value::Bool(_tag, b) => b.to_string(),
            Value::Num(_tag, num) => {
                if let Some(i) = num.to_i128() {
                    i.to_string()
                } else if let Some(u) = num.to_u128() {
                    u.to_string()
                } else {
                    num.to_f64().map_or_else(String::new, |f| f.to_string())
                }
            }
            Value::Empty(_tag, _) => "<empty>".into(),
            Value::Dict(_tag, dict) => format!("<{} entries>", dict.len()),
            Value::Array(_tag, vec) => {
                format!(
                    "[{}]",
                    vec.iter()
                        .map(PrettyConfig::render_value)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }

    fn new<F: Into<String>>(field: F, value: &Value, meta: Option<&Metadata>) -> Self {
        Self {
            field: field.into(),
            value: PrettyConfig::render_value(value),
            source: PrettyConfig::render_source(meta),
        }
    }
}

/// Pretty-printing type wrapper to Manager
#[derive(Debug)]
pub struct DisplayAdapter<'a> {
    /// Data source
    source: &'a Manager,
}

impl Manager {
    /// Creates a `DisplayAdapter` for this struct.
    ///
    /// # Returns
    /// An ephemeral structure implementing `Display`, listing each [`Configuration`] field
    /// with its value and where that value came from.
    #[must_use]
    pub fn to_display_adapter(&self) -> DisplayAdapter<'_> {
        DisplayAdapter { source: self }
    }
}

impl Display for DisplayAdapter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = &self.source.data;
        let mut output = vec![PrettyConfig {
            field: "Field".into(),
            value: "Value".into(),
            source: "Source".into(),
        }];
        for field in Configuration::FIELDS {
            if let Ok(value) = data.find_value(field) {
                let meta = data.get_metadata(value.tag());
                output.push(PrettyConfig::new(*field, &value, meta));
            }
        }
        let field_width = output.iter().map(|r| r.field.len()).max().unwrap_or(0);
        let value_width = output.iter().map(|r| r.value.len()).max().unwrap_or(0);
        for row in output {
            writeln!(
                f,
                "{:field_width$}  {:value_width$}  {}",
                row.field, row.value, row.source
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod test {
    use crate::config::{ConfigurationArgs, Manager};

    use assertables::{assert_contains, assert_not_contains};
    use figment::providers::Serialized;

    #[test]
    fn shows_sources() {
        let mut mgr = Manager::without_files();
        mgr.merge_provider(Serialized::defaults(ConfigurationArgs {
            port: Some(1),
            ..Default::default()
        }));
        let out = mgr.to_display_adapter().to_string();
        assert_contains!(out, "max_open_dirs");
        assert_contains!(out, "default");
        assert_contains!(out, "[]");
        let port_line = out.lines().find(|l| l.starts_with("port")).unwrap();
        assert_not_contains!(port_line, "default");
    }
}

use crate::dialect::Dialect;
use crate::error::ModcfgError;
use crate::value::ConfigValue;

/// Renders a value as a single-line literal for the given dialect, suitable
/// for splicing into a located span. Output is deterministic: strings are
/// always double-quoted, arrays and objects always single-line. Surrounding
/// formatting of the document is never touched, so no attempt is made to
/// match the original value's layout.
pub fn render_value(value: &ConfigValue, dialect: Dialect) -> Result<String, ModcfgError> {
    match value {
        ConfigValue::Null => match dialect {
            Dialect::Json | Dialect::Json5 => Ok("null".to_string()),
            Dialect::Toml => Err(ModcfgError::NullNotRepresentable),
        },
        ConfigValue::Bool(flag) => Ok(if *flag { "true" } else { "false" }.to_string()),
        ConfigValue::Number(number) => Ok(number.to_string()),
        ConfigValue::String(text) => Ok(quote_string(text)),
        ConfigValue::Array(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                rendered.push(render_value(item, dialect)?);
            }
            Ok(format!("[{}]", rendered.join(", ")))
        }
        ConfigValue::Object(entries) => {
            let mut rendered = Vec::with_capacity(entries.len());
            for (key, entry_value) in entries {
                let entry_text = render_value(entry_value, dialect)?;
                match dialect {
                    Dialect::Json | Dialect::Json5 => {
                        rendered.push(format!("{}: {entry_text}", quote_string(key)));
                    }
                    Dialect::Toml => rendered.push(format!("{key} = {entry_text}")),
                }
            }
            Ok(format!("{{{}}}", rendered.join(", ")))
        }
    }
}

fn quote_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for character in text.chars() {
        match character {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            control if (control as u32) < 0x20 => {
                quoted.push_str(&format!("\\u{:04x}", control as u32));
            }
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::render_value;
    use crate::dialect::Dialect;
    use crate::error::ModcfgError;
    use crate::value::ConfigValue;

    fn json_value(text: &str) -> ConfigValue {
        serde_json::from_str(text).expect("test value should parse")
    }

    #[test]
    fn scalars_render_identically_across_dialects() {
        for dialect in [Dialect::Json, Dialect::Json5, Dialect::Toml] {
            assert_eq!(
                render_value(&ConfigValue::Bool(true), dialect).expect("bool should render"),
                "true"
            );
            assert_eq!(
                render_value(&json_value("42"), dialect).expect("integer should render"),
                "42"
            );
            assert_eq!(
                render_value(&json_value("2.5"), dialect).expect("float should render"),
                "2.5"
            );
            assert_eq!(
                render_value(&json_value("\"a \\\"b\\\"\""), dialect)
                    .expect("string should render"),
                "\"a \\\"b\\\"\""
            );
        }
    }

    #[test]
    fn null_renders_for_json_dialects_but_errors_for_toml() {
        assert_eq!(
            render_value(&ConfigValue::Null, Dialect::Json).expect("json null should render"),
            "null"
        );
        assert_eq!(
            render_value(&ConfigValue::Null, Dialect::Json5).expect("json5 null should render"),
            "null"
        );
        let error = render_value(&ConfigValue::Null, Dialect::Toml)
            .expect_err("toml null should be rejected");
        assert!(matches!(error, ModcfgError::NullNotRepresentable));
    }

    #[test]
    fn arrays_render_single_line_with_comma_space_separators() {
        let value = json_value(r#"[1, "two", [3, 4]]"#);
        assert_eq!(
            render_value(&value, Dialect::Json).expect("array should render"),
            r#"[1, "two", [3, 4]]"#
        );
    }

    #[test]
    fn objects_render_as_quoted_pairs_for_json_and_inline_table_for_toml() {
        let value = json_value(r#"{"b": 10, "c": 2}"#);
        assert_eq!(
            render_value(&value, Dialect::Json).expect("json object should render"),
            r#"{"b": 10, "c": 2}"#
        );
        assert_eq!(
            render_value(&value, Dialect::Toml).expect("toml inline table should render"),
            "{b = 10, c = 2}"
        );
    }

    #[test]
    fn nested_toml_null_inside_array_propagates_the_error() {
        let value = ConfigValue::Array(vec![ConfigValue::Number(1.into()), ConfigValue::Null]);
        let error = render_value(&value, Dialect::Toml)
            .expect_err("nested toml null should be rejected");
        assert!(matches!(error, ModcfgError::NullNotRepresentable));
    }

    #[test]
    fn control_characters_escape_as_unicode_sequences() {
        let value = ConfigValue::String("bell\u{7}".to_string());
        assert_eq!(
            render_value(&value, Dialect::Json).expect("string should render"),
            "\"bell\\u0007\""
        );
    }
}

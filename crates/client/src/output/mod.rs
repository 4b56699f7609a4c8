//! Output formatting functions.

pub mod pretty;

use serde::Serialize;

use crate::cli::OutputFormat;

/// Render `value` as compact JSON, or through `pretty` for humans.
pub fn render<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    pretty: impl FnOnce(&T) -> String,
) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(value).unwrap_or_default(),
        OutputFormat::Pretty => pretty(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_switches_on_format() {
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(
            render(&value, OutputFormat::Json, |_| "pretty".into()),
            r#"{"a":1}"#
        );
        assert_eq!(
            render(&value, OutputFormat::Pretty, |_| "pretty".into()),
            "pretty"
        );
    }
}

//! `{name}` placeholder substitution for command argument templates.

use std::collections::HashMap;

/// Replace every known `{name}` in `template`; unknown placeholders are kept.
pub fn render(template: &str, values: &HashMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render a whole argument list.
pub fn render_all(templates: &[String], values: &HashMap<&'static str, String>) -> Vec<String> {
    templates.iter().map(|t| render(t, values)).collect()
}

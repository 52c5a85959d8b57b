use serde_json::{Map, Value};

/// Replace every `{{name}}` in `template` with the matching variable.
///
/// Strings are inserted verbatim, `null` becomes empty, numbers and booleans
/// use their JSON text, arrays and objects are JSON-encoded. Placeholders
/// without a matching variable are left as they are. Substituted text is not
/// scanned again.
pub fn render(template: &str, variables: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let name = &after_open[..end];
                match variables.get(name) {
                    Some(value) => out.push_str(&display_value(value)),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
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

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// First name in `required` that `variables` does not supply.
pub fn first_missing<'a>(required: &'a [String], variables: &Map<String, Value>) -> Option<&'a str> {
    required
        .iter()
        .find(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
}

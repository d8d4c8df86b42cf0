//! Locating JSON state objects inlined in profile page scripts.

use serde_json::Value;

/// Script prefixes that precede an inlined state object.
const MARKERS: &[&str] = &["window._sharedData", "window.__additionalDataLoaded("];

/// JSON pointers at which the profile owner has been observed, in order.
const USER_POINTERS: &[&str] = &[
    "/entry_data/ProfilePage/0/graphql/user",
    "/graphql/user",
    "/user",
    "/data/user",
];

/// Objects found after the markers, plus how many candidates failed to parse.
#[derive(Debug, Default)]
pub struct EmbeddedScan {
    pub objects: Vec<Value>,
    pub malformed: usize,
}

impl EmbeddedScan {
    /// First object carrying a user with a `username`.
    pub fn find_user(&self) -> Option<&Value> {
        self.objects.iter().find_map(locate_user)
    }
}

pub fn scan_embedded_json(html: &str) -> EmbeddedScan {
    let mut scan = EmbeddedScan::default();
    for marker in MARKERS {
        let mut from = 0;
        while let Some(idx) = html[from..].find(marker) {
            let after = from + idx + marker.len();
            from = after;
            let Some(start) = html[after..].find('{').map(|i| after + i) else {
                break;
            };
            match extract_json_object(html, start).map(|raw| serde_json::from_str::<Value>(raw)) {
                Some(Ok(value)) => scan.objects.push(value),
                Some(Err(e)) => {
                    tracing::debug!("Malformed JSON after {}: {}", marker, e);
                    scan.malformed += 1;
                }
                None => scan.malformed += 1,
            }
        }
    }
    scan
}

pub fn locate_user(state: &Value) -> Option<&Value> {
    USER_POINTERS
        .iter()
        .filter_map(|pointer| state.pointer(pointer))
        .find(|user| user.get("username").is_some())
}

/// Slice of `payload` holding the balanced `{...}` that opens at `start`.
/// Braces inside string literals are ignored.
pub fn extract_json_object(payload: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escape = false;
    for (offset, ch) in payload.get(start..)?.char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(&payload[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_object_ignores_braces_in_strings() {
        let payload = r#"x = {"a": "}{", "b": {"c": "\"}"}}; trailing {"#;
        let start = payload.find('{').unwrap();
        assert_eq!(
            extract_json_object(payload, start),
            Some(r#"{"a": "}{", "b": {"c": "\"}"}}"#)
        );
    }

    #[test]
    fn unbalanced_object_is_none() {
        assert_eq!(extract_json_object(r#"{"a": {"b": 1}"#, 0), None);
    }

    #[test]
    fn shared_data_user_located() {
        let html = r#"<script>window._sharedData = {"entry_data":{"ProfilePage":[{"graphql":{"user":{"username":"nasa"}}}]}};</script>"#;
        let scan = scan_embedded_json(html);
        assert_eq!(scan.objects.len(), 1);
        assert_eq!(scan.find_user().unwrap()["username"], "nasa");
    }

    #[test]
    fn additional_data_user_located() {
        let html = r#"<script>window.__additionalDataLoaded('/nasa/',{"graphql":{"user":{"username":"nasa"}}});</script>"#;
        let scan = scan_embedded_json(html);
        assert_eq!(scan.find_user().unwrap()["username"], "nasa");
    }

    #[test]
    fn data_user_pointer() {
        let state: Value = serde_json::from_str(r#"{"data":{"user":{"username":"nasa"}}}"#).unwrap();
        assert!(locate_user(&state).is_some());
        let no_name: Value = serde_json::from_str(r#"{"user":{"id":"1"}}"#).unwrap();
        assert!(locate_user(&no_name).is_none());
    }

    #[test]
    fn malformed_objects_counted() {
        let html = r#"window._sharedData = {"a": nope};"#;
        let scan = scan_embedded_json(html);
        assert!(scan.objects.is_empty());
        assert_eq!(scan.malformed, 1);
    }
}

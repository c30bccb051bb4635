use crate::{ENCODED_BACKSLASH, ENCODED_TILDE, PATH_SEPARATOR, TILDE};
use serde::Serialize;

/// A location inside a JSON document, kept as unescaped-then-encoded segments.
///
/// Used both for pointing at a node of the API document (rendered as a JSON
/// pointer such as `paths/~1pets/get`) and for pointing at a field of an
/// observed value (rendered as `[0].name` or `tags[1]`).
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct JsonPath(pub Vec<String>);

impl JsonPath {
    pub fn new() -> Self {
        JsonPath(Vec::new())
    }

    /// Parses a JSON pointer such as `/0/name`; `~1` and `~0` stay encoded.
    pub fn from_pointer(pointer: &str) -> Self {
        let segments = pointer
            .split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();
        JsonPath(segments)
    }

    pub fn add(&mut self, segment: impl AsRef<str>) -> &mut Self {
        let segment = segment.as_ref();
        if segment.contains(TILDE) || segment.contains(PATH_SEPARATOR) {
            let segment = segment
                .replace(TILDE, ENCODED_TILDE)
                .replace(PATH_SEPARATOR, ENCODED_BACKSLASH);
            self.0.push(segment);
        } else {
            self.0.push(segment.to_owned());
        }

        self
    }

    /// Returns a copy extended by one segment.
    pub fn with(&self, segment: impl AsRef<str>) -> Self {
        let mut path = self.clone();
        path.add(segment);
        path
    }

    pub fn format_path(&self) -> String {
        self.0.join(PATH_SEPARATOR)
    }

    /// Renders the path the way field errors are reported: array indices in
    /// brackets and object keys joined by dots.
    pub fn format_field_path(&self) -> String {
        let mut formatted = String::new();
        for segment in &self.0 {
            let segment = segment
                .replace(ENCODED_BACKSLASH, PATH_SEPARATOR)
                .replace(ENCODED_TILDE, TILDE);
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                formatted.push('[');
                formatted.push_str(&segment);
                formatted.push(']');
            } else {
                if !formatted.is_empty() {
                    formatted.push('.');
                }
                formatted.push_str(&segment);
            }
        }
        formatted
    }
}

#[cfg(test)]
mod test {
    use crate::types::json_path::JsonPath;
    use crate::{ENCODED_BACKSLASH, ENCODED_TILDE};

    #[test]
    fn test_new_json_path() {
        let path = JsonPath::new();
        assert_eq!(path.0.len(), 0);
        assert_eq!(path.format_path(), "");
        assert_eq!(path.format_field_path(), "");
    }

    #[test]
    fn test_add_multiple_segments() {
        let mut path = JsonPath::new();
        path.add("paths").add("/pets/{id}").add("get");
        assert_eq!(path.0.len(), 3);
        assert_eq!(
            path.format_path(),
            format!("paths/{}pets{}{{id}}/get", ENCODED_BACKSLASH, ENCODED_BACKSLASH)
        );
    }

    #[test]
    fn test_add_segment_with_tilde() {
        let mut path = JsonPath::new();
        path.add("user~name");
        assert_eq!(path.0[0], format!("user{}name", ENCODED_TILDE));
    }

    #[test]
    fn test_with_leaves_original_untouched() {
        let base = JsonPath::from_pointer("/paths");
        let extended = base.with("responses");
        assert_eq!(base.format_path(), "paths");
        assert_eq!(extended.format_path(), "paths/responses");
    }

    #[test]
    fn test_field_path_for_array_element() {
        assert_eq!(JsonPath::from_pointer("/0/name").format_field_path(), "[0].name");
    }

    #[test]
    fn test_field_path_for_nested_array() {
        assert_eq!(JsonPath::from_pointer("/tags/1").format_field_path(), "tags[1]");
        assert_eq!(
            JsonPath::from_pointer("/owner/pets/2/tags/0").format_field_path(),
            "owner.pets[2].tags[0]"
        );
    }

    #[test]
    fn test_field_path_decodes_escaped_keys() {
        let path = JsonPath::from_pointer("/a~1b/c~0d");
        assert_eq!(path.format_field_path(), "a/b.c~d");
    }
}

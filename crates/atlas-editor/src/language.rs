//! File extension to language id mapping.

use smol_str::SmolStr;

/// Language id used when the extension is unknown.
pub const PLAINTEXT: &str = "plaintext";

/// Returns the editor language id for a file extension (case-insensitive).
#[must_use]
pub fn language_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "html" => "html",
        "css" => "css",
        "py" => "python",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "cpp" => "c++",
        "c" => "c",
        "swift" => "swift",
        "kt" => "kotlin",
        "json" => "json",
        "xml" => "xml",
        "sql" => "sql",
        "sh" => "shell",
        _ => PLAINTEXT,
    }
}

/// Returns the language id for a slash-delimited path.
///
/// The extension is whatever follows the last `.` of the file name; a name
/// without a dot maps to [`PLAINTEXT`].
#[must_use]
pub fn language_for_path(path: &str) -> SmolStr {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let language = name
        .rsplit_once('.')
        .map_or(PLAINTEXT, |(_, ext)| language_for_extension(ext));
    SmolStr::new_static(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert_eq!(language_for_path("src/app.jsx"), "javascript");
        assert_eq!(language_for_path("main.PY"), "python");
        assert_eq!(language_for_path("lib/util.kt"), "kotlin");
        assert_eq!(language_for_path("native/core.cpp"), "c++");
    }

    #[test]
    fn unknown_or_missing_extension_is_plaintext() {
        assert_eq!(language_for_path("Makefile"), PLAINTEXT);
        assert_eq!(language_for_path("notes.md"), PLAINTEXT);
        assert_eq!(language_for_path("a.b/readme"), PLAINTEXT);
    }
}

/// Tree-sitter grammar resolution by file extension.
use std::path::Path;

use crate::error::Error;
use crate::frontend::Language;

/// Extensions the tree-sitter frontend indexes.
pub const SOURCE_EXTENSIONS: [&str; 7] = ["go", "js", "jsx", "py", "rs", "ts", "tsx"];

fn extension(path: &Path) -> &str {
    return path.extension().and_then(|e| return e.to_str()).unwrap_or("");
}

/// Map a file extension to its tree-sitter language.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for unknown extensions.
pub fn language_for_path(path: &Path) -> Result<tree_sitter::Language, Error> {
    let ext = extension(path);

    return match ext {
        "go" => Ok(tree_sitter_go::LANGUAGE.into()),
        "js" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "jsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        "py" => Ok(tree_sitter_python::LANGUAGE.into()),
        "rs" => Ok(tree_sitter_rust::LANGUAGE.into()),
        "ts" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "tsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        _ => Err(Error::UnsupportedLanguage { ext: ext.to_string() }),
    };
}

/// Source language of a file, as recorded on its project.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for unknown extensions.
pub fn source_language(path: &Path) -> Result<Language, Error> {
    let ext = extension(path);

    return match ext {
        "go" => Ok(Language::Go),
        "js" | "jsx" | "ts" | "tsx" => Ok(Language::TypeScript),
        "py" => Ok(Language::Python),
        "rs" => Ok(Language::Rust),
        _ => Err(Error::UnsupportedLanguage { ext: ext.to_string() }),
    };
}

/// Whether the tree-sitter frontend indexes this file.
pub fn is_source_file(path: &Path) -> bool {
    return SOURCE_EXTENSIONS.contains(&extension(path));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert!(language_for_path(Path::new("src/lib.rs")).is_ok());
        assert!(language_for_path(Path::new("web/app.tsx")).is_ok());
        assert_eq!(source_language(Path::new("main.go")).unwrap(), Language::Go);
        assert_eq!(source_language(Path::new("index.js")).unwrap(), Language::TypeScript);
    }

    #[test]
    fn rejects_markdown() {
        assert!(!is_source_file(Path::new("README.md")));
        assert!(matches!(
            language_for_path(Path::new("README.md")),
            Err(Error::UnsupportedLanguage { ext }) if ext == "md"
        ));
    }
}

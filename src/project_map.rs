//! Solution-wide project and assembly tables.

use std::path::Path;

use crate::error::Error;

/// Sorted project paths.
pub const PROJECTS_FILE: &str = "Projects.txt";

/// `assembly;projectIndex` lines.
pub const ASSEMBLIES_FILE: &str = "Assemblies.txt";

/// Projects sorted case-insensitively, plus each assembly's index into them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMap {
    /// `(assembly, index into projects)`; `None` when the assembly has no project.
    pub assemblies: Vec<(String, Option<usize>)>,
    /// Distinct project paths.
    pub projects: Vec<String>,
}

/// Case-insensitive order with an ordinal tie-break so output is deterministic.
fn case_insensitive(left: &str, right: &str) -> std::cmp::Ordering {
    return left.to_lowercase().cmp(&right.to_lowercase()).then_with(|| return left.cmp(right));
}

/// Build the project and assembly tables from `(assembly, project path)` pairs.
pub fn normalize(pairs: &[(String, Option<String>)]) -> ProjectMap {
    let mut projects: Vec<String> = pairs.iter().filter_map(|(_, project)| return project.clone()).collect();
    projects.sort_by(|left, right| return case_insensitive(left, right));
    projects.dedup();

    let mut assemblies: Vec<(String, Option<usize>)> = pairs
        .iter()
        .map(|(assembly, project)| {
            let index = project.as_ref().and_then(|path| return projects.iter().position(|candidate| return candidate == path));
            return (assembly.clone(), index);
        })
        .collect();
    assemblies.sort_by(|left, right| return case_insensitive(&left.0, &right.0));
    assemblies.dedup_by(|later, earlier| return later.0 == earlier.0);
    return ProjectMap { assemblies, projects };
}

impl ProjectMap {
    /// Text of `Assemblies.txt`; a missing project is written as `-1`.
    pub fn assemblies_text(&self) -> String {
        return self
            .assemblies
            .iter()
            .map(|(assembly, index)| {
                let index = index.map_or_else(|| return "-1".to_string(), |value| return value.to_string());
                return format!("{assembly};{index}\n");
            })
            .collect();
    }

    /// Text of `Projects.txt`.
    pub fn projects_text(&self) -> String {
        return self.projects.iter().map(|project| return format!("{project}\n")).collect();
    }

    /// Write both tables under `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if either file cannot be written.
    pub fn write(&self, root: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(root)?;
        std::fs::write(root.join(PROJECTS_FILE), self.projects_text())?;
        std::fs::write(root.join(ASSEMBLIES_FILE), self.assemblies_text())?;
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(assembly: &str, project: Option<&str>) -> (String, Option<String>) {
        return (assembly.to_string(), project.map(str::to_string));
    }

    #[test]
    fn projects_sorted_and_indexed() {
        let map = normalize(&[pair("a", Some("e")), pair("b", Some("f")), pair("c", Some("d"))]);
        assert_eq!(map.projects, vec!["d".to_string(), "e".to_string(), "f".to_string()]);
        assert_eq!(map.assemblies_text(), "a;1\nb;2\nc;0\n");
    }

    #[test]
    fn missing_project_is_minus_one() {
        let map = normalize(&[pair("mscorlib", None), pair("App", Some("src/App.csproj"))]);
        assert_eq!(map.assemblies_text(), "App;0\nmscorlib;-1\n");
    }

    #[test]
    fn case_insensitive_order() {
        let map = normalize(&[pair("x", Some("beta")), pair("y", Some("Alpha")), pair("z", Some("alpha2"))]);
        assert_eq!(map.projects, vec!["Alpha".to_string(), "alpha2".to_string(), "beta".to_string()]);
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use bundle_model::FileSet;
use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::BundleError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Editor and VCS debris never copied into a bundle.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.DS_Store",
    "**/._*",
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/.git",
    "**/.git/**",
    "**/.gitignore",
    "**/.gitattributes",
    "**/.gitmodules",
    "**/.hg/**",
    "**/.hgignore",
    "**/.svn/**",
    "**/CVS/**",
    "**/.cvsignore",
];

/// Copy every file selected by `file_sets` into `output_base`.
///
/// Relative set directories resolve against `project_base`; relative output
/// directories against `output_base`. Returns the copied target paths.
pub fn copy_file_sets(
    project_base: &Path,
    output_base: &Path,
    file_sets: &[FileSet],
) -> Result<Vec<PathBuf>, BundleError> {
    let mut copied = Vec::new();
    for file_set in file_sets {
        let source_dir = if file_set.directory.is_absolute() {
            file_set.directory.clone()
        } else {
            project_base.join(&file_set.directory)
        };
        if !source_dir.is_dir() {
            return Err(BundleError::MissingFile {
                what: "file set directory",
                path: source_dir,
            });
        }
        let target_dir = match file_set.output_directory.as_deref() {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => output_base.join(dir),
            None => output_base.to_path_buf(),
        };

        let includes = compile_patterns(&file_set.includes)?;
        let mut excludes = compile_patterns(&file_set.excludes)?;
        excludes.extend(default_excludes());

        for relative in included_files(&source_dir, &includes, &excludes)? {
            let source = source_dir.join(&relative);
            let target = target_dir.join(&relative);
            copy_file(&source, &target)?;
            debug!("copied {} to {}", source.display(), target.display());
            copied.push(target);
        }
    }
    Ok(copied)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, BundleError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|err| BundleError::Pattern {
                pattern: pattern.clone(),
                message: err.to_string(),
            })
        })
        .collect()
}

fn default_excludes() -> Vec<Pattern> {
    DEFAULT_EXCLUDES
        .iter()
        .filter_map(|pattern| Pattern::new(pattern).ok())
        .collect()
}

/// Files below `dir` (relative paths, sorted) selected by the patterns. No
/// includes means everything is included.
fn included_files(
    dir: &Path,
    includes: &[Pattern],
    excludes: &[Pattern],
) -> Result<Vec<PathBuf>, BundleError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|_| BundleError::Invalid(format!("{} escapes {}", entry.path().display(), dir.display())))?
            .to_path_buf();
        let key = relative.to_string_lossy().replace('\\', "/");
        let included = includes.is_empty()
            || includes
                .iter()
                .any(|pattern| pattern.matches_with(&key, MATCH_OPTIONS));
        let excluded = excludes
            .iter()
            .any(|pattern| pattern.matches_with(&key, MATCH_OPTIONS));
        if included && !excluded {
            files.push(relative);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy one file, creating parent directories. Permissions travel with the
/// file.
pub(crate) fn copy_file(source: &Path, target: &Path) -> Result<(), BundleError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| BundleError::io(format!("creating {}", parent.display()), err))?;
    }
    fs::copy(source, target).map_err(|err| {
        BundleError::io(
            format!("copying {} to {}", source.display(), target.display()),
            err,
        )
    })?;
    Ok(())
}

/// Recursively copy a directory tree, recreating symlinks on unix.
pub(crate) fn copy_tree(source: &Path, target: &Path) -> Result<(), BundleError> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| BundleError::Invalid(format!("{} escapes {}", entry.path().display(), source.display())))?;
        let destination = target.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|err| BundleError::io(format!("creating {}", destination.display()), err))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .map_err(|err| BundleError::io(format!("reading link {}", entry.path().display()), err))?;
            replace_symlink(&link, &destination)?;
        } else {
            copy_file(entry.path(), &destination)?;
        }
    }
    Ok(())
}

/// Create `link -> target`, replacing whatever is at `link`.
pub(crate) fn replace_symlink(target: &Path, link: &Path) -> Result<(), BundleError> {
    if let Ok(metadata) = fs::symlink_metadata(link) {
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(link)
        } else {
            fs::remove_file(link)
        };
        removed.map_err(|err| BundleError::io(format!("removing {}", link.display()), err))?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|err| {
            BundleError::io(format!("creating link {} -> {}", link.display(), target.display()), err)
        })
    }

    #[cfg(not(unix))]
    {
        Err(BundleError::Invalid(format!(
            "symbolic link {} -> {} requires a unix host",
            link.display(),
            target.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("bundle-gen-fileset-{prefix}-{nanos}"))
    }

    fn write(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        fs::write(path, b"content").expect("write file");
    }

    #[test]
    fn includes_and_excludes_select_files() {
        let root = unique_temp_dir("select");
        let project = root.join("project");
        write(&project.join("src/dmg/README.txt"));
        write(&project.join("src/dmg/docs/guide.txt"));
        write(&project.join("src/dmg/docs/draft.txt"));
        write(&project.join("src/dmg/background.png"));

        let out = root.join("out");
        let sets = vec![FileSet {
            directory: PathBuf::from("src/dmg"),
            includes: vec!["**/*.txt".to_string()],
            excludes: vec!["**/draft.txt".to_string()],
            output_directory: None,
        }];
        let copied = copy_file_sets(&project, &out, &sets).expect("copy");

        assert_eq!(
            copied,
            vec![out.join("README.txt"), out.join("docs").join("guide.txt")]
        );
        assert!(!out.join("background.png").exists());
        assert!(!out.join("docs").join("draft.txt").exists());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn editor_and_vcs_files_are_never_copied() {
        let root = unique_temp_dir("defaults");
        let source = root.join("src/app");
        write(&source.join("Resources/en.lproj/Credits.rtf"));
        write(&source.join(".DS_Store"));
        write(&source.join("Resources/.DS_Store"));
        write(&source.join(".git/config"));
        write(&source.join("Resources/notes.txt~"));
        write(&source.join(".gitignore"));

        let out = root.join("Contents");
        let sets = vec![FileSet {
            directory: source.clone(),
            includes: Vec::new(),
            excludes: Vec::new(),
            output_directory: None,
        }];
        let copied = copy_file_sets(&root, &out, &sets).expect("copy");

        assert_eq!(copied, vec![out.join("Resources/en.lproj/Credits.rtf")]);
        assert!(!out.join(".git").exists());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn output_directory_is_relative_to_output_base() {
        let root = unique_temp_dir("output");
        let source = root.join("resources");
        write(&source.join("license.txt"));

        let out = root.join("Contents");
        let sets = vec![FileSet {
            directory: source.clone(),
            includes: Vec::new(),
            excludes: Vec::new(),
            output_directory: Some(PathBuf::from("Resources/legal")),
        }];
        copy_file_sets(&root.join("unused"), &out, &sets).expect("copy");
        assert!(out.join("Resources/legal/license.txt").is_file());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_directory_and_bad_pattern_are_errors() {
        let root = unique_temp_dir("errors");
        let sets = vec![FileSet {
            directory: PathBuf::from("nope"),
            includes: Vec::new(),
            excludes: Vec::new(),
            output_directory: None,
        }];
        let err = copy_file_sets(&root, &root, &sets).expect_err("missing dir");
        assert!(matches!(err, BundleError::MissingFile { .. }));

        fs::create_dir_all(root.join("dir")).expect("create dir");
        let sets = vec![FileSet {
            directory: PathBuf::from("dir"),
            includes: vec!["[".to_string()],
            excludes: Vec::new(),
            output_directory: None,
        }];
        let err = copy_file_sets(&root, &root, &sets).expect_err("bad pattern");
        assert!(matches!(err, BundleError::Pattern { .. }));

        let _ = fs::remove_dir_all(root);
    }
}

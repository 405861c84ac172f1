//! Zip archiving for the post-download chaining step.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Archives `dir` into the zip file at `out`, storing entries relative to
/// `dir`. Blocking; run it on a blocking thread from async contexts.
pub fn zip_dir(dir: &Path, out: &Path) -> Result<()> {
    let file = File::create(out)
        .with_context(|| format!("failed to create archive {}", out.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(dir)
            .expect("walkdir yields paths under its root");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel.to_string_lossy();

        if entry.file_type().is_dir() {
            zip.add_directory(name.as_ref(), options)?;
        } else {
            zip.start_file(name.as_ref(), options)?;
            let mut src = File::open(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            io::copy(&mut src, &mut zip)?;
        }
    }

    zip.finish()?.flush()?;
    Ok(())
}

/// The `.zip` sibling path for a materialized directory.
pub fn zip_sibling(dir: &Path) -> std::path::PathBuf {
    let mut os = dir.as_os_str().to_owned();
    os.push(".zip");
    std::path::PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn zip_sibling_appends_extension() {
        assert_eq!(
            zip_sibling(Path::new("downloads/Sonata")).to_string_lossy(),
            "downloads/Sonata.zip"
        );
    }

    #[test]
    fn archives_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bundle");
        std::fs::create_dir_all(src.join("inner")).unwrap();
        std::fs::write(src.join("a.txt"), b"alpha").unwrap();
        std::fs::write(src.join("inner/b.txt"), b"beta").unwrap();

        let out = zip_sibling(&src);
        zip_dir(&src, &out).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "inner/", "inner/b.txt"]);

        let mut contents = String::new();
        archive
            .by_name("inner/b.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "beta");
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.zip");
        assert!(zip_dir(&dir.path().join("nope"), &out).is_err());
    }
}

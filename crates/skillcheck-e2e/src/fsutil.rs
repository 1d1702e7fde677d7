use std::fs;
use std::io;
use std::path::Path;

/// Recursively copy `src` into `dst`, creating `dst`. Returns the number of
/// files copied. Symlinks are recreated on unix and followed elsewhere.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::create_dir_all(dst)?;
    let mut copied = 0u64;

    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    let points_to = fs::read_link(link)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    let real = fs::canonicalize(link)?;
    if real.is_dir() {
        copy_tree(&real, target).map(|_| ())
    } else {
        fs::copy(real, target).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_tree_nested() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("top.md"), "top").unwrap();
        fs::write(src.path().join("a/b/deep.txt"), "deep").unwrap();
        fs::create_dir_all(src.path().join("empty")).unwrap();

        let out = dst.path().join("copy");
        let n = copy_tree(src.path(), &out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(fs::read_to_string(out.join("a/b/deep.txt")).unwrap(), "deep");
        assert!(out.join("empty").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_keeps_symlinks() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink("real.txt", src.path().join("link.txt")).unwrap();

        let out = dst.path().join("copy");
        copy_tree(src.path(), &out).unwrap();
        let meta = fs::symlink_metadata(out.join("link.txt")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_to_string(out.join("link.txt")).unwrap(), "x");
    }
}

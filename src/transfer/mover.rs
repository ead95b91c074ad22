//! Move-semantics directory relocation.

use std::fs;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::FoldResult;

/// Move every entry of `src` into `dst`, replacing entries of the same name, then remove `src`.
///
/// Entries are renamed when possible and copied then deleted otherwise (e.g. across devices).
pub fn move_dir_contents(src: &Path, dst: &Path) -> FoldResult<usize> {
    fs::create_dir_all(dst).with_context(|| format!("create '{}'", dst.display()))?;
    let mut moved = 0usize;
    let entries = fs::read_dir(src).with_context(|| format!("read dir '{}'", src.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir '{}'", src.display()))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        move_entry(&from, &to)?;
        moved += 1;
    }
    fs::remove_dir(src).with_context(|| format!("remove '{}'", src.display()))?;
    Ok(moved)
}

fn move_entry(from: &Path, to: &Path) -> FoldResult<()> {
    if to.is_dir() {
        fs::remove_dir_all(to).with_context(|| format!("replace '{}'", to.display()))?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    if from.is_dir() {
        copy_tree(from, to)?;
        fs::remove_dir_all(from).with_context(|| format!("remove '{}'", from.display()))?;
    } else {
        fs::copy(from, to)
            .with_context(|| format!("copy '{}' -> '{}'", from.display(), to.display()))?;
        fs::remove_file(from).with_context(|| format!("remove '{}'", from.display()))?;
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> FoldResult<()> {
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.with_context(|| format!("walk '{}'", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("relativize '{}'", entry.path().display()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("create '{}'", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("copy '{}' -> '{}'", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/transfer/mover.rs"]
mod tests;

use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};

/// An MP3 sitting in the output directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"))
}

/// List MP3 files in `dir`, newest first. A missing directory yields an empty list.
pub fn list_audio_files(dir: &Path) -> io::Result<Vec<StoredFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs_err::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_mp3(&path) {
            continue;
        }

        let metadata = fs_err::metadata(&path)?;
        let modified = metadata.modified()?;
        files.push(StoredFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
            path,
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

/// Delete MP3 files beyond the newest `keep`, never touching `protect`.
///
/// `protect` always counts as one of the kept files. Returns the removed paths.
pub fn prune_audio_files(dir: &Path, keep: usize, protect: &Path) -> io::Result<Vec<PathBuf>> {
    let files = list_audio_files(dir)?;

    let is_protected = |file: &StoredFile| same_file(&file.path, protect);
    let (protected, others): (Vec<_>, Vec<_>) = files.into_iter().partition(is_protected);

    let budget = keep.saturating_sub(protected.len());
    let mut removed = Vec::new();
    for file in others.into_iter().skip(budget) {
        tracing::debug!("Removing old download: {}", file.path.display());
        fs_err::remove_file(&file.path)?;
        removed.push(file.path);
    }

    Ok(removed)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_aged(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs_err::write(&path, name.as_bytes()).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(mtime).unwrap();
        path
    }

    #[test]
    fn test_list_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        write_aged(dir.path(), "old.mp3", 300);
        write_aged(dir.path(), "new.MP3", 10);
        write_aged(dir.path(), "mid.mp3", 100);
        write_aged(dir.path(), "notes.txt", 0);

        let names: Vec<_> = list_audio_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|file| file.name)
            .collect();
        assert_eq!(names, ["new.MP3", "mid.mp3", "old.mp3"]);
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(list_audio_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = (0..7)
            .map(|i| write_aged(dir.path(), &format!("space{}.mp3", i), 100 * (i + 1)))
            .collect();

        let removed = prune_audio_files(dir.path(), 5, &paths[0]).unwrap();
        assert_eq!(removed, vec![paths[5].clone(), paths[6].clone()]);
        assert_eq!(list_audio_files(dir.path()).unwrap().len(), 5);
    }

    #[test]
    fn test_prune_never_removes_protected_file() {
        let dir = TempDir::new().unwrap();
        // yt-dlp may stamp the new file with the upload time, making it the oldest
        let fresh = write_aged(dir.path(), "fresh.mp3", 10_000);
        write_aged(dir.path(), "a.mp3", 10);
        write_aged(dir.path(), "b.mp3", 20);

        let removed = prune_audio_files(dir.path(), 1, &fresh).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(fresh.exists());
    }
}

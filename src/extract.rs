//! The recursive unpack / classify / collect pipeline.
//!
//! A run unpacks the top-level archive into a scratch directory, then walks
//! the result: every file is classified and copied into its bucket, and every
//! archive is additionally unpacked into a fresh workspace of its own, whose
//! contents are walked one depth level down. Nesting is capped at
//! [`MAX_DEPTH`] layers. Failures below the top level are local; the affected
//! branch is skipped with a warning while the rest of the tree carries on.
//!
//! Workspaces are siblings of the directories being walked, never inside
//! them, so a walk cannot observe another archive's scratch space. Each
//! workspace is removed when its unpack attempt finishes, on every path.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh64::xxh64;

use crate::classify::{self, FileKind};
use crate::config::RunConfig;
use crate::format::ArchiveFormat;
use crate::sanitize;
use crate::unpack::Unpacker;

/// Maximum number of nested archive layers a run will open.
pub const MAX_DEPTH: u32 = 10;

/// Position within the nested tree during a walk.
///
/// `depth` counts unpack layers below the top-level archive (top-level
/// contents are 0). `prefix` is the slash-joined lineage of archive and
/// directory names from the outermost archive down to the directory being
/// walked; it travels onto copied files as part of their destination name.
#[derive(Debug, Clone)]
struct ExtractionContext {
    depth: u32,
    prefix: String,
}

impl ExtractionContext {
    fn top() -> Self {
        Self {
            depth: 0,
            prefix: String::new(),
        }
    }

    /// One lineage step: `name` under `prefix`.
    fn extended(prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    /// Lineage of entries sitting in `rel_parent`, a directory path relative
    /// to this walk's root.
    fn prefix_for(&self, rel_parent: &Path) -> String {
        let mut prefix = self.prefix.clone();
        for component in rel_parent.components() {
            prefix = Self::extended(&prefix, &component.as_os_str().to_string_lossy());
        }
        prefix
    }
}

/// Counters for one run.
///
/// Local failures end up here instead of becoming errors; the run itself only
/// fails for fatal conditions (bad input, no scratch space, top-level unpack).
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub source_files: usize,
    pub archive_files: usize,
    pub disguised_files: usize,
    pub other_files: usize,
    /// Nested archives successfully unpacked.
    pub unpacked: usize,
    /// Archives whose name maps to no unpack operation.
    pub unsupported: usize,
    /// Workspace or external-tool failures.
    pub unpack_failures: usize,
    /// Branches refused at the depth cap.
    pub depth_skips: usize,
    pub copy_failures: usize,
}

impl RunStats {
    fn record(&mut self, kind: FileKind) {
        match kind {
            FileKind::SourceCode => self.source_files += 1,
            FileKind::Archive => self.archive_files += 1,
            FileKind::DisguisedExtension => self.disguised_files += 1,
            FileKind::Other => self.other_files += 1,
        }
    }

    /// Total files copied into buckets.
    pub fn total_copied(&self) -> usize {
        self.source_files + self.archive_files + self.disguised_files + self.other_files
    }

    /// Whether anything was skipped along the way.
    pub fn had_local_failures(&self) -> bool {
        self.unsupported + self.unpack_failures + self.depth_skips + self.copy_failures > 0
    }
}

/// Drives one extraction run.
pub struct Extractor<'a> {
    config: &'a RunConfig,
    unpacker: &'a dyn Unpacker,
    stats: RunStats,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a RunConfig, unpacker: &'a dyn Unpacker) -> Self {
        Self {
            config,
            unpacker,
            stats: RunStats::default(),
        }
    }

    /// Run the whole job: unpack the top-level archive, walk and sort
    /// everything inside, tear the scratch space down.
    ///
    /// Returns `Err` only for fatal conditions: invalid configuration,
    /// scratch-space creation failure, or a top-level archive that has no
    /// unpack operation or fails to unpack. Every failure below the top level
    /// is recorded in [`RunStats`] and skipped with a warning.
    pub fn run(mut self) -> Result<RunStats> {
        self.config.validate()?;
        self.config
            .output
            .ensure_dirs()
            .context("failed to create output directories")?;

        let scratch = match &self.config.work_dir {
            Some(dir) => tempfile::Builder::new().prefix("shuck-").tempdir_in(dir),
            None => tempfile::Builder::new().prefix("shuck-").tempdir(),
        }
        .context("failed to create scratch root")?;

        let archive = &self.config.archive_path;
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("no file name in {}", archive.display()))?;
        let format = ArchiveFormat::from_name(&name)
            .ok_or_else(|| anyhow!("no unpack operation for {}", archive.display()))?;

        let top = scratch.path().join("top");
        fs::create_dir(&top).context("failed to create top-level workspace")?;

        self.unpacker
            .unpack(format, archive, &top)
            .with_context(|| format!("failed to unpack {}", archive.display()))?;
        debug!("top-level archive unpacked into {}", top.display());

        self.walk_tree(&top, scratch.path(), &ExtractionContext::top());

        if let Err(err) = scratch.close() {
            warn!("failed to remove scratch root: {}", err);
        }
        Ok(self.stats)
    }

    /// Walk one extracted tree: copy every file into its bucket, unpack every
    /// archive one level down. Directories that cannot be read are skipped
    /// without aborting the rest of the walk.
    fn walk_tree(&mut self, dir: &Path, scratch_root: &Path, ctx: &ExtractionContext) {
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel_parent = path
                .strip_prefix(dir)
                .ok()
                .and_then(|rel| rel.parent())
                .unwrap_or(Path::new(""));
            let prefix = ctx.prefix_for(rel_parent);

            let kind = classify::classify_file(path);
            self.copy_into(path, kind, &prefix);
            if kind == FileKind::Archive {
                self.unpack_nested(path, &name, scratch_root, ctx.depth + 1, &prefix);
            }
        }
    }

    /// Unpack one nested archive into its own workspace and walk the result.
    ///
    /// `depth` is the nesting level the archive's contents sit at;
    /// `parent_prefix` is the lineage of the directory the archive was found
    /// in. Every failure in here is local to this one archive.
    fn unpack_nested(
        &mut self,
        archive: &Path,
        name: &str,
        scratch_root: &Path,
        depth: u32,
        parent_prefix: &str,
    ) {
        if depth > MAX_DEPTH {
            println!(
                "Warning: depth limit reached, not unpacking {}",
                archive.display()
            );
            warn!("refusing depth {} for {}", depth, archive.display());
            self.stats.depth_skips += 1;
            return;
        }

        let format = match ArchiveFormat::from_name(name) {
            Some(format) => format,
            None => {
                println!("Warning: no unpack operation for {}", archive.display());
                self.stats.unsupported += 1;
                return;
            }
        };

        println!("Unpacking (depth {}): {}", depth, name);

        let workspace = match keyed_workspace(scratch_root, archive, depth) {
            Ok(workspace) => workspace,
            Err(err) => {
                println!("Warning: failed to unpack {}", archive.display());
                warn!("workspace creation failed for {}: {}", archive.display(), err);
                self.stats.unpack_failures += 1;
                return;
            }
        };

        if let Err(err) = self.unpacker.unpack(format, archive, workspace.path()) {
            println!("Warning: failed to unpack {}", archive.display());
            warn!("{} unpack failed for {}: {:#}", format, archive.display(), err);
            self.stats.unpack_failures += 1;
            return;
        }
        self.stats.unpacked += 1;

        let ctx = ExtractionContext {
            depth,
            prefix: ExtractionContext::extended(parent_prefix, name),
        };
        self.walk_tree(workspace.path(), scratch_root, &ctx);

        if let Err(err) = workspace.close() {
            warn!("failed to remove workspace for {}: {}", archive.display(), err);
        }
    }

    /// Copy one classified file into its bucket under its lineage name.
    /// Failure skips the file, nothing else.
    fn copy_into(&mut self, src: &Path, kind: FileKind, prefix: &str) {
        let name = match src.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return,
        };
        let dest = self
            .config
            .output
            .bucket_for(kind)
            .join(sanitize::dest_file_name(prefix, &name));

        match fs::copy(src, &dest) {
            Ok(_) => {
                println!(
                    "Extracted {}: {} -> {}",
                    kind.reason(),
                    src.display(),
                    dest.display()
                );
                self.stats.record(kind);
            }
            Err(err) => {
                println!("Error: unable to copy {}: {}", src.display(), err);
                warn!("copy {} -> {} failed: {}", src.display(), dest.display(), err);
                self.stats.copy_failures += 1;
            }
        }
    }
}

/// Workspace for one archive's contents, under the run's scratch root.
///
/// The name carries the depth and a hash of the archive's own path, so
/// sibling archives at the same depth can never land in each other's
/// workspace. The returned guard removes the directory when dropped.
fn keyed_workspace(scratch_root: &Path, archive: &Path, depth: u32) -> std::io::Result<TempDir> {
    let key = xxh64(archive.as_os_str().as_encoded_bytes(), 0);
    tempfile::Builder::new()
        .prefix(&format!("unpack-{}-{:016x}-", depth, key))
        .tempdir_in(scratch_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputLayout;
    use crate::unpack::{find_tool, ToolUnpacker};
    use anyhow::bail;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];

    /// Writes the same fixed tree into every destination it is asked to fill.
    struct StaticUnpacker {
        files: Vec<(&'static str, Vec<u8>)>,
        calls: AtomicUsize,
    }

    impl StaticUnpacker {
        fn new(files: Vec<(&'static str, Vec<u8>)>) -> Self {
            Self {
                files,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Unpacker for StaticUnpacker {
        fn unpack(&self, _format: ArchiveFormat, _archive: &Path, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for (rel, bytes) in &self.files {
                let path = dest.join(rel);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, bytes)?;
            }
            Ok(())
        }
    }

    /// First call produces `main.c` + `nested.zip`; the second produces
    /// `inner.c`. Models a two-level archive without real tools.
    struct TwoLevelUnpacker {
        calls: AtomicUsize,
    }

    impl Unpacker for TwoLevelUnpacker {
        fn unpack(&self, _format: ArchiveFormat, _archive: &Path, dest: &Path) -> Result<()> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => {
                    fs::write(dest.join("main.c"), b"int main(void) { return 0; }")?;
                    fs::write(dest.join("nested.zip"), b"stand-in zip bytes")?;
                }
                _ => {
                    fs::write(dest.join("inner.c"), b"void inner(void) {}")?;
                }
            }
            Ok(())
        }
    }

    /// Wraps an `inner.tar` inside every destination, forever.
    struct NestingUnpacker {
        calls: AtomicUsize,
    }

    impl Unpacker for NestingUnpacker {
        fn unpack(&self, _format: ArchiveFormat, _archive: &Path, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(dest.join("inner.tar"), b"wrapped again")?;
            Ok(())
        }
    }

    /// Succeeds once (the top level), fails every call after that.
    struct FirstOnlyUnpacker {
        calls: AtomicUsize,
    }

    impl Unpacker for FirstOnlyUnpacker {
        fn unpack(&self, _format: ArchiveFormat, _archive: &Path, dest: &Path) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                bail!("scripted failure");
            }
            fs::write(dest.join("good.c"), b"int x;")?;
            fs::write(dest.join("evil.zip"), PNG)?;
            fs::write(dest.join("photo.jpg"), JPEG)?;
            Ok(())
        }
    }

    /// Never produces anything.
    struct BrokenUnpacker;

    impl Unpacker for BrokenUnpacker {
        fn unpack(&self, _format: ArchiveFormat, _archive: &Path, _dest: &Path) -> Result<()> {
            bail!("tool exploded");
        }
    }

    fn config_in(root: &Path) -> Result<RunConfig> {
        let archive = root.join("top.tar");
        fs::write(&archive, b"fake tar bytes")?;
        let work = root.join("work");
        fs::create_dir(&work)?;
        Ok(RunConfig {
            archive_path: archive,
            output: OutputLayout::under(&root.join("result")),
            work_dir: Some(work),
        })
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_sorts_tree_into_buckets() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path())?;
        let fake = StaticUnpacker::new(vec![
            ("main.c", b"int main(void) { return 0; }".to_vec()),
            ("photo.jpg", JPEG.to_vec()),
            ("secret.txt", PNG.to_vec()),
            ("notes.txt", b"plain text".to_vec()),
            ("docs/readme.md", b"# readme".to_vec()),
        ]);

        let stats = Extractor::new(&config, &fake).run()?;

        assert_eq!(names_in(&config.output.source_dir), vec!["main.c"]);
        assert_eq!(names_in(&config.output.disguised_dir), vec!["secret.txt"]);
        assert_eq!(
            names_in(&config.output.other_dir),
            vec!["[docs]readme.md", "notes.txt", "photo.jpg"]
        );
        assert!(names_in(&config.output.archive_dir).is_empty());

        assert_eq!(stats.source_files, 1);
        assert_eq!(stats.disguised_files, 1);
        assert_eq!(stats.other_files, 3);
        assert_eq!(stats.total_copied(), 5);
        assert!(!stats.had_local_failures());
        Ok(())
    }

    #[test]
    fn test_nested_archive_lineage() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path())?;
        let fake = TwoLevelUnpacker {
            calls: AtomicUsize::new(0),
        };

        let stats = Extractor::new(&config, &fake).run()?;

        // Top-level files keep their bare names; files from inside the nested
        // archive carry its name as lineage.
        assert_eq!(
            names_in(&config.output.source_dir),
            vec!["[nested.zip]inner.c", "main.c"]
        );
        assert_eq!(names_in(&config.output.archive_dir), vec!["nested.zip"]);
        assert_eq!(stats.archive_files, 1);
        assert_eq!(stats.unpacked, 1);
        Ok(())
    }

    #[test]
    fn test_depth_cap_stops_runaway_nesting() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path())?;
        let fake = NestingUnpacker {
            calls: AtomicUsize::new(0),
        };

        let stats = Extractor::new(&config, &fake).run()?;

        // One top-level unpack plus ten nested layers; the eleventh layer is
        // refused before the unpacker is ever asked.
        assert_eq!(fake.calls.load(Ordering::SeqCst), 11);
        assert_eq!(stats.unpacked, 10);
        assert_eq!(stats.depth_skips, 1);
        // The refused archive was still copied into its bucket, like all the
        // others above it.
        assert_eq!(stats.archive_files, 11);
        assert_eq!(names_in(&config.output.archive_dir).len(), 11);
        Ok(())
    }

    #[test]
    fn test_failed_nested_unpack_spares_siblings() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path())?;
        let fake = FirstOnlyUnpacker {
            calls: AtomicUsize::new(0),
        };

        let stats = Extractor::new(&config, &fake).run()?;

        // evil.zip (PNG bytes) is an archive by name; its unpack failed but
        // the siblings were still sorted.
        assert_eq!(names_in(&config.output.archive_dir), vec!["evil.zip"]);
        assert_eq!(names_in(&config.output.source_dir), vec!["good.c"]);
        assert_eq!(names_in(&config.output.other_dir), vec!["photo.jpg"]);
        assert_eq!(stats.unpack_failures, 1);
        assert_eq!(stats.unpacked, 0);
        assert!(stats.had_local_failures());
        Ok(())
    }

    #[test]
    fn test_unmapped_archive_name_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path())?;
        let fake = StaticUnpacker::new(vec![
            ("bundle.tgz", b"short tar form".to_vec()),
            ("a.c", b"int a;".to_vec()),
        ]);

        let stats = Extractor::new(&config, &fake).run()?;

        // The .tgz still lands in the archive bucket, but no unpack operation
        // exists for it, so the unpacker only ever saw the top level.
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert_eq!(names_in(&config.output.archive_dir), vec!["bundle.tgz"]);
        assert_eq!(stats.unsupported, 1);
        assert_eq!(stats.unpacked, 0);
        Ok(())
    }

    #[test]
    fn test_scratch_space_removed_after_run() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path())?;
        let work = config.work_dir.clone().unwrap();

        let fake = FirstOnlyUnpacker {
            calls: AtomicUsize::new(0),
        };
        Extractor::new(&config, &fake).run()?;

        // Workspaces and the scratch root are gone even though a nested
        // unpack failed mid-run.
        assert_eq!(fs::read_dir(&work)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let config = RunConfig {
            archive_path: PathBuf::from("/no/such/top.tar"),
            output: OutputLayout::under(Path::new("/tmp/unused")),
            work_dir: None,
        };
        assert!(Extractor::new(&config, &BrokenUnpacker).run().is_err());
    }

    #[test]
    fn test_unmapped_top_level_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        let mut config = config_in(dir.path())?;
        let odd = dir.path().join("top.xyz");
        fs::write(&odd, b"bytes")?;
        config.archive_path = odd;

        assert!(Extractor::new(&config, &BrokenUnpacker).run().is_err());
        Ok(())
    }

    #[test]
    fn test_failed_top_level_unpack_is_fatal() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(dir.path())?;
        assert!(Extractor::new(&config, &BrokenUnpacker).run().is_err());
        Ok(())
    }

    #[test]
    fn test_end_to_end_with_real_unzip() -> Result<()> {
        if find_tool("unzip").is_err() {
            println!("unzip not installed, skipping");
            return Ok(());
        }

        let dir = tempdir()?;

        // Inner archive: one C file.
        let nested_path = dir.path().join("nested.zip");
        {
            let file = fs::File::create(&nested_path)?;
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("inner.c", options)?;
            zip.write_all(b"void inner(void) {}")?;
            zip.finish()?;
        }
        let nested_bytes = fs::read(&nested_path)?;

        // Top-level archive: a C file, an honest JPEG, PNG bytes hiding
        // behind .txt, and the nested archive.
        let top_path = dir.path().join("top.zip");
        {
            let file = fs::File::create(&top_path)?;
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("main.c", options)?;
            zip.write_all(b"int main(void) { return 0; }")?;
            zip.start_file("photo.jpg", options)?;
            zip.write_all(JPEG)?;
            zip.start_file("secret.txt", options)?;
            zip.write_all(PNG)?;
            zip.start_file("nested.zip", options)?;
            zip.write_all(&nested_bytes)?;
            zip.finish()?;
        }

        let work = dir.path().join("work");
        fs::create_dir(&work)?;
        let config = RunConfig {
            archive_path: top_path,
            output: OutputLayout::under(&dir.path().join("result")),
            work_dir: Some(work),
        };

        let stats = Extractor::new(&config, &ToolUnpacker).run()?;

        assert_eq!(
            names_in(&config.output.source_dir),
            vec!["[nested.zip]inner.c", "main.c"]
        );
        assert_eq!(names_in(&config.output.archive_dir), vec!["nested.zip"]);
        assert_eq!(names_in(&config.output.disguised_dir), vec!["secret.txt"]);
        assert_eq!(names_in(&config.output.other_dir), vec!["photo.jpg"]);

        assert_eq!(
            fs::read(config.output.source_dir.join("[nested.zip]inner.c"))?,
            b"void inner(void) {}"
        );
        assert_eq!(stats.unpacked, 1);
        assert!(!stats.had_local_failures());
        Ok(())
    }
}

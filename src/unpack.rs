//! External unpack capability.
//!
//! Decoding archive bytes is not this crate's business: each format maps to
//! one invocation of a standard command-line utility, treated as a black box
//! whose exit status decides success. The [`Unpacker`] trait is the seam:
//! the pipeline only ever sees `unpack(format, src, dest)`, so tests swap in
//! deterministic fakes instead of spawning real tools.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::format::ArchiveFormat;

/// Turns one archive into a directory of plain files.
///
/// `dest` exists and is empty when called. Implementations report failure for
/// anything that stops the content from coming out: unknown tool, bad
/// archive, non-zero tool exit.
pub trait Unpacker {
    fn unpack(&self, format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<()>;
}

/// [`Unpacker`] backed by the system archive utilities
/// (tar, gzip, bzip2, xz, unzip, 7z, unrar).
#[derive(Debug, Default)]
pub struct ToolUnpacker;

impl Unpacker for ToolUnpacker {
    fn unpack(&self, format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<()> {
        match format {
            ArchiveFormat::TarGz => run_tar("-xzf", archive, dest),
            ArchiveFormat::TarBz2 => run_tar("-xjf", archive, dest),
            ArchiveFormat::TarXz => run_tar("-xJf", archive, dest),
            ArchiveFormat::Tar => run_tar("-xf", archive, dest),
            ArchiveFormat::Gzip => decompress_single("gzip", archive, dest),
            ArchiveFormat::Bzip2 => decompress_single("bzip2", archive, dest),
            ArchiveFormat::Xz => decompress_single("xz", archive, dest),
            ArchiveFormat::Zip => run_unzip(archive, dest),
            ArchiveFormat::SevenZip => run_7z(archive, dest),
            ArchiveFormat::Rar => run_unrar(archive, dest),
        }
    }
}

/// Locate an external tool on PATH.
pub fn find_tool(name: &str) -> Result<PathBuf> {
    which::which(name).with_context(|| format!("{} not found on PATH", name))
}

fn run_tar(mode: &str, archive: &Path, dest: &Path) -> Result<()> {
    let tar = find_tool("tar")?;
    let output = Command::new(tar)
        .arg(mode)
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .output()
        .with_context(|| format!("failed to run tar on {}", archive.display()))?;
    check_status("tar", &output)
}

/// gzip, bzip2 and xz decode to stdout; the stream is captured into a file in
/// the workspace that keeps the archive's own name (so `data.gz` comes out as
/// `data.gz`, and the walker deals with the consequences).
fn decompress_single(tool_name: &str, archive: &Path, dest: &Path) -> Result<()> {
    let tool = find_tool(tool_name)?;
    let file_name = archive
        .file_name()
        .ok_or_else(|| anyhow!("no file name in {}", archive.display()))?;
    let out_path = dest.join(file_name);
    let out_file = File::create(&out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;

    let output = Command::new(tool)
        .arg("-d")
        .arg("-c")
        .arg(archive)
        .stdout(Stdio::from(out_file))
        .output()
        .with_context(|| format!("failed to run {} on {}", tool_name, archive.display()))?;
    check_status(tool_name, &output)
}

fn run_unzip(archive: &Path, dest: &Path) -> Result<()> {
    let unzip = find_tool("unzip")?;
    let output = Command::new(unzip)
        .arg("-q")
        .arg(archive)
        .arg("-d")
        .arg(dest)
        .output()
        .with_context(|| format!("failed to run unzip on {}", archive.display()))?;
    check_status("unzip", &output)
}

fn run_7z(archive: &Path, dest: &Path) -> Result<()> {
    let sz = find_tool("7z").or_else(|_| find_tool("7zz"))?;
    let output = Command::new(sz)
        .arg("x")
        .arg(archive)
        .arg(format!("-o{}", dest.display()))
        .arg("-y")
        .output()
        .with_context(|| format!("failed to run 7z on {}", archive.display()))?;
    check_status("7z", &output)
}

fn run_unrar(archive: &Path, dest: &Path) -> Result<()> {
    let unrar = find_tool("unrar")?;
    let output = Command::new(unrar)
        .arg("x")
        .arg(archive)
        .arg(format!("{}/", dest.display()))
        .arg("-y")
        .output()
        .with_context(|| format!("failed to run unrar on {}", archive.display()))?;
    check_status("unrar", &output)
}

fn check_status(tool: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    bail!("{} exited with {}: {}", tool, output.status, stderr.trim());
}

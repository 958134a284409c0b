// docker-maintain/src/backup/archive.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const ARCHIVE_PREFIX: &str = "docker";

/// `docker_<hostname>_<YYYYMMDD>.tar.gz`
///
/// Two snapshots on the same day share a name; the later one replaces the earlier.
pub fn archive_file_name(hostname: &str, date: NaiveDate) -> String {
    format!("{}.gz", uncompressed_file_name(hostname, date))
}

fn uncompressed_file_name(hostname: &str, date: NaiveDate) -> String {
    format!("{}_{}.tar", host_prefix(hostname), date.format("%Y%m%d"))
}

/// Key prefix shared by every archive of one host, used to filter remote listings.
pub fn host_prefix(hostname: &str) -> String {
    format!("{}_{}", ARCHIVE_PREFIX, hostname)
}

/// Matches archive file names belonging to one host.
pub fn archive_name_pattern(hostname: &str) -> Result<Regex> {
    let pattern = format!(
        r"^{}_[0-9]{{8}}\.tar\.gz$",
        regex::escape(&host_prefix(hostname))
    );
    Regex::new(&pattern).with_context(|| format!("Invalid archive name pattern: {}", pattern))
}

/// Uncompressed tar file that grows by appending entries.
///
/// Dropping an unfinished container still writes the tar trailer, so a build that
/// aborts part way leaves a readable `.tar` with everything appended so far.
pub struct TarContainer {
    path: PathBuf,
    builder: Builder<BufWriter<File>>,
}

impl TarContainer {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory for archive: {}", parent.display())
            })?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create archive file: {}", path.display()))?;
        let mut builder = Builder::new(BufWriter::new(file));
        builder.follow_symlinks(false);
        Ok(Self {
            path: path.to_path_buf(),
            builder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds `source_dir` recursively under a single top-level entry named after its base name.
    ///
    /// Sockets cannot be stored in a tar archive and are skipped.
    pub fn append_tree(&mut self, source_dir: &Path) -> Result<()> {
        if !source_dir.is_dir() {
            return Err(anyhow::anyhow!(
                "Source for archival is not a directory: {}",
                source_dir.display()
            ));
        }
        let top = source_dir
            .file_name()
            .with_context(|| format!("Source directory has no base name: {}", source_dir.display()))?;

        info!("snapshot {} to {}", source_dir.display(), self.path.display());

        for entry in WalkDir::new(source_dir).follow_links(false).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk directory: {}", source_dir.display()))?;
            let path = entry.path();
            let relative = path.strip_prefix(source_dir).with_context(|| {
                format!("Failed to strip prefix {} from {}", source_dir.display(), path.display())
            })?;
            let name = Path::new(top).join(relative);

            if entry.file_type().is_socket() {
                warn!("{}: socket ignored", path.display());
                continue;
            }
            self.builder.append_path_with_name(path, &name).with_context(|| {
                format!("Failed to append {} as {} to archive", path.display(), name.display())
            })?;
        }
        Ok(())
    }

    /// Appends a regular file from disk as a top-level entry called `name`.
    pub fn append_file(&mut self, name: &str, source: &Path) -> Result<()> {
        debug!("append {} as {}", source.display(), name);
        let mut file = File::open(source)
            .with_context(|| format!("Failed to open {} for archiving", source.display()))?;
        self.builder
            .append_file(name, &mut file)
            .with_context(|| format!("Failed to append {} to archive {}", name, self.path.display()))
    }

    /// Writes the tar trailer and flushes the file.
    pub fn finish(self) -> Result<PathBuf> {
        let writer = self
            .builder
            .into_inner()
            .with_context(|| format!("Failed to finish tar archive: {}", self.path.display()))?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush tar archive: {}", self.path.display()))?;
        Ok(self.path)
    }
}

/// Gzips `tar_path` next to itself, removes the uncompressed file and returns the `.tar.gz` path.
pub fn compress(tar_path: &Path) -> Result<PathBuf> {
    let mut gz_path = tar_path.as_os_str().to_owned();
    gz_path.push(".gz");
    let gz_path = PathBuf::from(gz_path);

    info!("compress: {}", tar_path.display());

    let mut input = BufReader::new(
        File::open(tar_path).with_context(|| format!("Failed to open {}", tar_path.display()))?,
    );
    let output = File::create(&gz_path)
        .with_context(|| format!("Failed to create compressed archive: {}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());

    io::copy(&mut input, &mut encoder)
        .with_context(|| format!("Failed to compress {}", tar_path.display()))?;
    encoder
        .finish()
        .with_context(|| format!("Failed to finish Gzip encoding for archive: {}", gz_path.display()))?
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush {}", gz_path.display()))?;

    fs::remove_file(tar_path)
        .with_context(|| format!("Failed to remove intermediate archive: {}", tar_path.display()))?;
    Ok(gz_path)
}

/// Extracts a GZipped TAR archive into `extract_to_dir`, replacing colliding paths.
///
/// When running as root the stored owners are restored as well.
pub fn extract_tar_gz_archive(archive_path: &Path, extract_to_dir: &Path) -> Result<PathBuf> {
    if !archive_path.is_file() {
        return Err(anyhow::anyhow!(
            "Archive for extraction is not a file: {}",
            archive_path.display()
        ));
    }

    if !extract_to_dir.exists() {
        fs::create_dir_all(extract_to_dir).with_context(|| {
            format!("Failed to create extraction directory: {}", extract_to_dir.display())
        })?;
    } else if !extract_to_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Extraction path exists but is not a directory: {}",
            extract_to_dir.display()
        ));
    }

    info!(
        "Extracting {} to {}",
        archive_path.display(),
        extract_to_dir.display()
    );

    let archive_file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive file: {}", archive_path.display()))?;
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(BufReader::new(archive_file)));
    archive.set_overwrite(true);
    archive.set_preserve_permissions(true);
    archive.set_preserve_ownerships(nix::unistd::geteuid().is_root());

    archive.unpack(extract_to_dir).with_context(|| {
        format!(
            "Failed to unpack archive {} to {}",
            archive_path.display(),
            extract_to_dir.display()
        )
    })?;

    Ok(extract_to_dir.to_path_buf())
}

/// Name of the intermediate `.tar` built before compression.
pub fn tar_path_for(backup_dir: &Path, hostname: &str, date: NaiveDate) -> PathBuf {
    backup_dir.join(uncompressed_file_name(hostname, date))
}

/*!
 * File system utilities for the application.
 *
 * Path handling, directory management, log appending, content hashing and
 * the file type detection used to vet input documents.
 */

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use log::debug;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Kinds of files the application cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// A PDF document, identified by magic bytes or extension
    Pdf,
    /// A file whose extension belongs to the attachment whitelist
    Attachment,
    /// Anything else
    Unknown,
}

/// File manager for application file operations
pub struct FileManager;

impl FileManager {
    /// Check if a file exists
    // @checks: file existence at the given path
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Check if a directory exists
    // @checks: directory existence at the given path
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    /// Ensure a directory exists, creating it if needed
    // @creates: the directory and any missing parents
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find all files with one of the given extensions under a directory
    // @returns: matching paths in directory walk order
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(anyhow!("Not a directory: {:?}", dir));
        }

        let mut result = Vec::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() {
                if let Some(ext) = Self::file_extension(path) {
                    if extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }
        Ok(result)
    }

    /// Lowercased extension of a path, if it has one
    pub fn file_extension<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    /// Write content to a file, creating parent directories as needed
    // @creates: the file and any missing parent directories
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write file: {:?}", path))
    }

    /// Copy a file to a new location
    pub fn copy_file<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }
        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;
        Ok(())
    }

    /// Append a timestamped line to a log file
    // @creates: the log file and parent directories on first write
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {:?}", path))?;
        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to append to log file: {:?}", path))?;
        Ok(())
    }

    /// Copy the source document aside before a run
    // @returns: the path of the backup copy
    pub fn backup_original<P: AsRef<Path>, Q: AsRef<Path>>(source: P, backup_dir: Q) -> Result<PathBuf> {
        let source = source.as_ref();
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Source has no file name: {:?}", source))?;

        let stamped = format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), file_name);
        let target = backup_dir.as_ref().join(stamped);
        Self::copy_file(source, &target)?;
        debug!("Backed up {:?} to {:?}", source, target);
        Ok(target)
    }

    /// Replace characters that are unsafe in file names
    // @returns: a non-empty stem usable as a directory or file name
    pub fn sanitize_file_stem(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' {
                out.push(c);
            } else {
                out.push('_');
            }
        }
        let trimmed = out.trim().to_string();
        if trimmed.is_empty() {
            "recipient".to_string()
        } else {
            trimmed
        }
    }

    /// Detect the type of a file from its content and extension
    // @checks: PDF magic bytes first, extension as fallback
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        let mut header = [0u8; 5];
        let mut file =
            File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
        let read = file
            .read(&mut header)
            .with_context(|| format!("Failed to read file header: {:?}", path))?;
        if read == header.len() && &header == b"%PDF-" {
            return Ok(FileType::Pdf);
        }

        match Self::file_extension(path).as_deref() {
            Some("pdf") => Ok(FileType::Pdf),
            Some("doc") | Some("xls") | Some("xlsx") => Ok(FileType::Attachment),
            _ => Ok(FileType::Unknown),
        }
    }

    /// SHA-256 checksum of a file, hex encoded
    // @returns: a stable identity for caching keyed by document content
    pub async fn hash_file<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref().to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open file for hashing: {:?}", path))?;

            let mut hasher = Sha256::new();
            let mut buffer = [0u8; 8192];

            loop {
                let bytes_read = file
                    .read(&mut buffer)
                    .with_context(|| format!("Failed to read file for hashing: {:?}", path))?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }

            Ok(format!("{:x}", hasher.finalize()))
        })
        .await
        .context("File hashing task panicked")?
    }
}

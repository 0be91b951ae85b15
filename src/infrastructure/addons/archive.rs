//! Addon package archives - reading entries out of zip packages and writing new ones

use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use rawzip::{CompressionMethod, ZipArchiveWriter, ZipDataWriter};
use crate::application::errors::AddonError;

/// An addon package held in memory
pub struct PackageArchive {
    path: PathBuf,
    buf: Vec<u8>,
}

impl PackageArchive {
    /// Open and validate a package.
    ///
    /// A missing or unreadable package has no readable metadata, so both
    /// surface as `MetadataMissing`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AddonError> {
        let path = path.as_ref();
        let buf = std::fs::read(path)
            .map_err(|e| AddonError::MetadataMissing(format!("cannot read package {}: {}", path.display(), e)))?;

        rawzip::ZipArchive::from_slice(&buf)
            .map_err(|e| AddonError::MetadataMissing(format!("invalid package archive {}: {:?}", path.display(), e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            buf,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all file entries, normalized
    pub fn entry_names(&self) -> Result<Vec<String>, AddonError> {
        let archive = rawzip::ZipArchive::from_slice(self.buf.as_slice())
            .map_err(|e| self.corrupt(format!("invalid zip archive: {:?}", e)))?;
        let mut names = Vec::new();
        for entry in archive.entries() {
            let entry = entry.map_err(|e| self.corrupt(format!("zip entry error: {:?}", e)))?;
            if entry.is_dir() {
                continue;
            }
            let filename = entry
                .file_path()
                .try_normalize()
                .map_err(|e| self.corrupt(format!("failed to normalize zip path: {:?}", e)))?
                .as_ref()
                .to_string();
            names.push(filename);
        }
        Ok(names)
    }

    /// Read a file entry, `None` if the package has no such entry
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>, AddonError> {
        let wanted = name.trim_start_matches('/');
        let archive = rawzip::ZipArchive::from_slice(self.buf.as_slice())
            .map_err(|e| self.corrupt(format!("invalid zip archive: {:?}", e)))?;

        for entry in archive.entries() {
            let entry = entry.map_err(|e| self.corrupt(format!("zip entry error: {:?}", e)))?;
            if entry.is_dir() {
                continue;
            }
            let filename = entry
                .file_path()
                .try_normalize()
                .map_err(|e| self.corrupt(format!("failed to normalize zip path: {:?}", e)))?
                .as_ref()
                .to_string();
            if filename != wanted {
                continue;
            }

            let wayfinder = entry.wayfinder();
            let slice_entry = archive
                .get_entry(wayfinder)
                .map_err(|e| self.corrupt(format!("failed to get entry data: {:?}", e)))?;
            let data = slice_entry.data();

            let mut out = Vec::new();
            match entry.compression_method() {
                rawzip::CompressionMethod::Store => out.extend_from_slice(data),
                rawzip::CompressionMethod::Deflate => {
                    flate2::read::DeflateDecoder::new(data)
                        .read_to_end(&mut out)
                        .map_err(|e| self.corrupt(format!("inflate {}: {}", filename, e)))?;
                }
                method => {
                    return Err(self.corrupt(format!("unsupported compression method: {:?}", method)));
                }
            }
            return Ok(Some(out));
        }

        Ok(None)
    }

    /// Extract one entry to `dest`, returning whether it existed
    pub fn extract(&self, name: &str, dest: &Path) -> Result<bool, AddonError> {
        let Some(data) = self.read(name)? else {
            return Ok(false);
        };
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, data)?;
        Ok(true)
    }

    fn corrupt(&self, detail: String) -> AddonError {
        AddonError::MetadataInvalid(format!("{}: {}", self.path.display(), detail))
    }
}

struct PendingEntry {
    name: String,
    data: Vec<u8>,
}

/// Builds addon packages
pub struct PackageWriter {
    entries: Vec<PendingEntry>,
    compress: bool,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            compress: true,
        }
    }

    /// Store entries uncompressed
    pub fn stored(mut self) -> Self {
        self.compress = false;
        self
    }

    pub fn add_file(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.entries.push(PendingEntry {
            name: name.into(),
            data: data.into(),
        });
        self
    }

    /// Add every file below `root`, named relative to it
    pub fn add_dir(&mut self, root: &Path) -> Result<&mut Self, AddonError> {
        let mut files = Vec::new();
        collect_files(root, &mut files)?;
        files.sort();
        for file in files {
            let relative = file
                .strip_prefix(root)
                .map_err(|e| AddonError::Internal(e.to_string()))?;
            let name = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => part.to_str(),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/");
            let data = std::fs::read(&file)?;
            self.add_file(name, data);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AddonError> {
        let mut archive = ZipArchiveWriter::new(Vec::new());
        let method = if self.compress {
            CompressionMethod::Deflate
        } else {
            CompressionMethod::Store
        };

        for entry in &self.entries {
            let mut file = archive
                .new_file(&entry.name)
                .compression_method(method)
                .create()
                .map_err(|e| write_error(&entry.name, e))?;

            let descriptor = if self.compress {
                let encoder = DeflateEncoder::new(&mut file, Compression::default());
                let mut writer = ZipDataWriter::new(encoder);
                writer.write_all(&entry.data)?;
                let (encoder, descriptor) = writer.finish().map_err(|e| write_error(&entry.name, e))?;
                encoder.finish()?;
                descriptor
            } else {
                let mut writer = ZipDataWriter::new(&mut file);
                writer.write_all(&entry.data)?;
                let (_, descriptor) = writer.finish().map_err(|e| write_error(&entry.name, e))?;
                descriptor
            };
            file.finish(descriptor).map_err(|e| write_error(&entry.name, e))?;
        }

        archive
            .finish()
            .map_err(|e| AddonError::Internal(format!("failed to finish package: {}", e)))
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), AddonError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), AddonError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn write_error(name: &str, e: rawzip::Error) -> AddonError {
    AddonError::Internal(format!("failed to write package entry {}: {}", name, e))
}

//! Shared helpers for integration tests: fixture archives, stub scripts and
//! environment guards.
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

pub fn kilnbox_binary() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("kilnbox")
}

/// RAII guard to set/restore environment variables in tests
pub struct EnvGuard {
    key: String,
    old_value: Option<String>,
}

impl EnvGuard {
    pub fn set(key: &str, value: &str) -> Self {
        let old_value = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self {
            key: key.to_string(),
            old_value,
        }
    }

    pub fn unset(key: &str) -> Self {
        let old_value = std::env::var(key).ok();
        std::env::remove_var(key);
        Self {
            key: key.to_string(),
            old_value,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.old_value {
            Some(v) => std::env::set_var(&self.key, v),
            None => std::env::remove_var(&self.key),
        }
    }
}

/// A zip archive holding the given text entries.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A zip tool distribution: everything nested under `top`, with an
/// executable launcher at `top/<launcher>`.
pub fn zip_dist(top: &str, launcher: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            format!("{top}/{launcher}"),
            SimpleFileOptions::default().unix_permissions(0o755),
        )
        .unwrap();
    writer.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
    writer
        .start_file(
            format!("{top}/lib/runtime.jar"),
            SimpleFileOptions::default(),
        )
        .unwrap();
    writer.write_all(b"jar").unwrap();
    writer.finish().unwrap().into_inner()
}

/// A tar.gz tool distribution with the same layout as [`zip_dist`].
pub fn tar_gz_dist(top: &str, launcher: &str) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    append_tar_entry(
        &mut builder,
        &format!("{top}/{launcher}"),
        b"#!/bin/sh\nexit 0\n",
        0o755,
    );
    append_tar_entry(
        &mut builder,
        &format!("{top}/conf/settings.xml"),
        b"<settings/>",
        0o644,
    );
    builder.into_inner().unwrap().finish().unwrap()
}

fn append_tar_entry(
    builder: &mut tar::Builder<GzEncoder<Vec<u8>>>,
    name: &str,
    body: &[u8],
    mode: u32,
) {
    let mut header = tar::Header::new_gnu();
    header.set_size(body.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder.append_data(&mut header, name, body).unwrap();
}

/// Writes an executable shell script.
#[cfg(unix)]
pub fn write_script(path: &std::path::Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

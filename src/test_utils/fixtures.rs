//! Test fixtures: tag API payloads, tool bundle archives and runner directories.

use super::transport::{ScriptedResponse, ScriptedTransport};
use anyhow::Result;
use serde_json::{Value, json};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builds tag API payloads rooted at a fake API URL.
#[derive(Clone, Debug)]
pub struct GitHubFixture {
    api: String,
}

impl GitHubFixture {
    /// Fixtures for the API rooted at `api`.
    pub fn new(api: &str) -> Self {
        Self {
            api: api.trim_end_matches('/').to_string(),
        }
    }

    /// Deterministic commit id for a version.
    pub fn commit_sha(version: &str) -> String {
        format!("c0ffee{}", version.replace('.', ""))
    }

    /// Deterministic annotated tag object id for a version.
    pub fn tag_sha(version: &str) -> String {
        format!("7a9{}", version.replace('.', ""))
    }

    /// URL of the commit object for `version`.
    pub fn commit_url(&self, version: &str) -> String {
        format!("{}/commits/{}", self.api, Self::commit_sha(version))
    }

    /// URL of the single tag reference for `version`.
    pub fn tag_ref_url(&self, version: &str) -> String {
        format!("{}/ref/tags/version-{version}", self.api)
    }

    /// A lightweight tag reference pointing at the version's commit.
    pub fn tag_ref(&self, version: &str) -> Value {
        json!({
            "ref": format!("refs/tags/version-{version}"),
            "node_id": "REF_kwDOAAAAAA",
            "url": format!("{}/refs/tags/version-{version}", self.api),
            "object": {
                "sha": Self::commit_sha(version),
                "type": "commit",
                "url": self.commit_url(version),
            }
        })
    }

    /// A commit object with the given committer timestamp.
    pub fn commit(&self, version: &str, date: &str) -> Value {
        json!({
            "sha": Self::commit_sha(version),
            "url": self.commit_url(version),
            "author": { "name": "D. Richard Hipp", "email": "drh@hwaci.com", "date": date },
            "committer": { "name": "D. Richard Hipp", "email": "drh@hwaci.com", "date": date },
            "message": format!("Version {version}"),
        })
    }

    /// A tag listing as returned by `matching-refs`.
    pub fn tag_listing(&self, versions: &[&str]) -> Value {
        Value::Array(versions.iter().map(|v| self.tag_ref(v)).collect())
    }

    /// Queue the tag reference and commit for `version`.
    pub fn script_release(&self, transport: &ScriptedTransport, version: &str, date: &str) {
        transport.push(&self.tag_ref_url(version), ScriptedResponse::json(&self.tag_ref(version)));
        self.script_commit(transport, version, date);
    }

    /// Queue only the commit for `version`.
    pub fn script_commit(&self, transport: &ScriptedTransport, version: &str, date: &str) {
        transport.push(&self.commit_url(version), ScriptedResponse::json(&self.commit(version, date)));
    }

    /// Queue an annotated tag chain: reference, tag object, commit.
    pub fn script_annotated_release(&self, transport: &ScriptedTransport, version: &str, date: &str) {
        let tag_url = format!("{}/tags/{}", self.api, Self::tag_sha(version));
        let reference = json!({
            "ref": format!("refs/tags/version-{version}"),
            "object": { "sha": Self::tag_sha(version), "type": "tag", "url": tag_url },
        });
        let tag = json!({
            "sha": Self::tag_sha(version),
            "tag": format!("version-{version}"),
            "object": { "sha": Self::commit_sha(version), "type": "commit", "url": self.commit_url(version) },
        });
        transport.push(&self.tag_ref_url(version), ScriptedResponse::json(&reference));
        transport.push(&tag_url, ScriptedResponse::json(&tag));
        self.script_commit(transport, version, date);
    }
}

/// Contents of the executables placed in fixture bundles.
pub const FIXTURE_BINARIES: [&str; 3] = ["sqlite3", "sqldiff", "sqlite3_analyzer"];

/// Builds tool bundle archives in memory.
pub struct ArchiveFixture;

impl ArchiveFixture {
    /// A zip with the binaries inside a single top-level directory `dir`.
    pub fn nested_zip(dir: &str) -> Result<Vec<u8>> {
        Self::zip(Some(dir))
    }

    /// A zip with the binaries at the archive root.
    pub fn flat_zip() -> Result<Vec<u8>> {
        Self::zip(None)
    }

    fn zip(dir: Option<&str>) -> Result<Vec<u8>> {
        use zip::write::SimpleFileOptions;

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().unix_permissions(0o755);
        if let Some(dir) = dir {
            writer.add_directory(format!("{dir}/"), options)?;
        }
        for name in FIXTURE_BINARIES {
            let path = match dir {
                Some(dir) => format!("{dir}/{name}"),
                None => name.to_string(),
            };
            writer.start_file(path, options)?;
            writer.write_all(format!("#!/bin/sh\necho {name}\n").as_bytes())?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// A tar+xz stream with the binaries under `dir/bin/`.
    pub fn tar_xz(dir: &str) -> Result<Vec<u8>> {
        let encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        let mut builder = tar::Builder::new(encoder);
        for name in FIXTURE_BINARIES {
            let data = format!("#!/bin/sh\necho {name}\n");
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, format!("{dir}/bin/{name}"), data.as_bytes())?;
        }
        Ok(builder.into_inner()?.finish()?)
    }

    /// A tar+xz stream holding exactly `members`, in order.
    pub fn tar_xz_with(members: &[TarMember<'_>]) -> Result<Vec<u8>> {
        let encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        let mut builder = tar::Builder::new(encoder);
        for member in members {
            let mut header = tar::Header::new_gnu();
            match *member {
                TarMember::File(path, data) => {
                    header.set_size(data.len() as u64);
                    header.set_mode(0o755);
                    header.set_cksum();
                    builder.append_data(&mut header, path, data)?;
                }
                TarMember::Symlink(path, target) => {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    header.set_mode(0o777);
                    builder.append_link(&mut header, path, target)?;
                }
                TarMember::HardLink(path, target) => {
                    header.set_entry_type(tar::EntryType::Link);
                    header.set_size(0);
                    header.set_mode(0o755);
                    builder.append_link(&mut header, path, target)?;
                }
            }
        }
        Ok(builder.into_inner()?.finish()?)
    }
}

/// One member of a hand-built tar stream.
#[derive(Debug, Clone, Copy)]
pub enum TarMember<'a> {
    /// Regular file at a path with the given contents
    File(&'a str, &'a [u8]),
    /// Symbolic link at a path pointing at a target
    Symlink(&'a str, &'a str),
    /// Hard link at a path to an earlier member
    HardLink(&'a str, &'a str),
}

/// Tool cache and temp roots inside one temporary directory.
pub struct RunnerDirs {
    _root: TempDir,
    /// Tool cache root (`RUNNER_TOOL_CACHE`)
    pub tool_cache: PathBuf,
    /// Temp root (`RUNNER_TEMP`)
    pub temp: PathBuf,
    /// Path file (`GITHUB_PATH`)
    pub path_file: PathBuf,
    /// Output file (`GITHUB_OUTPUT`)
    pub output_file: PathBuf,
}

impl RunnerDirs {
    /// Create fresh, empty runner directories.
    pub fn new() -> Result<Self> {
        let root = TempDir::new()?;
        let tool_cache = root.path().join("tool-cache");
        let temp = root.path().join("temp");
        std::fs::create_dir_all(&tool_cache)?;
        std::fs::create_dir_all(&temp)?;
        Ok(Self {
            path_file: root.path().join("github_path"),
            output_file: root.path().join("github_output"),
            tool_cache,
            temp,
            _root: root,
        })
    }

    /// Number of entries left under the temp root.
    pub fn temp_entries(&self) -> Result<usize> {
        count_entries(&self.temp)
    }
}

fn count_entries(dir: &Path) -> Result<usize> {
    Ok(std::fs::read_dir(dir)?.count())
}

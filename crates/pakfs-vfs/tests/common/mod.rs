//! Shared helpers for search path integration tests

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::path::{Path, PathBuf};

use pakfs_vfs::{PlatformDirs, VfsResult};

/// Route test logs through the test harness once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn put_u32(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&u32::try_from(value).unwrap().to_le_bytes());
}

fn put_name(out: &mut Vec<u8>, name: &str, width: usize, pad: u8) {
    let mut field = vec![pad; width];
    field[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&field);
}

/// GRP archive with entries in order.
pub fn grp(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"KenSilverman".to_vec();
    put_u32(&mut out, entries.len());
    for (name, data) in entries {
        put_name(&mut out, name, 12, b' ');
        put_u32(&mut out, data.len());
    }
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// MVL archive with entries in order.
pub fn mvl(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"DMVL".to_vec();
    put_u32(&mut out, entries.len());
    for (name, data) in entries {
        put_name(&mut out, name, 13, 0);
        put_u32(&mut out, data.len());
    }
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// SLB archive, TOC after the data. Names use `\` separators.
pub fn slb(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let data: Vec<u8> = entries.iter().flat_map(|(_, d)| d.iter().copied()).collect();
    let mut out = Vec::new();
    put_u32(&mut out, 0);
    put_u32(&mut out, entries.len());
    put_u32(&mut out, 12 + data.len());
    out.extend_from_slice(&data);
    let mut offset = 12;
    for (name, bytes) in entries {
        out.push(b'\\');
        put_name(&mut out, name, 63, 0);
        put_u32(&mut out, offset);
        put_u32(&mut out, bytes.len());
        offset += bytes.len();
    }
    out
}

/// PWAD with lumps before the directory.
pub fn wad(lumps: &[(&str, &[u8])]) -> Vec<u8> {
    let data: Vec<u8> = lumps.iter().flat_map(|(_, d)| d.iter().copied()).collect();
    let mut out = b"PWAD".to_vec();
    put_u32(&mut out, lumps.len());
    put_u32(&mut out, 12 + data.len());
    out.extend_from_slice(&data);
    let mut offset = 12;
    for (name, bytes) in lumps {
        put_u32(&mut out, offset);
        put_u32(&mut out, bytes.len());
        put_name(&mut out, name, 8, 0);
        offset += bytes.len();
    }
    out
}

/// Fixed platform directories under a temporary root.
pub struct TestDirs {
    pub base: PathBuf,
    pub pref_root: PathBuf,
}

impl TestDirs {
    pub fn new(root: &Path) -> Self {
        let base = root.join("base");
        let pref_root = root.join("pref");
        std::fs::create_dir_all(&base).unwrap();
        Self { base, pref_root }
    }
}

impl PlatformDirs for TestDirs {
    fn base_dir(&self) -> VfsResult<PathBuf> {
        Ok(self.base.clone())
    }

    fn pref_dir(&self, organization: &str, app: &str) -> VfsResult<PathBuf> {
        let dir = self.pref_root.join(organization).join(app);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

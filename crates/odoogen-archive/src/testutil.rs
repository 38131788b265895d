//! Tar-gzip fixtures shared by the unit tests.

use std::path::{Path, PathBuf};

/// Writes `name` into `dir` as a gzip-compressed tar holding `entries`.
///
/// A `None` payload produces a directory entry.
pub fn write_tar_gz(dir: &Path, name: &str, entries: &[(&str, Option<&[u8]>)]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).expect("failed to create tar.gz");
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (entry_name, payload) in entries {
        let mut header = tar::Header::new_gnu();
        match payload {
            Some(data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, entry_name, *data)
                    .expect("failed to append file");
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                header.set_cksum();
                builder
                    .append_data(&mut header, entry_name, std::io::empty())
                    .expect("failed to append directory");
            }
        }
    }

    let encoder = builder.into_inner().expect("failed to finish tar");
    let _ = encoder.finish().expect("failed to finish gzip");
    path
}

/// Returns the bytes of a small enterprise-like archive wrapped in a single
/// `enterprise/` root directory.
pub fn enterprise_archive_bytes() -> Vec<u8> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_tar_gz(
        dir.path(),
        "enterprise.tar.gz",
        &[
            ("enterprise/", None),
            ("enterprise/odoo/", None),
            ("enterprise/odoo/addons/", None),
            ("enterprise/odoo/addons/web_studio/", None),
            (
                "enterprise/odoo/addons/web_studio/__manifest__.py",
                Some(b"{'name': 'Studio'}"),
            ),
        ],
    );
    std::fs::read(path).expect("read archive")
}

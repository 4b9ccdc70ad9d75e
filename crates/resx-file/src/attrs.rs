//! POSIX stat fields as attribute terms.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;

use resx::term::Term;

pub(crate) fn stat_terms(meta: &Metadata, name: &str) -> BTreeMap<String, Term> {
    let mut out = BTreeMap::new();
    out.insert("size".to_string(), Term::Int(meta.size() as i64));
    out.insert("access".to_string(), Term::Int(meta.atime()));
    out.insert("modification".to_string(), Term::Int(meta.mtime()));
    out.insert("ctime".to_string(), Term::Int(meta.ctime()));
    out.insert("mode".to_string(), Term::Int(meta.mode() as i64));
    out.insert("links".to_string(), Term::Int(meta.nlink() as i64));
    out.insert("uid".to_string(), Term::Int(meta.uid() as i64));
    out.insert("gid".to_string(), Term::Int(meta.gid() as i64));
    out.insert("device".to_string(), Term::Int(meta.dev() as i64));
    out.insert("inode".to_string(), Term::Int(meta.ino() as i64));
    out.insert("type".to_string(), Term::Text(kind_of(meta).to_string()));
    out.insert("name".to_string(), Term::Text(name.to_string()));
    out
}

fn kind_of(meta: &Metadata) -> &'static str {
    let ft = meta.file_type();
    if ft.is_file() {
        "regular"
    } else if ft.is_dir() {
        "directory"
    } else if ft.is_symlink() {
        "symlink"
    } else {
        "other"
    }
}

//! MIME derivation from filenames.
//!
//! The basename is split on `.` with leading dots ignored. No suffix
//! means `application/octet-stream`; multiple suffixes produce a list of
//! types, outermost first (`file.jpg.txt` is a `text/plain` rendering of
//! an `image/jpeg`).

use mime::Mime;

/// Derive the content-type list for a file name.
pub fn derive(name: &str) -> Vec<Mime> {
    let trimmed = name.trim_start_matches('.');
    let mut parts = trimmed.split('.');
    // Drop the stem; everything after it is a suffix.
    parts.next();
    let mut kinds: Vec<Mime> = parts
        .filter(|suffix| !suffix.is_empty())
        .map(lookup)
        .collect();
    if kinds.is_empty() {
        return vec![mime::APPLICATION_OCTET_STREAM];
    }
    kinds.reverse();
    kinds
}

fn lookup(suffix: &str) -> Mime {
    mime_guess::from_ext(suffix)
        .first()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_suffix_is_octet_stream() {
        assert_eq!(derive("README"), vec![mime::APPLICATION_OCTET_STREAM]);
        assert_eq!(derive(".bashrc"), vec![mime::APPLICATION_OCTET_STREAM]);
    }

    #[test]
    fn single_suffix() {
        assert_eq!(derive("notes.txt"), vec![mime::TEXT_PLAIN]);
        assert_eq!(derive("photo.png"), vec![mime::IMAGE_PNG]);
    }

    #[test]
    fn multiple_suffixes_outermost_first() {
        let kinds = derive("file.jpg.txt");
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0], mime::TEXT_PLAIN);
        assert_eq!(kinds[1], mime::IMAGE_JPEG);
    }

    #[test]
    fn unknown_suffix_falls_back() {
        assert_eq!(
            derive("blob.weirdext"),
            vec![mime::APPLICATION_OCTET_STREAM]
        );
    }
}

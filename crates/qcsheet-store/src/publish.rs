use sha1::{Digest, Sha1};

/// Content hash the remote file host reports for a stored file: the git blob id,
/// `sha1("blob <len>\0" ++ bytes)`.
pub fn git_blob_sha1(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Whether a register file needs to be pushed to the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDecision {
    /// The remote has no file at this path.
    FirstUpload,
    /// The remote already holds byte-identical content.
    Unchanged,
    /// The remote holds different content; the update must reference `previous_sha`.
    Update { previous_sha: String },
}

impl UploadDecision {
    /// `remote_sha` is the blob id the host reports for the path, or `None` when the path does
    /// not exist (or could not be looked up, which the host treats the same way).
    pub fn decide(remote_sha: Option<&str>, local: &[u8]) -> Self {
        let Some(remote_sha) = remote_sha.map(str::trim).filter(|s| !s.is_empty()) else {
            return UploadDecision::FirstUpload;
        };
        if remote_sha.eq_ignore_ascii_case(&git_blob_sha1(local)) {
            UploadDecision::Unchanged
        } else {
            UploadDecision::Update {
                previous_sha: remote_sha.to_string(),
            }
        }
    }

    pub fn needs_upload(&self) -> bool {
        !matches!(self, UploadDecision::Unchanged)
    }

    /// Per-file status shown next to each upload slot.
    pub fn status_label(&self) -> &'static str {
        match self {
            UploadDecision::FirstUpload => "第一次上传",
            UploadDecision::Unchanged => "无需更新",
            UploadDecision::Update { .. } => "已经更新",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_sha_matches_git() {
        // `printf 'hello\n' | git hash-object --stdin`
        assert_eq!(
            git_blob_sha1(b"hello\n"),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
        // The empty blob.
        assert_eq!(
            git_blob_sha1(b""),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn decides_from_remote_hash() {
        let bytes = b"hello\n";

        assert_eq!(UploadDecision::decide(None, bytes), UploadDecision::FirstUpload);
        assert_eq!(UploadDecision::decide(Some("  "), bytes), UploadDecision::FirstUpload);

        let same = UploadDecision::decide(Some("CE013625030BA8DBA906F756967F9E9CA394464A"), bytes);
        assert_eq!(same, UploadDecision::Unchanged);
        assert!(!same.needs_upload());
        assert_eq!(same.status_label(), "无需更新");

        let changed = UploadDecision::decide(Some("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"), bytes);
        assert_eq!(
            changed,
            UploadDecision::Update {
                previous_sha: "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391".to_string()
            }
        );
        assert!(changed.needs_upload());
    }
}

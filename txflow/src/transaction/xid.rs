use crate::common::{MAX_BQUAL_SIZE, MAX_GTRID_SIZE, TXFLOW_FORMAT_ID};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicI64, Ordering};

/// Global transaction identifier.
///
/// Two handles denote the same transaction exactly when their xids are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    pub fn new(format_id: i32, global_id: Vec<u8>, branch_qualifier: Vec<u8>) -> Self {
        Xid {
            format_id,
            global_id,
            branch_qualifier,
        }
    }

    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    pub fn global_id(&self) -> &[u8] {
        &self.global_id
    }

    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }
}

impl Display for Xid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x}:", self.format_id)?;
        for byte in self.global_id.iter().take(8) {
            write!(f, "{:02x}", byte)?;
        }
        if !self.branch_qualifier.is_empty() {
            write!(f, ":")?;
            for byte in self.branch_qualifier.iter().take(4) {
                write!(f, "{:02x}", byte)?;
            }
        }
        Ok(())
    }
}

/// Mints xids for one transaction manager instance.
///
/// Global ids are `MAX_GTRID_SIZE` bytes: a little-endian sequence number in
/// bytes 0..8 followed by the manager id. The sequence starts at the
/// factory's creation time in milliseconds, so ids minted by an earlier
/// factory with the same manager id compare below `start` and can be
/// recognised as recoverable.
pub struct XidFactory {
    base_id: [u8; MAX_GTRID_SIZE],
    start: i64,
    count: AtomicI64,
}

impl XidFactory {
    pub fn new(tm_id: &[u8]) -> Self {
        let start = chrono::Utc::now().timestamp_millis();
        let mut base_id = [0u8; MAX_GTRID_SIZE];
        let len = tm_id.len().min(MAX_GTRID_SIZE - 8);
        base_id[8..8 + len].copy_from_slice(&tm_id[..len]);

        XidFactory {
            base_id,
            start,
            count: AtomicI64::new(start),
        }
    }

    /// Timestamp (ms) this factory started counting from.
    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn create_xid(&self) -> Xid {
        let id = self.count.fetch_add(1, Ordering::SeqCst);
        let mut global_id = self.base_id;
        insert_long(id, &mut global_id, 0);
        Xid::new(TXFLOW_FORMAT_ID, global_id.to_vec(), Vec::new())
    }

    /// Derives a branch of `global` numbered `branch`.
    ///
    /// The branch qualifier holds the branch number in bytes 0..4, the
    /// factory start in bytes 4..12 and the manager id from byte 12 on.
    pub fn create_branch(&self, global: &Xid, branch: u32) -> Xid {
        let mut branch_id = self.base_id;
        branch_id[..4].copy_from_slice(&branch.to_le_bytes());
        insert_long(self.start, &mut branch_id, 4);
        Xid::new(
            TXFLOW_FORMAT_ID,
            global.global_id().to_vec(),
            branch_id.to_vec(),
        )
    }

    /// True if `global_id` was minted by an earlier factory with the same
    /// manager id.
    pub fn matches_global_id(&self, global_id: &[u8]) -> bool {
        if global_id.len() != MAX_GTRID_SIZE {
            return false;
        }
        global_id[8..] == self.base_id[8..] && extract_long(global_id, 0) < self.start
    }

    /// True if `branch_id` was minted by an earlier factory with the same
    /// manager id.
    pub fn matches_branch_id(&self, branch_id: &[u8]) -> bool {
        if branch_id.len() != MAX_BQUAL_SIZE {
            return false;
        }
        if extract_long(branch_id, 4) >= self.start {
            return false;
        }
        branch_id[12..] == self.base_id[12..]
    }

    /// Rebuilds an xid read back from a log or a resource manager.
    pub fn recover(&self, format_id: i32, global_id: &[u8], branch_id: &[u8]) -> Xid {
        Xid::new(format_id, global_id.to_vec(), branch_id.to_vec())
    }
}

fn insert_long(value: i64, bytes: &mut [u8], offset: usize) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn extract_long(bytes: &[u8], offset: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_le_bytes(buf)
}

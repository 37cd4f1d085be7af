//! Blob repository — content-addressable storage with SHA-256 dedup.
//!
//! Blobs store large or shared content separately from events. Content is
//! hashed with SHA-256 for deduplication: storing the same bytes twice
//! increments the reference count instead of creating a duplicate row, and
//! deletion is only possible once the count reaches zero.

use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};

use crate::errors::Result;
use crate::sqlite::row_types::BlobRow;

/// Blob repository — stateless, every method takes `&Connection`.
pub struct BlobRepo;

impl BlobRepo {
    /// Store content, deduplicating by SHA-256 hash.
    ///
    /// If identical content already exists, increments the reference count and
    /// returns the existing blob ID. Otherwise creates a new blob with
    /// `ref_count = 1`.
    pub fn store(conn: &Connection, content: &[u8]) -> Result<String> {
        let hash = hex_sha256(content);

        let existing: Option<String> = conn
            .query_row("SELECT id FROM blobs WHERE hash = ?1", params![hash], |row| row.get(0))
            .optional()?;

        if let Some(id) = existing {
            let _ = conn.execute(
                "UPDATE blobs SET ref_count = ref_count + 1 WHERE id = ?1",
                params![id],
            )?;
            return Ok(id);
        }

        let id = arbor_core::new_blob_id();
        let now = arbor_core::now_iso();
        let size = i64::try_from(content.len()).unwrap_or(i64::MAX);

        let _ = conn.execute(
            "INSERT INTO blobs (id, hash, content, size, ref_count, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![id, hash, content, size, now],
        )?;

        Ok(id)
    }

    /// Get blob content by ID.
    pub fn get_content(conn: &Connection, blob_id: &str) -> Result<Option<Vec<u8>>> {
        let content: Option<Vec<u8>> = conn
            .query_row("SELECT content FROM blobs WHERE id = ?1", params![blob_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(content)
    }

    /// Get blob metadata by ID (no content).
    pub fn get_by_id(conn: &Connection, blob_id: &str) -> Result<Option<BlobRow>> {
        let row = conn
            .query_row(
                "SELECT id, hash, size, ref_count, created_at FROM blobs WHERE id = ?1",
                params![blob_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Get reference count for a blob.
    pub fn get_ref_count(conn: &Connection, blob_id: &str) -> Result<Option<i64>> {
        let count: Option<i64> = conn
            .query_row("SELECT ref_count FROM blobs WHERE id = ?1", params![blob_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(count)
    }

    /// Decrement reference count (floor at 0). Returns the new count if the
    /// blob exists.
    pub fn decrement_ref_count(conn: &Connection, blob_id: &str) -> Result<Option<i64>> {
        let _ = conn.execute(
            "UPDATE blobs SET ref_count = ref_count - 1 WHERE id = ?1 AND ref_count > 0",
            params![blob_id],
        )?;
        Self::get_ref_count(conn, blob_id)
    }

    /// Delete all blobs with zero references. Returns count deleted.
    pub fn delete_unreferenced(conn: &Connection) -> Result<usize> {
        let changed = conn.execute("DELETE FROM blobs WHERE ref_count <= 0", [])?;
        Ok(changed)
    }

    /// Count total blobs.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM blobs", [], |row| row.get(0))?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlobRow> {
        Ok(BlobRow {
            id: row.get(0)?,
            hash: row.get(1)?,
            size: row.get(2)?,
            ref_count: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

use sqlx::Row;

use common::content::Uid;

use crate::database::Database;

/// uids are stored bit-for-bit in SQLite's signed 64-bit integers.
fn to_db(uid: Uid) -> i64 {
    uid.as_u64() as i64
}

fn from_db(file_id: i64) -> Uid {
    Uid::from(file_id as u64)
}

impl Database {
    /// Record that `identity` owns `uid`.
    ///
    /// Returns `false` when the pair was already recorded; the unique
    /// constraint on (identity, file_id) makes concurrent duplicates a no-op.
    pub async fn record_ownership(&self, identity: &str, uid: Uid) -> Result<bool, sqlx::Error> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO user_files (identity, file_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(identity, file_id) DO NOTHING
            "#,
        )
        .bind(identity)
        .bind(to_db(uid))
        .bind(now)
        .execute(&**self)
        .await?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            tracing::debug!(%identity, %uid, "ownership already recorded");
        }
        Ok(inserted)
    }

    /// Every uid recorded for `identity`, oldest first.
    pub async fn list_by_identity(&self, identity: &str) -> Result<Vec<Uid>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT file_id FROM user_files
            WHERE identity = ?
            ORDER BY id ASC
            "#,
        )
        .bind(identity)
        .fetch_all(&**self)
        .await?;

        Ok(rows
            .iter()
            .map(|row| from_db(row.get::<i64, _>("file_id")))
            .collect())
    }

    pub async fn is_owned_by(&self, identity: &str, uid: Uid) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_files WHERE identity = ? AND file_id = ?
            ) AS owned
            "#,
        )
        .bind(identity)
        .bind(to_db(uid))
        .fetch_one(&**self)
        .await?;

        Ok(row.get::<i64, _>("owned") != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_list() {
        let db = Database::in_memory().await.unwrap();

        let a = Uid::from(0x0123_4567_89ab_cdef);
        let b = Uid::from(0xffff_0000_ffff_0000);

        assert!(db.record_ownership("alice", a).await.unwrap());
        assert!(db.record_ownership("alice", b).await.unwrap());

        let owned = db.list_by_identity("alice").await.unwrap();
        assert_eq!(owned, vec![a, b]);
        assert!(db.list_by_identity("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let uid = Uid::from(42);

        assert!(db.record_ownership("alice", uid).await.unwrap());
        assert!(!db.record_ownership("alice", uid).await.unwrap());
        assert!(!db.record_ownership("alice", uid).await.unwrap());

        assert_eq!(db.list_by_identity("alice").await.unwrap(), vec![uid]);
    }

    #[tokio::test]
    async fn test_high_bit_uids_survive_storage() {
        let db = Database::in_memory().await.unwrap();
        let uid = Uid::from(u64::MAX);

        db.record_ownership("alice", uid).await.unwrap();
        assert_eq!(db.list_by_identity("alice").await.unwrap(), vec![uid]);
        assert!(db.is_owned_by("alice", uid).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_cross_identity_leakage() {
        let db = Database::in_memory().await.unwrap();
        let shared = Uid::from(7);
        let private = Uid::from(8);

        db.record_ownership("alice", shared).await.unwrap();
        db.record_ownership("alice", private).await.unwrap();
        db.record_ownership("bob", shared).await.unwrap();

        assert!(db.is_owned_by("alice", private).await.unwrap());
        assert!(db.is_owned_by("bob", shared).await.unwrap());
        assert!(!db.is_owned_by("bob", private).await.unwrap());
        assert!(!db.is_owned_by("carol", shared).await.unwrap());
        assert_eq!(db.list_by_identity("bob").await.unwrap(), vec![shared]);
    }
}

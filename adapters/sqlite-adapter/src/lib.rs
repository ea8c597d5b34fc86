//! sqlite-adapter - SQLite implementation of the VideoRepository port.
//!
//! Purpose
//! - Provide a lightweight, file-based repository so the collection survives
//!   restarts without any external database.
//! - Implements the `VideoRepository` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - `video_id` carries a `UNIQUE` constraint; violations surface as
//!   `CoreError::DuplicateVideo`.
//! - Name search and ordering go through a `fold_name` SQL function backed by
//!   `domain::fold_name`, so results match the in-memory repository exactly
//!   (SQLite's own `lower()` only folds ASCII).

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use domain::{
    fold_name, CoreError, ListOptions, Video, VideoDraft, VideoId, VideoKey, VideoRepository,
};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection};

const SELECT_COLUMNS: &str = "SELECT id, name, url, notes, video_id FROM videos";

/// SQLite-backed video repository.
pub struct SqliteRepo {
    conn: Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqerr)?;
        Self::from_connection(conn)
    }

    /// Like `new`, but first creates the parent directory if it is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| CoreError::Repository(format!("cannot create {}: {e}", dir.display())))?;
        }
        Self::new(path)
    }

    /// Construct from env var `DB_PATH` (defaults to `./data/videos.db`).
    pub fn from_env() -> Result<Self, CoreError> {
        let path = std::env::var("DB_PATH").unwrap_or_else(|_| "./data/videos.db".to_string());
        Self::open(path)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoreError> {
        register_functions(&conn)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

fn register_functions(conn: &Connection) -> Result<(), CoreError> {
    conn.create_scalar_function(
        "fold_name",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let name: String = ctx.get(0)?;
            Ok(fold_name(&name))
        },
    )
    .map_err(map_sqerr)
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            notes TEXT,
            video_id TEXT NOT NULL UNIQUE
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

/// Map a write error, turning UNIQUE violations into `DuplicateVideo`. Other
/// constraint failures stay repository errors.
fn map_write_err(e: rusqlite::Error, video_id: &VideoId) -> CoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return CoreError::DuplicateVideo(video_id.as_str().to_string());
        }
    }
    map_sqerr(e)
}

fn row_to_video(row: &rusqlite::Row) -> Result<Video, CoreError> {
    let id: i64 = row.get(0).map_err(map_sqerr)?;
    let name: String = row.get(1).map_err(map_sqerr)?;
    let url: String = row.get(2).map_err(map_sqerr)?;
    let notes: Option<String> = row.get(3).map_err(map_sqerr)?;
    let video_id: String = row.get(4).map_err(map_sqerr)?;

    let video_id = VideoId::new(video_id)
        .map_err(|e| CoreError::Repository(format!("bad video_id in db: {e}")))?;
    Ok(Video {
        id: VideoKey::new(id),
        name,
        url,
        notes,
        video_id,
    })
}

impl VideoRepository for SqliteRepo {
    fn insert(&self, draft: VideoDraft) -> Result<Video, CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO videos(name, url, notes, video_id) VALUES (?1, ?2, ?3, ?4)",
            params![draft.name, draft.url, draft.notes, draft.video_id.as_str()],
        )
        .map_err(|e| map_write_err(e, &draft.video_id))?;
        // Same connection, still under the lock
        let id = conn.last_insert_rowid();
        Ok(draft.into_video(VideoKey::new(id)))
    }

    fn update(&self, video: &Video) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE videos SET name = ?1, url = ?2, notes = ?3, video_id = ?4 WHERE id = ?5",
                params![
                    video.name,
                    video.url,
                    video.notes,
                    video.video_id.as_str(),
                    video.id.get()
                ],
            )
            .map_err(|e| map_write_err(e, &video.video_id))?;
        if changed == 0 {
            Err(CoreError::NotFound)
        } else {
            Ok(())
        }
    }

    fn get(&self, id: VideoKey) -> Result<Option<Video>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![id.get()]).map_err(map_sqerr)?;
        if let Some(row) = rows.next().map_err(map_sqerr)? {
            Ok(Some(row_to_video(row)?))
        } else {
            Ok(None)
        }
    }

    fn list(&self, options: &ListOptions) -> Result<Vec<Video>, CoreError> {
        let conn = self.lock()?;
        let mut out = Vec::new();
        match options.search.as_deref() {
            Some(term) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "{SELECT_COLUMNS} WHERE instr(fold_name(name), ?1) > 0 ORDER BY fold_name(name), id"
                    ))
                    .map_err(map_sqerr)?;
                let mut rows = stmt.query(params![fold_name(term)]).map_err(map_sqerr)?;
                while let Some(row) = rows.next().map_err(map_sqerr)? {
                    out.push(row_to_video(row)?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!("{SELECT_COLUMNS} ORDER BY fold_name(name), id"))
                    .map_err(map_sqerr)?;
                let mut rows = stmt.query([]).map_err(map_sqerr)?;
                while let Some(row) = rows.next().map_err(map_sqerr)? {
                    out.push(row_to_video(row)?);
                }
            }
        }
        Ok(out)
    }

    fn count(&self) -> Result<usize, CoreError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM videos", [], |r| r.get(0))
            .map_err(map_sqerr)?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::service::VideoService;
    use domain::NewVideo;
    use std::sync::Arc;

    fn tmp_db() -> (SqliteRepo, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let repo = SqliteRepo::new(path).unwrap();
        (repo, dir)
    }

    fn draft(name: &str, video_id: &str) -> VideoDraft {
        VideoDraft {
            name: name.to_string(),
            url: format!("https://www.youtube.com/watch?v={video_id}"),
            notes: Some("example".into()),
            video_id: VideoId::new(video_id).unwrap(),
        }
    }

    fn names(videos: &[Video]) -> Vec<&str> {
        videos.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn insert_get_roundtrip() {
        let (repo, _dir) = tmp_db();
        let video = repo.insert(draft("abc", "123")).unwrap();
        let got = repo.get(video.id).unwrap().unwrap();
        assert_eq!(got, video);
        assert_eq!(got.notes.as_deref(), Some("example"));
    }

    #[test]
    fn get_missing_is_none() {
        let (repo, _dir) = tmp_db();
        assert!(repo.get(VideoKey::new(1)).unwrap().is_none());
    }

    #[test]
    fn insert_duplicate_conflict() {
        let (repo, _dir) = tmp_db();
        repo.insert(draft("abc", "dup")).unwrap();
        let err = repo.insert(draft("other", "dup")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateVideo(ref id) if id == "dup"));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn update_works_and_conflicts() {
        let (repo, _dir) = tmp_db();
        repo.insert(draft("a", "one")).unwrap();
        let mut b = repo.insert(draft("b", "two")).unwrap();

        b.name = "b renamed".into();
        repo.update(&b).unwrap();
        assert_eq!(repo.get(b.id).unwrap().unwrap().name, "b renamed");

        b.video_id = VideoId::new("one").unwrap();
        assert!(matches!(repo.update(&b), Err(CoreError::DuplicateVideo(_))));
        assert_eq!(repo.get(b.id).unwrap().unwrap().video_id.as_str(), "two");
    }

    #[test]
    fn only_unique_violations_are_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT NOT NULL UNIQUE);")
            .unwrap();
        let video_id = VideoId::new("abc").unwrap();

        let not_null = conn.execute("INSERT INTO t(a) VALUES (NULL)", []).unwrap_err();
        assert!(matches!(map_write_err(not_null, &video_id), CoreError::Repository(_)));

        conn.execute("INSERT INTO t(a) VALUES ('x')", []).unwrap();
        let unique = conn.execute("INSERT INTO t(a) VALUES ('x')", []).unwrap_err();
        assert!(matches!(
            map_write_err(unique, &video_id),
            CoreError::DuplicateVideo(ref id) if id == "abc"
        ));
    }

    #[test]
    fn update_missing_is_not_found() {
        let (repo, _dir) = tmp_db();
        let ghost = draft("ghost", "boo").into_video(VideoKey::new(77));
        assert!(matches!(repo.update(&ghost), Err(CoreError::NotFound)));
    }

    #[test]
    fn list_orders_by_folded_name_then_insertion() {
        let (repo, _dir) = tmp_db();
        repo.insert(draft("lmn", "789")).unwrap();
        repo.insert(draft("abc", "123")).unwrap();
        repo.insert(draft("AAA", "456")).unwrap();
        repo.insert(draft("XYZ", "101112")).unwrap();
        repo.insert(draft("Abc", "999")).unwrap();
        let all = repo.list(&ListOptions::default()).unwrap();
        assert_eq!(names(&all), vec!["AAA", "abc", "Abc", "lmn", "XYZ"]);
    }

    #[test]
    fn search_is_case_insensitive_beyond_ascii() {
        let (repo, _dir) = tmp_db();
        repo.insert(draft("Super Mario RPG", "0r5PJx7rlds")).unwrap();
        repo.insert(draft("Zelda", "z1")).unwrap();
        repo.insert(draft("ÉCLAIR", "e1")).unwrap();

        let found = repo.list(&ListOptions::from_term(Some("mario"))).unwrap();
        assert_eq!(names(&found), vec!["Super Mario RPG"]);

        let found = repo.list(&ListOptions::from_term(Some("éclair"))).unwrap();
        assert_eq!(names(&found), vec!["ÉCLAIR"]);

        // LIKE wildcards are plain characters here
        assert!(repo.list(&ListOptions::from_term(Some("%"))).unwrap().is_empty());
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("videos.db");
        let repo = SqliteRepo::open(&path).unwrap();
        repo.insert(draft("abc", "123")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        {
            let repo = SqliteRepo::new(&path).unwrap();
            repo.insert(draft("keep me", "k1")).unwrap();
        }
        let repo = SqliteRepo::new(&path).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(repo.list(&ListOptions::default()).unwrap()[0].name, "keep me");
    }

    #[test]
    fn concurrent_saves_of_same_video_yield_one_row() {
        let svc = Arc::new(VideoService::new(SqliteRepo::in_memory().unwrap()));
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let svc = Arc::clone(&svc);
                std::thread::spawn(move || {
                    svc.save(NewVideo::new(
                        format!("attempt {i}"),
                        "https://www.youtube.com/watch?v=race",
                        None,
                    ))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(CoreError::DuplicateVideo(_)))));
        assert_eq!(svc.count().unwrap(), 1);
    }
}

//! Mapping override rules — validation, normalization, CRUD.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Database, DbError, mapping_key};

/// Which token field a mapping compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Uid,
    Text,
    Data,
}

/// Comparison discipline for the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Partial,
    Regex,
}

/// A persisted override rule rewriting a token's launch text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: String,
    /// Creation time, unix seconds.
    pub added: i64,
    pub label: String,
    pub enabled: bool,
    pub kind: MappingKind,
    pub match_kind: MatchKind,
    pub pattern: String,
    pub override_text: String,
}

/// Canonical UID form: trimmed, lowercased, colons stripped. Applied to
/// stored patterns and to scanned UIDs before comparison.
pub fn normalize_uid(uid: &str) -> String {
    uid.trim().to_lowercase().replace(':', "")
}

fn validate(m: &mut Mapping) -> Result<(), DbError> {
    if m.kind == MappingKind::Uid {
        m.pattern = normalize_uid(&m.pattern);
    }
    if m.pattern.is_empty() {
        return Err(DbError::InvalidMapping("missing pattern".into()));
    }
    if m.match_kind == MatchKind::Regex && regex::Regex::new(&m.pattern).is_err() {
        return Err(DbError::InvalidMapping(format!(
            "invalid regex pattern: {}",
            m.pattern
        )));
    }
    Ok(())
}

impl Database {
    /// Store a new mapping. The id and creation time are assigned here;
    /// any values on the input are ignored.
    pub fn add_mapping(&self, mut mapping: Mapping) -> Result<Mapping, DbError> {
        validate(&mut mapping)?;
        mapping.added = OffsetDateTime::now_utc().unix_timestamp();
        self.mutate_store(|store| {
            mapping.id = store.next_mapping_id().to_string();
            store
                .mappings_mut()
                .insert(mapping_key(&mapping.id), mapping.clone());
            Ok(mapping.clone())
        })
    }

    pub fn mapping(&self, id: &str) -> Result<Mapping, DbError> {
        self.with_store(|store| {
            store
                .mappings()
                .get(&mapping_key(id))
                .cloned()
                .ok_or_else(|| DbError::MappingNotFound(id.to_string()))
        })
    }

    /// Replace the mapping stored under `id`.
    pub fn update_mapping(&self, id: &str, mut mapping: Mapping) -> Result<(), DbError> {
        validate(&mut mapping)?;
        mapping.id = id.to_string();
        self.mutate_store(|store| {
            let key = mapping_key(id);
            if !store.mappings().contains_key(&key) {
                return Err(DbError::MappingNotFound(id.to_string()));
            }
            store.mappings_mut().insert(key, mapping);
            Ok(())
        })
    }

    /// Delete by id. Deleting an absent mapping is a no-op.
    pub fn delete_mapping(&self, id: &str) -> Result<(), DbError> {
        self.mutate_store(|store| {
            store.mappings_mut().remove(&mapping_key(id));
            Ok(())
        })
    }

    pub fn all_mappings(&self) -> Vec<Mapping> {
        self.with_store(|store| store.mappings().values().cloned().collect())
    }

    /// Enabled mappings in persistence (key) order; the resolver walks
    /// these first-match-wins.
    pub fn enabled_mappings(&self) -> Vec<Mapping> {
        self.with_store(|store| {
            store
                .mappings()
                .values()
                .filter(|m| m.enabled)
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(kind: MappingKind, match_kind: MatchKind, pattern: &str) -> Mapping {
        Mapping {
            id: String::new(),
            added: 0,
            label: "test".into(),
            enabled: true,
            kind,
            match_kind,
            pattern: pattern.into(),
            override_text: "**launch.system:snes".into(),
        }
    }

    fn temp_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("store.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn normalize_uid_equivalences() {
        assert_eq!(normalize_uid("04:AA:BB"), "04aabb");
        assert_eq!(normalize_uid(" 04AABB "), "04aabb");
        assert_eq!(normalize_uid("04aabb"), "04aabb");
    }

    #[test]
    fn add_assigns_sequential_ids_and_normalizes() {
        let (db, _dir) = temp_db();
        let a = db
            .add_mapping(mapping(MappingKind::Uid, MatchKind::Exact, " 04:AA:BB "))
            .unwrap();
        let b = db
            .add_mapping(mapping(MappingKind::Text, MatchKind::Exact, "snes/x"))
            .unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");
        assert_eq!(db.mapping("1").unwrap().pattern, "04aabb");
    }

    #[test]
    fn rejects_empty_pattern_and_bad_regex() {
        let (db, _dir) = temp_db();
        assert!(matches!(
            db.add_mapping(mapping(MappingKind::Uid, MatchKind::Exact, " : ")),
            Err(DbError::InvalidMapping(_))
        ));
        assert!(matches!(
            db.add_mapping(mapping(MappingKind::Text, MatchKind::Regex, "([unclosed")),
            Err(DbError::InvalidMapping(_))
        ));
    }

    #[test]
    fn update_and_delete() {
        let (db, _dir) = temp_db();
        let m = db
            .add_mapping(mapping(MappingKind::Text, MatchKind::Exact, "old"))
            .unwrap();

        let mut updated = m.clone();
        updated.pattern = "new".into();
        db.update_mapping(&m.id, updated).unwrap();
        assert_eq!(db.mapping(&m.id).unwrap().pattern, "new");

        db.delete_mapping(&m.id).unwrap();
        assert!(db.mapping(&m.id).is_err());
        // Absent delete is a no-op.
        db.delete_mapping(&m.id).unwrap();
    }

    #[test]
    fn update_missing_mapping_errors() {
        let (db, _dir) = temp_db();
        let result = db.update_mapping("9", mapping(MappingKind::Text, MatchKind::Exact, "x"));
        assert!(matches!(result, Err(DbError::MappingNotFound(_))));
    }

    #[test]
    fn enabled_mappings_filters_and_orders() {
        let (db, _dir) = temp_db();
        db.add_mapping(mapping(MappingKind::Text, MatchKind::Exact, "first"))
            .unwrap();
        let mut disabled = mapping(MappingKind::Text, MatchKind::Exact, "second");
        disabled.enabled = false;
        db.add_mapping(disabled).unwrap();
        db.add_mapping(mapping(MappingKind::Text, MatchKind::Exact, "third"))
            .unwrap();

        let enabled: Vec<String> = db
            .enabled_mappings()
            .into_iter()
            .map(|m| m.pattern)
            .collect();
        assert_eq!(enabled, vec!["first", "third"]);
    }
}

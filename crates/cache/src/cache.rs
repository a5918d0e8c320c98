use crate::error::{ErrorKind, Result};
use crate::models::{FolderKey, FolderRecord};
use std::collections::BTreeMap;

/// The complete, normalized folder cache.
///
/// An ordered mapping from [`FolderKey`] to [`FolderRecord`]. The cache is
/// append-only while it's being built: [`insert`](Self::insert) never
/// replaces an existing record, and refuses records whose parent isn't
/// already present, so the tree property (no orphans) holds at every step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderCache {
    records: BTreeMap<FolderKey, FolderRecord>,
}
impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cache from records in any order, validating every invariant.
    ///
    /// Used when loading the artifact: a parent may legitimately appear after
    /// its children in a hand-edited file, but duplicates, orphans, cycles and
    /// unsafe path segments are all rejected.
    pub fn from_records(records: impl IntoIterator<Item = FolderRecord>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for record in records {
            if let Some(segment) = record.invalid_segment() {
                exn::bail!(ErrorKind::InvalidData(format!("folder {} has unsafe path segment {segment:?}", record.key())));
            }
            let key = record.key();
            if map.insert(key, record).is_some() {
                exn::bail!(ErrorKind::InvalidData(format!("duplicate folder {key}")));
            }
        }
        let cache = Self { records: map };
        cache.validate()?;
        Ok(cache)
    }

    /// Insert a record, returning `false` if its key was already present (the
    /// existing record is kept untouched).
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidData`] if the record's parent isn't cached
    /// yet or its path contains unsafe segments.
    pub fn insert(&mut self, record: FolderRecord) -> Result<bool> {
        if let Some(segment) = record.invalid_segment() {
            exn::bail!(ErrorKind::InvalidData(format!("folder {} has unsafe path segment {segment:?}", record.key())));
        }
        if let Some(parent) = record.parent_key()
            && !self.records.contains_key(&parent)
        {
            exn::bail!(ErrorKind::InvalidData(format!("folder {} inserted before its parent", record.key())));
        }
        if self.records.contains_key(&record.key()) {
            return Ok(false);
        }
        self.records.insert(record.key(), record);
        Ok(true)
    }

    pub fn get(&self, user: u32, id: u64) -> Option<&FolderRecord> {
        self.records.get(&FolderKey { user, id })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate all records in key order (user, then folder id).
    pub fn iter(&self) -> impl Iterator<Item = &FolderRecord> {
        self.records.values()
    }

    /// Number of records cached for a single user.
    pub fn count_for(&self, user: u32) -> usize {
        self.records.range(FolderKey { user, id: 0 }..=FolderKey { user, id: u64::MAX }).count()
    }

    /// Iterate the records of a single user in folder id order.
    pub fn iter_for(&self, user: u32) -> impl Iterator<Item = &FolderRecord> {
        self.records.range(FolderKey { user, id: 0 }..=FolderKey { user, id: u64::MAX }).map(|(_, r)| r)
    }

    /// Copy `user`'s records from `prior` that this cache doesn't hold yet,
    /// shallowest first. Records whose parent can't be found are skipped, as
    /// is a prior root when the user already has folders here. Returns the
    /// number of records copied.
    pub fn carry_forward(&mut self, prior: &FolderCache, user: u32) -> usize {
        let has_root = self.count_for(user) > 0;
        let mut records: Vec<_> = prior.iter_for(user).filter(|r| !(has_root && r.is_root())).collect();
        records.sort_by_key(|r| r.path.len());
        let mut carried = 0;
        for record in records {
            if let Ok(true) = self.insert(record.clone()) {
                carried += 1;
            }
        }
        carried
    }

    /// Walk from a folder up to its user's root, returning the chain starting
    /// with the folder itself. Returns `None` if any link is missing.
    pub fn ancestors(&self, user: u32, id: u64) -> Option<Vec<&FolderRecord>> {
        let mut chain = Vec::new();
        let mut current = self.get(user, id)?;
        loop {
            chain.push(current);
            match current.parent_key() {
                None => return Some(chain),
                // A chain longer than the cache means there's a cycle.
                Some(_) if chain.len() > self.records.len() => return None,
                Some(parent) => current = self.records.get(&parent)?,
            }
        }
    }

    fn validate(&self) -> Result<()> {
        for record in self.records.values() {
            if let Some(parent) = record.parent_key()
                && !self.records.contains_key(&parent)
            {
                exn::bail!(ErrorKind::InvalidData(format!("folder {} has no parent {parent}", record.key())));
            }
            if self.ancestors(record.user, record.id).is_none() {
                exn::bail!(ErrorKind::InvalidData(format!("folder {} is part of a cycle", record.key())));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<String> {
        path.split('/').map(String::from).collect()
    }

    fn sample() -> FolderCache {
        let mut cache = FolderCache::new();
        cache.insert(FolderRecord::root(0, 1)).unwrap();
        cache.insert(FolderRecord::child(0, 2, 1, segments("Pictures"))).unwrap();
        cache.insert(FolderRecord::child(0, 3, 2, segments("Pictures/2021"))).unwrap();
        cache.insert(FolderRecord::root(1, 1)).unwrap();
        cache
    }

    #[test]
    fn test_same_id_different_users() {
        let cache = sample();
        assert!(cache.get(0, 1).is_some());
        assert!(cache.get(1, 1).is_some());
        assert_eq!(cache.count_for(0), 3);
        assert_eq!(cache.count_for(1), 1);
        assert_eq!(cache.count_for(2), 0);
        assert_eq!(cache.iter_for(0).map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_insert_keeps_first_record() {
        let mut cache = sample();
        let inserted = cache.insert(FolderRecord::child(0, 2, 1, segments("Renamed"))).unwrap();
        assert!(!inserted);
        assert_eq!(cache.get(0, 2).unwrap().path, segments("Pictures"));
    }

    #[test]
    fn test_insert_rejects_orphans() {
        let mut cache = FolderCache::new();
        let err = cache.insert(FolderRecord::child(0, 2, 1, segments("a"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(_)));
        // Parent of another user doesn't count.
        cache.insert(FolderRecord::root(1, 1)).unwrap();
        assert!(cache.insert(FolderRecord::child(0, 2, 1, segments("a"))).is_err());
    }

    #[test]
    fn test_insert_rejects_traversal() {
        let mut cache = sample();
        assert!(cache.insert(FolderRecord::child(0, 9, 1, segments("../../etc"))).is_err());
    }

    #[test]
    fn test_carry_forward_missing_user() {
        let prior = sample();
        let mut cache = FolderCache::new();
        cache.insert(FolderRecord::root(1, 1)).unwrap();
        assert_eq!(cache.carry_forward(&prior, 0), 3);
        assert_eq!(cache.get(0, 3).unwrap().path, segments("Pictures/2021"));
        // Nothing of user 1 is missing.
        assert_eq!(cache.carry_forward(&prior, 1), 0);
    }

    #[test]
    fn test_carry_forward_fills_gaps_only() {
        let prior = sample();
        let mut cache = FolderCache::new();
        cache.insert(FolderRecord::root(0, 1)).unwrap();
        cache.insert(FolderRecord::child(0, 2, 1, segments("Bilder"))).unwrap();
        assert_eq!(cache.carry_forward(&prior, 0), 1);
        // Fresh records win over prior ones.
        assert_eq!(cache.get(0, 2).unwrap().path, segments("Bilder"));
        assert!(cache.get(0, 3).is_some());
    }

    #[test]
    fn test_carry_forward_skips_orphans_and_stale_roots() {
        let prior = sample();
        let mut cache = FolderCache::new();
        // The user's root changed; nothing of the old tree hangs off it.
        cache.insert(FolderRecord::root(0, 9)).unwrap();
        assert_eq!(cache.carry_forward(&prior, 0), 0);
        assert_eq!(cache.count_for(0), 1);
    }

    #[test]
    fn test_ancestors() {
        let cache = sample();
        let chain: Vec<_> = cache.ancestors(0, 3).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(chain, vec![3, 2, 1]);
        assert!(cache.ancestors(0, 42).is_none());
    }

    #[test]
    fn test_from_records_any_order() {
        let records = vec![
            FolderRecord::child(0, 3, 2, segments("Pictures/2021")),
            FolderRecord::child(0, 2, 1, segments("Pictures")),
            FolderRecord::root(0, 1),
        ];
        let cache = FolderCache::from_records(records).unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_from_records_rejects_orphans_and_duplicates() {
        let orphan = vec![FolderRecord::root(0, 1), FolderRecord::child(0, 3, 2, segments("x"))];
        assert!(FolderCache::from_records(orphan).is_err());
        let duplicate = vec![FolderRecord::root(0, 1), FolderRecord::root(0, 1)];
        assert!(FolderCache::from_records(duplicate).is_err());
    }

    #[test]
    fn test_from_records_rejects_cycles() {
        let cycle = vec![FolderRecord::child(0, 1, 2, segments("a")), FolderRecord::child(0, 2, 1, segments("b"))];
        let err = FolderCache::from_records(cycle).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(msg) if msg.contains("cycle")));
    }
}

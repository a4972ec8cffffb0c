use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when trying to build a [`SimilarityGroup`] from fewer than two members.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("A similarity group needs at least two members, got {0}")]
pub struct TooFewEntries(pub usize);

/// A cluster of videos judged similar, directly or through a chain of similar videos.
///
/// Members are kept in the order the cluster was reported in, which is ascending video length.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct SimilarityGroup<K> {
    similarity_id: u32,
    members: Vec<K>,
}

impl<K> SimilarityGroup<K> {
    /// Create a group. A similarity group always holds at least two videos.
    /// # Errors
    /// Returns [`TooFewEntries`] when `members` has fewer than two entries.
    pub fn new(
        similarity_id: u32,
        members: impl IntoIterator<Item = K>,
    ) -> Result<Self, TooFewEntries> {
        let members = members.into_iter().collect::<Vec<_>>();
        if members.len() < 2 {
            return Err(TooFewEntries(members.len()));
        }

        Ok(Self {
            similarity_id,
            members,
        })
    }

    #[must_use]
    pub const fn similarity_id(&self) -> u32 {
        self.similarity_id
    }

    /// The number of videos in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> impl Iterator<Item = &K> {
        self.members.iter()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool
    where
        K: PartialEq,
    {
        self.members.contains(key)
    }

    /// Every unordered pair of members.
    pub fn pairs(&self) -> impl Iterator<Item = (&K, &K)> {
        self.members.iter().tuple_combinations()
    }

    #[must_use]
    pub fn into_members(self) -> Vec<K> {
        self.members
    }
}

#[cfg(test)]
mod test {
    use super::{SimilarityGroup, TooFewEntries};

    #[test]
    fn test_too_few() {
        assert_eq!(SimilarityGroup::new(1, ["a"]), Err(TooFewEntries(1)));
        assert_eq!(
            SimilarityGroup::<&str>::new(1, []),
            Err(TooFewEntries(0))
        );
    }

    #[test]
    fn test_pairs() {
        let group = SimilarityGroup::new(7, ["a", "b", "c"]).unwrap();
        assert_eq!(group.similarity_id(), 7);
        assert_eq!(group.len(), 3);
        assert!(group.contains(&"b"));
        assert_eq!(
            group.pairs().collect::<Vec<_>>(),
            vec![(&"a", &"b"), (&"a", &"c"), (&"b", &"c")]
        );
    }
}

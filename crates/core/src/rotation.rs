use std::collections::HashSet;

use rand::seq::SliceRandom;
use thiserror::Error;

use crate::catalog::{Bucket, ContentItem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RotationError {
    #[error("content catalog for bucket `{0}` has no items")]
    EmptyCatalog(Bucket),
}

/// Pick the next item to post for a bucket.
///
/// Items never posted before win, in catalog order, so the whole catalog is
/// covered exactly once before anything repeats. Once every item has been
/// posted the bucket "cycles": selection falls back to a uniformly random
/// item from the full catalog. Posted history is never reset, so the cycle
/// is soft - repeats are random rather than a second ordered pass.
pub fn pick_next<'a>(
    bucket: Bucket,
    items: &'a [ContentItem],
    posted: &HashSet<String>,
) -> Result<&'a ContentItem, RotationError> {
    if items.is_empty() {
        return Err(RotationError::EmptyCatalog(bucket));
    }

    if let Some(unposted) = items.iter().find(|item| !posted.contains(&item.id)) {
        return Ok(unposted);
    }

    let mut rng = rand::thread_rng();
    items.choose(&mut rng).ok_or(RotationError::EmptyCatalog(bucket))
}

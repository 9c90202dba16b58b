use std::fmt::{self, Debug, Display, Formatter};
use std::future::Future;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Error;

/// SHA-256 digest of a value's canonical JSON serialization.
///
/// Callers are responsible for canonical ordering: use `BTreeMap` for maps and sort lists
/// whose order carries no meaning before fingerprinting them.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint, Error> {
    let canonical = serde_json::to_vec(value)?;

    let mut digest = [0; 32];
    digest.copy_from_slice(&Sha256::digest(&canonical));

    Ok(Fingerprint(digest))
}

/// Holds the last observed value together with the fingerprint of the input it was built
/// from.
#[derive(Debug)]
pub struct FingerprintCache<T> {
    last: Option<(Fingerprint, T)>,
}

impl<T> Default for FingerprintCache<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T> FingerprintCache<T> {
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.last.as_ref().map(|(fingerprint, _)| *fingerprint)
    }

    /// Returns the cached value if `fingerprint` matches the stored one, otherwise awaits
    /// `refresh` and caches its output. A failed refresh keeps the previous entry.
    pub async fn get_or_refresh<F, Fut, E>(
        &mut self,
        fingerprint: Fingerprint,
        refresh: F,
    ) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = match self.last.take() {
            Some((last, value)) if last == fingerprint => {
                debug!(%fingerprint, "fingerprint unchanged, reuse cache");

                value
            }

            previous => match refresh().await {
                Err(err) => {
                    self.last = previous;

                    return Err(err);
                }

                Ok(value) => {
                    debug!(%fingerprint, "fingerprint changed, cache replaced");

                    value
                }
            },
        };

        Ok(&self.last.insert((fingerprint, value)).1)
    }

    /// Drops the cached entry so the next call refreshes whatever the fingerprint is.
    pub fn clear(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use futures_util::future;

    use super::*;

    #[test]
    fn same_content_same_fingerprint() {
        let a: BTreeMap<_, _> = [("b", 2), ("a", 1)].into_iter().collect();
        let b: BTreeMap<_, _> = [("a", 1), ("b", 2)].into_iter().collect();

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_ne!(
            fingerprint(&a).unwrap(),
            fingerprint(&vec![("a", 1)]).unwrap()
        );
        assert_eq!(fingerprint(&a).unwrap().to_string().len(), 64);
    }

    #[tokio::test]
    async fn reuse_on_hit_refresh_on_miss() {
        let mut cache = FingerprintCache::default();
        let first = fingerprint(&["i-1"]).unwrap();
        let second = fingerprint(&["i-1", "i-2"]).unwrap();

        let value = cache
            .get_or_refresh(first, || future::ok::<_, Error>(1))
            .await
            .unwrap();
        assert_eq!(*value, 1);

        let value = cache
            .get_or_refresh(first, || -> future::Ready<Result<i32, Error>> {
                panic!("cache hit must not refresh")
            })
            .await
            .unwrap();
        assert_eq!(*value, 1);

        let value = cache
            .get_or_refresh(second, || future::ok::<_, Error>(2))
            .await
            .unwrap();
        assert_eq!(*value, 2);
        assert_eq!(cache.fingerprint(), Some(second));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_entry() {
        let mut cache = FingerprintCache::default();
        let first = fingerprint(&1).unwrap();
        let second = fingerprint(&2).unwrap();

        cache
            .get_or_refresh(first, || future::ok::<_, Error>("one"))
            .await
            .unwrap();

        let result = cache
            .get_or_refresh(second, || {
                future::err::<&str, _>(Error::Rejected(anyhow::anyhow!("boom")))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.fingerprint(), Some(first));
    }

    #[tokio::test]
    async fn clear_forces_refresh() {
        let mut cache = FingerprintCache::default();
        let first = fingerprint(&["i-1"]).unwrap();

        cache
            .get_or_refresh(first, || future::ok::<_, Error>(1))
            .await
            .unwrap();
        cache.clear();
        assert_eq!(cache.fingerprint(), None);

        let value = cache
            .get_or_refresh(first, || future::ok::<_, Error>(2))
            .await
            .unwrap();
        assert_eq!(*value, 2);
    }
}

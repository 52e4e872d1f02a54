//! Enumeration Module
//!
//! One-shot iterators over a snapshot taken when the enumeration starts.
//! Writes made while an iterator is alive never show up in it, and iterating
//! never touches storage.

use std::iter::FusedIterator;
use std::vec;

use serde_json::Value;

use crate::cache::CacheEntry;

// == Keys ==
/// Live keys, newest write first.
#[derive(Debug)]
pub struct Keys {
    inner: vec::IntoIter<CacheEntry>,
}

impl Keys {
    pub(crate) fn new(snapshot: Vec<CacheEntry>) -> Self {
        Self {
            inner: snapshot.into_iter(),
        }
    }
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| entry.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys {}

impl FusedIterator for Keys {}

// == Values ==
/// Live values, newest write first.
#[derive(Debug)]
pub struct Values {
    inner: vec::IntoIter<CacheEntry>,
}

impl Values {
    pub(crate) fn new(snapshot: Vec<CacheEntry>) -> Self {
        Self {
            inner: snapshot.into_iter(),
        }
    }
}

impl Iterator for Values {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| entry.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Values {}

impl FusedIterator for Values {}

// == Entries ==
/// Live `(key, value)` pairs, newest write first.
#[derive(Debug)]
pub struct Entries {
    inner: vec::IntoIter<CacheEntry>,
}

impl Entries {
    pub(crate) fn new(snapshot: Vec<CacheEntry>) -> Self {
        Self {
            inner: snapshot.into_iter(),
        }
    }
}

impl Iterator for Entries {
    type Item = (String, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| (entry.key, entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Entries {}

impl FusedIterator for Entries {}

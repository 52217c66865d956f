use crate::types;
use std::{
    collections::{btree_map, BTreeMap},
    env,
    iter::FromIterator,
};

/// The session environment: string variables, seeded from the process environment and changed
/// only by assignment stages. Externals receive exactly this mapping as their environment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Variables(BTreeMap<types::Str, types::Str>);

impl Variables {
    /// A copy of the process environment. Entries that are not valid unicode are skipped.
    pub fn from_env() -> Self {
        env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> { self.0.get(name).map(String::as_str) }

    /// Set `name` to `value`, returning the previous value
    pub fn set<K: Into<types::Str>, V: Into<types::Str>>(
        &mut self,
        name: K,
        value: V,
    ) -> Option<types::Str> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<types::Str> { self.0.remove(name) }

    /// Every variable, in name order
    pub fn iter(&self) -> btree_map::Iter<'_, types::Str, types::Str> { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<K: Into<types::Str>, V: Into<types::Str>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Variables(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Variables {
    type IntoIter = btree_map::Iter<'a, types::Str, types::Str>;
    type Item = (&'a types::Str, &'a types::Str);

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

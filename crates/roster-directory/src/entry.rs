//! Directory entry model.
//!
//! # Purpose
//! Holds one entry's DN and its attribute values, already decoded to strings.
//!
//! # Key invariants
//! - Attribute names are stored lower-cased; every accessor lower-cases its
//!   argument, so `telegramId` and `telegramid` address the same values.
//! - Value order is preserved as returned by the directory.
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub dn: String,
    attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Build an entry from raw attribute pairs, merging names that differ only by case.
    pub fn from_attributes<I, K, V>(dn: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entry = Self::new(dn);
        for (name, values) in attributes {
            entry
                .attributes
                .entry(name.as_ref().to_ascii_lowercase())
                .or_default()
                .extend(values.into_iter().map(Into::into));
        }
        entry.attributes.retain(|_, values| !values.is_empty());
        entry
    }

    /// Builder-style setter used by seeds and tests.
    pub fn with<V: Into<String>>(
        mut self,
        attribute: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.set(attribute, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn values(&self, attribute: &str) -> &[String] {
        self.attributes
            .get(&attribute.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute).first().map(String::as_str)
    }

    pub fn has(&self, attribute: &str) -> bool {
        !self.values(attribute).is_empty()
    }

    /// Replace all values of an attribute; an empty list removes it.
    pub fn set(&mut self, attribute: &str, values: Vec<String>) {
        let key = attribute.to_ascii_lowercase();
        if values.is_empty() {
            self.attributes.remove(&key);
        } else {
            self.attributes.insert(key, values);
        }
    }

    pub fn remove(&mut self, attribute: &str) -> Option<Vec<String>> {
        self.attributes.remove(&attribute.to_ascii_lowercase())
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Copy of this entry restricted to the requested attributes.
    ///
    /// An empty request returns every attribute; the `1.1` marker returns none.
    pub fn project(&self, attributes: &[&str]) -> Entry {
        if attributes.is_empty() {
            return self.clone();
        }
        let wanted: Vec<String> = attributes
            .iter()
            .filter(|name| **name != "1.1")
            .map(|name| name.to_ascii_lowercase())
            .collect();
        Entry {
            dn: self.dn.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|(name, _)| wanted.contains(name))
                .map(|(name, values)| (name.clone(), values.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_names_are_case_insensitive() {
        let entry = Entry::from_attributes(
            "uid=alice,ou=People",
            vec![("telegramId", vec!["555"]), ("TELEGRAMID", vec!["556"])],
        );
        assert_eq!(entry.values("telegramid"), ["555", "556"]);
        assert_eq!(entry.first("TelegramId"), Some("555"));
        assert!(entry.has("telegramID"));
    }

    #[test]
    fn empty_values_are_dropped() {
        let entry = Entry::from_attributes("uid=a", vec![("cn", Vec::<String>::new())]);
        assert!(!entry.has("cn"));
        assert_eq!(entry.attribute_names().count(), 0);
    }

    #[test]
    fn projection_honours_all_and_none_markers() {
        let entry = Entry::new("uid=a").with("uid", ["a"]).with("cn", ["A"]);
        assert_eq!(entry.project(&[]), entry);
        assert_eq!(entry.project(&["1.1"]).attribute_names().count(), 0);
        let projected = entry.project(&["CN"]);
        assert_eq!(projected.first("cn"), Some("A"));
        assert!(!projected.has("uid"));
    }

    #[test]
    fn set_with_empty_values_removes() {
        let mut entry = Entry::new("uid=a").with("telegramNickname", ["alice"]);
        entry.set("telegramnickname", Vec::new());
        assert!(!entry.has("telegramNickname"));
    }
}

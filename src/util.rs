use std::collections::HashMap;

/// Prefix trie answering "does any registered word prefix this string?"
#[derive(Debug, Default, Clone)]
pub struct Trie {
    children: HashMap<u8, Trie>,
    word_tail: bool,
}

impl Trie {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Self::default();
        for word in words {
            trie.insert(word.as_ref());
        }
        trie
    }

    pub fn insert(&mut self, word: &str) {
        let mut node = self;
        for byte in word.bytes() {
            node = node.children.entry(byte).or_default();
        }
        node.word_tail = true;
    }

    /// True when some inserted word is a prefix of `s`
    pub fn has_prefix(&self, s: &str) -> bool {
        let mut node = self;
        if node.word_tail {
            return true;
        }
        for byte in s.bytes() {
            match node.children.get(&byte) {
                Some(child) => node = child,
                None => return false,
            }
            if node.word_tail {
                return true;
            }
        }
        false
    }
}

/// Turns a Rust type path (`a::b::Type`) into a canonical name (`a/b.Type`)
pub fn canonical_name_from_type_path(type_path: &str) -> String {
    // generic arguments are kept verbatim, only the outer path is rewritten
    let (outer, generics) = match type_path.find('<') {
        Some(idx) => type_path.split_at(idx),
        None => (type_path, ""),
    };
    match outer.rsplit_once("::") {
        Some((module, name)) => format!("{}.{}{}", module.replace("::", "/"), name, generics),
        None => type_path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trie_prefix_matching() {
        let trie = Trie::new(["/swaggerapi", "/healthz"]);
        assert!(trie.has_prefix("/swaggerapi"));
        assert!(trie.has_prefix("/healthz/ping"));
        assert!(!trie.has_prefix("/health"));
        assert!(!trie.has_prefix("/api/v1"));
    }

    #[test]
    fn test_empty_word_matches_everything() {
        let trie = Trie::new([""]);
        assert!(trie.has_prefix("/anything"));
        assert!(!Trie::new(Vec::<String>::new()).has_prefix("/anything"));
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(
            canonical_name_from_type_path("my_api::models::Pod"),
            "my_api/models.Pod"
        );
        assert_eq!(canonical_name_from_type_path("i32"), "i32");
        assert_eq!(
            canonical_name_from_type_path("my_api::List<my_api::Pod>"),
            "my_api.List<my_api::Pod>"
        );
    }
}

use crc32fast::Hasher;

/// Generate a document seed from its name using CRC32
pub fn get_document_seed(name: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential block id generator scoped to one document
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // Document seed (CRC32 of its name)
    count: u32,   // Sequential counter
}

impl IdGenerator {
    pub fn new(document_name: &str) -> Self {
        Self {
            seed: get_document_seed(document_name),
            count: 0,
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Generate the next block id
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("Blk-{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_seed_generation() {
        let seed1 = get_document_seed("notes");
        let seed2 = get_document_seed("notes");

        // Same name always generates same seed
        assert_eq!(seed1, seed2);

        // Different names generate different seeds
        assert_ne!(seed1, get_document_seed("journal"));
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::new("notes");

        let id1 = gen.new_id();
        let id2 = gen.new_id();
        let id3 = gen.new_id();

        assert!(id1.ends_with("-1"));
        assert!(id2.ends_with("-2"));
        assert!(id3.ends_with("-3"));

        let seed = gen.seed().to_string();
        for id in [&id1, &id2, &id3] {
            assert!(id.contains(&seed));
        }
    }

    #[test]
    fn test_from_seed() {
        let mut gen = IdGenerator::from_seed("abc");
        assert_eq!(gen.new_id(), "Blk-abc-1");
    }
}

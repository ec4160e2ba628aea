/// A fixed-dimensional text embedder, document- and query-role. SPEC_FULL
/// §4.11 treats the real embedding provider as an out-of-scope collaborator;
/// this is the local, deterministic stand-in that keeps C11 testable offline.
pub trait Embedder: Send + Sync {
    fn embed_document(&self, text: &str) -> Vec<f32>;
    fn embed_query(&self, text: &str) -> Vec<f32>;
}

/// Hashed bag-of-terms projected into `dim` buckets and L2-normalized.
pub struct HashedEmbedder {
    dim: usize,
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn project(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let hash = fnv1a(token.as_bytes());
            let idx = (hash as usize) % self.dim;
            let sign = if (hash >> 63) & 1 == 1 { -1.0 } else { 1.0 };
            vector[idx] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl Embedder for HashedEmbedder {
    fn embed_document(&self, text: &str) -> Vec<f32> {
        self.project(text)
    }

    fn embed_query(&self, text: &str) -> Vec<f32> {
        self.project(text)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Both inputs are assumed L2-normalized, so the dot product equals cosine
/// similarity.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x * y) as f64).sum()
}

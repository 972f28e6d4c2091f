//! Topic clustering and similarity over document embeddings.
//!
//! [`kmeans`] groups summary embeddings with k-means++ seeding and Lloyd iterations. Seeding uses
//! a fixed-seed SplitMix64 generator so repeated runs over the same corpus produce the same
//! assignments. [`label_clusters`] names each group by its heaviest TF-IDF terms.

use thiserror::Error;

use crate::text::TfidfVectorizer;

/// Seed used for centroid initialization when callers do not supply one.
pub const DEFAULT_SEED: u64 = 42;
/// Upper bound on Lloyd iterations.
pub const DEFAULT_MAX_ITER: usize = 300;
/// Terms present in more than this share of documents are too common to label a cluster.
pub const LABEL_MAX_DF: f64 = 0.8;
/// Independent k-means++ seedings per run; the lowest-inertia result wins.
pub const RESTARTS: usize = 10;
const SIMILARITY_EPSILON: f32 = 1e-9;

/// Errors raised while clustering.
#[derive(Debug, Error)]
pub enum ClusteringError {
    /// Input vectors do not share one dimensionality.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the first vector.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Labels and texts describe different document counts.
    #[error("Got {labels} cluster labels for {texts} texts")]
    LengthMismatch {
        /// Number of texts supplied.
        texts: usize,
        /// Number of labels supplied.
        labels: usize,
    },
}

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster index per input vector.
    pub labels: Vec<usize>,
    /// Final centroid per cluster.
    pub centroids: Vec<Vec<f32>>,
    /// Lloyd iterations performed.
    pub iterations: usize,
}

impl KMeansResult {
    /// Number of clusters.
    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    /// Input indices assigned to `cluster`.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(index, label)| (*label == cluster).then_some(index))
            .collect()
    }
}

/// Cluster `vectors` into `k` groups.
///
/// `k` is clamped to `1..=vectors.len()`. Empty input yields an empty result. Clusters left
/// without members after an update take the point farthest from its own centroid. The run is
/// repeated [`RESTARTS`] times from one seeded generator and the tightest clustering is kept.
pub fn kmeans(
    vectors: &[Vec<f32>],
    k: usize,
    seed: u64,
    max_iter: usize,
) -> Result<KMeansResult, ClusteringError> {
    let Some(first) = vectors.first() else {
        return Ok(KMeansResult {
            labels: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
        });
    };
    let dimension = first.len();
    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(ClusteringError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }

    let n = vectors.len();
    let k = k.clamp(1, n);
    let mut rng = SplitMix64::new(seed);
    let mut result = lloyd(vectors, k, dimension, max_iter, &mut rng);
    let mut lowest = inertia(vectors, &result);
    for _ in 1..RESTARTS {
        let run = lloyd(vectors, k, dimension, max_iter, &mut rng);
        let run_inertia = inertia(vectors, &run);
        if run_inertia < lowest {
            lowest = run_inertia;
            result = run;
        }
    }

    tracing::debug!(
        points = n,
        clusters = k,
        iterations = result.iterations,
        inertia = lowest,
        "k-means converged"
    );
    Ok(result)
}

fn lloyd(
    vectors: &[Vec<f32>],
    k: usize,
    dimension: usize,
    max_iter: usize,
    rng: &mut SplitMix64,
) -> KMeansResult {
    let mut centroids = seed_centroids(vectors, k, rng);
    let mut labels = vec![usize::MAX; vectors.len()];
    let mut iterations = 0;

    for iteration in 1..=max_iter.max(1) {
        iterations = iteration;
        let mut changed = assign(vectors, &centroids, &mut labels);
        changed |= relocate_empty_clusters(vectors, &centroids, &mut labels, k);
        centroids = recompute_centroids(vectors, &labels, k, dimension);
        if !changed {
            break;
        }
    }

    KMeansResult {
        labels,
        centroids,
        iterations,
    }
}

fn inertia(vectors: &[Vec<f32>], result: &KMeansResult) -> f64 {
    vectors
        .iter()
        .zip(&result.labels)
        .map(|(vector, label)| squared_distance(vector, &result.centroids[*label]))
        .sum()
}

fn seed_centroids(vectors: &[Vec<f32>], k: usize, rng: &mut SplitMix64) -> Vec<Vec<f32>> {
    let n = vectors.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(vectors[rng.below(n)].clone());

    let mut closest: Vec<f64> = vectors
        .iter()
        .map(|vector| squared_distance(vector, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let chosen = if total <= 0.0 {
            rng.below(n)
        } else {
            let mut target = rng.next_f64() * total;
            let mut chosen = n - 1;
            for (index, distance) in closest.iter().enumerate() {
                if target < *distance {
                    chosen = index;
                    break;
                }
                target -= distance;
            }
            chosen
        };

        let centroid = vectors[chosen].clone();
        for (distance, vector) in closest.iter_mut().zip(vectors) {
            *distance = distance.min(squared_distance(vector, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

fn assign(vectors: &[Vec<f32>], centroids: &[Vec<f32>], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (label, vector) in labels.iter_mut().zip(vectors) {
        let nearest = nearest_centroid(vector, centroids);
        if *label != nearest {
            *label = nearest;
            changed = true;
        }
    }
    changed
}

fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(vector, centroid);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

fn relocate_empty_clusters(
    vectors: &[Vec<f32>],
    centroids: &[Vec<f32>],
    labels: &mut [usize],
    k: usize,
) -> bool {
    let mut counts = vec![0usize; k];
    for label in labels.iter() {
        counts[*label] += 1;
    }

    let mut relocated = false;
    for cluster in 0..k {
        if counts[cluster] > 0 {
            continue;
        }
        let donor = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| counts[**label] > 1)
            .map(|(index, label)| (index, squared_distance(&vectors[index], &centroids[*label])))
            .max_by(|left, right| left.1.total_cmp(&right.1));
        let Some((index, _)) = donor else {
            break;
        };
        counts[labels[index]] -= 1;
        counts[cluster] += 1;
        labels[index] = cluster;
        relocated = true;
    }
    relocated
}

fn recompute_centroids(
    vectors: &[Vec<f32>],
    labels: &[usize],
    k: usize,
    dimension: usize,
) -> Vec<Vec<f32>> {
    let mut sums = vec![vec![0.0_f64; dimension]; k];
    let mut counts = vec![0usize; k];
    for (vector, label) in vectors.iter().zip(labels) {
        counts[*label] += 1;
        for (sum, value) in sums[*label].iter_mut().zip(vector) {
            *sum += f64::from(*value);
        }
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            let count = count.max(1) as f64;
            sum.into_iter().map(|value| (value / count) as f32).collect()
        })
        .collect()
}

fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = f64::from(*x) - f64::from(*y);
            diff * diff
        })
        .sum()
}

/// Name every cluster by the heaviest terms in the mean TF-IDF row of its members.
///
/// Returns one list per cluster index `0..=max(labels)`. Only terms with positive weight are
/// kept. When vocabulary pruning leaves nothing, every list is empty.
pub fn label_clusters<S: AsRef<str>>(
    texts: &[S],
    labels: &[usize],
    top_n: usize,
) -> Result<Vec<Vec<String>>, ClusteringError> {
    if texts.len() != labels.len() {
        return Err(ClusteringError::LengthMismatch {
            texts: texts.len(),
            labels: labels.len(),
        });
    }
    let Some(cluster_count) = labels.iter().max().map(|max| max + 1) else {
        return Ok(Vec::new());
    };

    let matrix = TfidfVectorizer::new()
        .with_max_df(LABEL_MAX_DF)
        .fit_transform(texts);
    let terms = matrix.terms();
    if terms.is_empty() {
        tracing::debug!("No terms survived pruning; clusters left unlabeled");
        return Ok(vec![Vec::new(); cluster_count]);
    }

    let labeled = (0..cluster_count)
        .map(|cluster| {
            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter_map(|(index, label)| (*label == cluster).then_some(index))
                .collect();
            let mean = matrix.mean_row(&members);
            let mut weighted: Vec<(usize, f64)> = mean
                .into_iter()
                .enumerate()
                .filter(|(_, weight)| *weight > 0.0)
                .collect();
            weighted.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));
            weighted
                .into_iter()
                .take(top_n)
                .map(|(column, _)| terms[column].clone())
                .collect()
        })
        .collect();

    Ok(labeled)
}

/// Cosine similarity with a small epsilon in the denominator so zero vectors score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + SIMILARITY_EPSILON)
}

/// Score every candidate against `target` and keep the `k` most similar, best first.
///
/// Ties keep candidate order.
pub fn rank_similar<T>(target: &[f32], candidates: Vec<(T, Vec<f32>)>, k: usize) -> Vec<(T, f32)> {
    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .map(|(item, vector)| {
            let score = cosine_similarity(target, &vector);
            (item, score)
        })
        .collect();
    scored.sort_by(|left, right| right.1.total_cmp(&left.1));
    scored.truncate(k);
    scored
}

/// SplitMix64: small, fast, and fully determined by its seed.
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `0..n`; `n` must be non-zero.
    fn below(&mut self, n: usize) -> usize {
        ((self.next_f64() * n as f64) as usize).min(n - 1)
    }
}

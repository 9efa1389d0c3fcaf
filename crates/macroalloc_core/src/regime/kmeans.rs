//! Lloyd's k-means with k-means++ seeding over dense feature vectors.

use rand::Rng;

#[derive(Debug, Clone)]
pub(crate) struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

#[inline]
pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of the nearest centroid; ties go to the lower index.
pub(crate) fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

/// Run k-means on `points` (all of equal dimension, at least `k` of them).
pub(crate) fn fit<R: Rng + ?Sized>(
    points: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    tolerance: f64,
    rng: &mut R,
) -> KMeansFit {
    let mut centroids = plus_plus_init(points, k, rng);
    let mut assignments = vec![0; points.len()];
    let mut iterations = 0;

    for _ in 0..max_iterations {
        iterations += 1;
        assign(points, &centroids, &mut assignments);
        let updated = update(points, &assignments, &centroids);
        let shift = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(old, new))
            .fold(0.0, f64::max);
        centroids = updated;
        if shift <= tolerance {
            break;
        }
    }

    assign(points, &centroids, &mut assignments);
    let inertia = points
        .iter()
        .zip(&assignments)
        .map(|(p, &j)| squared_distance(p, &centroids[j]))
        .sum();

    KMeansFit {
        centroids,
        assignments,
        inertia,
        iterations,
    }
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>], assignments: &mut [usize]) {
    for (p, a) in points.iter().zip(assignments.iter_mut()) {
        *a = nearest(p, centroids).0;
    }
}

/// Recompute centroids as cluster means. An empty cluster is re-seeded with the
/// point farthest from its current centroid.
fn update(points: &[Vec<f64>], assignments: &[usize], centroids: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = centroids.len();
    let dim = points[0].len();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];
    for (p, &j) in points.iter().zip(assignments) {
        counts[j] += 1;
        for (s, x) in sums[j].iter_mut().zip(p) {
            *s += x;
        }
    }

    let mut reseeded: Vec<usize> = Vec::new();
    let mut updated = Vec::with_capacity(k);
    for j in 0..k {
        if counts[j] > 0 {
            let n = counts[j] as f64;
            updated.push(sums[j].iter().map(|s| s / n).collect());
            continue;
        }
        let mut farthest: Option<(usize, f64)> = None;
        for (i, (p, &a)) in points.iter().zip(assignments).enumerate() {
            if reseeded.contains(&i) {
                continue;
            }
            let d = squared_distance(p, &centroids[a]);
            if farthest.is_none_or(|(_, best)| d > best) {
                farthest = Some((i, d));
            }
        }
        match farthest {
            Some((i, _)) => {
                reseeded.push(i);
                updated.push(points[i].clone());
            }
            None => updated.push(centroids[j].clone()),
        }
    }
    updated
}

/// k-means++: first centre uniform, later centres drawn proportional to the
/// squared distance from the nearest chosen centre.
fn plus_plus_init<R: Rng + ?Sized>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..n)].clone());

    let mut d2: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let idx = if total > 0.0 {
            let r = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, d) in d2.iter().enumerate() {
                cumulative += d;
                if *d > 0.0 && cumulative > r {
                    chosen = Some(i);
                    break;
                }
            }
            // Rounding can leave r just above the final cumulative sum
            chosen.unwrap_or_else(|| d2.iter().rposition(|d| *d > 0.0).unwrap_or(0))
        } else {
            rng.random_range(0..n)
        };
        let centre = points[idx].clone();
        for (d, p) in d2.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centre));
        }
        centroids.push(centre);
    }
    centroids
}

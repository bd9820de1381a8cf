use kdbucket::{Euclidean, KdTree, Manhattan, Metric, WeightedManhattan};
use ordered_float::OrderedFloat;
use rand::{rngs::StdRng, Rng, SeedableRng};

const DIMENSIONS: usize = 3;

fn random_point(rng: &mut StdRng) -> Vec<f64> {
    (0..DIMENSIONS).map(|_| rng.gen_range(-100.0..100.0)).collect()
}

// Integer coordinates with many duplicates and equal distances.
fn grid_point(rng: &mut StdRng) -> Vec<f64> {
    (0..DIMENSIONS).map(|_| f64::from(rng.gen_range(0..6_u8))).collect()
}

fn build<M: Metric>(tree: &mut KdTree<usize, M>, rng: &mut StdRng, n: usize) -> Vec<Vec<f64>> {
    build_with(tree, rng, n, random_point)
}

fn build_with<M: Metric>(
    tree: &mut KdTree<usize, M>,
    rng: &mut StdRng,
    n: usize,
    generate: fn(&mut StdRng) -> Vec<f64>,
) -> Vec<Vec<f64>> {
    let mut points = Vec::new();
    for id in 0..n {
        let point = generate(rng);
        tree.add_point(&point, id).unwrap();
        points.push(point);
    }
    points
}

// Compare every query against a linear scan over `points`. Ids are insertion indices, so a
// stable sort by distance gives the expected order of equally distant points.
fn check_queries<M: Metric>(tree: &KdTree<usize, M>, points: &[Vec<f64>], rng: &mut StdRng) {
    for _ in 0..100 {
        // Stored points as queries produce ties
        let query = if rng.gen_bool(0.5) {
            random_point(rng)
        } else {
            points[rng.gen_range(0..points.len())].clone()
        };

        // k nearest neighbours
        let k = rng.gen_range(1..30);
        let mut expected = points
            .iter()
            .enumerate()
            .map(|(id, point)| (tree.metric().distance(&query, point), id))
            .collect::<Vec<_>>();
        expected.sort_by_key(|(distance, _)| OrderedFloat(*distance));
        expected.truncate(k);

        let actual = tree.nearest_neighbours(&query, k).unwrap();
        let actual = actual
            .into_iter()
            .map(|(distance, id)| (distance, *id))
            .collect::<Vec<_>>();
        assert_eq!(expected, actual);

        // Ball search with the distance of the k-th neighbour, exactly or scaled
        let kth = expected[expected.len() - 1].0;
        let radius = if rng.gen_bool(0.5) {
            kth
        } else {
            kth * rng.gen_range(0.5..1.5)
        };
        let mut expected = points
            .iter()
            .enumerate()
            .filter(|(_, point)| tree.metric().distance(&query, point) <= radius)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        expected.sort_unstable();

        let mut actual = tree
            .ball_search(&query, radius)
            .unwrap()
            .into_iter()
            .copied()
            .collect::<Vec<_>>();
        actual.sort_unstable();
        assert_eq!(expected, actual);

        // Rectangle search
        let other = random_point(rng);
        let mins = query.iter().zip(&other).map(|(a, b)| a.min(*b)).collect::<Vec<_>>();
        let maxs = query.iter().zip(&other).map(|(a, b)| a.max(*b)).collect::<Vec<_>>();
        let mut expected = points
            .iter()
            .enumerate()
            .filter(|(_, point)| {
                (0..DIMENSIONS).all(|d| mins[d] <= point[d] && point[d] <= maxs[d])
            })
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        expected.sort_unstable();

        let mut actual = tree
            .rect_search(&mins, &maxs)
            .unwrap()
            .into_iter()
            .copied()
            .collect::<Vec<_>>();
        actual.sort_unstable();
        assert_eq!(expected, actual);

        // Swapping the corners gives an empty box
        assert!(tree.rect_search(&maxs, &mins).unwrap().is_empty());
    }
}

#[test]
fn euclidean() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut tree = KdTree::<usize, Euclidean>::with_bucket_size(DIMENSIONS, 8).unwrap();
    let points = build(&mut tree, &mut rng, 2000);
    assert_eq!(tree.size(), 2000);
    check_queries(&tree, &points, &mut rng);
}

#[test]
fn manhattan() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut tree = KdTree::<usize, Manhattan>::new(DIMENSIONS).unwrap();
    let points = build(&mut tree, &mut rng, 2000);
    check_queries(&tree, &points, &mut rng);
}

#[test]
fn weighted_manhattan() {
    let mut rng = StdRng::seed_from_u64(0);
    let metric = WeightedManhattan::new(vec![1.0, 0.25, 4.0]).unwrap();
    let mut tree = KdTree::with_metric(DIMENSIONS, 16, metric).unwrap();
    let points = build(&mut tree, &mut rng, 2000);
    check_queries(&tree, &points, &mut rng);

    // Weights may change after the points are in
    tree.set_weights(&[0.0, 2.0, 1.0]).unwrap();
    check_queries(&tree, &points, &mut rng);
}

#[test]
fn euclidean_grid() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut tree = KdTree::<usize, Euclidean>::with_bucket_size(DIMENSIONS, 2).unwrap();
    let points = build_with(&mut tree, &mut rng, 1000, grid_point);
    check_queries(&tree, &points, &mut rng);
}

#[test]
fn manhattan_grid() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut tree = KdTree::<usize, Manhattan>::with_bucket_size(DIMENSIONS, 3).unwrap();
    let points = build_with(&mut tree, &mut rng, 1000, grid_point);
    check_queries(&tree, &points, &mut rng);
}

#[test]
fn weighted_manhattan_grid() {
    let mut rng = StdRng::seed_from_u64(0);
    let metric = WeightedManhattan::new(vec![2.0, 1.0, 0.0]).unwrap();
    let mut tree = KdTree::with_metric(DIMENSIONS, 4, metric).unwrap();
    let points = build_with(&mut tree, &mut rng, 1000, grid_point);
    check_queries(&tree, &points, &mut rng);
}

#[test]
fn incremental() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut tree = KdTree::<usize>::with_bucket_size(DIMENSIONS, 4).unwrap();
    let mut points = Vec::new();

    // Query while the tree grows
    for id in 0..500 {
        let point = random_point(&mut rng);
        tree.add_point(&point, id).unwrap();
        points.push(point);

        if id % 50 == 0 {
            let query = random_point(&mut rng);
            let mut expected = points
                .iter()
                .enumerate()
                .map(|(id, point)| (Euclidean.distance(&query, point), id))
                .collect::<Vec<_>>();
            expected.sort_by_key(|(distance, _)| OrderedFloat(*distance));
            expected.truncate(5);

            let actual = tree
                .nearest_neighbours(&query, 5)
                .unwrap()
                .into_iter()
                .map(|(distance, id)| (distance, *id))
                .collect::<Vec<_>>();
            assert_eq!(expected, actual);
        }
    }
    assert_eq!(tree.size(), 500);
}

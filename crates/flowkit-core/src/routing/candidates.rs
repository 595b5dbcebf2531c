//! Enumeration of short orthogonal paths through channel coordinates.

use super::Port;
use crate::EPSILON;
use crate::anchor::Direction;
use kurbo::Point;

/// Longest candidate considered (four bends).
const MAX_SEGMENTS: usize = 5;

/// A path built from channel coordinates, already free of collinear points.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub points: Vec<Point>,
    /// Distance of the free channel coordinates from the midpoint between stubs.
    pub balance: f64,
}

/// Enumerate every orthogonal path of up to five segments that honors the
/// port normals and stub length.
///
/// Segments alternate axes, so the first `n - 2` segments each pick one free
/// coordinate from the channel set and the last two land on the target.
pub(crate) fn enumerate(source: &Port, target: &Port, stub: f64) -> Vec<Candidate> {
    let s = source.point;
    let t = target.point;
    let s_stub = source.stub_point(stub);
    let t_stub = target.stub_point(stub);
    let mid = s_stub.midpoint(t_stub);

    let mut xs = vec![s.x, t.x, s_stub.x, t_stub.x, mid.x];
    let mut ys = vec![s.y, t.y, s_stub.y, t_stub.y, mid.y];
    for bounds in [source.bounds, target.bounds].into_iter().flatten() {
        xs.extend([bounds.x0, bounds.x1]);
        ys.extend([bounds.y0, bounds.y1]);
    }
    let xs = with_detours(xs, stub);
    let ys = with_detours(ys, stub);

    let first_horizontal = source.normal.is_horizontal();
    let mut candidates = Vec::new();

    for segments in 1..=MAX_SEGMENTS {
        let last_horizontal = first_horizontal ^ ((segments - 1) % 2 == 1);
        if last_horizontal != target.normal.is_horizontal() {
            continue;
        }
        let free = segments.saturating_sub(2);
        let sets: Vec<&[f64]> = (0..free)
            .map(|i| {
                if first_horizontal ^ (i % 2 == 1) {
                    xs.as_slice()
                } else {
                    ys.as_slice()
                }
            })
            .collect();

        for_each_combo(&sets, |values| {
            let mut cur = s;
            let mut points = Vec::with_capacity(segments + 1);
            points.push(s);
            let mut balance = 0.0;
            for i in 0..segments {
                let horizontal = first_horizontal ^ (i % 2 == 1);
                let value = match values.get(i) {
                    Some(&v) => {
                        balance += if horizontal { (v - mid.x).abs() } else { (v - mid.y).abs() };
                        v
                    }
                    None if horizontal => t.x,
                    None => t.y,
                };
                cur = if horizontal {
                    Point::new(value, cur.y)
                } else {
                    Point::new(cur.x, value)
                };
                points.push(cur);
            }
            if cur.distance(t) <= EPSILON && honors_ports(&points, source, target, stub) {
                candidates.push(Candidate { points, balance });
            }
        });
    }
    candidates
}

/// Check stub and direction constraints of a finished path.
///
/// The first segment leaves along the source normal, the last arrives against
/// the target normal, both at least `stub` long, with no zero-length segment
/// and no reversal.
pub(crate) fn honors_ports(points: &[Point], source: &Port, target: &Port, stub: f64) -> bool {
    if points.len() < 2 {
        return false;
    }
    let mut directions = Vec::with_capacity(points.len() - 1);
    for pair in points.windows(2) {
        match Direction::between(pair[0], pair[1]) {
            Some(direction) => directions.push(direction),
            None => return false,
        }
    }
    if directions
        .windows(2)
        .any(|pair| pair[1] == pair[0].opposite())
    {
        return false;
    }

    let first_len = points[0].distance(points[1]);
    let last_len = points[points.len() - 2].distance(points[points.len() - 1]);
    directions.first() == Some(&source.normal)
        && directions.last() == Some(&target.normal.opposite())
        && first_len >= stub - EPSILON
        && last_len >= stub - EPSILON
}

/// Sort, dedupe and add one coordinate beyond each extreme.
fn with_detours(mut values: Vec<f64>, stub: f64) -> Vec<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values.extend([lo - stub, hi + stub]);
    dedup_coordinates(values)
}

pub(crate) fn dedup_coordinates(mut values: Vec<f64>) -> Vec<f64> {
    values.retain(|v| v.is_finite());
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
    values
}

/// Call `f` with every combination taking one value from each set.
fn for_each_combo(sets: &[&[f64]], mut f: impl FnMut(&[f64])) {
    if sets.iter().any(|set| set.is_empty()) {
        return;
    }
    let mut indices = vec![0usize; sets.len()];
    let mut values = Vec::with_capacity(sets.len());
    loop {
        values.clear();
        values.extend(indices.iter().zip(sets).map(|(&i, set)| set[i]));
        f(&values);

        let mut k = 0;
        loop {
            if k == sets.len() {
                return;
            }
            indices[k] += 1;
            if indices[k] < sets[k].len() {
                break;
            }
            indices[k] = 0;
            k += 1;
        }
    }
}

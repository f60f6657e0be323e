//! Geometry predicates used by the cleanup passes.
//!
//! Everything here works on exact integer coordinates; no tolerance is ever
//! applied. Deltas and products are widened to `i128` so no coordinate an
//! `i64` can hold ever overflows.

use crate::board::Track;

/// A trace whose two ends coincide. Vias are never null.
pub fn is_null(track: &Track) -> bool {
    track.is_trace() && track.start == track.end
}

/// Direction vector `end - start`.
pub fn direction(track: &Track) -> (i128, i128) {
    (
        i128::from(track.end.x) - i128::from(track.start.x),
        i128::from(track.end.y) - i128::from(track.start.y),
    )
}

/// Are the two direction vectors parallel?
///
/// Axis-aligned cases are decided first so that a zero component is never fed
/// into the cross product.
pub fn parallelism_test(dx1: i128, dy1: i128, dx2: i128, dy2: i128) -> bool {
    // vertical
    if dx1 == 0 {
        return dx2 == 0;
    }
    if dx2 == 0 {
        return dx1 == 0;
    }

    // horizontal
    if dy1 == 0 {
        return dy2 == 0;
    }
    if dy2 == 0 {
        return dy1 == 0;
    }

    products_equal(dy1, dx2, dx1, dy2)
}

/// `a * b == c * d` for deltas of `i64` coordinates. Such a delta fits in 64
/// bits of magnitude, so the unsigned products fit in `u128`.
fn products_equal(a: i128, b: i128, c: i128, d: i128) -> bool {
    let sign_ab = a.signum() * b.signum();
    let sign_cd = c.signum() * d.signum();
    sign_ab == sign_cd && a.unsigned_abs() * b.unsigned_abs() == c.unsigned_abs() * d.unsigned_abs()
}

/// Parallel direction vectors. For segments that already share an endpoint
/// this is the same as lying on one line.
pub fn are_collinear(a: &Track, b: &Track) -> bool {
    let (dx1, dy1) = direction(a);
    let (dx2, dy2) = direction(b);
    parallelism_test(dx1, dy1, dx2, dy2)
}

/// Same two endpoints, in either order.
pub fn same_endpoints(a: &Track, b: &Track) -> bool {
    (a.start == b.start && a.end == b.end) || (a.start == b.end && a.end == b.start)
}

/// `b` is a redundant copy of `a`: same kind, same layer, same endpoints.
/// Arcs sharing their ends can still bulge differently and are never
/// duplicates.
pub fn is_duplicate_track(a: &Track, b: &Track) -> bool {
    !a.is_arc()
        && !b.is_arc()
        && a.is_via() == b.is_via()
        && a.layer == b.layer
        && same_endpoints(a, b)
}

/// Two through vias drilled at the same spot.
pub fn is_duplicate_via(a: &Track, b: &Track) -> bool {
    a.is_through_via() && b.is_through_via() && a.start == b.start
}

/// Width and kind allow a collinear merge of `a` and `b`. Only straight
/// traces merge.
pub fn can_merge_kinds(a: &Track, b: &Track) -> bool {
    a.is_trace() && b.is_trace() && a.width == b.width
}

use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use tracing::debug;

/// Lengths below this are treated as zero when building local frames.
pub const DEGENERACY_EPSILON: f64 = 1e-8;

pub fn distance(p: &Point3<f64>, q: &Point3<f64>) -> f64 {
    (p - q).norm()
}

/// Angle `p-q-r` in degrees, with `q` as the vertex.
///
/// The cosine is clamped to `[-1, 1]` before `acos`. A zero-length arm yields 0.
pub fn angle(p: &Point3<f64>, q: &Point3<f64>, r: &Point3<f64>) -> f64 {
    let v1 = p - q;
    let v2 = r - q;
    let n1 = v1.norm();
    let n2 = v2.norm();
    if n1 < DEGENERACY_EPSILON || n2 < DEGENERACY_EPSILON {
        debug!("Angle requested with a zero-length arm; reporting 0 degrees");
        return 0.0;
    }
    let cos = v1.dot(&v2) / (n1 * n2);
    if !(-1.0..=1.0).contains(&cos) {
        debug!(cos, "Clamping angle cosine to [-1, 1]");
    }
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Signed torsion `p-q-r-s` in degrees, in `(-180, 180]`.
///
/// Positive values follow the IUPAC convention: looking down `q -> r`, the
/// front bond `q-p` is rotated clockwise onto the back bond `r-s`.
pub fn dihedral(p: &Point3<f64>, q: &Point3<f64>, r: &Point3<f64>, s: &Point3<f64>) -> f64 {
    let b1 = q - p;
    let b2 = r - q;
    let b3 = s - r;
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    if x.abs() < DEGENERACY_EPSILON && y.abs() < DEGENERACY_EPSILON {
        debug!("Dihedral requested for collinear points; reporting 0 degrees");
        return 0.0;
    }
    wrap_degrees(y.atan2(x).to_degrees())
}

/// Computes the point `X` with `distance(X, c) = r`, `angle(X, c, b) = theta` and
/// `dihedral(X, c, b, a) = phi` (angles in degrees).
///
/// Returns `None` when `b` coincides with `c` or when `a`, `b` and `c` are
/// collinear, because the torsion axis is then undefined.
pub fn place(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    r: f64,
    theta: f64,
    phi: f64,
) -> Option<Point3<f64>> {
    let bc = c - b;
    if bc.norm() < DEGENERACY_EPSILON {
        return None;
    }
    let bc = bc.normalize();
    let normal = bc.cross(&(a - b));
    if normal.norm() < DEGENERACY_EPSILON {
        return None;
    }
    let v1 = normal.normalize();
    let v2 = v1.cross(&bc);

    let theta = theta.to_radians();
    let phi = phi.to_radians();
    let v3 = v1 * phi.sin() + v2 * phi.cos();
    let supplement = std::f64::consts::PI - theta;

    Some(c + bc * (r * supplement.cos()) + v3 * (r * supplement.sin()))
}

/// Maps an angle in degrees into `(-180, 180]`.
pub fn wrap_degrees(value: f64) -> f64 {
    let mut wrapped = value % 360.0;
    if wrapped <= -180.0 {
        wrapped += 360.0;
    } else if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// The representative `value + 360k` closest to `reference`.
pub fn nearest_periodic_image(value: f64, reference: f64) -> f64 {
    reference + wrap_degrees(value - reference)
}

/// Shortest signed difference `a - b` on the circle, in `(-180, 180]`.
pub fn periodic_difference(a: f64, b: f64) -> f64 {
    wrap_degrees(a - b)
}

/// Rigid transform that best superimposes `from_points` onto `to_points` (Kabsch).
///
/// Returns `None` for empty or mismatched inputs.
pub fn superposition_transform(
    from_points: &[Point3<f64>],
    to_points: &[Point3<f64>],
) -> Option<(Rotation3<f64>, Vector3<f64>)> {
    if from_points.is_empty() || from_points.len() != to_points.len() {
        return None;
    }
    let from_centroid = centroid(from_points);
    let to_centroid = centroid(to_points);

    let h = from_points
        .iter()
        .zip(to_points)
        .fold(Matrix3::zeros(), |acc, (f, t)| {
            acc + (t - to_centroid) * (f - from_centroid).transpose()
        });

    let svd = h.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;

    let d = (u * v_t).determinant();
    let mut correction = Matrix3::identity();
    if d < 0.0 {
        correction[(2, 2)] = -1.0;
    }

    let rotation = Rotation3::from_matrix_unchecked(u * correction * v_t);
    let translation = to_centroid.coords - rotation * from_centroid.coords;
    Some((rotation, translation))
}

pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

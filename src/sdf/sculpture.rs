use cgmath::Vector3;

use super::DistanceField;

/// The backdrop sculpture: a high power Mandelbulb-style fractal, lying on
/// its side (the input is swizzled `xzy`).
///
/// The estimate is evaluated in `f64`; the running derivative grows past the
/// `f32` range for points that never escape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sculpture {
    pub power: f64,
    pub iterations: usize,
    pub scale: f64,
}

impl Default for Sculpture {
    fn default() -> Self {
        Self {
            power: 40.0,
            iterations: 7,
            scale: 1.2,
        }
    }
}

impl DistanceField for Sculpture {
    fn distance(&self, p: Vector3<f32>) -> f32 {
        let p = [
            f64::from(p.x) * self.scale,
            f64::from(p.z) * self.scale,
            f64::from(p.y) * self.scale,
        ];
        let mut z = p;
        let mut dr = 1.0f64;
        let mut r = 0.0f64;
        for _ in 0..self.iterations {
            r = (z[0] * z[0] + z[1] * z[1] + z[2] * z[2]).sqrt();
            if r > 2.0 {
                break;
            }
            // atan2 instead of atan(y / x): the two differ by π, which an even
            // power maps onto the same angle, and atan2 is defined at x = 0.
            let theta = z[1].atan2(z[0]);
            let phi = if r > 0.0 { (z[2] / r).clamp(-1.0, 1.0).asin() } else { 0.0 };
            dr = r.powf(self.power - 1.0) * dr * self.power + 1.0;
            r = r.powf(self.power);
            let theta = theta * self.power;
            let phi = phi * self.power;
            z = [
                r * theta.cos() * phi.cos() + p[0],
                r * theta.sin() * phi.cos() + p[1],
                r * phi.sin() + p[2],
            ];
        }
        if r <= 0.0 {
            // the orbit of the origin never leaves it
            return -1.0;
        }
        let d = 0.5 * r.ln() * r / dr;
        // Deep inside the set the estimate underflows f32; keep its sign.
        if d < 0.0 {
            (d as f32).min(-f32::MIN_POSITIVE)
        } else {
            d as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::SdfGeometryGenerator;

    #[test]
    fn far_points_are_outside() {
        let field = Sculpture::default();
        assert!(field.distance(Vector3::new(1.0, 1.0, 1.0)) > 0.0);
        assert!(field.distance(Vector3::new(0.0, 0.95, 0.0)) > 0.0);
    }

    #[test]
    fn the_core_is_inside() {
        let field = Sculpture::default();
        assert!(field.distance(Vector3::new(0.0, 0.0, 0.0)) < 0.0);
        assert!(field.distance(Vector3::new(0.1, 0.05, -0.1)) < 0.0);
    }

    #[test]
    fn tiny_interior_estimates_stay_negative() {
        let field = Sculpture::default();
        let step = 2.0 / 64.0;
        assert!(field.distance(Vector3::new(step, 0.0, 0.0)) < 0.0);
        assert!(field.distance(Vector3::new(0.0, step, step)) < 0.0);
    }

    #[test]
    fn distances_are_finite_on_the_sampling_lattice() {
        let field = Sculpture::default();
        let cells = 8;
        for i in 0..=cells {
            for j in 0..=cells {
                for k in 0..=cells {
                    let coord = |c: i32| -1.0 + 2.0 * c as f32 / cells as f32;
                    let p = Vector3::new(coord(i), coord(j), coord(k));
                    assert!(field.distance(p).is_finite(), "non-finite distance at {:?}", p);
                }
            }
        }
    }

    #[test]
    fn produces_a_closed_looking_surface() {
        let mut mesh = SdfGeometryGenerator::new().generate(16, &Sculpture::default(), 1.0);
        mesh.compute_vertex_normals();
        assert!(mesh.vertex_count() > 100);
        assert!(mesh.triangle_count() > 100);
        assert!(mesh.positions.iter().flatten().all(|c| c.abs() <= 1.0));
    }
}

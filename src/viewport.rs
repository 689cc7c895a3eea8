//! Viewport sizing.
//!
//! The canvas follows the content box of its container. A container that has
//! not been laid out yet reports zero, in which case the window dimension is
//! used instead. The fallback applies per dimension.

/// Raw size measurements taken from the host (CSS pixels).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostMetrics {
    pub container_width: u32,
    pub container_height: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub pixel_ratio: f64,
}

impl HostMetrics {
    /// Metrics for hosts where the canvas fills the whole window.
    pub fn window(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self {
            container_width: width,
            container_height: height,
            window_width: width,
            window_height: height,
            pixel_ratio,
        }
    }

    pub fn viewport(&self) -> Viewport {
        let pick = |container: u32, window: u32| if container == 0 { window } else { container };
        Viewport {
            width: pick(self.container_width, self.window_width),
            height: pick(self.container_height, self.window_height),
            pixel_ratio: if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
                self.pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Smaller of the two window dimensions.
    pub fn window_min_side(&self) -> u32 {
        self.window_width.min(self.window_height)
    }
}

/// Resolved drawing area in CSS pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    /// Size of the backing store in device pixels, never zero.
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((f64::from(v) * self.pixel_ratio).floor() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cw: u32, ch: u32) -> HostMetrics {
        HostMetrics {
            container_width: cw,
            container_height: ch,
            window_width: 1280,
            window_height: 720,
            pixel_ratio: 2.0,
        }
    }

    #[test]
    fn uses_container_size_when_laid_out() {
        let viewport = metrics(800, 600).viewport();
        assert_eq!((viewport.width, viewport.height), (800, 600));
        assert_eq!(viewport.physical_size(), (1600, 1200));
    }

    #[test]
    fn falls_back_to_window_per_dimension() {
        let viewport = metrics(0, 600).viewport();
        assert_eq!((viewport.width, viewport.height), (1280, 600));
        let viewport = metrics(800, 0).viewport();
        assert_eq!((viewport.width, viewport.height), (800, 720));
        let viewport = metrics(0, 0).viewport();
        assert_eq!((viewport.width, viewport.height), (1280, 720));
    }

    #[test]
    fn sanitizes_pixel_ratio() {
        let mut m = metrics(10, 10);
        m.pixel_ratio = 0.0;
        assert_eq!(m.viewport().pixel_ratio, 1.0);
        m.pixel_ratio = f64::NAN;
        assert_eq!(m.viewport().pixel_ratio, 1.0);
    }

    #[test]
    fn physical_size_is_never_zero() {
        let viewport = Viewport {
            width: 0,
            height: 0,
            pixel_ratio: 1.0,
        };
        assert_eq!(viewport.physical_size(), (1, 1));
    }
}

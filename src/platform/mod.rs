#[cfg(windows)]
pub mod win32;

use glam::Vec2;
use winit::window::Window;

use crate::motion::Bounds;

/// Usable desktop area in logical pixels: the Win32 work area where there
/// is one, otherwise the rectangle of the monitor holding the window.
pub fn visible_bounds(window: &Window) -> Option<Bounds> {
    let scale = window.scale_factor();

    #[cfg(windows)]
    if let Some((left, top, right, bottom)) = win32::work_area() {
        return Some(logical_bounds((left, top), (right, bottom), scale));
    }

    let monitor = window
        .current_monitor()
        .or_else(|| window.primary_monitor())?;
    let pos = monitor.position();
    let size = monitor.size();
    Some(logical_bounds(
        (pos.x, pos.y),
        (pos.x + size.width as i32, pos.y + size.height as i32),
        scale,
    ))
}

/// Physical corner pair to a logical rectangle.
fn logical_bounds(min: (i32, i32), max: (i32, i32), scale: f64) -> Bounds {
    let scale = scale.max(f64::EPSILON) as f32;
    Bounds::new(
        Vec2::new(min.0 as f32, min.1 as f32) / scale,
        Vec2::new(max.0 as f32, max.1 as f32) / scale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscaled_bounds_pass_through() {
        let b = logical_bounds((0, 0), (1920, 1040), 1.0);
        assert_eq!(b, Bounds::from_origin_size(Vec2::ZERO, Vec2::new(1920.0, 1040.0)));
    }

    #[test]
    fn hidpi_bounds_shrink() {
        let b = logical_bounds((-3840, 0), (0, 2160), 2.0);
        assert_eq!(b.min, Vec2::new(-1920.0, 0.0));
        assert_eq!(b.max, Vec2::new(0.0, 1080.0));
    }
}

use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Dwm::{DwmSetWindowAttribute, DWMWINDOWATTRIBUTE};
use windows::Win32::UI::WindowsAndMessaging::{
    GetWindowLongPtrW, SetWindowLongPtrW, SetWindowPos, SystemParametersInfoW, GWL_EXSTYLE,
    SPI_GETWORKAREA, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
    SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS, WS_EX_TOOLWINDOW,
};

/// Extract the Win32 HWND from a winit window.
pub fn get_hwnd(window: &winit::window::Window) -> Option<HWND> {
    let handle = window.window_handle().ok()?;
    match handle.as_raw() {
        RawWindowHandle::Win32(h) => Some(HWND(h.hwnd.get() as *mut core::ffi::c_void)),
        _ => None,
    }
}

fn set_dwm_u32(hwnd: HWND, attribute: i32, value: u32) {
    unsafe {
        let _ = DwmSetWindowAttribute(
            hwnd,
            DWMWINDOWATTRIBUTE(attribute),
            &value as *const u32 as *const core::ffi::c_void,
            4,
        );
    }
}

/// Apply window styles for a borderless, per-pixel-transparent mascot
/// that stays off the taskbar.
pub unsafe fn make_mascot_window(hwnd: HWND) {
    let style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);

    // No GDI redirection surface: everything comes from the DirectComposition
    // visual wgpu creates via DxgiFromVisual. WS_EX_LAYERED would fight it.
    const WS_EX_LAYERED: isize = 0x00080000;
    const WS_EX_NOREDIRECTIONBITMAP: isize = 0x00200000;

    let new_style =
        (style & !WS_EX_LAYERED) | WS_EX_TOOLWINDOW.0 as isize | WS_EX_NOREDIRECTIONBITMAP;
    SetWindowLongPtrW(hwnd, GWL_EXSTYLE, new_style);
    log::debug!("Window ex-style 0x{style:08X} -> 0x{new_style:08X}");

    // Make DWM pick up the new styles.
    let _ = SetWindowPos(
        hwnd,
        HWND::default(),
        0,
        0,
        0,
        0,
        SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
    );

    // DWMWA_NCRENDERING_POLICY = DWMNCRP_DISABLED
    set_dwm_u32(hwnd, 2, 2);
    // DWMWA_WINDOW_CORNER_PREFERENCE = DWMWCP_DONOTROUND
    set_dwm_u32(hwnd, 33, 1);
    // DWMWA_BORDER_COLOR = DWMWA_COLOR_NONE
    set_dwm_u32(hwnd, 34, 0xFFFFFFFE);
    // DWMWA_SYSTEMBACKDROP_TYPE = DWMSBT_NONE
    set_dwm_u32(hwnd, 38, 1);
}

pub fn setup_mascot_window(window: &winit::window::Window) {
    let Some(hwnd) = get_hwnd(window) else {
        log::warn!("No Win32 handle, skipping window styling");
        return;
    };
    unsafe {
        make_mascot_window(hwnd);
    }
    log::info!("Win32 mascot window ready (DirectComposition + toolwindow)");
}

/// Primary monitor's work area (excludes the taskbar), physical pixels.
pub fn work_area() -> Option<(i32, i32, i32, i32)> {
    let mut rect = RECT::default();
    let ok = unsafe {
        SystemParametersInfoW(
            SPI_GETWORKAREA,
            0,
            Some(&mut rect as *mut RECT as *mut core::ffi::c_void),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        )
    };
    match ok {
        Ok(()) => Some((rect.left, rect.top, rect.right, rect.bottom)),
        Err(e) => {
            log::warn!("SPI_GETWORKAREA failed: {e}");
            None
        }
    }
}

//! System tray icon with the Stop / Patrol / Quit context menu.
//! Uses Win32 Shell_NotifyIconW directly. Elsewhere only the keyboard
//! shortcuts are available.
use std::sync::atomic::{AtomicU16, Ordering};

#[cfg(windows)]
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
#[cfg(windows)]
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu, DestroyWindow,
    GetCursorPos, LoadIconW, RegisterClassW, SetForegroundWindow, TrackPopupMenu, CS_HREDRAW,
    CS_VREDRAW, HMENU, IDI_APPLICATION, MF_CHECKED, MF_SEPARATOR, MF_STRING, TPM_BOTTOMALIGN,
    TPM_LEFTALIGN, TPM_RETURNCMD, WM_DESTROY, WM_USER, WNDCLASSW, WS_EX_TOOLWINDOW,
};

use crate::mode::{MenuAction, Mode};

/// Custom message ID for tray icon callbacks.
#[cfg(windows)]
const WM_TRAYICON: u32 = WM_USER + 1;

/// Menu item IDs, in display order. Quit goes after a separator.
const MENU: [(u16, MenuAction); 3] = [
    (1001, MenuAction::Stop),
    (1002, MenuAction::Patrol),
    (1000, MenuAction::Quit),
];

/// Command picked from the tray icon's menu, waiting for `poll`.
static PENDING: AtomicU16 = AtomicU16::new(0);
/// Mode to tick in the menu. 0 = idle, 1 = patrolling.
static CHECKED: AtomicU16 = AtomicU16::new(0);

fn action_for(id: u16) -> Option<MenuAction> {
    MENU.iter().find(|(i, _)| *i == id).map(|&(_, action)| action)
}

fn mode_value(mode: Mode) -> u16 {
    match mode {
        Mode::Idle => 0,
        Mode::Patrolling => 1,
    }
}

fn checked_for(value: u16) -> MenuAction {
    if value == 1 {
        MenuAction::Patrol
    } else {
        MenuAction::Stop
    }
}

#[cfg(windows)]
fn checked_action() -> MenuAction {
    checked_for(CHECKED.load(Ordering::Relaxed))
}

/// System tray icon state.
pub struct TrayIcon {
    #[cfg(windows)]
    hwnd: HWND,
    #[cfg(windows)]
    nid: NOTIFYICONDATAW,
}

impl TrayIcon {
    /// Take the command chosen from the tray menu since the last call.
    pub fn poll(&self) -> Option<MenuAction> {
        action_for(PENDING.swap(0, Ordering::Relaxed))
    }

    /// Tick the current mode in future menus.
    pub fn set_mode(&self, mode: Mode) {
        CHECKED.store(mode_value(mode), Ordering::Relaxed);
    }
}

#[cfg(windows)]
impl TrayIcon {
    pub fn new() -> Self {
        unsafe {
            // Hidden window class for receiving tray messages.
            let class_name: Vec<u16> = "DesktopMascotTrayClass\0".encode_utf16().collect();
            let wc = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(tray_wnd_proc),
                lpszClassName: windows::core::PCWSTR(class_name.as_ptr()),
                ..Default::default()
            };
            RegisterClassW(&wc);

            use windows::Win32::Foundation::HINSTANCE;
            let hwnd = CreateWindowExW(
                WS_EX_TOOLWINDOW,
                windows::core::PCWSTR(class_name.as_ptr()),
                windows::core::PCWSTR::null(),
                Default::default(),
                0,
                0,
                0,
                0,
                HWND::default(),
                HMENU::default(),
                HINSTANCE::default(),
                None,
            )
            .expect("failed to create tray message window");

            let mut nid = NOTIFYICONDATAW::default();
            nid.cbSize = std::mem::size_of::<NOTIFYICONDATAW>() as u32;
            nid.hWnd = hwnd;
            nid.uID = 1;
            nid.uFlags = NIF_ICON | NIF_MESSAGE | NIF_TIP;
            nid.uCallbackMessage = WM_TRAYICON;
            nid.hIcon = LoadIconW(None, IDI_APPLICATION).unwrap_or_default();

            let tip = "Desktop Mascot";
            for (i, ch) in tip.encode_utf16().enumerate() {
                if i >= nid.szTip.len() - 1 {
                    break;
                }
                nid.szTip[i] = ch;
            }

            let _ = Shell_NotifyIconW(NIM_ADD, &nid);
            log::info!("System tray icon created");

            Self { hwnd, nid }
        }
    }

    /// Show the menu at the cursor and return the choice, if any.
    pub fn popup(&self) -> Option<MenuAction> {
        unsafe { action_for(show_context_menu(self.hwnd)) }
    }
}

#[cfg(windows)]
impl Drop for TrayIcon {
    fn drop(&mut self) {
        unsafe {
            let _ = Shell_NotifyIconW(NIM_DELETE, &self.nid);
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

/// Window procedure for the hidden tray message window.
#[cfg(windows)]
unsafe extern "system" fn tray_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_TRAYICON {
        let event = (lparam.0 & 0xFFFF) as u32;
        // WM_RBUTTONUP
        if event == 0x0205 {
            let id = show_context_menu(hwnd);
            if id != 0 {
                PENDING.store(id, Ordering::Relaxed);
            }
            return LRESULT(0);
        }
    }
    if msg == WM_DESTROY {
        return LRESULT(0);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// Run the context menu modally. Returns the chosen item ID, 0 if dismissed.
#[cfg(windows)]
unsafe fn show_context_menu(hwnd: HWND) -> u16 {
    let Ok(hmenu) = CreatePopupMenu() else {
        log::warn!("CreatePopupMenu failed");
        return 0;
    };

    let checked = checked_action();
    for &(id, action) in &MENU {
        if action == MenuAction::Quit {
            let _ = AppendMenuW(hmenu, MF_SEPARATOR, 0, windows::core::PCWSTR::null());
        }
        let flags = if action == checked {
            MF_STRING | MF_CHECKED
        } else {
            MF_STRING
        };
        let wide: Vec<u16> = action
            .label()
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();
        let _ = AppendMenuW(hmenu, flags, id as usize, windows::core::PCWSTR(wide.as_ptr()));
    }

    let mut pt = windows::Win32::Foundation::POINT::default();
    let _ = GetCursorPos(&mut pt);

    // Required so menu closes when clicking outside
    let _ = SetForegroundWindow(hwnd);

    let chosen = TrackPopupMenu(
        hmenu,
        TPM_LEFTALIGN | TPM_BOTTOMALIGN | TPM_RETURNCMD,
        pt.x,
        pt.y,
        0,
        hwnd,
        None,
    );

    let _ = DestroyMenu(hmenu);
    chosen.0 as u16
}

#[cfg(not(windows))]
impl TrayIcon {
    pub fn new() -> Self {
        log::info!("No system tray on this platform; use S / P / Esc");
        Self {}
    }

    pub fn popup(&self) -> Option<MenuAction> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_ids_map_back_to_actions() {
        for (id, action) in MENU {
            assert_eq!(action_for(id), Some(action));
        }
        assert_eq!(action_for(0), None);
    }

    #[test]
    fn checked_item_follows_mode() {
        assert_eq!(checked_for(0), MenuAction::Stop);
        assert_eq!(checked_for(1), MenuAction::Patrol);
        assert_eq!(checked_for(mode_value(Mode::Patrolling)), MenuAction::Patrol);
        assert_eq!(checked_for(mode_value(Mode::Idle)), MenuAction::Stop);
    }
}

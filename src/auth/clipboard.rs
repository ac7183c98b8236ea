//! Copying the device user code to the system clipboard.

/// Place `text` on the general pasteboard.
#[cfg(target_os = "macos")]
pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    use objc2_app_kit::NSPasteboard;
    use objc2_foundation::NSString;

    unsafe {
        let pasteboard = NSPasteboard::generalPasteboard();
        pasteboard.clearContents();

        let ns_text = NSString::from_str(text);

        // NSPasteboardTypeString is "public.utf8-plain-text"
        let type_str = NSString::from_str("public.utf8-plain-text");
        if pasteboard.setString_forType(&ns_text, &type_str) {
            Ok(())
        } else {
            Err("pasteboard rejected the string".to_string())
        }
    }
}

/// Clipboard access is only wired up for macOS.
#[cfg(not(target_os = "macos"))]
pub fn copy_to_clipboard(_text: &str) -> Result<(), String> {
    Err("clipboard is not supported on this platform".to_string())
}

/// Vulkan debug messenger - routes validation layer messages into the
/// framework logger
///
/// Compiled in only with the `vulkan-validation` feature. Validation errors
/// indicate a synchronization or configuration defect in the frame pipeline
/// and are logged at ERROR severity; performance/info chatter goes to the
/// lower severities.

use ash::vk;
use std::ffi::CStr;

use mage_framework::log::LogSeverity;

/// Create the debug messenger when validation is enabled.
///
/// Failures here are non-fatal: rendering works without the messenger, so
/// a missing debug-utils extension just disables message capture.
pub(crate) fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> (
    Option<ash::ext::debug_utils::Instance>,
    Option<vk::DebugUtilsMessengerEXT>,
) {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    match unsafe { loader.create_debug_utils_messenger(&create_info, None) } {
        Ok(messenger) => (Some(loader), Some(messenger)),
        Err(_) => (None, None),
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }

    let message = {
        let data = &*callback_data;
        if data.p_message.is_null() {
            String::new()
        } else {
            CStr::from_ptr(data.p_message).to_string_lossy().to_string()
        }
    };

    let log_severity = match severity {
        s if s.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) => LogSeverity::Error,
        s if s.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) => LogSeverity::Warn,
        s if s.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) => LogSeverity::Debug,
        _ => LogSeverity::Trace,
    };

    mage_framework::log::dispatch(
        log_severity,
        "mage::vulkan::validation",
        format!("[{:?}] {}", message_type, message),
    );

    vk::FALSE
}

/// Vulkan validation messenger
///
/// Validation layer messages are forwarded to the engine log sink under
/// the `dank::vulkan::Validation` source and counted per severity. The
/// counters live in the GPU context and reach the callback through the
/// messenger's user data pointer, so several devices never share state.

use ash::vk;
use colored::*;
use dank_engine::dank::log::LogSeverity;
use dank_engine::log;
use rustc_hash::FxHashMap;
use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const SOURCE: &str = "dank::vulkan::Validation";

/// Snapshot of validation message counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
    /// Distinct message ids seen more than once
    pub repeated: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    /// Print a colored summary to stdout
    pub fn print_report(&self) {
        if self.total() == 0 {
            println!("\n{}", "✓ No validation messages".green().bold());
            return;
        }

        println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
        if self.errors > 0 {
            println!("  {} {}", "Errors:".red().bold(), self.errors);
        }
        if self.warnings > 0 {
            println!("  {} {}", "Warnings:".yellow().bold(), self.warnings);
        }
        if self.info > 0 {
            println!("  {} {}", "Info:".cyan(), self.info);
        }
        if self.verbose > 0 {
            println!("  {} {}", "Verbose:".bright_black(), self.verbose);
        }
        println!("  {} {}", "Total:".white().bold(), self.total());
        if self.repeated > 0 {
            println!("\n  {} {} message(s) appeared multiple times", "ℹ".cyan(), self.repeated);
        }
        println!("{}\n", "====================================".bright_blue().bold());
    }
}

/// Per-device counters written by the messenger callback
#[derive(Default)]
pub(crate) struct ValidationCounters {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
    occurrences: Mutex<FxHashMap<String, u32>>,
}

impl ValidationCounters {
    /// Count one message and return how often its id was seen
    pub(crate) fn record(&self, severity: LogSeverity, message_id: &str) -> u32 {
        let counter = match severity {
            LogSeverity::Error => &self.errors,
            LogSeverity::Warn => &self.warnings,
            LogSeverity::Info => &self.info,
            LogSeverity::Debug | LogSeverity::Trace => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        match self.occurrences.lock() {
            Ok(mut occurrences) => {
                let count = occurrences.entry(message_id.to_string()).or_insert(0);
                *count += 1;
                *count
            }
            Err(_) => 1,
        }
    }

    pub(crate) fn snapshot(&self) -> ValidationStats {
        let repeated = self
            .occurrences
            .lock()
            .map(|occurrences| occurrences.values().filter(|&&count| count > 1).count() as u32)
            .unwrap_or(0);
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
            repeated,
        }
    }
}

/// Engine severity of a validation message
pub(crate) fn message_severity(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Debug
    }
}

pub(crate) fn message_type_name(flags: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Messenger create info shared by instance creation and device setup
pub(crate) fn messenger_create_info<'a>(
    counters: &'a ValidationCounters,
) -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
        .user_data(counters as *const ValidationCounters as *mut c_void)
}

/// Vulkan debug messenger callback
///
/// `user_data` points at the device's `ValidationCounters`, which outlive
/// the messenger.
unsafe extern "system" fn vulkan_debug_callback(
    severity_flags: vk::DebugUtilsMessageSeverityFlagsEXT,
    type_flags: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_str().unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message).to_str().unwrap_or("Invalid UTF-8")
    };

    let severity = message_severity(severity_flags);
    let occurrences = match (user_data as *const ValidationCounters).as_ref() {
        Some(counters) => counters.record(severity, message_id),
        None => 1,
    };
    let repeat = if occurrences > 1 { format!(" [x{}]", occurrences) } else { String::new() };

    let text = format!("[{}]{} {}: {}", message_type_name(type_flags), repeat, message_id, message);
    match severity {
        LogSeverity::Error => log::log_detailed(severity, SOURCE, text, file!(), line!()),
        _ => log::log(severity, SOURCE, text),
    }

    vk::FALSE
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;

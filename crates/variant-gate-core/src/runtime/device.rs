// crates/variant-gate-core/src/runtime/device.rs
// ============================================================================
// Module: Variant Gate Device Classification
// Description: User-agent to device-category classification.
// Purpose: Map raw user agents onto the targeting engine's device labels.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Device targeting operates on four category labels: `PC`, `SP`
//! (smartphone), `Tablet`, and `other`. Classification first derives a
//! device family from the raw user agent, then applies the category rules
//! in a fixed precedence order:
//!
//! 1. family `Other` or `Desktop` maps to `PC`
//! 2. family containing `iPad` or `Tablet` maps to `Tablet`
//! 3. family containing `iPhone`, `Android`, or `Mobile` maps to `SP`
//! 4. anything else maps to `other`
//!
//! The `Other` family (the catch-all produced for desktop browsers that
//! advertise no device token) deliberately maps to `PC`, not to the generic
//! bucket. Missing or malformed user agents degrade to a category rather
//! than erroring.

// ============================================================================
// SECTION: Device Class
// ============================================================================

/// Device category labels used by the targeting engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Desktop browsers.
    Pc,
    /// Smartphones.
    Sp,
    /// Tablets.
    Tablet,
    /// Anything that fits no other bucket (bots, consoles, readers).
    Other,
}

impl DeviceClass {
    /// Returns the wire label matched by device axis rules.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::Sp => "SP",
            Self::Tablet => "Tablet",
            Self::Other => "other",
        }
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a raw user-agent header into a device category.
#[must_use]
pub fn classify_device(user_agent: &str) -> DeviceClass {
    let family = device_family(user_agent);
    if family == "Other" || family == "Desktop" {
        return DeviceClass::Pc;
    }
    if family.contains("iPad") || family.contains("Tablet") {
        return DeviceClass::Tablet;
    }
    if family.contains("iPhone") || family.contains("Android") || family.contains("Mobile") {
        return DeviceClass::Sp;
    }
    DeviceClass::Other
}

/// Derives a coarse device family label from the user-agent string.
///
/// Tablet tokens are tested before phone tokens because Android tablets
/// also advertise `Android`, and some carry `Mobile` variants.
fn device_family(user_agent: &str) -> &'static str {
    if user_agent.contains("iPad") {
        return "iPad";
    }
    if user_agent.contains("Tablet") || is_android_tablet(user_agent) {
        return "Generic Tablet";
    }
    if user_agent.contains("iPhone") {
        return "iPhone";
    }
    if user_agent.contains("Android") {
        return "Android";
    }
    if user_agent.contains("Mobile") || user_agent.contains("Windows Phone") {
        return "Generic Mobile";
    }
    if user_agent.contains("Kindle") || user_agent.contains("Silk") {
        return "Kindle";
    }
    if user_agent.contains("PlayStation") || user_agent.contains("Nintendo") {
        return "Console";
    }
    // Desktop browsers advertise platform tokens rather than device tokens;
    // everything without a device token lands in the "Other" family.
    "Other"
}

/// Returns true for Android user agents without the `Mobile` token, which
/// Android documents as the tablet form factor.
fn is_android_tablet(user_agent: &str) -> bool {
    user_agent.contains("Android") && !user_agent.contains("Mobile")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

//! Static device descriptions.

/// Static properties of the device a context is bound to.
///
/// Queried exactly once at context construction and cached for the
/// lifetime of the context; accessors have no device-side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Device ordinal the context was constructed with.
    pub ordinal: usize,
    /// Device name as reported by the driver.
    pub name: String,
    /// Compute capability (major, minor).
    pub compute_capability: (u32, u32),
    /// Total global memory in bytes.
    pub total_memory: usize,
    /// Whether the device is real hardware (false for the null backend).
    pub is_hardware: bool,
}

impl DeviceProperties {
    /// Properties of the null backend's pseudo-device.
    pub fn null(ordinal: usize) -> Self {
        Self {
            ordinal,
            name: "null".to_string(),
            compute_capability: (0, 0),
            total_memory: 0,
            is_hardware: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_properties() {
        let props = DeviceProperties::null(3);
        assert_eq!(props.ordinal, 3);
        assert!(!props.is_hardware);
        assert_eq!(props.compute_capability, (0, 0));
    }
}

//! Physics Error Types
//!
//! Unified error type for the engine. Fallible operations (body creation,
//! soft-body construction, configuration validation) return
//! `Result<T, PhysicsError>`; lookups with invalid ids return `Option` or
//! act as no-ops instead, per the boundary contract.

use core::fmt;

/// Unified error type for physics operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicsError {
    /// Body index is out of range.
    InvalidBodyIndex {
        /// The invalid index that was provided
        index: usize,
        /// Current number of bodies in the world
        count: usize,
    },
    /// A capacity limit was exceeded (too many bodies, soft bodies, etc.).
    ///
    /// Storage is sized at world creation and never grows mid-step.
    CapacityExceeded {
        /// What resource was exhausted
        resource: &'static str,
        /// The limit that was exceeded
        limit: usize,
    },
    /// Invalid configuration or construction parameter.
    InvalidConfiguration {
        /// Description of the invalid parameter
        reason: &'static str,
    },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBodyIndex { index, count } => {
                write!(f, "body index {index} out of range (count={count})")
            }
            Self::CapacityExceeded { resource, limit } => {
                write!(f, "{resource} capacity exceeded (limit={limit})")
            }
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for PhysicsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PhysicsError::InvalidBodyIndex { index: 5, count: 3 };
        let s = format!("{}", e);
        assert!(s.contains("5"), "Should contain index");
        assert!(s.contains("3"), "Should contain count");
    }

    #[test]
    fn test_capacity_exceeded() {
        let e = PhysicsError::CapacityExceeded {
            resource: "bodies",
            limit: 1024,
        };
        let s = format!("{}", e);
        assert!(s.contains("bodies"));
        assert!(s.contains("1024"));
    }

    #[test]
    fn test_error_variants_distinct() {
        let e1 = PhysicsError::InvalidBodyIndex { index: 0, count: 0 };
        let e2 = PhysicsError::InvalidConfiguration {
            reason: "soft body needs at least 3 points",
        };
        assert_ne!(e1, e2);
    }
}

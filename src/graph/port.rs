//! Port descriptors for the node system.
//!
//! Each node kind declares its static ports and, for fan-out/fan-in nodes,
//! the template used to allocate request ports. The graph uses these to
//! validate links.

use serde::Serialize;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortDirection {
    /// Data flows into the node (`sink` side).
    Input,
    /// Data flows out of the node (`src` side).
    Output,
}

/// When a port exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortPresence {
    /// Created together with the node.
    Always,
    /// Allocated on demand from a template and released explicitly.
    Request,
    /// Appears at runtime when the backend discovers a stream.
    Sometimes,
}

/// Static descriptor for a node's port.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
}

impl PortDescriptor {
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Input,
        }
    }

    pub const fn output(name: &'static str) -> Self {
        Self {
            name,
            direction: PortDirection::Output,
        }
    }
}

/// Template for ports allocated at runtime, e.g. `src_%u` on a tee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortTemplate {
    pub pattern: &'static str,
    pub direction: PortDirection,
    pub presence: PortPresence,
}

impl PortTemplate {
    pub const fn request(pattern: &'static str, direction: PortDirection) -> Self {
        Self {
            pattern,
            direction,
            presence: PortPresence::Request,
        }
    }

    pub const fn sometimes(pattern: &'static str, direction: PortDirection) -> Self {
        Self {
            pattern,
            direction,
            presence: PortPresence::Sometimes,
        }
    }

    /// Expand the template with a serial number: `sink_%u` + 2 → `sink_2`.
    pub fn instantiate(&self, serial: u32) -> String {
        self.pattern.replace("%u", &serial.to_string())
    }

    /// Whether `name` could have been produced by this template.
    pub fn matches(&self, name: &str) -> bool {
        match self.pattern.split_once("%u") {
            Some((prefix, suffix)) => name
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())),
            None => name == self.pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_instantiate() {
        let tpl = PortTemplate::request("sink_%u", PortDirection::Input);
        assert_eq!(tpl.instantiate(0), "sink_0");
        assert_eq!(tpl.instantiate(12), "sink_12");
    }

    #[test]
    fn test_template_matches() {
        let tpl = PortTemplate::request("src_%u", PortDirection::Output);
        assert!(tpl.matches("src_3"));
        assert!(!tpl.matches("src_"));
        assert!(!tpl.matches("sink_3"));
        assert!(!tpl.matches("src_x"));
    }
}

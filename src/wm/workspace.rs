//! Workspace Module
//!
//! Virtual desktops: count, names and the one currently shown. Clients
//! carry their own desktop index; sticky clients show on all of them.

use tracing::warn;

/// Desktop index meaning "all desktops" on the wire
pub const ALL_WORKSPACES: u32 = 0xFFFF_FFFF;

/// Workspace manager
#[derive(Debug, Clone)]
pub struct Desktops {
    current: u32,
    names: Vec<String>,
}

impl Desktops {
    /// `names` is padded or truncated to `count`; a zero count becomes one
    pub fn new(count: u32, names: &[String]) -> Self {
        let count = if count == 0 {
            warn!("Desktop count 0 is invalid, using 1");
            1
        } else {
            count
        };
        if names.len() > count as usize {
            warn!(
                "{} desktop names configured for {} desktops, extra names dropped",
                names.len(),
                count
            );
        }
        let names = (0..count as usize)
            .map(|i| {
                names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("{}", i + 1))
            })
            .collect();
        Self { current: 0, names }
    }

    pub fn count(&self) -> u32 {
        self.names.len() as u32
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_valid(&self, index: u32) -> bool {
        index < self.count()
    }

    /// Returns whether the shown desktop changed
    pub fn view(&mut self, index: u32) -> bool {
        if !self.is_valid(index) || index == self.current {
            return false;
        }
        self.current = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_padded_to_count() {
        let desktops = Desktops::new(3, &["web".to_string()]);
        assert_eq!(desktops.names(), &["web", "2", "3"]);
        assert_eq!(desktops.count(), 3);
    }

    #[test]
    fn test_zero_count_and_invalid_view() {
        let mut desktops = Desktops::new(0, &[]);
        assert_eq!(desktops.count(), 1);
        assert!(!desktops.view(1));
        assert!(!desktops.view(0));
        assert_eq!(desktops.current(), 0);
    }
}
